//! Sources of client TLS material.

use std::fmt;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

/// Supplies optional TLS material by file path.
///
/// Every accessor may return "absent"; the transport treats each item
/// independently and silently skips whatever is missing or unreadable.
pub trait TlsCredentialSource: Send + Sync {
    /// PEM file holding the client certificate (chain).
    fn local_certificate_path(&self) -> Option<&Path>;

    /// PEM file holding the client private key.
    fn private_key_path(&self) -> Option<&Path>;

    /// Passphrase for the private key. Empty when not configured.
    ///
    /// The returned buffer is wiped when dropped.
    fn private_key_passphrase(&self) -> Zeroizing<String>;

    /// PEM file holding an extra CA certificate to trust.
    fn ca_certificate_path(&self) -> Option<&Path>;
}

/// A [`TlsCredentialSource`] backed by plain file paths.
///
/// ```
/// use faye_transport::tls::FileCredentials;
///
/// let credentials = FileCredentials::new()
///     .with_ca_certificate("ca.pem")
///     .with_private_key("client.key", "secret");
/// ```
#[derive(Clone, Default)]
pub struct FileCredentials {
    local_certificate: Option<PathBuf>,
    private_key: Option<PathBuf>,
    passphrase: Zeroizing<String>,
    ca_certificate: Option<PathBuf>,
}

impl FileCredentials {
    /// Empty credentials; every item absent.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the client certificate file.
    #[must_use]
    pub fn with_local_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_certificate = Some(path.into());
        self
    }

    /// Set the private key file and its passphrase (may be empty).
    #[must_use]
    pub fn with_private_key(mut self, path: impl Into<PathBuf>, passphrase: &str) -> Self {
        self.private_key = Some(path.into());
        self.passphrase = Zeroizing::new(passphrase.to_owned());
        self
    }

    /// Set the CA certificate file.
    #[must_use]
    pub fn with_ca_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_certificate = Some(path.into());
        self
    }
}

impl TlsCredentialSource for FileCredentials {
    fn local_certificate_path(&self) -> Option<&Path> {
        self.local_certificate.as_deref()
    }

    fn private_key_path(&self) -> Option<&Path> {
        self.private_key.as_deref()
    }

    fn private_key_passphrase(&self) -> Zeroizing<String> {
        self.passphrase.clone()
    }

    fn ca_certificate_path(&self) -> Option<&Path> {
        self.ca_certificate.as_deref()
    }
}

impl fmt::Debug for FileCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCredentials")
            .field("local_certificate", &self.local_certificate)
            .field("private_key", &self.private_key)
            .field("passphrase", &"<redacted>")
            .field("ca_certificate", &self.ca_certificate)
            .finish()
    }
}
