//! Per-connect TLS assembly and the socket's accumulated TLS state.

use std::path::Path;
use std::sync::Arc;

use rustls::client::WantsClientCert;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, ConfigBuilder, RootCertStore};
use tracing::debug;

use crate::socket::Socket;
use crate::tls::credentials::TlsCredentialSource;
use crate::tls::loader::{TlsError, crypto_provider, load_certs_from_file, load_private_key_from_file};

/// TLS material assembled from a [`TlsCredentialSource`] for one connect attempt.
///
/// Each field is filled only when its file was readable and valid; nothing in
/// here can make a connect attempt fail.
#[derive(Debug, Default)]
pub struct TlsConfig {
    local_certificate: Option<Vec<CertificateDer<'static>>>,
    private_key: Option<PrivateKeyDer<'static>>,
    ca_certificates: Vec<CertificateDer<'static>>,
}

impl TlsConfig {
    /// Load whatever the source provides. Items are independent: a failure
    /// on one is logged and does not affect the others.
    pub fn assemble(source: &dyn TlsCredentialSource) -> Self {
        let mut config = Self::default();

        if let Some(path) = configured(source.local_certificate_path()) {
            match load_certs_from_file(path) {
                Ok(chain) => config.local_certificate = Some(chain),
                Err(e) => debug!(path = %path.display(), error = %e, "local certificate skipped"),
            }
        }

        if let Some(path) = configured(source.private_key_path()) {
            let passphrase = source.private_key_passphrase();
            let loaded = load_private_key_from_file(path, &passphrase);
            drop(passphrase);
            match loaded {
                Ok(key) => config.private_key = Some(key),
                Err(e) => debug!(path = %path.display(), error = %e, "private key skipped"),
            }
        }

        if let Some(path) = configured(source.ca_certificate_path()) {
            match load_certs_from_file(path).and_then(trust_anchors) {
                Ok(certs) => config.ca_certificates = certs,
                Err(e) => debug!(path = %path.display(), error = %e, "CA certificate skipped"),
            }
        }

        config
    }

    /// Client certificate chain, if one was loaded.
    #[must_use]
    pub fn local_certificate(&self) -> Option<&[CertificateDer<'static>]> {
        self.local_certificate.as_deref()
    }

    /// Client private key, if one was loaded.
    #[must_use]
    pub fn private_key(&self) -> Option<&PrivateKeyDer<'static>> {
        self.private_key.as_ref()
    }

    /// CA certificates to add to the trust store.
    #[must_use]
    pub fn ca_certificates(&self) -> &[CertificateDer<'static>] {
        &self.ca_certificates
    }

    /// True when no item could be loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local_certificate.is_none()
            && self.private_key.is_none()
            && self.ca_certificates.is_empty()
    }

    /// Hand the loaded items to `socket`.
    ///
    /// The client certificate and key always replace the socket's, so an item
    /// missing now also clears what an earlier connect set. CA certificates
    /// are only ever added.
    pub fn apply_to<S: Socket + ?Sized>(self, socket: &mut S) {
        socket.set_local_certificate(self.local_certificate);
        socket.set_private_key(self.private_key);
        if !self.ca_certificates.is_empty() {
            socket.add_ca_certificates(self.ca_certificates);
        }
    }
}

fn configured(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| !p.as_os_str().is_empty())
}

/// Keep the certificates rustls accepts as trust anchors.
fn trust_anchors(
    certs: Vec<CertificateDer<'static>>,
) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut last_error = None;
    let valid: Vec<_> = certs
        .into_iter()
        .filter(|cert| match RootCertStore::empty().add(cert.clone()) {
            Ok(()) => true,
            Err(e) => {
                last_error = Some(e.to_string());
                false
            }
        })
        .collect();

    if valid.is_empty() {
        return Err(TlsError::InvalidCaCertificate(
            last_error.unwrap_or_default(),
        ));
    }
    Ok(valid)
}

/// TLS state held by a socket across connect attempts.
///
/// The certificate and key are replaced (or cleared) by each setter call; CA
/// certificates accumulate on top of the bundled web PKI roots.
#[derive(Debug, Default)]
pub struct TlsSettings {
    local_certificate: Option<Vec<CertificateDer<'static>>>,
    private_key: Option<PrivateKeyDer<'static>>,
    ca_certificates: Vec<CertificateDer<'static>>,
}

impl TlsSettings {
    /// Replace the client certificate chain.
    pub fn set_local_certificate(&mut self, chain: Option<Vec<CertificateDer<'static>>>) {
        self.local_certificate = chain;
    }

    /// Replace the client private key.
    pub fn set_private_key(&mut self, key: Option<PrivateKeyDer<'static>>) {
        self.private_key = key;
    }

    /// Append CA certificates, skipping ones already trusted.
    pub fn add_ca_certificates(&mut self, certs: Vec<CertificateDer<'static>>) {
        for cert in certs {
            if !self.ca_certificates.contains(&cert) {
                self.ca_certificates.push(cert);
            }
        }
    }

    /// Extra CA certificates added so far.
    #[must_use]
    pub fn ca_certificates(&self) -> &[CertificateDer<'static>] {
        &self.ca_certificates
    }

    /// True when both a certificate and a key are present.
    #[must_use]
    pub fn has_client_identity(&self) -> bool {
        self.local_certificate.is_some() && self.private_key.is_some()
    }

    /// Build a rustls client config.
    ///
    /// A certificate/key pair rustls rejects, or half a pair, is dropped and
    /// the config is built without client authentication.
    ///
    /// # Errors
    ///
    /// Returns `TlsError::Configuration` if the crypto provider cannot offer
    /// any safe protocol version.
    pub fn client_config(&self) -> Result<Arc<ClientConfig>, TlsError> {
        let mut roots: RootCertStore = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
        for cert in &self.ca_certificates {
            if let Err(e) = roots.add(cert.clone()) {
                debug!(error = %e, "CA certificate not added to trust store");
            }
        }

        let config = match (&self.local_certificate, &self.private_key) {
            (Some(chain), Some(key)) => {
                match builder(&roots)?.with_client_auth_cert(chain.clone(), key.clone_key()) {
                    Ok(config) => config,
                    Err(e) => {
                        debug!(error = %e, "client identity rejected, continuing without it");
                        builder(&roots)?.with_no_client_auth()
                    }
                }
            }
            (None, None) => builder(&roots)?.with_no_client_auth(),
            (chain, _) => {
                debug!(
                    has_certificate = chain.is_some(),
                    "incomplete client identity ignored"
                );
                builder(&roots)?.with_no_client_auth()
            }
        };

        Ok(Arc::new(config))
    }
}

fn builder(roots: &RootCertStore) -> Result<ConfigBuilder<ClientConfig, WantsClientCert>, TlsError> {
    Ok(ClientConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| TlsError::Configuration(e.to_string()))?
        .with_root_certificates(roots.clone()))
}
