//! Client TLS material for `wss://` connections.
//!
//! A [`TlsCredentialSource`] names up to three optional PEM files. On every
//! connect attempt the transport turns them into a [`TlsConfig`] and applies
//! it to its socket, which keeps the result in [`TlsSettings`] and builds the
//! rustls client config from it when the URL asks for TLS.

mod config;
mod credentials;
mod encrypted;
mod loader;

pub use config::{TlsConfig, TlsSettings};
pub use credentials::{FileCredentials, TlsCredentialSource};
pub use loader::{
    TlsError, crypto_provider, load_certs_from_file, load_private_key_from_file,
};
