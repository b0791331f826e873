//! # faye-transport
//!
//! Pluggable network transport for a publish/subscribe protocol client.
//!
//! A protocol client talks to a [`Transport`] and receives notifications
//! through a [`TransportSink`]. The stock implementation,
//! [`WebSocketTransport`], owns an RFC 6455 client socket that runs on the
//! ambient tokio runtime and can load client TLS material from PEM files
//! before every connect.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use faye_transport::{Transport, TransportSink, WebSocketTransport};
//!
//! struct Client;
//!
//! impl TransportSink for Client {
//!     fn on_connected(&self) {}
//!     fn on_disconnected(&self) {}
//!     fn on_text_received(&self, text: &str) { println!("{text}"); }
//!     fn on_data_received(&self, _data: &[u8]) {}
//!     fn on_error(&self, message: &str) { eprintln!("{message}"); }
//! }
//!
//! # async fn run() {
//! let url = url::Url::parse("ws://localhost:8000/faye").unwrap();
//! let mut transport = WebSocketTransport::new(url, Arc::new(Client));
//! transport.connect_to_server();
//! while transport.dispatch_next().await {
//!     if transport.is_connected() {
//!         transport.send_text(r#"[{"channel":"/meta/handshake"}]"#);
//!     }
//! }
//! # }
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod socket;
pub mod tls;
pub mod transport;

pub use config::{Config, Limits, Timeouts};
pub use error::{Error, Result};
pub use socket::{Socket, SocketErrorKind, SocketEvent, WebSocketSocket};
pub use tls::{FileCredentials, TlsConfig, TlsCredentialSource};
pub use transport::{
    Transport, TransportSink, TransportState, WebSocketTransport, create_transport,
    supported_transports,
};
