//! Client side of the HTTP/1.1 upgrade handshake (RFC 6455 section 4).

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Parse header lines into a map keyed by lowercase name. Stops at the blank line.
fn parse_headers<'a, I>(lines: I) -> HashMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }
    headers
}

/// Reject header values that would let the caller inject extra header lines.
fn validate_header_value(header_name: &str, value: &str) -> Result<()> {
    if value.contains('\r') || value.contains('\n') {
        return Err(Error::InvalidHeaderValue {
            header: header_name.to_string(),
            reason: "contains CR or LF characters".to_string(),
        });
    }
    Ok(())
}

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use faye_transport::protocol::compute_accept_key;
///
/// let accept = compute_accept_key("dGhlIHNhbXBsZSBub25jZQ==");
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Generate a fresh Sec-WebSocket-Key: 16 random bytes, Base64 encoded.
///
/// # Errors
///
/// Returns `Error::Io` if the OS random source is unavailable.
pub fn generate_key() -> Result<String> {
    let mut nonce = [0u8; 16];
    getrandom::getrandom(&mut nonce).map_err(|e| Error::Io {
        kind: std::io::ErrorKind::Other,
        message: e.to_string(),
    })?;
    Ok(BASE64.encode(nonce))
}

/// Locate the end of the HTTP header block; returns the offset just past `\r\n\r\n`.
#[must_use]
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// An upgrade request ready to be written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHandshake {
    /// The Sec-WebSocket-Key sent with the request.
    pub key: String,
    /// Serialized HTTP request.
    pub request: Vec<u8>,
}

impl ClientHandshake {
    /// Build the upgrade request for `url` with a freshly generated key.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidUrl` if the URL is not `ws://` / `wss://` or has no host
    /// - `Error::InvalidHeaderValue` if the origin or a subprotocol contains CR/LF
    pub fn new(url: &Url, config: &Config) -> Result<Self> {
        Self::with_key(url, config, generate_key()?)
    }

    /// Build the upgrade request with a caller-provided key.
    ///
    /// # Errors
    ///
    /// Same as [`ClientHandshake::new`].
    pub fn with_key(url: &Url, config: &Config, key: String) -> Result<Self> {
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::InvalidUrl(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl(format!("missing host: {url}")))?;

        let host_header = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let target = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        let mut request = format!(
            "GET {target} HTTP/1.1\r\n\
             Host: {host_header}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {key}\r\n\
             Sec-WebSocket-Version: 13\r\n"
        );
        if let Some(origin) = &config.origin {
            validate_header_value("Origin", origin)?;
            request.push_str(&format!("Origin: {origin}\r\n"));
        }
        if !config.subprotocols.is_empty() {
            for protocol in &config.subprotocols {
                validate_header_value("Sec-WebSocket-Protocol", protocol)?;
            }
            request.push_str(&format!(
                "Sec-WebSocket-Protocol: {}\r\n",
                config.subprotocols.join(", ")
            ));
        }
        request.push_str("\r\n");

        Ok(Self {
            key,
            request: request.into_bytes(),
        })
    }

    /// Parse the server's response and check it accepts this request.
    ///
    /// # Errors
    ///
    /// - errors from [`HandshakeResponse::parse`]
    /// - `Error::InvalidHandshake` if the accept key does not match, or the server
    ///   selected a subprotocol that was never offered
    pub fn verify(&self, response: &[u8], config: &Config) -> Result<HandshakeResponse> {
        let response = HandshakeResponse::parse(response)?;
        if response.accept != compute_accept_key(&self.key) {
            return Err(Error::InvalidHandshake(
                "Sec-WebSocket-Accept mismatch".into(),
            ));
        }
        if let Some(protocol) = &response.protocol {
            if !config.subprotocols.iter().any(|p| p == protocol) {
                return Err(Error::InvalidHandshake(format!(
                    "server selected unrequested subprotocol: {protocol}"
                )));
            }
        }
        Ok(response)
    }
}

/// WebSocket handshake response from server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// The Sec-WebSocket-Accept value.
    pub accept: String,
    /// The selected Sec-WebSocket-Protocol (optional).
    pub protocol: Option<String>,
    /// The negotiated Sec-WebSocket-Extensions (optional).
    pub extensions: Vec<String>,
}

impl HandshakeResponse {
    /// Parse a WebSocket handshake response from raw HTTP data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if:
    /// - The data is not valid UTF-8.
    /// - The response is empty or the status code is not `101`.
    /// - `Upgrade`, `Connection` or `Sec-WebSocket-Accept` is missing or wrong.
    /// - The server negotiated an extension (none are offered).
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::InvalidHandshake("Invalid UTF-8".into()))?;
        let mut lines = text.lines();

        let status_line = lines
            .next()
            .ok_or_else(|| Error::InvalidHandshake("Empty response".into()))?;
        if !status_line.starts_with("HTTP/1.1 101") {
            return Err(Error::InvalidHandshake(format!(
                "Expected 101 status, got: {status_line}"
            )));
        }

        let headers = parse_headers(lines);

        let upgrade = headers
            .get("upgrade")
            .ok_or_else(|| Error::InvalidHandshake("Missing Upgrade header in response".into()))?;
        if !upgrade.eq_ignore_ascii_case("websocket") {
            return Err(Error::InvalidHandshake(format!(
                "Invalid Upgrade header: {upgrade}"
            )));
        }

        let connection = headers.get("connection").ok_or_else(|| {
            Error::InvalidHandshake("Missing Connection header in response".into())
        })?;
        if !connection.to_lowercase().contains("upgrade") {
            return Err(Error::InvalidHandshake(format!(
                "Invalid Connection header: {connection}"
            )));
        }

        let accept = headers
            .get("sec-websocket-accept")
            .ok_or_else(|| Error::InvalidHandshake("Missing Sec-WebSocket-Accept header".into()))?
            .clone();

        let extensions: Vec<String> = headers
            .get("sec-websocket-extensions")
            .map(|e| e.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();
        if !extensions.is_empty() {
            return Err(Error::InvalidHandshake(format!(
                "server negotiated unrequested extensions: {}",
                extensions.join(", ")
            )));
        }

        Ok(Self {
            accept,
            protocol: headers.get("sec-websocket-protocol").cloned(),
            extensions,
        })
    }
}
