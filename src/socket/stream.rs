//! TCP/TLS stream setup and the client upgrade handshake.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::BytesMut;
use rustls::ClientConfig;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tracing::debug;
use url::{Host, Url};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::protocol::ClientHandshake;
use crate::protocol::handshake::find_header_end;

/// A plain or TLS-wrapped TCP connection.
pub(crate) enum MaybeTlsStream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_flush(cx),
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Host part of `url` in the form the resolver and rustls expect
/// (IPv6 literals without brackets).
fn host_name(url: &Url) -> Result<String> {
    match url.host() {
        Some(Host::Domain(domain)) => Ok(domain.to_string()),
        Some(Host::Ipv4(ip)) => Ok(ip.to_string()),
        Some(Host::Ipv6(ip)) => Ok(ip.to_string()),
        None => Err(Error::InvalidUrl(format!("missing host: {url}"))),
    }
}

/// Connect, optionally wrap in TLS, and perform the upgrade handshake.
///
/// Returns the stream and any bytes the server sent after its handshake
/// response, which belong to the first frames.
pub(crate) async fn establish(
    url: &Url,
    tls: Option<Arc<ClientConfig>>,
    config: &Config,
) -> Result<(MaybeTlsStream, BytesMut)> {
    let handshake = ClientHandshake::new(url, config)?;
    let host = host_name(url)?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| Error::InvalidUrl(format!("missing port: {url}")))?;

    let addrs: Vec<_> = tokio::net::lookup_host((host.as_str(), port))
        .await
        .map_err(|e| Error::Io {
            kind: io::ErrorKind::NotFound,
            message: format!("host not found: {host}: {e}"),
        })?
        .collect();
    if addrs.is_empty() {
        return Err(Error::Io {
            kind: io::ErrorKind::NotFound,
            message: format!("host not found: {host}"),
        });
    }

    let tcp = TcpStream::connect(addrs.as_slice()).await?;
    tcp.set_nodelay(true)?;
    debug!(%host, port, "tcp connected");

    let mut stream = match tls {
        Some(client_config) => {
            let server_name = ServerName::try_from(host.clone())
                .map_err(|_| Error::Tls(format!("invalid DNS name: {host}")))?;
            let tls_stream = tokio_rustls::TlsConnector::from(client_config)
                .connect(server_name, tcp)
                .await
                .map_err(|e| Error::Tls(e.to_string()))?;
            debug!(%host, "tls established");
            MaybeTlsStream::Tls(Box::new(tls_stream))
        }
        None => MaybeTlsStream::Plain(tcp),
    };

    stream.write_all(&handshake.request).await?;
    stream.flush().await?;

    let mut buf = BytesMut::with_capacity(config.read_buffer_size);
    let header_end = loop {
        if let Some(end) = find_header_end(&buf) {
            break end;
        }
        config.limits.check_handshake_size(buf.len())?;
        if stream.read_buf(&mut buf).await? == 0 {
            return Err(Error::ConnectionClosed(None));
        }
    };

    let leftover = buf.split_off(header_end);
    let response = handshake.verify(&buf, config)?;
    debug!(protocol = ?response.protocol, "upgrade accepted");
    Ok((stream, leftover))
}
