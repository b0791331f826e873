//! Local WebSocket server on `127.0.0.1:0`, plain or TLS.
//!
//! Each accepted connection completes the upgrade, writes the scripted raw
//! frames, then echoes text and binary messages, answers pings and replies
//! to a close frame. Every client frame it reads is recorded.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::{Buf, BytesMut};
use faye_transport::protocol::handshake::find_header_end;
use faye_transport::protocol::{Frame, OpCode, compute_accept_key};
use faye_transport::tls::crypto_provider;
use faye_transport::Error;
use parking_lot::Mutex;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use url::Url;

/// Encode `frame` the way a server sends it (unmasked).
pub fn server_frame(frame: &Frame) -> Vec<u8> {
    let mut out = BytesMut::new();
    frame.encode(None, &mut out);
    out.to_vec()
}

/// Server certificate, key and optional client-certificate trust roots.
pub struct TlsIdentity {
    pub cert_pem: String,
    pub certs: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
    pub client_roots: Option<Vec<CertificateDer<'static>>>,
}

impl TlsIdentity {
    /// Self-signed identity for `localhost`.
    pub fn localhost() -> Self {
        let generated = rcgen::generate_simple_self_signed(vec!["localhost".into()]).unwrap();
        Self {
            cert_pem: generated.cert.pem(),
            certs: vec![generated.cert.der().clone()],
            key: PrivateKeyDer::Pkcs8(generated.key_pair.serialize_der().into()),
            client_roots: None,
        }
    }

    /// Require clients to present a certificate issued by one of `roots`.
    pub fn requiring_client_certs(mut self, roots: Vec<CertificateDer<'static>>) -> Self {
        self.client_roots = Some(roots);
        self
    }

    fn server_config(self) -> ServerConfig {
        let provider = crypto_provider();
        let builder = ServerConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .unwrap();
        let builder = match self.client_roots {
            Some(roots) => {
                let mut store = RootCertStore::empty();
                for root in roots {
                    store.add(root).unwrap();
                }
                let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(store), provider)
                    .build()
                    .unwrap();
                builder.with_client_cert_verifier(verifier)
            }
            None => builder.with_no_client_auth(),
        };
        builder.with_single_cert(self.certs, self.key).unwrap()
    }
}

pub struct TestServer {
    addr: SocketAddr,
    tls: bool,
    received: Arc<Mutex<Vec<Frame>>>,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn echo() -> Self {
        Self::start(Vec::new(), None).await
    }

    /// Send `script` (raw frame bytes) right after the upgrade.
    pub async fn scripted(script: Vec<Vec<u8>>) -> Self {
        Self::start(script, None).await
    }

    pub async fn echo_tls(identity: TlsIdentity) -> Self {
        Self::start(Vec::new(), Some(identity)).await
    }

    async fn start(script: Vec<Vec<u8>>, tls: Option<TlsIdentity>) -> Self {
        super::init_logging();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let acceptor = tls.map(|identity| TlsAcceptor::from(Arc::new(identity.server_config())));
        let is_tls = acceptor.is_some();
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let task = {
            let received = received.clone();
            let connections = connections.clone();
            tokio::spawn(async move {
                while let Ok((tcp, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    let script = script.clone();
                    let received = received.clone();
                    let acceptor = acceptor.clone();
                    tokio::spawn(async move {
                        match acceptor {
                            Some(acceptor) => {
                                if let Ok(stream) = acceptor.accept(tcp).await {
                                    serve(stream, &script, &received).await;
                                }
                            }
                            None => serve(tcp, &script, &received).await,
                        }
                    });
                }
            })
        };

        Self {
            addr,
            tls: is_tls,
            received,
            connections,
            task,
        }
    }

    /// `ws://127.0.0.1:<port>/faye`, or `wss://localhost:<port>/faye` for TLS.
    pub fn url(&self) -> Url {
        let url = if self.tls {
            format!("wss://localhost:{}/faye", self.addr.port())
        } else {
            format!("ws://{}/faye", self.addr)
        };
        Url::parse(&url).unwrap()
    }

    pub fn received(&self) -> Vec<Frame> {
        self.received.lock().clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Wait until the server has read a frame matching `pred`.
    pub async fn wait_for(&self, pred: impl Fn(&Frame) -> bool) -> Frame {
        tokio::time::timeout(super::EVENT_TIMEOUT, async {
            loop {
                if let Some(frame) = self.received.lock().iter().find(|f| pred(f)) {
                    return frame.clone();
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("server never received the frame; got {:?}", self.received()))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve<S>(mut stream: S, script: &[Vec<u8>], received: &Mutex<Vec<Frame>>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = BytesMut::new();
    let end = loop {
        if let Some(end) = find_header_end(&buf) {
            break end;
        }
        if stream.read_buf(&mut buf).await.unwrap_or(0) == 0 {
            return;
        }
    };
    let request = String::from_utf8_lossy(&buf[..end]).into_owned();
    buf.advance(end);

    let Some(key) = request.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.eq_ignore_ascii_case("sec-websocket-key")
            .then(|| value.trim().to_owned())
    }) else {
        return;
    };
    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        compute_accept_key(&key)
    );
    if stream.write_all(response.as_bytes()).await.is_err() {
        return;
    }

    let mut closing = false;
    for raw in script {
        if stream.write_all(raw).await.is_err() {
            return;
        }
        closing |= raw.first().is_some_and(|b| b & 0x0F == OpCode::Close.as_u8());
    }

    loop {
        let frame = match Frame::parse(&buf) {
            Ok((frame, consumed)) => {
                buf.advance(consumed);
                frame
            }
            Err(Error::IncompleteFrame { .. }) => match stream.read_buf(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => continue,
            },
            Err(_) => return,
        };
        received.lock().push(frame.clone());

        let reply = match frame.opcode {
            OpCode::Text | OpCode::Binary if !closing => {
                Some(Frame::new(true, frame.opcode, frame.payload().to_vec()))
            }
            OpCode::Ping => Some(Frame::pong(frame.payload().to_vec())),
            OpCode::Close if !closing => {
                Some(Frame::new(true, OpCode::Close, frame.payload().to_vec()))
            }
            _ => None,
        };
        if let Some(reply) = reply {
            if stream.write_all(&server_frame(&reply)).await.is_err() {
                return;
            }
        }
        if frame.opcode == OpCode::Close {
            let _ = stream.shutdown().await;
            return;
        }
    }
}
