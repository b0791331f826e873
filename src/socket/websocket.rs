//! RFC 6455 client socket driven by a tokio task.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustls::ClientConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::protocol::{AssembledMessage, CloseFrame, Frame, MessageAssembler, NORMAL_CLOSURE, OpCode};
use crate::socket::codec::{FrameReader, FrameWriter};
use crate::socket::stream::establish;
use crate::socket::{EventSender, Socket, SocketErrorKind, SocketEvent};
use crate::tls::TlsSettings;

/// Requests from the socket handle to its connection task.
#[derive(Debug)]
enum Command {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

#[derive(Debug, Default)]
struct SharedState {
    subscriber: Option<EventSender>,
    error: String,
    /// Bumped on every `open`; tasks from older attempts go silent.
    generation: u64,
    /// Whether the current attempt still owes a `Disconnected`.
    live: bool,
}

/// Posts events for one connection attempt.
struct Emitter {
    shared: Arc<Mutex<SharedState>>,
    generation: u64,
}

impl Emitter {
    fn emit(&self, event: SocketEvent) {
        let state = self.shared.lock();
        if state.generation != self.generation {
            trace!(?event, "event from superseded connection dropped");
            return;
        }
        if let Some(subscriber) = &state.subscriber {
            let _ = subscriber.send(event);
        }
    }

    fn fail(&self, err: &Error) {
        let mut state = self.shared.lock();
        if state.generation != self.generation {
            return;
        }
        let kind = SocketErrorKind::from(err);
        debug!(error = %err, %kind, "socket error");
        state.error = err.to_string();
        if let Some(subscriber) = &state.subscriber {
            let _ = subscriber.send(SocketEvent::Error(kind));
        }
    }

    fn finish(&self) {
        let mut state = self.shared.lock();
        if state.generation != self.generation || !state.live {
            return;
        }
        state.live = false;
        if let Some(subscriber) = &state.subscriber {
            let _ = subscriber.send(SocketEvent::Disconnected);
        }
    }
}

/// A WebSocket client connection.
///
/// Each [`open`](Socket::open) spawns a task on the ambient tokio runtime that
/// connects, performs the upgrade and then shuttles frames. The handle itself
/// never blocks.
pub struct WebSocketSocket {
    config: Config,
    tls: TlsSettings,
    shared: Arc<Mutex<SharedState>>,
    commands: Option<mpsc::UnboundedSender<Command>>,
}

impl WebSocketSocket {
    /// Create a socket with default engine settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::client())
    }

    /// Create a socket with custom limits, timeouts and upgrade headers.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            tls: TlsSettings::default(),
            shared: Arc::new(Mutex::new(SharedState::default())),
            commands: None,
        }
    }

    /// Engine settings used for new connections.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// TLS material applied so far.
    #[must_use]
    pub fn tls_settings(&self) -> &TlsSettings {
        &self.tls
    }

    /// Start a new attempt: settle the previous one and silence its task.
    fn begin(&self) -> Emitter {
        let mut state = self.shared.lock();
        if state.live {
            if let Some(subscriber) = &state.subscriber {
                let _ = subscriber.send(SocketEvent::Disconnected);
            }
        }
        state.generation = state.generation.wrapping_add(1);
        state.live = true;
        state.error.clear();
        Emitter {
            shared: Arc::clone(&self.shared),
            generation: state.generation,
        }
    }

    fn send(&self, command: Command) {
        let sent = match &self.commands {
            Some(commands) => commands.send(command).is_ok(),
            None => false,
        };
        if !sent {
            debug!("socket not open, message dropped");
        }
    }
}

impl Default for WebSocketSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl Socket for WebSocketSocket {
    fn subscribe(&mut self, events: EventSender) {
        self.shared.lock().subscriber = Some(events);
    }

    fn unsubscribe(&mut self) {
        self.shared.lock().subscriber = None;
    }

    fn open(&mut self, url: &Url) {
        self.close();
        let emitter = self.begin();

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                emitter.fail(&Error::Runtime(e.to_string()));
                emitter.finish();
                return;
            }
        };

        let tls = if url.scheme() == "wss" {
            match self.tls.client_config() {
                Ok(config) => Some(config),
                Err(e) => {
                    emitter.fail(&Error::Tls(e.to_string()));
                    emitter.finish();
                    return;
                }
            }
        } else {
            None
        };

        let (commands, command_rx) = mpsc::unbounded_channel();
        self.commands = Some(commands);
        debug!(%url, "opening websocket");
        runtime.spawn(run_connection(
            url.clone(),
            tls,
            self.config.clone(),
            command_rx,
            emitter,
        ));
    }

    fn close(&mut self) {
        if let Some(commands) = self.commands.take() {
            if commands.send(Command::Close).is_err() {
                trace!("connection task already finished");
            }
        }
    }

    fn send_text(&mut self, text: &str) {
        self.send(Command::Text(text.to_owned()));
    }

    fn send_binary(&mut self, data: &[u8]) {
        if data.is_empty() {
            trace!("empty binary message ignored");
            return;
        }
        self.send(Command::Binary(data.to_vec()));
    }

    fn error_string(&self) -> String {
        self.shared.lock().error.clone()
    }

    fn set_local_certificate(&mut self, chain: Option<Vec<CertificateDer<'static>>>) {
        self.tls.set_local_certificate(chain);
    }

    fn set_private_key(&mut self, key: Option<PrivateKeyDer<'static>>) {
        self.tls.set_private_key(key);
    }

    fn add_ca_certificates(&mut self, certs: Vec<CertificateDer<'static>>) {
        self.tls.add_ca_certificates(certs);
    }
}

impl Drop for WebSocketSocket {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for WebSocketSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketSocket")
            .field("config", &self.config)
            .field("open", &self.commands.is_some())
            .finish_non_exhaustive()
    }
}

/// Connection task: connect phase, frame loop, then teardown.
async fn run_connection(
    url: Url,
    tls: Option<Arc<ClientConfig>>,
    config: Config,
    mut commands: mpsc::UnboundedReceiver<Command>,
    emitter: Emitter,
) {
    let connecting = tokio::time::timeout(config.timeouts.connect, establish(&url, tls, &config));
    tokio::pin!(connecting);

    let (stream, buffered) = loop {
        tokio::select! {
            result = &mut connecting => match result {
                Ok(Ok(established)) => break established,
                Ok(Err(e)) => {
                    emitter.fail(&e);
                    emitter.finish();
                    return;
                }
                Err(_) => {
                    emitter.fail(&Error::Timeout("connect"));
                    emitter.finish();
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(Command::Close) | None => {
                    debug!(%url, "connect aborted");
                    emitter.finish();
                    return;
                }
                Some(_) => debug!("message sent before connect dropped"),
            },
        }
    };

    debug!(%url, "websocket connected");
    emitter.emit(SocketEvent::Connected);

    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = FrameReader::new(read_half, buffered, config.limits.clone());
    let mut writer = FrameWriter::new(write_half);

    if let Err(e) = run_session(&mut reader, &mut writer, &mut commands, &emitter, &config).await {
        emitter.fail(&e);
        if let Some(code) = e.close_code() {
            let _ = writer.write_frame(&Frame::close(Some(code), "")).await;
        }
    }

    let _ = writer.shutdown().await;
    debug!(%url, "websocket disconnected");
    emitter.finish();
}

enum Step {
    Frame(Result<Frame>),
    Command(Option<Command>),
}

/// Frame loop. `Ok` means the connection closed cleanly.
async fn run_session<R, W>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    emitter: &Emitter,
    config: &Config,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut assembler = MessageAssembler::new(config.limits.clone());

    loop {
        let step = tokio::select! {
            frame = reader.read_frame() => Step::Frame(frame),
            command = commands.recv() => Step::Command(command),
        };

        match step {
            Step::Frame(frame) => {
                let frame = frame?;
                match frame.opcode {
                    OpCode::Ping => writer.write_frame(&Frame::pong(frame.into_payload())).await?,
                    OpCode::Pong => trace!("pong received"),
                    OpCode::Close => {
                        let close = CloseFrame::parse(frame.payload())?;
                        debug!(
                            code = ?close.as_ref().map(|c| c.code),
                            reason = close.as_ref().map_or("", |c| c.reason.as_str()),
                            "close received"
                        );
                        let reply = Frame::close(close.map(|c| c.code), "");
                        let _ = writer.write_frame(&reply).await;
                        return Ok(());
                    }
                    _ => match assembler.push(frame)? {
                        Some(AssembledMessage::Text(text)) => {
                            emitter.emit(SocketEvent::TextReceived(text));
                        }
                        Some(AssembledMessage::Binary(data)) => {
                            emitter.emit(SocketEvent::BinaryReceived(data));
                        }
                        None => {}
                    },
                }
            }
            Step::Command(Some(Command::Text(text))) => {
                writer.write_frame(&Frame::text(text)).await?;
            }
            Step::Command(Some(Command::Binary(data))) => {
                writer.write_frame(&Frame::binary(data)).await?;
            }
            Step::Command(Some(Command::Close) | None) => {
                writer
                    .write_frame(&Frame::close(Some(NORMAL_CLOSURE), ""))
                    .await?;
                await_close_reply(reader, config.timeouts.close).await;
                return Ok(());
            }
        }
    }
}

/// Wait for the peer's close frame, discarding anything before it.
async fn await_close_reply<R: AsyncRead + Unpin>(reader: &mut FrameReader<R>, wait: Duration) {
    let reply = tokio::time::timeout(wait, async {
        loop {
            match reader.read_frame().await {
                Ok(frame) if frame.opcode == OpCode::Close => return Ok(()),
                Ok(frame) => trace!(opcode = %frame.opcode, "frame discarded while closing"),
                Err(e) => return Err(e),
            }
        }
    })
    .await;

    match reply {
        Ok(Ok(())) => debug!("close acknowledged"),
        Ok(Err(e)) => debug!(error = %e, "close reply not received"),
        Err(_) => debug!("close reply timed out"),
    }
}
