//! Shared fixtures for the integration tests: a local WebSocket server, a
//! recording sink and a scripted socket double.

#![allow(dead_code)]

mod mock;
mod server;
mod sink;

use std::future::poll_fn;
use std::time::Duration;

use faye_transport::Transport;
use tracing_subscriber::EnvFilter;

pub use mock::{MockCall, MockSocket};
pub use server::{TestServer, TlsIdentity, server_frame};
pub use sink::{RecordingSink, SinkEvent};

/// How long a test waits for an expected event before failing.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Route crate logs to the test writer; filter with `RUST_LOG`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("faye_transport=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// Dispatch transport events until `done` holds for the recorded events.
pub async fn pump_until<T>(
    transport: &mut T,
    sink: &RecordingSink,
    mut done: impl FnMut(&[SinkEvent]) -> bool,
) where
    T: Transport + ?Sized,
{
    tokio::time::timeout(EVENT_TIMEOUT, async {
        while !done(&sink.events()) {
            if !poll_fn(|cx| transport.poll_dispatch(cx)).await {
                break;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out; events so far: {:?}", sink.events()));
}

/// Dispatch until the sink has seen `event`.
pub async fn pump_until_event<T>(transport: &mut T, sink: &RecordingSink, event: SinkEvent)
where
    T: Transport + ?Sized,
{
    pump_until(transport, sink, |events| events.contains(&event)).await;
}
