//! Transport lifecycle states.

/// Where a transport is in its connect/disconnect cycle.
///
/// `Idle` → `Connecting` → `Open` → `Closing` → `Idle`, with `Closed` reached
/// only when the transport is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TransportState {
    /// Constructed or fully disconnected; a connect may be issued.
    #[default]
    Idle,
    /// Connect requested, waiting for the socket to report the outcome.
    Connecting,
    /// Connected and ready for sends.
    Open,
    /// Disconnect requested or error observed, waiting for the socket to close.
    Closing,
    /// Transport destroyed.
    Closed,
}

impl TransportState {
    /// Whether [`connect_to_server`](crate::transport::Transport::connect_to_server)
    /// will start a new attempt.
    #[must_use]
    #[inline]
    pub const fn can_connect(&self) -> bool {
        matches!(self, TransportState::Idle)
    }

    /// Check if the connection is usable for sends.
    #[must_use]
    #[inline]
    pub const fn is_open(&self) -> bool {
        matches!(self, TransportState::Open)
    }

    /// Check if a socket attempt is in flight, in any phase.
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            TransportState::Connecting | TransportState::Open | TransportState::Closing
        )
    }
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportState::Idle => write!(f, "Idle"),
            TransportState::Connecting => write!(f, "Connecting"),
            TransportState::Open => write!(f, "Open"),
            TransportState::Closing => write!(f, "Closing"),
            TransportState::Closed => write!(f, "Closed"),
        }
    }
}
