//! WebSocket wire protocol (RFC 6455), client side.

pub mod assembler;
pub mod close;
pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;

pub use assembler::{AssembledMessage, MessageAssembler};
pub use close::{CloseFrame, NORMAL_CLOSURE};
pub use frame::{Frame, FrameHeader};
pub use handshake::{ClientHandshake, HandshakeResponse, WS_GUID, compute_accept_key};
pub use mask::{MaskGenerator, apply_mask};
pub use opcode::OpCode;
