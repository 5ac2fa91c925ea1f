//! hearth-protocol: Wire definitions for client-server communication
//!
//! This crate defines the handshake, terminal event and frame messages
//! exchanged between a hearth client and the server over TCP.

pub mod codec;
pub mod messages;
pub mod types;

// Re-export main types at crate root
pub use codec::{ClientCodec, CodecError, FrameCodec, ServerCodec, WireMessage};
pub use messages::{ClientMessage, ServerMessage};
pub use types::{ColorDepth, PtyRequest, Rgb};

/// Current protocol version
pub const PROTOCOL_VERSION: u32 = 1;
