//! Length-prefixed bincode framing
//!
//! Every frame on the wire is a big-endian `u32` payload length followed by
//! a bincode payload. Each direction has its own size budget: terminal input
//! is small, rendered frames can be large.

use std::fmt;
use std::marker::PhantomData;

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder};

use crate::messages::{ClientMessage, ServerMessage};

/// Length prefix size in bytes
const HEADER_LEN: usize = 4;

/// A message type that may cross the wire
pub trait WireMessage: Serialize + DeserializeOwned {
    /// Largest payload accepted for this message type
    const MAX_FRAME_LEN: usize;
    /// Direction name used in errors and logs
    const DIRECTION: &'static str;
}

impl WireMessage for ClientMessage {
    /// Hello, keys and pastes
    const MAX_FRAME_LEN: usize = 64 * 1024;
    const DIRECTION: &'static str = "client";
}

impl WireMessage for ServerMessage {
    /// A full styled screen of a very large terminal
    const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;
    const DIRECTION: &'static str = "server";
}

/// Protocol codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("{direction} frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        direction: &'static str,
        size: usize,
        max: usize,
    },
}

impl CodecError {
    /// The frame was refused but the stream is still in sync
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::FrameTooLarge { .. })
    }
}

/// Decodes `In` frames and encodes `Out` frames
pub struct FrameCodec<In, Out> {
    _marker: PhantomData<fn(Out) -> In>,
}

/// Client side: sends [`ClientMessage`], receives [`ServerMessage`]
pub type ClientCodec = FrameCodec<ServerMessage, ClientMessage>;

/// Server side: sends [`ServerMessage`], receives [`ClientMessage`]
pub type ServerCodec = FrameCodec<ClientMessage, ServerMessage>;

impl<In, Out> FrameCodec<In, Out> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<In, Out> Default for FrameCodec<In, Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In, Out> fmt::Debug for FrameCodec<In, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameCodec")
            .field("in", &std::any::type_name::<In>())
            .field("out", &std::any::type_name::<Out>())
            .finish()
    }
}

impl<In: WireMessage, Out> Decoder for FrameCodec<In, Out> {
    type Item = In;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<In>, CodecError> {
        let Some(header) = src.get(..HEADER_LEN) else {
            return Ok(None);
        };
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;

        // An oversized header leaves the stream unusable, so it is never skipped
        if len > In::MAX_FRAME_LEN {
            return Err(CodecError::FrameTooLarge {
                direction: In::DIRECTION,
                size: len,
                max: In::MAX_FRAME_LEN,
            });
        }

        let needed = HEADER_LEN + len;
        if src.len() < needed {
            src.reserve(needed - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let payload = src.split_to(len);
        Ok(Some(bincode::deserialize(&payload)?))
    }
}

impl<In, Out: WireMessage> Encoder<Out> for FrameCodec<In, Out> {
    type Error = CodecError;

    /// Nothing is written when the payload is over budget
    fn encode(&mut self, item: Out, dst: &mut BytesMut) -> Result<(), CodecError> {
        let size = bincode::serialized_size(&item)? as usize;
        if size > Out::MAX_FRAME_LEN {
            return Err(CodecError::FrameTooLarge {
                direction: Out::DIRECTION,
                size,
                max: Out::MAX_FRAME_LEN,
            });
        }

        dst.reserve(HEADER_LEN + size);
        dst.put_u32(size as u32);
        bincode::serialize_into(dst.writer(), &item)?;
        Ok(())
    }
}
