use bytes::Bytes;

use crate::err::EncodeError;

/// Mirrors `mqtt-core`'s `Encode` trait: every message type knows how to
/// serialize its own body (the frame length-prefix and type byte are added
/// by [`crate::frame`], not by the message itself).
pub trait Encode {
    fn encode(&self) -> Result<Bytes, EncodeError>;
}
