use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    codec::Encode,
    err::{DecodeError, DecodeErrorKind, EncodeError},
};

/// Broadcast by a client searching for a gateway. Out of scope for the
/// Session (client-discovery happens before a Session exists) but kept for
/// wire completeness and for the driver's broadcast listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchGwMsg {
    pub radius: u8,
}

impl SearchGwMsg {
    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() < 1 {
            return Err(DecodeError::new(
                DecodeErrorKind::NotEnoughData,
                String::from("SEARCHGW requires radius"),
            ));
        }
        Ok(Self {
            radius: bytes.get_u8(),
        })
    }
}

impl Encode for SearchGwMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut out = BytesMut::with_capacity(1);
        out.put_u8(self.radius);
        Ok(out.freeze())
    }
}
