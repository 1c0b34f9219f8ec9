use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    codec::Encode,
    err::{DecodeError, DecodeErrorKind, EncodeError},
};

/// Periodic gateway beacon: `{gwId, duration}`. Emitted by the Gateway's
/// own advertise timer, never by a Session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdvertiseMsg {
    pub gw_id: u8,
    pub duration_s: u16,
}

impl AdvertiseMsg {
    pub fn new(gw_id: u8, duration_s: u16) -> Self {
        Self { gw_id, duration_s }
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() < 3 {
            return Err(DecodeError::new(
                DecodeErrorKind::NotEnoughData,
                String::from("ADVERTISE requires gwId + duration"),
            ));
        }
        Ok(Self {
            gw_id: bytes.get_u8(),
            duration_s: bytes.get_u16(),
        })
    }
}

impl Encode for AdvertiseMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut out = BytesMut::with_capacity(3);
        out.put_u8(self.gw_id);
        out.put_u16(self.duration_s);
        Ok(out.freeze())
    }
}
