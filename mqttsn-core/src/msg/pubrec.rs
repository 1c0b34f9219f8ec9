use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    codec::Encode,
    err::{DecodeError, DecodeErrorKind, EncodeError},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PubRecMsg {
    pub msg_id: u16,
}

impl PubRecMsg {
    pub fn new(msg_id: u16) -> Self {
        Self { msg_id }
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() < 2 {
            return Err(DecodeError::new(
                DecodeErrorKind::NotEnoughData,
                String::from("PUBREC requires msgId"),
            ));
        }
        Ok(Self {
            msg_id: bytes.get_u16(),
        })
    }
}

impl Encode for PubRecMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut out = BytesMut::with_capacity(2);
        out.put_u16(self.msg_id);
        Ok(out.freeze())
    }
}
