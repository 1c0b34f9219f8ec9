use bytes::{BufMut, Bytes, BytesMut};

use super::util::decode_rest_bytes;
use crate::{codec::Encode, err::DecodeError, err::EncodeError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WillMsgUpdMsg {
    pub message: Bytes,
}

impl WillMsgUpdMsg {
    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            message: decode_rest_bytes(bytes),
        })
    }
}

impl Encode for WillMsgUpdMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut out = BytesMut::with_capacity(self.message.len());
        out.put_slice(&self.message);
        Ok(out.freeze())
    }
}
