use bytes::{Bytes, BytesMut};

use crate::{codec::Encode, err::DecodeError, err::EncodeError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PingRespMsg;

impl PingRespMsg {
    pub fn decode(_bytes: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self)
    }
}

impl Encode for PingRespMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        Ok(BytesMut::new().freeze())
    }
}
