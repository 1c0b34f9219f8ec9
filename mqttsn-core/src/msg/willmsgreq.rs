use bytes::{Bytes, BytesMut};

use crate::{codec::Encode, err::EncodeError};

/// No body. Sent by the gateway after WILLTOPIC to ask for the will message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct WillMsgReqMsg;

impl WillMsgReqMsg {
    pub fn decode(_bytes: &mut Bytes) -> Result<Self, crate::err::DecodeError> {
        Ok(Self)
    }
}

impl Encode for WillMsgReqMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        Ok(BytesMut::new().freeze())
    }
}
