use bytes::{Bytes, BytesMut};

use crate::{codec::Encode, err::EncodeError};

/// No body. Sent by the gateway to ask for the will topic during CONNECT
/// handshakes where the `will` flag was set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct WillTopicReqMsg;

impl WillTopicReqMsg {
    pub fn decode(_bytes: &mut Bytes) -> Result<Self, crate::err::DecodeError> {
        Ok(Self)
    }
}

impl Encode for WillTopicReqMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        Ok(BytesMut::new().freeze())
    }
}
