use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    codec::Encode,
    err::{DecodeError, DecodeErrorKind, EncodeError},
    return_code::ReturnCode,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PubAckMsg {
    pub topic_id: u16,
    pub msg_id: u16,
    pub return_code: ReturnCode,
}

impl PubAckMsg {
    pub fn new(topic_id: u16, msg_id: u16, return_code: ReturnCode) -> Self {
        Self {
            topic_id,
            msg_id,
            return_code,
        }
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() < 5 {
            return Err(DecodeError::new(
                DecodeErrorKind::NotEnoughData,
                String::from("PUBACK requires topicId + msgId + returnCode"),
            ));
        }
        Ok(Self {
            topic_id: bytes.get_u16(),
            msg_id: bytes.get_u16(),
            return_code: ReturnCode::try_from(bytes.get_u8())?,
        })
    }
}

impl Encode for PubAckMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut out = BytesMut::with_capacity(5);
        out.put_u16(self.topic_id);
        out.put_u16(self.msg_id);
        out.put_u8(self.return_code.into());
        Ok(out.freeze())
    }
}
