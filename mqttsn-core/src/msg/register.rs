use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::util::decode_rest_utf8;
use crate::{
    codec::Encode,
    err::{DecodeError, DecodeErrorKind, EncodeError},
};

/// `{topicId, msgId, topicName}`. `topicId` is `0x0000` when sent by the
/// client (the gateway assigns the real id); the gateway always fills it in
/// when registering on the broker's behalf (PubRecv, 4.4.5).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterMsg {
    pub topic_id: u16,
    pub msg_id: u16,
    pub topic_name: String,
}

impl RegisterMsg {
    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() < 4 {
            return Err(DecodeError::new(
                DecodeErrorKind::NotEnoughData,
                String::from("REGISTER requires topicId + msgId"),
            ));
        }
        let topic_id = bytes.get_u16();
        let msg_id = bytes.get_u16();
        let topic_name = decode_rest_utf8(bytes)?;
        Ok(Self {
            topic_id,
            msg_id,
            topic_name,
        })
    }
}

impl Encode for RegisterMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut out = BytesMut::with_capacity(4 + self.topic_name.len());
        out.put_u16(self.topic_id);
        out.put_u16(self.msg_id);
        out.put_slice(self.topic_name.as_bytes());
        Ok(out.freeze())
    }
}
