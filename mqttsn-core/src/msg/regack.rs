use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    codec::Encode,
    err::{DecodeError, DecodeErrorKind, EncodeError},
    return_code::ReturnCode,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegAckMsg {
    pub topic_id: u16,
    pub msg_id: u16,
    pub return_code: ReturnCode,
}

impl RegAckMsg {
    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() < 5 {
            return Err(DecodeError::new(
                DecodeErrorKind::NotEnoughData,
                String::from("REGACK requires topicId + msgId + returnCode"),
            ));
        }
        let topic_id = bytes.get_u16();
        let msg_id = bytes.get_u16();
        let return_code = ReturnCode::try_from(bytes.get_u8())?;
        Ok(Self {
            topic_id,
            msg_id,
            return_code,
        })
    }
}

impl Encode for RegAckMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut out = BytesMut::with_capacity(5);
        out.put_u16(self.topic_id);
        out.put_u16(self.msg_id);
        out.put_u8(self.return_code.into());
        Ok(out.freeze())
    }
}
