use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    codec::Encode,
    err::{DecodeError, DecodeErrorKind, EncodeError},
    flags::Flags,
    return_code::ReturnCode,
};

/// `{flags, topicId, msgId, returnCode}`. `flags.qos()` carries the granted
/// QoS.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubAckMsg {
    pub flags: Flags,
    pub topic_id: u16,
    pub msg_id: u16,
    pub return_code: ReturnCode,
}

impl SubAckMsg {
    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() < 6 {
            return Err(DecodeError::new(
                DecodeErrorKind::NotEnoughData,
                String::from("SUBACK requires flags + topicId + msgId + returnCode"),
            ));
        }
        let flags = Flags::from_byte(bytes.get_u8());
        let topic_id = bytes.get_u16();
        let msg_id = bytes.get_u16();
        let return_code = ReturnCode::try_from(bytes.get_u8())?;

        Ok(Self {
            flags,
            topic_id,
            msg_id,
            return_code,
        })
    }
}

impl Encode for SubAckMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut out = BytesMut::with_capacity(6);
        out.put_u8(self.flags.as_byte());
        out.put_u16(self.topic_id);
        out.put_u16(self.msg_id);
        out.put_u8(self.return_code.into());
        Ok(out.freeze())
    }
}
