use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    codec::Encode,
    err::{DecodeError, DecodeErrorKind, EncodeError},
    flags::Flags,
    topic::TopicSelector,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsubscribeMsg {
    pub flags: Flags,
    pub msg_id: u16,
    pub topic: TopicSelector,
}

impl UnsubscribeMsg {
    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() < 3 {
            return Err(DecodeError::new(
                DecodeErrorKind::NotEnoughData,
                String::from("UNSUBSCRIBE requires flags + msgId"),
            ));
        }
        let flags = Flags::from_byte(bytes.get_u8());
        let msg_id = bytes.get_u16();
        let topic = TopicSelector::decode(flags.topic_id_type()?, bytes)?;

        Ok(Self {
            flags,
            msg_id,
            topic,
        })
    }
}

impl Encode for UnsubscribeMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut out = BytesMut::with_capacity(3);
        out.put_u8(self.flags.as_byte());
        out.put_u16(self.msg_id);
        self.topic.encode(&mut out)?;
        Ok(out.freeze())
    }
}
