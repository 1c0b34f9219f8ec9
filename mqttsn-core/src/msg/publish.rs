use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::util::decode_rest_bytes;
use crate::{
    codec::Encode,
    err::{DecodeError, DecodeErrorKind, EncodeError},
    flags::Flags,
    topic::TopicRef,
};

/// `{flags, topicId, msgId, data}`. Field order mirrors the original
/// `PublishFields` tuple: Flags, TopicId, MsgId, Data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishMsg {
    pub flags: Flags,
    pub topic: TopicRef,
    pub msg_id: u16,
    pub data: Bytes,
}

impl PublishMsg {
    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() < 5 {
            return Err(DecodeError::new(
                DecodeErrorKind::NotEnoughData,
                String::from("PUBLISH requires flags + topicId + msgId"),
            ));
        }
        let flags = Flags::from_byte(bytes.get_u8());
        let topic = TopicRef::decode(flags.topic_id_type()?, bytes)?;
        let msg_id = bytes.get_u16();
        let data = decode_rest_bytes(bytes);

        Ok(Self {
            flags,
            topic,
            msg_id,
            data,
        })
    }
}

impl Encode for PublishMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut out = BytesMut::with_capacity(5 + self.data.len());
        out.put_u8(self.flags.as_byte());
        self.topic.encode(&mut out)?;
        out.put_u16(self.msg_id);
        out.put_slice(&self.data);
        Ok(out.freeze())
    }
}

#[cfg(test)]
mod publish {
    use super::*;
    use crate::qos::QoSLevel;
    use crate::topic::TopicIdType;

    #[test]
    fn round_trips_a_normal_publish() {
        let msg = PublishMsg {
            flags: Flags::builder()
                .qos(QoSLevel::One)
                .topic_id_type(TopicIdType::Normal)
                .build(),
            topic: TopicRef::Normal(7),
            msg_id: 42,
            data: Bytes::from_static(b"hello"),
        };

        let encoded = msg.encode().expect("encode");
        let decoded = PublishMsg::decode(&mut encoded.clone()).expect("decode");

        assert_eq!(decoded, msg);
    }

    #[test]
    fn short_name_topic_is_two_raw_bytes() {
        let msg = PublishMsg {
            flags: Flags::builder().topic_id_type(TopicIdType::ShortName).build(),
            topic: TopicRef::ShortName(*b"ab"),
            msg_id: 0,
            data: Bytes::from_static(b"x"),
        };

        let encoded = msg.encode().expect("encode");
        assert_eq!(&encoded[1..3], b"ab");

        let decoded = PublishMsg::decode(&mut encoded.clone()).expect("decode");
        assert_eq!(decoded, msg);
    }
}
