use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::util::decode_rest_utf8;
use crate::{codec::Encode, err::DecodeError, err::EncodeError, flags::Flags};

/// `{flags, willTopic}`. An empty body (no flags byte, no topic) is valid
/// and means "delete the will" — `WillTopicMsg::None` models that case so
/// callers don't need to special-case a zero-length `Flags`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WillTopicMsg {
    Some { flags: Flags, topic: String },
    None,
}

impl WillTopicMsg {
    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if !bytes.has_remaining() {
            return Ok(Self::None);
        }
        let flags = Flags::from_byte(bytes.get_u8());
        let topic = decode_rest_utf8(bytes)?;
        Ok(Self::Some { flags, topic })
    }
}

impl Encode for WillTopicMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        match self {
            Self::None => Ok(BytesMut::new().freeze()),
            Self::Some { flags, topic } => {
                let mut out = BytesMut::with_capacity(1 + topic.len());
                out.put_u8(flags.as_byte());
                out.put_slice(topic.as_bytes());
                Ok(out.freeze())
            }
        }
    }
}
