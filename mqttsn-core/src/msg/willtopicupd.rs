use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::util::decode_rest_utf8;
use crate::{codec::Encode, err::DecodeError, err::EncodeError, flags::Flags};

/// Same shape as WILLTOPIC (`{flags, topic}`, empty body deletes the will).
/// Handled by the WillUpdate op (4.4.7), which also triggers a transparent
/// broker reconnect if the session is currently connected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WillTopicUpdMsg {
    Some { flags: Flags, topic: String },
    Delete,
}

impl WillTopicUpdMsg {
    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if !bytes.has_remaining() {
            return Ok(Self::Delete);
        }
        let flags = Flags::from_byte(bytes.get_u8());
        let topic = decode_rest_utf8(bytes)?;
        Ok(Self::Some { flags, topic })
    }
}

impl Encode for WillTopicUpdMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        match self {
            Self::Delete => Ok(BytesMut::new().freeze()),
            Self::Some { flags, topic } => {
                let mut out = BytesMut::with_capacity(1 + topic.len());
                out.put_u8(flags.as_byte());
                out.put_slice(topic.as_bytes());
                Ok(out.freeze())
            }
        }
    }
}
