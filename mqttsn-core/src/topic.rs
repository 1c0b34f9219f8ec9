use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::err::{DecodeError, DecodeErrorKind, EncodeError};

/// The 2-bit `topicIdType` carried in a message's [`crate::flags::Flags`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopicIdType {
    Normal,
    PreDefined,
    ShortName,
}

impl TryFrom<u8> for TopicIdType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, DecodeError> {
        match value & 0b11 {
            0b00 => Ok(Self::Normal),
            0b01 => Ok(Self::PreDefined),
            0b10 => Ok(Self::ShortName),
            other => Err(DecodeError::new(
                DecodeErrorKind::InvalidTopicIdType,
                format!("topicIdType value {other} is reserved"),
            )),
        }
    }
}

impl From<TopicIdType> for u8 {
    fn from(value: TopicIdType) -> Self {
        match value {
            TopicIdType::Normal => 0b00,
            TopicIdType::PreDefined => 0b01,
            TopicIdType::ShortName => 0b10,
        }
    }
}

/// The topic reference carried in the 2-byte `TopicId`/`TopicName` slot of
/// PUBLISH, SUBSCRIBE, UNSUBSCRIBE and SUBACK.
///
/// `Normal` and `PreDefined` both wire as a `u16` topic id; `ShortName` wires
/// as the two ASCII bytes of the topic name itself, never registered with
/// the Registration Manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopicRef {
    Normal(u16),
    PreDefined(u16),
    ShortName([u8; 2]),
}

impl TopicRef {
    pub fn type_(&self) -> TopicIdType {
        match self {
            Self::Normal(_) => TopicIdType::Normal,
            Self::PreDefined(_) => TopicIdType::PreDefined,
            Self::ShortName(_) => TopicIdType::ShortName,
        }
    }

    pub fn decode(type_: TopicIdType, bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() < 2 {
            return Err(DecodeError::new(
                DecodeErrorKind::NotEnoughData,
                String::from("topic id field requires 2 bytes"),
            ));
        }
        match type_ {
            TopicIdType::Normal => Ok(Self::Normal(bytes.get_u16())),
            TopicIdType::PreDefined => Ok(Self::PreDefined(bytes.get_u16())),
            TopicIdType::ShortName => {
                let mut short = [0u8; 2];
                bytes.copy_to_slice(&mut short);
                Ok(Self::ShortName(short))
            }
        }
    }

    pub fn encode(&self, bytes: &mut BytesMut) -> Result<(), EncodeError> {
        match self {
            Self::Normal(id) | Self::PreDefined(id) => bytes.put_u16(*id),
            Self::ShortName(short) => bytes.put_slice(short),
        }
        Ok(())
    }
}

/// A free-form (not-yet-registered) `SUBSCRIBE`/`UNSUBSCRIBE` topic name, or
/// a [`TopicRef`] when the client already knows the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopicSelector {
    Name(String),
    Ref(TopicRef),
}

impl TopicSelector {
    pub fn decode(
        type_: TopicIdType,
        bytes: &mut Bytes,
    ) -> Result<Self, DecodeError> {
        match type_ {
            TopicIdType::PreDefined => {
                Ok(Self::Ref(TopicRef::decode(TopicIdType::PreDefined, bytes)?))
            }
            TopicIdType::Normal | TopicIdType::ShortName => {
                let name = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    DecodeError::new(DecodeErrorKind::Utf8ParseError, e.to_string())
                })?;
                bytes.advance(bytes.remaining());
                Ok(Self::Name(name))
            }
        }
    }

    pub fn encode(&self, bytes: &mut BytesMut) -> Result<(), EncodeError> {
        match self {
            Self::Name(name) => bytes.put_slice(name.as_bytes()),
            Self::Ref(topic_ref) => topic_ref.encode(bytes)?,
        }
        Ok(())
    }
}
