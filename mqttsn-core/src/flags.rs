use crate::{qos::QoSLevel, topic::TopicIdType};

const DUP_BIT: u8 = 0b1000_0000;
const QOS_BITS: u8 = 0b0110_0000;
const QOS_SHIFT: u8 = 5;
const RETAIN_BIT: u8 = 0b0001_0000;
const WILL_BIT: u8 = 0b0000_1000;
const CLEAN_SESSION_BIT: u8 = 0b0000_0100;
const TOPIC_ID_TYPE_BITS: u8 = 0b0000_0011;

/// The single shared bitfield layout MQTT-SN reuses across CONNECT,
/// WILLTOPIC, WILLTOPICUPD, PUBLISH, SUBSCRIBE and SUBACK:
/// `{dup:1, qos:2, retain:1, will:1, cleanSession:1, topicIdType:2}`.
///
/// Not every message uses every bit — CONNECT ignores qos/retain/topicIdType,
/// PUBLISH ignores will/cleanSession — callers read only the fields that
/// apply to the message they're decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Flags {
    byte: u8,
}

impl Flags {
    pub fn from_byte(byte: u8) -> Self {
        Self { byte }
    }

    pub fn as_byte(&self) -> u8 {
        self.byte
    }

    pub fn builder() -> FlagsBuilder {
        FlagsBuilder { byte: 0 }
    }

    pub fn dup(&self) -> bool {
        self.byte & DUP_BIT != 0
    }

    pub fn qos(&self) -> Result<QoSLevel, crate::err::DecodeError> {
        QoSLevel::try_from((self.byte & QOS_BITS) >> QOS_SHIFT)
    }

    pub fn retain(&self) -> bool {
        self.byte & RETAIN_BIT != 0
    }

    pub fn will(&self) -> bool {
        self.byte & WILL_BIT != 0
    }

    pub fn clean_session(&self) -> bool {
        self.byte & CLEAN_SESSION_BIT != 0
    }

    pub fn topic_id_type(&self) -> Result<TopicIdType, crate::err::DecodeError> {
        TopicIdType::try_from(self.byte & TOPIC_ID_TYPE_BITS)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FlagsBuilder {
    byte: u8,
}

impl FlagsBuilder {
    pub fn dup(mut self, dup: bool) -> Self {
        if dup {
            self.byte |= DUP_BIT;
        }
        self
    }

    pub fn qos(mut self, qos: QoSLevel) -> Self {
        self.byte |= (u8::from(qos) << QOS_SHIFT) & QOS_BITS;
        self
    }

    pub fn retain(mut self, retain: bool) -> Self {
        if retain {
            self.byte |= RETAIN_BIT;
        }
        self
    }

    pub fn will(mut self, will: bool) -> Self {
        if will {
            self.byte |= WILL_BIT;
        }
        self
    }

    pub fn clean_session(mut self, clean_session: bool) -> Self {
        if clean_session {
            self.byte |= CLEAN_SESSION_BIT;
        }
        self
    }

    pub fn topic_id_type(mut self, type_: TopicIdType) -> Self {
        self.byte |= u8::from(type_) & TOPIC_ID_TYPE_BITS;
        self
    }

    pub fn build(self) -> Flags {
        Flags { byte: self.byte }
    }
}

#[cfg(test)]
mod flags {
    use super::*;

    #[test]
    fn builder_round_trips_publish_flags() {
        let flags = Flags::builder()
            .dup(true)
            .qos(QoSLevel::Two)
            .retain(true)
            .topic_id_type(TopicIdType::PreDefined)
            .build();

        assert!(flags.dup());
        assert_eq!(flags.qos().unwrap(), QoSLevel::Two);
        assert!(flags.retain());
        assert!(!flags.will());
        assert_eq!(flags.topic_id_type().unwrap(), TopicIdType::PreDefined);
    }

    #[test]
    fn builder_round_trips_connect_flags() {
        let flags = Flags::builder().will(true).clean_session(true).build();

        assert!(flags.will());
        assert!(flags.clean_session());
        assert!(!flags.dup());
    }
}
