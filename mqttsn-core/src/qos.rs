use crate::err::DecodeError;

/// MQTT-SN's 2-bit QoS field.
///
/// Unlike plain MQTT, the wire value `3` is not an error — it denotes
/// "QoS -1", the publish-without-connect mode defined by MQTT-SN 1.2
/// section 6.4. Translating to the broker's QoS is the gateway's job,
/// not the codec's: this type only knows how to read and write the bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QoSLevel {
    Zero,
    One,
    Two,
    MinusOne,
}

impl TryFrom<u8> for QoSLevel {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, DecodeError> {
        match value & 0b11 {
            0 => Ok(Self::Zero),
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::MinusOne),
            _ => unreachable!("masked to 2 bits"),
        }
    }
}

impl From<QoSLevel> for u8 {
    fn from(value: QoSLevel) -> Self {
        match value {
            QoSLevel::Zero => 0,
            QoSLevel::One => 1,
            QoSLevel::Two => 2,
            QoSLevel::MinusOne => 3,
        }
    }
}

#[cfg(test)]
mod qos {
    use super::*;

    #[test]
    fn round_trips_all_wire_values() {
        for raw in 0u8..=3 {
            let qos = QoSLevel::try_from(raw).expect("valid 2-bit value");
            assert_eq!(u8::from(qos), raw);
        }
    }
}
