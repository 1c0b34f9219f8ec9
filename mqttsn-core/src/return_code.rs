use crate::err::{DecodeError, DecodeErrorKind};

/// The single-byte return code shared by CONNACK, REGACK, PUBACK, SUBACK,
/// WILLTOPICRESP and WILLMSGRESP.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnCode {
    Accepted,
    Congestion,
    InvalidTopicId,
    NotSupported,
}

impl TryFrom<u8> for ReturnCode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, DecodeError> {
        match value {
            0x00 => Ok(Self::Accepted),
            0x01 => Ok(Self::Congestion),
            0x02 => Ok(Self::InvalidTopicId),
            0x03 => Ok(Self::NotSupported),
            other => Err(DecodeError::new(
                DecodeErrorKind::InvalidReturnCode,
                format!("return code {other} is not defined by MQTT-SN 1.2"),
            )),
        }
    }
}

impl From<ReturnCode> for u8 {
    fn from(value: ReturnCode) -> Self {
        match value {
            ReturnCode::Accepted => 0x00,
            ReturnCode::Congestion => 0x01,
            ReturnCode::InvalidTopicId => 0x02,
            ReturnCode::NotSupported => 0x03,
        }
    }
}
