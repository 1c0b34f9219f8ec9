use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::util::decode_rest_utf8;
use crate::{
    codec::Encode,
    err::{DecodeError, DecodeErrorKind, EncodeError},
    flags::Flags,
};

/// Fields: `{flags, protocolId, duration, clientId}`. `protocolId` MUST be
/// `0x01`; anything else is a protocol error the Connect op turns into
/// `CONNACK_SN(NotSupported)` rather than a decode failure, so this type
/// carries the raw byte through instead of rejecting it here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectMsg {
    pub flags: Flags,
    pub protocol_id: u8,
    pub duration_s: u16,
    pub client_id: String,
}

pub const PROTOCOL_ID: u8 = 0x01;

impl ConnectMsg {
    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() < 4 {
            return Err(DecodeError::new(
                DecodeErrorKind::NotEnoughData,
                String::from("CONNECT requires flags + protocolId + duration"),
            ));
        }
        let flags = Flags::from_byte(bytes.get_u8());
        let protocol_id = bytes.get_u8();
        let duration_s = bytes.get_u16();
        let client_id = decode_rest_utf8(bytes)?;

        Ok(Self {
            flags,
            protocol_id,
            duration_s,
            client_id,
        })
    }
}

impl Encode for ConnectMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        if self.client_id.len() > 23 {
            return Err(EncodeError::new(
                crate::err::EncodeErrorKind::OversizedClientId,
                format!(
                    "clientId of length {} exceeds the 23-byte MQTT-SN limit",
                    self.client_id.len()
                ),
            ));
        }
        let mut out = BytesMut::with_capacity(4 + self.client_id.len());
        out.put_u8(self.flags.as_byte());
        out.put_u8(self.protocol_id);
        out.put_u16(self.duration_s);
        out.put_slice(self.client_id.as_bytes());
        Ok(out.freeze())
    }
}

#[cfg(test)]
mod connect {
    use super::*;

    #[test]
    fn round_trips_a_clean_session_connect() {
        let msg = ConnectMsg {
            flags: Flags::builder().clean_session(true).build(),
            protocol_id: PROTOCOL_ID,
            duration_s: 30,
            client_id: String::from("c"),
        };

        let encoded = msg.encode().expect("encode");
        let mut bytes = encoded.clone();
        let decoded = ConnectMsg::decode(&mut bytes).expect("decode");

        assert_eq!(decoded, msg);
    }
}
