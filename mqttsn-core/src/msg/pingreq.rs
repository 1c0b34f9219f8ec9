use bytes::{BufMut, Bytes, BytesMut};

use super::util::decode_rest_utf8;
use crate::{codec::Encode, err::DecodeError, err::EncodeError};

/// An empty `clientId` is a plain keepalive ping; a non-empty one is the
/// sleeping-client wake-up request handled by the Asleep op (4.4.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PingReqMsg {
    pub client_id: String,
}

impl PingReqMsg {
    pub fn keepalive() -> Self {
        Self {
            client_id: String::new(),
        }
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            client_id: decode_rest_utf8(bytes)?,
        })
    }
}

impl Encode for PingReqMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut out = BytesMut::with_capacity(self.client_id.len());
        out.put_slice(self.client_id.as_bytes());
        Ok(out.freeze())
    }
}
