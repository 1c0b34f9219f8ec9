use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{codec::Encode, err::DecodeError, err::EncodeError};

/// `duration` present means "go to sleep for this many seconds"; absent
/// means a plain, final disconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisconnectMsg {
    pub duration_s: Option<u16>,
}

impl DisconnectMsg {
    pub fn final_disconnect() -> Self {
        Self { duration_s: None }
    }

    pub fn sleep(duration_s: u16) -> Self {
        Self {
            duration_s: Some(duration_s),
        }
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        let duration_s = if bytes.remaining() >= 2 {
            Some(bytes.get_u16())
        } else {
            None
        };
        Ok(Self { duration_s })
    }
}

impl Encode for DisconnectMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut out = BytesMut::with_capacity(2);
        if let Some(duration) = self.duration_s {
            out.put_u16(duration);
        }
        Ok(out.freeze())
    }
}
