use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::util::decode_rest_bytes;
use crate::{
    codec::Encode,
    err::{DecodeError, DecodeErrorKind, EncodeError},
};

/// Response to SEARCHGW, or a gateway announcing a peer gateway's address.
/// `gw_add` is present only when relayed by another client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GwInfoMsg {
    pub gw_id: u8,
    pub gw_add: Option<Bytes>,
}

impl GwInfoMsg {
    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() < 1 {
            return Err(DecodeError::new(
                DecodeErrorKind::NotEnoughData,
                String::from("GWINFO requires gwId"),
            ));
        }
        let gw_id = bytes.get_u8();
        let gw_add = if bytes.has_remaining() {
            Some(decode_rest_bytes(bytes))
        } else {
            None
        };
        Ok(Self { gw_id, gw_add })
    }
}

impl Encode for GwInfoMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut out = BytesMut::with_capacity(1 + self.gw_add.as_ref().map_or(0, |a| a.len()));
        out.put_u8(self.gw_id);
        if let Some(addr) = &self.gw_add {
            out.put_slice(addr);
        }
        Ok(out.freeze())
    }
}
