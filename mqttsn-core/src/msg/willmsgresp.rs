use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    codec::Encode,
    err::{DecodeError, DecodeErrorKind, EncodeError},
    return_code::ReturnCode,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WillMsgRespMsg {
    pub return_code: ReturnCode,
}

impl WillMsgRespMsg {
    pub fn new(return_code: ReturnCode) -> Self {
        Self { return_code }
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        if bytes.remaining() < 1 {
            return Err(DecodeError::new(
                DecodeErrorKind::NotEnoughData,
                String::from("WILLMSGRESP requires a return code"),
            ));
        }
        Ok(Self {
            return_code: ReturnCode::try_from(bytes.get_u8())?,
        })
    }
}

impl Encode for WillMsgRespMsg {
    fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut out = BytesMut::with_capacity(1);
        out.put_u8(self.return_code.into());
        Ok(out.freeze())
    }
}
