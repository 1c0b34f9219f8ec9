use bytes::{Buf, Bytes};

use crate::err::{DecodeError, DecodeErrorKind};

/// MQTT-SN never length-prefixes a variable-length field inside a message
/// body — the frame's own length tells the codec exactly where the body
/// ends, so a variable field always simply consumes whatever remains.
pub fn decode_rest_utf8(bytes: &mut Bytes) -> Result<String, DecodeError> {
    let rest = decode_rest_bytes(bytes);
    String::from_utf8(rest.to_vec())
        .map_err(|e| DecodeError::new(DecodeErrorKind::Utf8ParseError, e.to_string()))
}

pub fn decode_rest_bytes(bytes: &mut Bytes) -> Bytes {
    let rest = bytes.slice(0..bytes.remaining());
    bytes.advance(rest.len());
    rest
}
