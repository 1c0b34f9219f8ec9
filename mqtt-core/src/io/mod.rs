use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

mod util;

pub use util::*;

use crate::{
    err,
    v3::{decode_mqtt_packet, FixedHeader, MqttPacket},
};

/// Reads a single framed MQTT v3.1.1 packet off `stream`.
///
/// Blocks until the fixed header and the full remaining-length body have
/// arrived. Returns `Ok(None)` only on a clean EOF before any byte of a new
/// packet has been read.
pub async fn read_packet<S, E>(stream: &mut S) -> Result<Option<MqttPacket>, E>
where
    S: AsyncRead + AsyncWrite + Unpin,
    E: From<std::io::Error> + From<err::DecodeError>,
{
    let mut type_byte = [0u8; 1];
    let n = stream.read(&mut type_byte).await?;
    if n == 0 {
        return Ok(None);
    }

    let mut len_buf = Vec::with_capacity(4);
    loop {
        let byte = stream.read_u8().await?;
        len_buf.push(byte);
        if byte < 128 || len_buf.len() == 4 {
            break;
        }
    }

    let mut header_bytes = BytesMut::with_capacity(1 + len_buf.len());
    header_bytes.extend_from_slice(&type_byte);
    header_bytes.extend_from_slice(&len_buf);
    let mut header_bytes: Bytes = header_bytes.into();
    let f_header = FixedHeader::decode(&mut header_bytes)?;

    let mut body = BytesMut::new();
    body.resize(f_header.rest_len(), 0);
    stream.read_exact(&mut body).await?;

    Ok(Some(decode_mqtt_packet(f_header, &mut body.into())?))
}
