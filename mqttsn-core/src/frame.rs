use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    codec::Encode,
    err::{DecodeError, DecodeErrorKind},
    msg::*,
};

/// MQTT-SN's variable-length framing. The first length byte, when `>= 2`,
/// gives the total frame length directly; value `0x01` means "the next two
/// bytes, big-endian, are the real length" (used once a message would not
/// fit in a single byte — total length including itself, the two length
/// bytes and the type byte).
const EXTENDED_LENGTH_MARKER: u8 = 0x01;

#[derive(Clone, Copy, Debug)]
pub struct FixedHeader {
    pub msg_type: MsgType,
    header_len: usize,
    total_len: usize,
}

impl FixedHeader {
    /// Inspects `bytes` without consuming it. Returns
    /// `DecodeErrorKind::NotEnoughData` if the buffer does not yet hold a
    /// complete frame — the caller must retain the bytes and wait.
    pub fn peek(bytes: &Bytes) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Err(not_enough_data());
        }

        let first = bytes[0];
        let (header_prefix_len, total_len) = if first == EXTENDED_LENGTH_MARKER {
            if bytes.len() < 3 {
                return Err(not_enough_data());
            }
            let total = u16::from_be_bytes([bytes[1], bytes[2]]) as usize;
            (3usize, total)
        } else {
            (1usize, first as usize)
        };

        if total_len < header_prefix_len + 1 {
            return Err(DecodeError::new(
                DecodeErrorKind::MalformedLength,
                format!("frame length {total_len} too small to hold its own header"),
            ));
        }

        if bytes.len() < header_prefix_len + 1 {
            return Err(not_enough_data());
        }
        if bytes.len() < total_len {
            return Err(not_enough_data());
        }

        let type_byte = bytes[header_prefix_len];
        let msg_type = MsgType::try_from(type_byte)?;

        Ok(Self {
            msg_type,
            header_len: header_prefix_len + 1,
            total_len,
        })
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn total_len(&self) -> usize {
        self.total_len
    }

    pub fn body_len(&self) -> usize {
        self.total_len - self.header_len
    }
}

fn not_enough_data() -> DecodeError {
    DecodeError::new(
        DecodeErrorKind::NotEnoughData,
        String::from("buffer does not yet hold a complete MQTT-SN frame"),
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MsgType {
    Advertise,
    SearchGw,
    GwInfo,
    Connect,
    ConnAck,
    WillTopicReq,
    WillTopic,
    WillMsgReq,
    WillMsg,
    Register,
    RegAck,
    Publish,
    PubAck,
    PubRec,
    PubRel,
    PubComp,
    Subscribe,
    SubAck,
    Unsubscribe,
    UnsubAck,
    PingReq,
    PingResp,
    Disconnect,
    WillTopicUpd,
    WillTopicResp,
    WillMsgUpd,
    WillMsgResp,
}

impl TryFrom<u8> for MsgType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, DecodeError> {
        Ok(match value {
            0x00 => Self::Advertise,
            0x01 => Self::SearchGw,
            0x02 => Self::GwInfo,
            0x04 => Self::Connect,
            0x05 => Self::ConnAck,
            0x06 => Self::WillTopicReq,
            0x07 => Self::WillTopic,
            0x08 => Self::WillMsgReq,
            0x09 => Self::WillMsg,
            0x0A => Self::Register,
            0x0B => Self::RegAck,
            0x0C => Self::Publish,
            0x0D => Self::PubAck,
            0x0E => Self::PubComp,
            0x0F => Self::PubRec,
            0x10 => Self::PubRel,
            0x12 => Self::Subscribe,
            0x13 => Self::SubAck,
            0x14 => Self::Unsubscribe,
            0x15 => Self::UnsubAck,
            0x16 => Self::PingReq,
            0x17 => Self::PingResp,
            0x18 => Self::Disconnect,
            0x1A => Self::WillTopicUpd,
            0x1B => Self::WillTopicResp,
            0x1C => Self::WillMsgUpd,
            0x1D => Self::WillMsgResp,
            other => {
                return Err(DecodeError::new(
                    DecodeErrorKind::InvalidMsgType,
                    format!("message type 0x{other:02X} is not a known MQTT-SN type"),
                ))
            }
        })
    }
}

impl From<MsgType> for u8 {
    fn from(value: MsgType) -> Self {
        match value {
            MsgType::Advertise => 0x00,
            MsgType::SearchGw => 0x01,
            MsgType::GwInfo => 0x02,
            MsgType::Connect => 0x04,
            MsgType::ConnAck => 0x05,
            MsgType::WillTopicReq => 0x06,
            MsgType::WillTopic => 0x07,
            MsgType::WillMsgReq => 0x08,
            MsgType::WillMsg => 0x09,
            MsgType::Register => 0x0A,
            MsgType::RegAck => 0x0B,
            MsgType::Publish => 0x0C,
            MsgType::PubAck => 0x0D,
            MsgType::PubComp => 0x0E,
            MsgType::PubRec => 0x0F,
            MsgType::PubRel => 0x10,
            MsgType::Subscribe => 0x12,
            MsgType::SubAck => 0x13,
            MsgType::Unsubscribe => 0x14,
            MsgType::UnsubAck => 0x15,
            MsgType::PingReq => 0x16,
            MsgType::PingResp => 0x17,
            MsgType::Disconnect => 0x18,
            MsgType::WillTopicUpd => 0x1A,
            MsgType::WillTopicResp => 0x1B,
            MsgType::WillMsgUpd => 0x1C,
            MsgType::WillMsgResp => 0x1D,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Advertise(AdvertiseMsg),
    SearchGw(SearchGwMsg),
    GwInfo(GwInfoMsg),
    Connect(ConnectMsg),
    ConnAck(ConnAckMsg),
    WillTopicReq(WillTopicReqMsg),
    WillTopic(WillTopicMsg),
    WillMsgReq(WillMsgReqMsg),
    WillMsg(WillMsgMsg),
    Register(RegisterMsg),
    RegAck(RegAckMsg),
    Publish(PublishMsg),
    PubAck(PubAckMsg),
    PubRec(PubRecMsg),
    PubRel(PubRelMsg),
    PubComp(PubCompMsg),
    Subscribe(SubscribeMsg),
    SubAck(SubAckMsg),
    Unsubscribe(UnsubscribeMsg),
    UnsubAck(UnsubAckMsg),
    PingReq(PingReqMsg),
    PingResp(PingRespMsg),
    Disconnect(DisconnectMsg),
    WillTopicUpd(WillTopicUpdMsg),
    WillTopicResp(WillTopicRespMsg),
    WillMsgUpd(WillMsgUpdMsg),
    WillMsgResp(WillMsgRespMsg),
}

impl Message {
    pub fn msg_type(&self) -> MsgType {
        match self {
            Self::Advertise(_) => MsgType::Advertise,
            Self::SearchGw(_) => MsgType::SearchGw,
            Self::GwInfo(_) => MsgType::GwInfo,
            Self::Connect(_) => MsgType::Connect,
            Self::ConnAck(_) => MsgType::ConnAck,
            Self::WillTopicReq(_) => MsgType::WillTopicReq,
            Self::WillTopic(_) => MsgType::WillTopic,
            Self::WillMsgReq(_) => MsgType::WillMsgReq,
            Self::WillMsg(_) => MsgType::WillMsg,
            Self::Register(_) => MsgType::Register,
            Self::RegAck(_) => MsgType::RegAck,
            Self::Publish(_) => MsgType::Publish,
            Self::PubAck(_) => MsgType::PubAck,
            Self::PubRec(_) => MsgType::PubRec,
            Self::PubRel(_) => MsgType::PubRel,
            Self::PubComp(_) => MsgType::PubComp,
            Self::Subscribe(_) => MsgType::Subscribe,
            Self::SubAck(_) => MsgType::SubAck,
            Self::Unsubscribe(_) => MsgType::Unsubscribe,
            Self::UnsubAck(_) => MsgType::UnsubAck,
            Self::PingReq(_) => MsgType::PingReq,
            Self::PingResp(_) => MsgType::PingResp,
            Self::Disconnect(_) => MsgType::Disconnect,
            Self::WillTopicUpd(_) => MsgType::WillTopicUpd,
            Self::WillTopicResp(_) => MsgType::WillTopicResp,
            Self::WillMsgUpd(_) => MsgType::WillMsgUpd,
            Self::WillMsgResp(_) => MsgType::WillMsgResp,
        }
    }

    fn encode_body(&self) -> Result<Bytes, crate::err::EncodeError> {
        match self {
            Self::Advertise(m) => m.encode(),
            Self::SearchGw(m) => m.encode(),
            Self::GwInfo(m) => m.encode(),
            Self::Connect(m) => m.encode(),
            Self::ConnAck(m) => m.encode(),
            Self::WillTopicReq(m) => m.encode(),
            Self::WillTopic(m) => m.encode(),
            Self::WillMsgReq(m) => m.encode(),
            Self::WillMsg(m) => m.encode(),
            Self::Register(m) => m.encode(),
            Self::RegAck(m) => m.encode(),
            Self::Publish(m) => m.encode(),
            Self::PubAck(m) => m.encode(),
            Self::PubRec(m) => m.encode(),
            Self::PubRel(m) => m.encode(),
            Self::PubComp(m) => m.encode(),
            Self::Subscribe(m) => m.encode(),
            Self::SubAck(m) => m.encode(),
            Self::Unsubscribe(m) => m.encode(),
            Self::UnsubAck(m) => m.encode(),
            Self::PingReq(m) => m.encode(),
            Self::PingResp(m) => m.encode(),
            Self::Disconnect(m) => m.encode(),
            Self::WillTopicUpd(m) => m.encode(),
            Self::WillTopicResp(m) => m.encode(),
            Self::WillMsgUpd(m) => m.encode(),
            Self::WillMsgResp(m) => m.encode(),
        }
    }

    fn decode_body(header: &FixedHeader, body: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(match header.msg_type {
            MsgType::Advertise => Self::Advertise(AdvertiseMsg::decode(body)?),
            MsgType::SearchGw => Self::SearchGw(SearchGwMsg::decode(body)?),
            MsgType::GwInfo => Self::GwInfo(GwInfoMsg::decode(body)?),
            MsgType::Connect => Self::Connect(ConnectMsg::decode(body)?),
            MsgType::ConnAck => Self::ConnAck(ConnAckMsg::decode(body)?),
            MsgType::WillTopicReq => Self::WillTopicReq(WillTopicReqMsg::decode(body)?),
            MsgType::WillTopic => Self::WillTopic(WillTopicMsg::decode(body)?),
            MsgType::WillMsgReq => Self::WillMsgReq(WillMsgReqMsg::decode(body)?),
            MsgType::WillMsg => Self::WillMsg(WillMsgMsg::decode(body)?),
            MsgType::Register => Self::Register(RegisterMsg::decode(body)?),
            MsgType::RegAck => Self::RegAck(RegAckMsg::decode(body)?),
            MsgType::Publish => Self::Publish(PublishMsg::decode(body)?),
            MsgType::PubAck => Self::PubAck(PubAckMsg::decode(body)?),
            MsgType::PubRec => Self::PubRec(PubRecMsg::decode(body)?),
            MsgType::PubRel => Self::PubRel(PubRelMsg::decode(body)?),
            MsgType::PubComp => Self::PubComp(PubCompMsg::decode(body)?),
            MsgType::Subscribe => Self::Subscribe(SubscribeMsg::decode(body)?),
            MsgType::SubAck => Self::SubAck(SubAckMsg::decode(body)?),
            MsgType::Unsubscribe => Self::Unsubscribe(UnsubscribeMsg::decode(body)?),
            MsgType::UnsubAck => Self::UnsubAck(UnsubAckMsg::decode(body)?),
            MsgType::PingReq => Self::PingReq(PingReqMsg::decode(body)?),
            MsgType::PingResp => Self::PingResp(PingRespMsg::decode(body)?),
            MsgType::Disconnect => Self::Disconnect(DisconnectMsg::decode(body)?),
            MsgType::WillTopicUpd => Self::WillTopicUpd(WillTopicUpdMsg::decode(body)?),
            MsgType::WillTopicResp => Self::WillTopicResp(WillTopicRespMsg::decode(body)?),
            MsgType::WillMsgUpd => Self::WillMsgUpd(WillMsgUpdMsg::decode(body)?),
            MsgType::WillMsgResp => Self::WillMsgResp(WillMsgRespMsg::decode(body)?),
        })
    }

    pub fn encode(&self) -> Result<Bytes, crate::err::EncodeError> {
        let body = self.encode_body()?;
        let type_byte: u8 = self.msg_type().into();
        let total_len = body.len() + 2;

        let mut out = BytesMut::with_capacity(total_len.max(3));
        if total_len <= 255 {
            out.put_u8(total_len as u8);
            out.put_u8(type_byte);
        } else {
            out.put_u8(EXTENDED_LENGTH_MARKER);
            out.put_u16((total_len + 2) as u16);
            out.put_u8(type_byte);
        }
        out.put_slice(&body);

        Ok(out.freeze())
    }
}

/// Attempts to decode exactly one complete frame from the front of `buf`.
///
/// Returns `Ok(None)` when `buf` holds only a partial frame (the caller
/// should retain the bytes and supply more later, satisfying the
/// framing-boundary invariant regardless of how the underlying datagrams or
/// stream chunks are split). Returns `Ok(Some((message, n_consumed)))` on a
/// complete frame.
pub fn decode_one(buf: &Bytes) -> Result<Option<(Message, usize)>, DecodeError> {
    match FixedHeader::peek(buf) {
        Ok(header) => {
            let mut body = buf.slice(header.header_len()..header.total_len());
            let message = Message::decode_body(&header, &mut body)?;
            Ok(Some((message, header.total_len())))
        }
        Err(e) if e.is_not_enough_data() => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod frame {
    use super::*;

    #[test]
    fn short_length_byte_drives_header_parsing() {
        let bytes = Bytes::from_static(&[0x07, 0x16, b'c', b'l', b'n', b't']);
        let header = FixedHeader::peek(&bytes).expect("complete frame");
        assert_eq!(header.header_len(), 2);
        assert_eq!(header.total_len(), 7);
        assert_eq!(header.msg_type, MsgType::PingReq);
    }

    #[test]
    fn partial_frame_reports_not_enough_data() {
        let bytes = Bytes::from_static(&[0x07, 0x16, b'c']);
        let err = FixedHeader::peek(&bytes).expect_err("incomplete frame");
        assert!(err.is_not_enough_data());
    }

    #[test]
    fn extended_length_prefix_is_honored() {
        let mut body = vec![0x01, 0x00, 0x84];
        body.push(0x0C);
        body.extend(std::iter::repeat(0u8).take(0x84 - 4));
        let bytes = Bytes::from(body);
        let header = FixedHeader::peek(&bytes).expect("complete extended frame");
        assert_eq!(header.header_len(), 4);
        assert_eq!(header.total_len(), 0x84);
        assert_eq!(header.msg_type, MsgType::Publish);
    }
}
