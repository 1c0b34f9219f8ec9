use crate::err::{DecodeError, DecodeErrorKind, EncodeError};
use crate::v3::PacketType;
use crate::{
    io::{decode_bytes, decode_utf8, encode_bytes, encode_packet_length, encode_utf8},
    qos::QosLevel,
    topic::TopicName,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use core::fmt::Debug;

/*
 * After a Network Connection is established by a Client to a Server,
 * the first Packet sent from the Client to the Server MUST be a CONNECT Packet [MQTT-3.1.0-1].
 *
 * A Client can only send the CONNECT Packet once over a Network Connection.
 * The Server MUST process a second CONNECT Packet sent from a Client as a protocol
 * violation and disconnect the Client [MQTT-3.1.0-2].
 *
 * The payload contains one or more encoded fields. They specify a unique Client identifier for the Client,
 * a Will topic, Will Message, User Name and Password. All but the Client identifier are optional and their
 * presence is determined based on flags in the variable header.
 */
#[derive(Clone, PartialEq, Debug)]
pub struct ConnectPacket {
    protocol: Protocol,

    /*
     * The value of the Protocol Level field for version 3.1.1 of the protocol is 4 (0x04).
     * The Server MUST respond to the CONNECT Packet with a CONNACK return code 0x01 (unacceptable protocol level)
     * and then disconnect the Client if the Protocol Level is not supported [MQTT-3.1.2-2].
     */
    level: u8,

    conn_flags: ConnectFlags,

    /*
     * A Keep Alive value of zero (0) has the effect of turning off the keep alive mechanism.
     * If the Keep Alive value is non-zero and the Server does not receive a Control Packet from
     * the Client within one and a half times the Keep Alive time period, it MUST disconnect the
     * Network Connection to the Client as if the network had failed [MQTT-3.1.2-24].
     */
    pub keep_alive: u16,

    pub client_id: String,

    pub will: Option<Will>,

    username: Option<String>,

    password: Option<Bytes>,
}

impl ConnectPacket {
    pub fn decode(mut bytes: &mut Bytes) -> Result<Self, DecodeError> {
        let protocol: Protocol;
        (protocol, bytes) = Protocol::from_bytes(bytes)?;

        let level = bytes.get_u8();

        if level != 4 {
            return Err(DecodeError::new(
                DecodeErrorKind::InvalidProtocol,
                format!("Mqtt V3.1.1 Requires Protocol level to be 4, instead received: {level}"),
            ));
        }

        let conn_flags = ConnectFlags::from_byte(bytes.get_u8())?;

        let keep_alive = bytes.get_u16();

        let client_id: String = decode_utf8(bytes)?;

        let mut will = None;

        if conn_flags.will() {
            let topic: String = decode_utf8(bytes)?;
            let message: String = decode_utf8(bytes)?;

            let qos = conn_flags.will_qos();
            let retain = conn_flags.will_retain();

            will = Some(Will::new(
                TopicName::from_str(topic.as_str())?,
                message,
                qos,
                retain,
            ))
        }

        let username: Option<String> = if conn_flags.user_name() {
            Some(decode_utf8(bytes)?)
        } else {
            None
        };

        let password: Option<Bytes> = if conn_flags.password() {
            Some(decode_bytes(bytes)?)
        } else {
            None
        };

        return Ok(Self {
            protocol,
            level,
            conn_flags,
            keep_alive,
            client_id,
            will,
            username,
            password,
        });
    }

    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        // 1 for protocol level, 1 for connect flags, 2 for the keep alive.
        let mut len = 1 + 1 + 2;
        len += 2 + self.protocol.len();
        len += 2 + self.client_id.len();

        if let Some(will) = &self.will {
            len += will.will_topic.len() + 2;
            len += will.will_message.len() + 2;
        }

        if let Some(username) = &self.username {
            len += username.len() + 2;
        }

        if let Some(password) = &self.password {
            len += password.len() + 2;
        }

        let mut bytes = BytesMut::with_capacity(len);

        bytes.put_u8(PacketType::CONNECT as u8);

        encode_packet_length(&mut bytes, len)?;

        encode_utf8(&mut bytes, self.protocol.as_str())?;

        bytes.put_u8(self.level);

        bytes.put_u8(self.conn_flags.as_byte());

        bytes.put_u16(self.keep_alive);

        encode_utf8(&mut bytes, &self.client_id)?;

        if let Some(will) = &self.will {
            encode_utf8(&mut bytes, &will.will_topic.clone().to_string())?;
            encode_utf8(&mut bytes, &will.will_message)?;
        }

        if let Some(username) = &self.username {
            encode_utf8(&mut bytes, username)?;
        }

        if let Some(password) = &self.password {
            encode_bytes(&mut bytes, password)?;
        }

        return Ok(bytes.into());
    }

    pub fn new(
        is_clean_session: bool,
        keep_alive: u16,
        client_id: String,
        will: Option<Will>,
        username: Option<String>,
        password: Option<Bytes>,
    ) -> Self {
        let mut conn_flags = ConnectFlags::default();

        if username.is_some() {
            conn_flags.set_user_name(true);
        }

        if password.is_some() {
            conn_flags.set_password(true);
        }

        if let Some(will) = &will {
            conn_flags.set_will_retain(will.will_retain);
            conn_flags.set_will_qos(will.will_qos);
            conn_flags.set_will(true);
        }

        if is_clean_session {
            conn_flags.set_clean_session(true);
        }

        return Self {
            protocol: Protocol::MQTT,
            level: 4,
            conn_flags,
            keep_alive,
            client_id,
            will,
            username,
            password,
        };
    }

    pub fn client_id(&self) -> &'_ str {
        return &self.client_id;
    }

    pub fn version(&self) -> u8 {
        return self.level;
    }

    pub fn will_retain(&self) -> bool {
        return self.conn_flags.will_retain();
    }

    pub fn clean_session(&self) -> bool {
        return self.conn_flags.clean_session();
    }

    pub fn username(&self) -> &Option<String> {
        return &self.username;
    }

    pub fn password(&self) -> &Option<Bytes> {
        return &self.password;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Will {
    // prefixing the fields with will may seem verbose, but it adds clarity when dealing with the struct at a higher level.
    will_topic: TopicName,
    will_message: String,
    will_qos: QosLevel,
    will_retain: bool,
}

impl Will {
    pub fn new(
        will_topic: TopicName,
        will_message: String,
        will_qos: QosLevel,
        will_retain: bool,
    ) -> Self {
        return Self {
            will_topic,
            will_message,
            will_qos,
            will_retain,
        };
    }

    pub fn will_topic(&self) -> &TopicName {
        return &self.will_topic;
    }

    pub fn will_message(&self) -> String {
        return self.will_message.clone();
    }

    pub fn will_qos(&self) -> QosLevel {
        return self.will_qos;
    }

    pub fn will_retain(&self) -> bool {
        return self.will_retain;
    }
}

const USERNAME: u8 = 0b1000_0000;
const PASSWORD: u8 = 0b0100_0000;
const WILL_RETAIN: u8 = 0b0010_0000;
const WILL_QOS_2: u8 = 0b0001_0000;
const WILL_QOS_1: u8 = 0b0000_1000;
const WILL_QOS_BITS: u8 = 0b0001_1000;
const WILL: u8 = 0b0000_0100;
const CLEAN_SESSION: u8 = 0b0000_0010;
const RESERVED_BIT: u8 = 0b0000_0001;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct ConnectFlags {
    byte: u8,
}

impl ConnectFlags {
    pub fn from_byte(byte: u8) -> Result<Self, DecodeError> {
        if byte & RESERVED_BIT == RESERVED_BIT {
            return Err(DecodeError::new(
                DecodeErrorKind::ProtocolError,
                format!("Connect packet cannot have reserved bit (index 0) set, received: {byte}"),
            ));
        }

        if byte & WILL == 0 && byte & 0b0011_1000 != 0 {
            return Err(DecodeError::new(
                DecodeErrorKind::Will,
                format!(
                    "Optional connection Will bits were set, but the Will bit itself was unset, received: {byte}"
                ),
            ));
        }

        if byte & PASSWORD == PASSWORD && byte & USERNAME != USERNAME {
            return Err(DecodeError::new(
                DecodeErrorKind::UsernamePassword,
                format!("Password bit is set and Username bit is unset, received: {byte}"),
            ));
        }

        return Ok(Self { byte });
    }

    pub fn as_byte(&self) -> u8 {
        return self.byte;
    }

    pub fn will_qos(&self) -> QosLevel {
        match self.byte & (WILL_QOS_BITS) {
            WILL_QOS_1 => QosLevel::AtLeastOnce,
            WILL_QOS_2 => QosLevel::ExactlyOnce,
            _ => QosLevel::AtMostOnce,
        }
    }

    pub fn set_will_qos(&mut self, value: QosLevel) {
        self.byte = self.byte & !(WILL_QOS_BITS);
        self.byte = self.byte | ((value as u8) << 3);
    }

    pub fn user_name(&self) -> bool {
        return self.byte & USERNAME == USERNAME;
    }

    pub fn set_user_name(&mut self, val: bool) {
        if val {
            self.byte = self.byte | USERNAME;
        } else {
            self.byte = self.byte & !USERNAME;
        }
    }

    pub fn password(&self) -> bool {
        return self.byte & PASSWORD == PASSWORD;
    }

    pub fn set_password(&mut self, val: bool) {
        if val {
            self.byte = self.byte | PASSWORD;
        } else {
            self.byte = self.byte & !PASSWORD;
        }
    }

    pub fn will_retain(&self) -> bool {
        return self.byte & WILL_RETAIN == WILL_RETAIN;
    }

    pub fn set_will_retain(&mut self, val: bool) {
        if val {
            self.byte = self.byte | WILL_RETAIN;
        } else {
            self.byte = self.byte & !WILL_RETAIN;
        }
    }

    pub fn will(&self) -> bool {
        return self.byte & WILL == WILL;
    }

    pub fn set_will(&mut self, val: bool) {
        if val {
            self.byte = self.byte | WILL;
        } else {
            self.byte = self.byte & !WILL;
        }
    }

    pub fn clean_session(&self) -> bool {
        return self.byte & CLEAN_SESSION == CLEAN_SESSION;
    }

    pub fn set_clean_session(&mut self, val: bool) {
        if val {
            self.byte = self.byte | CLEAN_SESSION;
        } else {
            self.byte = self.byte & !CLEAN_SESSION;
        }
    }
}

impl Default for ConnectFlags {
    fn default() -> Self {
        return Self { byte: 0 };
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Protocol {
    MQTT,
}

impl Protocol {
    pub fn from_bytes(bytes: &mut Bytes) -> Result<(Self, &mut Bytes), DecodeError> {
        let protocol_name = decode_utf8(bytes)?;

        match protocol_name.as_str() {
            "MQTT" => return Ok((Self::MQTT, bytes)),
            _ => {
                return Err(DecodeError::new(
                    DecodeErrorKind::InvalidProtocol,
                    format!(
                        "Only MQTT packet types are allowed, instead received type: {protocol_name}"
                    ),
                ))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::MQTT => return "MQTT",
        }
    }

    /// returns the number of bytes, not the number of chars.
    pub fn len(&self) -> usize {
        return self.as_str().len();
    }
}

#[cfg(test)]
mod packet {
    use crate::v3::{FixedHeader, MqttPacket};

    use super::ConnectPacket;
    use bytes::Buf;

    #[test]
    fn serialize_deserialize() {
        let packet = ConnectPacket::new(true, 100, "id_1".to_string(), None, None, None);
        let mut buf = packet.encode().unwrap();

        let f_header = FixedHeader::decode(&mut buf).unwrap();
        buf.advance(f_header.header_len);
        let packet_de = MqttPacket::decode(f_header, &mut buf).expect("Could not decode packet");

        assert_eq!(packet_de, MqttPacket::Connect(packet));

        let packet = ConnectPacket::new(true, 10, String::from("TestClientId"), None, None, None);
        let mut buf = packet.encode().unwrap();

        let f_header = FixedHeader::decode(&mut buf).unwrap();
        buf.advance(f_header.header_len);
        let packet_de = MqttPacket::decode(f_header, &mut buf).expect("Could not decode packet");

        assert_eq!(packet_de, MqttPacket::Connect(packet));
    }
}
