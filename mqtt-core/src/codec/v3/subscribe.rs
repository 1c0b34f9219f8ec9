use crate::{
    err::{DecodeError, EncodeError},
    io::{encode_packet_length, encode_utf8},
    qos::QosLevel,
    topic::TopicFilter,
    v3::PacketType,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/*
 * The SUBSCRIBE Packet is sent from the Client to the Server to create one or more Subscriptions.
 * Each Subscription registers a Client's interest in one or more Topics.
 *
 * The Server sends PUBLISH Packets to the Client in order to forward Application Messages
 * that were published to Topics that match these Subscriptions.
 *
 * The SUBSCRIBE Packet also specifies (for each Subscription) the maximum QoS
 * with which the Server can send Application Messages to the Client.
 */
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub struct SubscribePacket {
    packet_id: u16,
    payload: Vec<(TopicFilter, QosLevel)>,
}

impl SubscribePacket {
    pub fn new(packet_id: u16, payload: Vec<(TopicFilter, QosLevel)>) -> Self {
        return Self { packet_id, payload };
    }

    pub fn decode(bytes: &mut Bytes) -> Result<Self, DecodeError> {
        let packet_id = bytes.get_u16();

        let mut payload = Vec::new();

        loop {
            let filter = TopicFilter::decode(bytes)?;
            let qos: QosLevel = bytes.get_u8().try_into()?;

            payload.push((filter, qos));

            if bytes.remaining() == 0 {
                break;
            }
        }

        return Ok(Self { packet_id, payload });
    }

    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        // 2 for packet_id
        let mut len = 2;

        for (filter, _) in &self.payload {
            // 2 for str length, 1 for QoS byte
            len += 2 + 1 + filter.len();
        }

        let mut bytes = BytesMut::with_capacity(len);

        bytes.put_u8(PacketType::SUBSCRIBE as u8 | 0x02);

        encode_packet_length(&mut bytes, len)?;

        bytes.put_u16(self.packet_id);

        for (filter, qos) in &self.payload {
            encode_utf8(&mut bytes, &filter.clone().to_string())?;
            bytes.put_u8(*qos as u8);
        }

        return Ok(bytes.into());
    }

    pub fn id(&self) -> u16 {
        return self.packet_id;
    }

    pub fn topic_filters(&self) -> &Vec<(TopicFilter, QosLevel)> {
        return &self.payload;
    }
}

#[cfg(test)]
mod packet {
    use super::SubscribePacket;
    use crate::{
        qos::QosLevel,
        topic::TopicFilter,
        v3::{FixedHeader, MqttPacket},
        Decode,
    };

    #[test]
    fn serialize_deserialize() {
        let packet = SubscribePacket::new(
            1234,
            vec![(TopicFilter::from_str("test").unwrap(), QosLevel::AtLeastOnce)],
        );
        let mut buf = packet.encode().unwrap();

        let f_header = FixedHeader::decode(&mut buf).unwrap();
        let packet_de = MqttPacket::decode(f_header, &mut buf).expect("Could not decode packet");

        assert_eq!(packet_de, MqttPacket::Subscribe(packet));
    }
}
