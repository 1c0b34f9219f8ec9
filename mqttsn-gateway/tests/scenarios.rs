//! End-to-end scenarios against a bare `Session`, exercising more than one
//! fixture file's worth of messages per test (S1-S6 from the testable
//! properties). Unlike the `#[cfg(test)]` unit tests colocated with each
//! op, these drive a real `Session` through a full client/broker exchange.

use std::collections::VecDeque;

use bytes::Bytes;

use mqtt_core::codec::v3::{ConnAckPacket, MqttPacket, PublishPacket};
use mqtt_core::topic::TopicName;
use mqtt_core::ConnectReturnCode;

use mqttsn_core::flags::Flags;
use mqttsn_core::msg::{
    ConnectMsg, DisconnectMsg, PingReqMsg, PublishMsg, RegisterMsg, WillMsgMsg, WillTopicMsg,
};
use mqttsn_core::qos::QoSLevel;
use mqttsn_core::return_code::ReturnCode;
use mqttsn_core::topic::{TopicIdType, TopicRef};
use mqttsn_core::Message;

use mqttsn_gateway::driver::SessionDriver;
use mqttsn_gateway::topic::RegMgr;
use mqttsn_gateway::Session;

#[derive(Default)]
struct RecordingDriver {
    to_client: Vec<Message>,
    to_broker: Vec<MqttPacket>,
    ticks: VecDeque<u32>,
    cancelled: bool,
    terminated: bool,
}

impl SessionDriver for RecordingDriver {
    fn send_to_client(&mut self, msg: Message) {
        self.to_client.push(msg);
    }
    fn send_to_broker(&mut self, packet: MqttPacket) {
        self.to_broker.push(packet);
    }
    fn program_tick(&mut self, ms: u32) {
        self.ticks.push_back(ms);
    }
    fn cancel_tick(&mut self) {
        self.cancelled = true;
    }
    fn request_terminate(&mut self) {
        self.terminated = true;
    }
    fn request_broker_reconnect(&mut self) {}
    fn report_client_connected(&mut self, _client_id: &str) {}
    fn request_auth_info(&mut self, _client_id: &str) -> Option<(Option<String>, Option<Bytes>)> {
        None
    }
}

fn send_client(session: &mut Session, driver: &mut RecordingDriver, msg: Message) {
    let bytes = msg.encode().expect("frame encodes");
    session
        .on_client_frame(driver, &bytes, 0)
        .expect("frame decodes");
}

fn send_broker(session: &mut Session, driver: &mut RecordingDriver, packet: MqttPacket) {
    let mut bytes = packet.encode().expect("packet encodes");
    session
        .on_broker_bytes(driver, &mut bytes)
        .expect("packet decodes");
}

fn connect(session: &mut Session, driver: &mut RecordingDriver, client_id: &str, keep_alive: u16) {
    send_client(
        session,
        driver,
        Message::Connect(ConnectMsg {
            flags: Flags::builder().clean_session(true).build(),
            protocol_id: mqttsn_core::msg::PROTOCOL_ID,
            duration_s: keep_alive,
            client_id: client_id.to_string(),
        }),
    );
    driver.to_broker.clear();
    send_broker(
        session,
        driver,
        MqttPacket::ConnAck(ConnAckPacket::new(false, ConnectReturnCode::Accept)),
    );
}

#[test]
fn s1_simple_qos0_publish() {
    let mut session = Session::new(String::from("default"), RegMgr::new(1, 0xFFFE));
    let mut driver = RecordingDriver::default();

    connect(&mut session, &mut driver, "c", 30);
    assert!(matches!(driver.to_client.last(), Some(Message::ConnAck(ack)) if ack.return_code == ReturnCode::Accepted));
    driver.to_client.clear();

    send_client(
        &mut session,
        &mut driver,
        Message::Register(RegisterMsg {
            topic_id: 0,
            msg_id: 1,
            topic_name: String::from("a/b"),
        }),
    );
    assert_eq!(driver.to_client.len(), 1);
    let Message::RegAck(ack) = &driver.to_client[0] else {
        panic!("expected REGACK");
    };
    assert_eq!(ack.msg_id, 1);
    assert_eq!(ack.return_code, ReturnCode::Accepted);
    let topic_id = ack.topic_id;
    driver.to_client.clear();

    send_client(
        &mut session,
        &mut driver,
        Message::Publish(PublishMsg {
            flags: Flags::builder()
                .qos(QoSLevel::Zero)
                .topic_id_type(TopicIdType::Normal)
                .build(),
            topic: TopicRef::Normal(topic_id),
            msg_id: 0,
            data: Bytes::from_static(b"x"),
        }),
    );

    assert_eq!(driver.to_broker.len(), 1);
    let MqttPacket::Publish(publish) = &driver.to_broker[0] else {
        panic!("expected PUBLISH");
    };
    assert_eq!(publish.topic().clone().to_string(), "a/b");
    assert_eq!(publish.payload().as_ref(), b"x");
    assert!(driver.to_client.is_empty());
}

#[test]
fn s2_unknown_topic_id_is_rejected() {
    let mut session = Session::new(String::from("default"), RegMgr::new(1, 0xFFFE));
    let mut driver = RecordingDriver::default();

    connect(&mut session, &mut driver, "c", 30);
    driver.to_client.clear();

    send_client(
        &mut session,
        &mut driver,
        Message::Publish(PublishMsg {
            flags: Flags::builder()
                .qos(QoSLevel::Zero)
                .topic_id_type(TopicIdType::Normal)
                .build(),
            topic: TopicRef::Normal(7),
            msg_id: 9,
            data: Bytes::from_static(b"x"),
        }),
    );

    assert!(driver.to_broker.is_empty());
    assert_eq!(driver.to_client.len(), 1);
    let Message::PubAck(ack) = &driver.to_client[0] else {
        panic!("expected PUBACK_SN");
    };
    assert_eq!(ack.topic_id, 7);
    assert_eq!(ack.return_code, ReturnCode::InvalidTopicId);
}

#[test]
fn s3_sleeping_client_buffers_then_flushes_in_order() {
    let mut session = Session::new(String::from("default"), RegMgr::new(1, 0xFFFE));
    let mut driver = RecordingDriver::default();

    connect(&mut session, &mut driver, "c", 30);
    driver.to_client.clear();

    send_client(
        &mut session,
        &mut driver,
        Message::Disconnect(DisconnectMsg::sleep(60)),
    );
    assert!(matches!(
        driver.to_client.last(),
        Some(Message::Disconnect(DisconnectMsg { duration_s: None }))
    ));
    driver.to_client.clear();

    let topic_name = TopicName::from_str("a/b").expect("valid topic name");
    let mut first = PublishPacket::new(&topic_name, Bytes::from_static(b"one"));
    first.set_qos_atmostonce();
    send_broker(&mut session, &mut driver, MqttPacket::Publish(first));

    let mut second = PublishPacket::new(&topic_name, Bytes::from_static(b"two"));
    second.set_qos_atmostonce();
    send_broker(&mut session, &mut driver, MqttPacket::Publish(second));

    assert!(driver.to_client.is_empty(), "publishes are buffered while asleep");

    send_client(
        &mut session,
        &mut driver,
        Message::PingReq(PingReqMsg {
            client_id: String::from("c"),
        }),
    );

    let publishes: Vec<&Bytes> = driver
        .to_client
        .iter()
        .filter_map(|m| match m {
            Message::Publish(p) => Some(&p.data),
            _ => None,
        })
        .collect();
    assert_eq!(publishes, vec![&Bytes::from_static(b"one"), &Bytes::from_static(b"two")]);
    assert!(matches!(driver.to_client.last(), Some(Message::PingResp(_))));
}

#[test]
fn s4_will_setup_reaches_the_broker_connect() {
    let mut session = Session::new(String::from("default"), RegMgr::new(1, 0xFFFE));
    let mut driver = RecordingDriver::default();

    send_client(
        &mut session,
        &mut driver,
        Message::Connect(ConnectMsg {
            flags: Flags::builder().clean_session(true).will(true).build(),
            protocol_id: mqttsn_core::msg::PROTOCOL_ID,
            duration_s: 30,
            client_id: String::from("c"),
        }),
    );
    assert!(matches!(
        driver.to_client.last(),
        Some(Message::WillTopicReq(_))
    ));
    driver.to_client.clear();

    send_client(
        &mut session,
        &mut driver,
        Message::WillTopic(WillTopicMsg::Some {
            flags: Flags::builder().qos(QoSLevel::One).retain(true).build(),
            topic: String::from("w"),
        }),
    );
    assert!(matches!(
        driver.to_client.last(),
        Some(Message::WillMsgReq(_))
    ));
    driver.to_client.clear();

    send_client(
        &mut session,
        &mut driver,
        Message::WillMsg(WillMsgMsg {
            message: Bytes::from_static(b"bye"),
        }),
    );

    assert_eq!(driver.to_broker.len(), 1);
    let MqttPacket::Connect(connect) = &driver.to_broker[0] else {
        panic!("expected CONNECT");
    };
    let will = connect.will.as_ref().expect("will should be set");
    assert_eq!(will.will_topic().clone().to_string(), "w");
    assert_eq!(will.will_message(), "bye");
}

#[test]
fn s5_qos_minus_one_publish_only() {
    let mut session = Session::new(String::from("default"), RegMgr::new(1, 0xFFFE));
    session.state.reg_mgr.add_predefined("pre/5", 5);
    let mut driver = RecordingDriver::default();

    send_client(
        &mut session,
        &mut driver,
        Message::Publish(PublishMsg {
            flags: Flags::builder()
                .qos(QoSLevel::MinusOne)
                .topic_id_type(TopicIdType::PreDefined)
                .build(),
            topic: TopicRef::PreDefined(5),
            msg_id: 0,
            data: Bytes::from_static(b"hi"),
        }),
    );

    assert!(driver.to_broker.iter().any(|p| matches!(p, MqttPacket::Connect(_))));
    let publish = driver.to_broker.iter().find_map(|p| match p {
        MqttPacket::Publish(p) => Some(p),
        _ => None,
    });
    let publish = publish.expect("expected a forwarded PUBLISH");
    assert_eq!(publish.topic().clone().to_string(), "pre/5");
    assert_eq!(publish.payload().as_ref(), b"hi");
    assert!(driver.to_broker.iter().any(|p| matches!(p, MqttPacket::Disconnect(_))));
}

#[test]
fn s6_retry_exhaustion_on_register_frees_the_allocation() {
    let mut session = Session::new(String::from("default"), RegMgr::new(1, 0xFFFE));
    let mut driver = RecordingDriver::default();

    connect(&mut session, &mut driver, "c", 30);
    driver.to_client.clear();

    let topic_name = TopicName::from_str("fresh/topic").expect("valid topic name");
    let mut publish = PublishPacket::new(&topic_name, Bytes::from_static(b"payload"));
    publish.set_qos_atmostonce();
    send_broker(&mut session, &mut driver, MqttPacket::Publish(publish));

    assert!(matches!(driver.to_client.last(), Some(Message::Register(_))));
    let retry_count = session.state.retry_count;
    let allocated_id = match driver.to_client.last() {
        Some(Message::Register(r)) => r.topic_id,
        _ => unreachable!(),
    };

    for _ in 0..=retry_count {
        session.on_tick(&mut driver, 0);
    }

    assert!(
        session.state.reg_mgr.map_topic_name(allocated_id).is_none(),
        "allocation must be freed once retries are exhausted"
    );
}
