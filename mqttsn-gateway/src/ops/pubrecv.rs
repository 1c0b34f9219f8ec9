use bytes::Bytes;

use mqtt_core::codec::v3::{MqttPacket, PubRelPacket};
use mqtt_core::qos::QosLevel;
use mqttsn_core::flags::Flags;
use mqttsn_core::msg::{PublishMsg, RegAckMsg, RegisterMsg};
use mqttsn_core::qos::QoSLevel;
use mqttsn_core::return_code::ReturnCode;
use mqttsn_core::topic::{TopicIdType, TopicRef};
use mqttsn_core::Message;

use crate::driver::SessionDriver;
use crate::state::{ConnStatus, SessionState};
use crate::topic::PubInfo;

use super::{Outcome, SessionOp};

#[derive(Clone, Debug, PartialEq, Eq)]
struct Pending {
    topic_id: u16,
    reg_msg_id: u16,
    payload: Bytes,
    qos: QosLevel,
    retain: bool,
    dup: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Stage {
    Idle,
    AwaitingRegAck(Pending),
    AwaitingPubAck(u16),
    AwaitingPubRec(u16),
    AwaitingPubComp(u16),
}

fn sn_qos(qos: QosLevel) -> QoSLevel {
    match qos {
        QosLevel::AtMostOnce => QoSLevel::Zero,
        QosLevel::AtLeastOnce => QoSLevel::One,
        QosLevel::ExactlyOnce => QoSLevel::Two,
    }
}

/// Broker-to-client publish path (4.4.5). Whether the message originated
/// from another client on the broker or from a plain MQTT publisher makes
/// no difference here — both arrive as the same `MqttPacket::Publish` from
/// the broker TCP connection.
///
/// A publish on a topic the client has never seen goes through a
/// REGISTER_SN/REGACK_SN handshake first (with its own retry budget); only
/// once that's acknowledged is the PUBLISH_SN itself sent. If the client
/// never ACKs the registration, the allocation is discarded and the
/// payload is dropped (S6) rather than sent under an id the client never
/// confirmed.
pub struct PubRecvOp {
    stage: Stage,
    retries_left: u32,
}

impl Default for PubRecvOp {
    fn default() -> Self {
        Self {
            stage: Stage::Idle,
            retries_left: 0,
        }
    }
}

impl PubRecvOp {
    fn send_publish(
        &mut self,
        state: &mut SessionState,
        driver: &mut dyn SessionDriver,
        topic_id: u16,
        payload: Bytes,
        qos: QosLevel,
        retain: bool,
        dup: bool,
    ) {
        let msg_id = state.next_msg_id();
        let flags = Flags::builder()
            .dup(dup)
            .qos(sn_qos(qos))
            .retain(retain)
            .topic_id_type(TopicIdType::Normal)
            .build();

        driver.send_to_client(Message::Publish(PublishMsg {
            flags,
            topic: TopicRef::Normal(topic_id),
            msg_id,
            data: payload,
        }));

        match qos {
            QosLevel::AtMostOnce => {}
            QosLevel::AtLeastOnce => {
                self.stage = Stage::AwaitingPubAck(msg_id);
                self.retries_left = state.retry_count;
                driver.program_tick(state.retry_period_ms);
            }
            QosLevel::ExactlyOnce => {
                self.stage = Stage::AwaitingPubRec(msg_id);
                self.retries_left = state.retry_count;
                driver.program_tick(state.retry_period_ms);
            }
        }
    }

    fn deliver(
        &mut self,
        state: &mut SessionState,
        driver: &mut dyn SessionDriver,
        topic: &str,
        payload: Bytes,
        qos: QosLevel,
        retain: bool,
        dup: bool,
    ) {
        let (topic_id, is_new) = match state.reg_mgr.map_topic_id(topic) {
            Ok(pair) => pair,
            Err(err) => {
                log::warn!("cannot deliver publish on '{topic}' to '{}': {err}", state.client_id);
                return;
            }
        };

        if is_new {
            let reg_msg_id = state.next_msg_id();
            driver.send_to_client(Message::Register(RegisterMsg {
                topic_id,
                msg_id: reg_msg_id,
                topic_name: topic.to_string(),
            }));
            self.stage = Stage::AwaitingRegAck(Pending {
                topic_id,
                reg_msg_id,
                payload,
                qos,
                retain,
                dup,
            });
            self.retries_left = state.retry_count;
            driver.program_tick(state.retry_period_ms);
            return;
        }

        self.send_publish(state, driver, topic_id, payload, qos, retain, dup);
    }
}

impl SessionOp for PubRecvOp {
    fn on_broker_packet(
        &mut self,
        state: &mut SessionState,
        driver: &mut dyn SessionDriver,
        packet: &MqttPacket,
    ) -> Outcome {
        match packet {
            MqttPacket::Publish(publish) if self.stage == Stage::Idle => {
                let qos = publish.qos();
                let topic = publish.topic().clone().to_string();
                let payload = publish.payload().clone();
                let retain = publish.retain();

                if state.conn_status == ConnStatus::Asleep {
                    state.push_broker_pub(PubInfo {
                        topic,
                        payload,
                        qos,
                        retain,
                        dup: false,
                    });
                } else {
                    self.deliver(state, driver, &topic, payload, qos, retain, false);
                }
                Outcome::Handled
            }
            _ => Outcome::NotHandled,
        }
    }

    fn on_client_msg(
        &mut self,
        state: &mut SessionState,
        driver: &mut dyn SessionDriver,
        msg: &Message,
    ) -> Outcome {
        match msg {
            Message::RegAck(RegAckMsg {
                topic_id,
                msg_id,
                return_code,
            }) => {
                let Stage::AwaitingRegAck(pending) = &self.stage else {
                    return Outcome::NotHandled;
                };
                if pending.topic_id != *topic_id || pending.reg_msg_id != *msg_id {
                    return Outcome::NotHandled;
                }
                driver.cancel_tick();
                let pending = pending.clone();
                self.stage = Stage::Idle;

                if *return_code == ReturnCode::Accepted {
                    self.send_publish(
                        state,
                        driver,
                        pending.topic_id,
                        pending.payload,
                        pending.qos,
                        pending.retain,
                        pending.dup,
                    );
                } else {
                    state.reg_mgr.discard_registration(pending.topic_id);
                    log::warn!(
                        "client '{}' refused REGISTER_SN for topic id {}, dropping the publish",
                        state.client_id,
                        pending.topic_id
                    );
                }
                Outcome::Handled
            }
            Message::PubAck(ack) if self.stage == Stage::AwaitingPubAck(ack.msg_id) => {
                driver.cancel_tick();
                self.stage = Stage::Idle;
                Outcome::Handled
            }
            Message::PubRec(rec) if self.stage == Stage::AwaitingPubRec(rec.msg_id) => {
                driver.cancel_tick();
                driver.send_to_broker(MqttPacket::PubRel(PubRelPacket::new(rec.msg_id)));
                self.stage = Stage::AwaitingPubComp(rec.msg_id);
                self.retries_left = state.retry_count;
                driver.program_tick(state.retry_period_ms);
                Outcome::Handled
            }
            Message::PubComp(comp) if self.stage == Stage::AwaitingPubComp(comp.msg_id) => {
                driver.cancel_tick();
                self.stage = Stage::Idle;
                Outcome::Handled
            }
            _ => Outcome::NotHandled,
        }
    }

    fn on_tick(&mut self, state: &mut SessionState, driver: &mut dyn SessionDriver, _now_ms: u64) {
        if self.stage == Stage::Idle {
            return;
        }
        if self.retries_left == 0 {
            if let Stage::AwaitingRegAck(pending) = &self.stage {
                state.reg_mgr.discard_registration(pending.topic_id);
                log::warn!(
                    "client '{}' never acked REGISTER_SN for topic id {}, discarding it and dropping the publish",
                    state.client_id,
                    pending.topic_id
                );
            } else {
                log::warn!(
                    "client '{}' broker-publish handshake exhausted its retries, abandoning",
                    state.client_id
                );
            }
            self.stage = Stage::Idle;
            driver.cancel_tick();
            return;
        }

        if let Stage::AwaitingRegAck(pending) = &self.stage {
            driver.send_to_client(Message::Register(RegisterMsg {
                topic_id: pending.topic_id,
                msg_id: pending.reg_msg_id,
                topic_name: String::new(),
            }));
        }

        self.retries_left -= 1;
        driver.program_tick(state.retry_period_ms);
    }
}

#[cfg(test)]
mod pubrecv {
    use super::*;
    use crate::topic::RegMgr;
    use mqtt_core::codec::v3::PublishPacket;
    use mqtt_core::topic::TopicName;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct RecordingDriver {
        to_client: Vec<Message>,
        to_broker: Vec<MqttPacket>,
        ticks: VecDeque<u32>,
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
        fn cancel_tick(&mut self) {}
        fn request_terminate(&mut self) {}
        fn request_broker_reconnect(&mut self) {}
        fn report_client_connected(&mut self, _client_id: &str) {}
        fn request_auth_info(&mut self, _client_id: &str) -> Option<(Option<String>, Option<Bytes>)> {
            None
        }
    }

    #[test]
    fn new_topic_registers_before_publishing() {
        let mut state = SessionState::new(String::from("c1"), RegMgr::default());
        state.retry_count = 2;
        let mut driver = RecordingDriver::default();
        let mut op = PubRecvOp::default();

        let topic = TopicName::from_str("a/b").unwrap();
        let mut packet = PublishPacket::new(&topic, Bytes::from_static(b"x"));
        packet.set_qos_atmostonce();

        op.on_broker_packet(&mut state, &mut driver, &MqttPacket::Publish(packet));

        assert_eq!(driver.to_client.len(), 1);
        assert!(matches!(driver.to_client[0], Message::Register(_)));
        assert!(matches!(op.stage, Stage::AwaitingRegAck(_)));
    }

    #[test]
    fn retry_exhaustion_on_register_discards_the_allocation() {
        let mut state = SessionState::new(String::from("c1"), RegMgr::default());
        state.retry_count = 1;
        let mut driver = RecordingDriver::default();
        let mut op = PubRecvOp::default();

        let topic = TopicName::from_str("a/b").unwrap();
        let mut packet = PublishPacket::new(&topic, Bytes::from_static(b"x"));
        packet.set_qos_atmostonce();
        op.on_broker_packet(&mut state, &mut driver, &MqttPacket::Publish(packet));

        op.on_tick(&mut state, &mut driver, 0);
        op.on_tick(&mut state, &mut driver, 0);

        assert_eq!(op.stage, Stage::Idle);
        assert!(state.reg_mgr.map_topic_name(1).is_none() || state.reg_mgr.entries().is_empty());
    }
}
