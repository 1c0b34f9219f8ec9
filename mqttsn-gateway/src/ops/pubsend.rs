use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use mqtt_core::codec::v3::{ConnectPacket, DisconnectPacket, MqttPacket, PubRelPacket, PublishPacket};
use mqtt_core::topic::TopicName;
use mqttsn_core::msg::{PubAckMsg, PubCompMsg, PubRecMsg, PubRelMsg, RegAckMsg};
use mqttsn_core::qos::QoSLevel;
use mqttsn_core::return_code::ReturnCode;
use mqttsn_core::topic::TopicRef;
use mqttsn_core::Message;

use crate::driver::SessionDriver;
use crate::state::{ConnStatus, SessionState};
use crate::topic::TopicKind;

use super::{Outcome, SessionOp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Idle,
    AwaitingPubAck(u16, u16),
    AwaitingPubRec(u16, u16),
    AwaitingPubComp(u16, u16),
}

/// The "pub-only:" + short-id-of-topic client-id convention used for the
/// synthetic broker CONNECT a QoS -1 publish triggers when no session is
/// connected (4.4.1's publish-only variant).
fn pub_only_client_id(topic: &str) -> String {
    let mut hasher = DefaultHasher::new();
    topic.hash(&mut hasher);
    format!("pub-only:{:x}", hasher.finish() as u32)
}

fn resolve_topic(state: &mut SessionState, topic: &TopicRef) -> Result<String, ReturnCode> {
    match topic {
        TopicRef::Normal(id) => state
            .reg_mgr
            .map_topic_name(*id)
            .map(String::from)
            .ok_or(ReturnCode::InvalidTopicId),
        TopicRef::PreDefined(id) => state
            .reg_mgr
            .map_topic_name_by_kind(*id, TopicKind::Predefined)
            .map(String::from)
            .ok_or(ReturnCode::InvalidTopicId),
        TopicRef::ShortName(bytes) => {
            String::from_utf8(bytes.to_vec()).map_err(|_| ReturnCode::InvalidTopicId)
        }
    }
}

/// Client-to-broker publish path (4.4.4): REGISTER_SN bookkeeping plus the
/// at-most-one-in-flight QoS1/QoS2 handshake forwarded onto the broker's TCP
/// connection. QoS -1 ("publish without connect") skips the handshake
/// entirely and is fire-and-forget in both directions.
pub struct PubSendOp {
    stage: Stage,
    retries_left: u32,
}

impl Default for PubSendOp {
    fn default() -> Self {
        Self {
            stage: Stage::Idle,
            retries_left: 0,
        }
    }
}

impl PubSendOp {
    /// A PUBLISH_SN with QoS -1 and no prior CONNECT (4.4.1's publish-only
    /// variant) opens a throwaway broker connection under the
    /// `"pub-only:"+short-id-of-topic` client-id convention, with no will
    /// and `pub_only_keep_alive_s` as its keepalive, before the publish
    /// itself is forwarded.
    fn synthetic_connect(&self, state: &mut SessionState, driver: &mut dyn SessionDriver, topic: &str) {
        let client_id = pub_only_client_id(topic);
        let packet = ConnectPacket::new(
            true,
            state.pub_only_keep_alive_s,
            client_id.clone(),
            None,
            None,
            None,
        );
        driver.send_to_broker(MqttPacket::Connect(packet));
        state.client_id = client_id;
        state.pub_only_client = true;
        state.conn_status = ConnStatus::Connected;
        state.broker_connected = true;
    }
}

impl SessionOp for PubSendOp {
    fn on_client_msg(
        &mut self,
        state: &mut SessionState,
        driver: &mut dyn SessionDriver,
        msg: &Message,
    ) -> Outcome {
        match msg {
            Message::Register(register) => {
                let (topic_id, _is_new) = match state.reg_mgr.map_topic_id(&register.topic_name) {
                    Ok(pair) => pair,
                    Err(_) => {
                        driver.send_to_client(Message::RegAck(RegAckMsg {
                            topic_id: 0,
                            msg_id: register.msg_id,
                            return_code: ReturnCode::Congestion,
                        }));
                        return Outcome::Handled;
                    }
                };
                driver.send_to_client(Message::RegAck(RegAckMsg {
                    topic_id,
                    msg_id: register.msg_id,
                    return_code: ReturnCode::Accepted,
                }));
                Outcome::Handled
            }

            Message::Publish(publish) if self.stage == Stage::Idle => {
                let sn_qos = publish.flags.qos().unwrap_or(QoSLevel::Zero);
                let requested_topic_id = match &publish.topic {
                    TopicRef::Normal(id) | TopicRef::PreDefined(id) => *id,
                    TopicRef::ShortName(_) => 0,
                };

                let topic_name = match resolve_topic(state, &publish.topic) {
                    Ok(name) => name,
                    Err(return_code) => {
                        if sn_qos != QoSLevel::MinusOne {
                            driver.send_to_client(Message::PubAck(PubAckMsg::new(
                                requested_topic_id,
                                publish.msg_id,
                                return_code,
                            )));
                        }
                        return Outcome::Handled;
                    }
                };

                if sn_qos == QoSLevel::MinusOne && state.conn_status != ConnStatus::Connected {
                    self.synthetic_connect(state, driver, &topic_name);
                }

                let Ok(topic_name_parsed) = TopicName::from_str(&topic_name) else {
                    return Outcome::Handled;
                };

                let mut packet = PublishPacket::new(&topic_name_parsed, publish.data.clone());
                packet.set_retain(publish.flags.retain());

                match sn_qos {
                    QoSLevel::Zero | QoSLevel::MinusOne => {
                        packet.set_qos_atmostonce();
                        driver.send_to_broker(MqttPacket::Publish(packet));
                        if sn_qos == QoSLevel::MinusOne && state.pub_only_client {
                            driver.send_to_broker(MqttPacket::Disconnect(DisconnectPacket::new()));
                            state.pub_only_client = false;
                            state.conn_status = ConnStatus::Disconnected;
                            state.broker_connected = false;
                        }
                    }
                    QoSLevel::One => {
                        packet.set_qos_atleastonce(publish.msg_id);
                        driver.send_to_broker(MqttPacket::Publish(packet));
                        self.stage = Stage::AwaitingPubAck(publish.msg_id, requested_topic_id);
                        self.retries_left = state.retry_count;
                        driver.program_tick(state.retry_period_ms);
                    }
                    QoSLevel::Two => {
                        packet.set_qos_exactlyonce(publish.msg_id);
                        driver.send_to_broker(MqttPacket::Publish(packet));
                        self.stage = Stage::AwaitingPubRec(publish.msg_id, requested_topic_id);
                        self.retries_left = state.retry_count;
                        driver.program_tick(state.retry_period_ms);
                    }
                }
                Outcome::Handled
            }

            Message::PubRel(pubrel) => {
                if let Stage::AwaitingPubComp(expected, _) = self.stage {
                    if expected == pubrel.msg_id {
                        driver.send_to_broker(MqttPacket::PubRel(PubRelPacket::new(pubrel.msg_id)));
                        driver.program_tick(state.retry_period_ms);
                        return Outcome::Handled;
                    }
                }
                Outcome::NotHandled
            }

            _ => Outcome::NotHandled,
        }
    }

    fn on_broker_packet(
        &mut self,
        state: &mut SessionState,
        driver: &mut dyn SessionDriver,
        packet: &MqttPacket,
    ) -> Outcome {
        match packet {
            MqttPacket::PubAck(ack) if matches!(self.stage, Stage::AwaitingPubAck(id, _) if id == ack.id()) => {
                driver.cancel_tick();
                driver.send_to_client(Message::PubAck(PubAckMsg::new(
                    0,
                    ack.id(),
                    ReturnCode::Accepted,
                )));
                self.stage = Stage::Idle;
                Outcome::Handled
            }

            MqttPacket::PubRec(rec) if matches!(self.stage, Stage::AwaitingPubRec(id, _) if id == rec.id()) => {
                let Stage::AwaitingPubRec(msg_id, topic_id) = self.stage else {
                    unreachable!()
                };
                driver.cancel_tick();
                driver.send_to_client(Message::PubRec(PubRecMsg::new(rec.id())));
                self.stage = Stage::AwaitingPubComp(msg_id, topic_id);
                self.retries_left = state.retry_count;
                driver.program_tick(state.retry_period_ms);
                Outcome::Handled
            }

            MqttPacket::PubComp(comp) if matches!(self.stage, Stage::AwaitingPubComp(id, _) if id == comp.id()) => {
                driver.cancel_tick();
                driver.send_to_client(Message::PubComp(PubCompMsg::new(comp.id())));
                self.stage = Stage::Idle;
                Outcome::Handled
            }

            _ => Outcome::NotHandled,
        }
    }

    fn on_tick(&mut self, state: &mut SessionState, driver: &mut dyn SessionDriver, _now_ms: u64) {
        let (msg_id, topic_id) = match self.stage {
            Stage::Idle => return,
            Stage::AwaitingPubAck(msg_id, topic_id)
            | Stage::AwaitingPubRec(msg_id, topic_id)
            | Stage::AwaitingPubComp(msg_id, topic_id) => (msg_id, topic_id),
        };

        if self.retries_left == 0 {
            log::warn!(
                "client '{}' publish handshake exhausted its retries, abandoning",
                state.client_id
            );
            self.stage = Stage::Idle;
            driver.cancel_tick();
            driver.send_to_client(Message::PubAck(PubAckMsg::new(
                topic_id,
                msg_id,
                ReturnCode::Congestion,
            )));
            return;
        }
        self.retries_left -= 1;
        driver.program_tick(state.retry_period_ms);
    }
}

#[cfg(test)]
mod pubsend {
    use super::*;
    use crate::topic::RegMgr;
    use mqttsn_core::flags::Flags;
    use mqttsn_core::msg::PublishMsg;
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
        fn request_auth_info(&mut self, _client_id: &str) -> Option<(Option<String>, Option<bytes::Bytes>)> {
            None
        }
    }

    fn state_with_predefined(topic: &str, id: u16) -> SessionState {
        let mut reg_mgr = RegMgr::default();
        reg_mgr.add_predefined(topic, id);
        SessionState::new(String::new(), reg_mgr)
    }

    #[test]
    fn qos_minus_one_without_connect_opens_a_synthetic_broker_session() {
        let mut state = state_with_predefined("sys/temp", 5);
        let mut driver = RecordingDriver::default();
        let mut op = PubSendOp::default();

        let publish = Message::Publish(PublishMsg {
            flags: Flags::builder().qos(QoSLevel::MinusOne).build(),
            topic: TopicRef::PreDefined(5),
            msg_id: 0,
            data: bytes::Bytes::from_static(b"hi"),
        });

        op.on_client_msg(&mut state, &mut driver, &publish);

        assert_eq!(driver.to_broker.len(), 3);
        assert!(matches!(driver.to_broker[0], MqttPacket::Connect(_)));
        assert!(matches!(driver.to_broker[1], MqttPacket::Publish(_)));
        assert!(matches!(driver.to_broker[2], MqttPacket::Disconnect(_)));
        assert!(state.client_id.starts_with("pub-only:"));
        assert!(!state.pub_only_client);
    }

    #[test]
    fn retry_exhaustion_on_qos1_drops_and_sends_congestion() {
        let mut state = state_with_predefined("a/b", 1);
        state.retry_count = 1;
        let mut driver = RecordingDriver::default();
        let mut op = PubSendOp::default();

        let publish = Message::Publish(PublishMsg {
            flags: Flags::builder().qos(QoSLevel::One).build(),
            topic: TopicRef::PreDefined(1),
            msg_id: 42,
            data: bytes::Bytes::from_static(b"x"),
        });
        op.on_client_msg(&mut state, &mut driver, &publish);

        op.on_tick(&mut state, &mut driver, 0);
        op.on_tick(&mut state, &mut driver, 0);

        let last = driver.to_client.last().expect("a PUBACK_SN was sent");
        match last {
            Message::PubAck(ack) => {
                assert_eq!(ack.msg_id, 42);
                assert_eq!(ack.return_code, ReturnCode::Congestion);
            }
            other => panic!("expected PubAck, got {other:?}"),
        }
    }
}

