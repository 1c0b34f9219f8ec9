use mqtt_core::codec::v3::{MqttPacket, SubscribePacket, UnsubscribePacket};
use mqtt_core::qos::{QosLevel, SubAckQoS};
use mqtt_core::topic::TopicFilter;
use mqttsn_core::msg::{SubAckMsg, UnsubAckMsg};
use mqttsn_core::qos::QoSLevel;
use mqttsn_core::return_code::ReturnCode;
use mqttsn_core::topic::TopicSelector;
use mqttsn_core::Message;

use crate::driver::SessionDriver;
use crate::state::SessionState;

use super::{Outcome, SessionOp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Idle,
    AwaitingSubAck(u16, u16),
    AwaitingUnsubAck(u16),
}

/// What's needed to resend a SUBSCRIBE on retry, kept alongside `Stage`
/// instead of folded into it since `Stage` is `Copy` and this isn't.
#[derive(Clone)]
struct PendingSub {
    topic_name: String,
    qos: QosLevel,
}

/// Same idea as [`PendingSub`] for UNSUBSCRIBE.
#[derive(Clone)]
struct PendingUnsub {
    topic_name: String,
}

fn to_core_qos(qos: QoSLevel) -> QosLevel {
    match qos {
        QoSLevel::Zero | QoSLevel::MinusOne => QosLevel::AtMostOnce,
        QoSLevel::One => QosLevel::AtLeastOnce,
        QoSLevel::Two => QosLevel::ExactlyOnce,
    }
}

fn to_sn_qos(qos: QosLevel) -> QoSLevel {
    match qos {
        QosLevel::AtMostOnce => QoSLevel::Zero,
        QosLevel::AtLeastOnce => QoSLevel::One,
        QosLevel::ExactlyOnce => QoSLevel::Two,
    }
}

/// Forwards SUBSCRIBE_SN/UNSUBSCRIBE_SN onto the broker's MQTT connection
/// and relays the SUBACK/UNSUBACK back, translating topic ids to names and
/// back (4.4.6). The MQTT-SN `msgId` doubles as the MQTT packet id; the
/// gateway never needs a second id space for this exchange since at most
/// one (un)subscribe is ever in flight per session.
pub struct ForwardOp {
    stage: Stage,
    retries_left: u32,
    pending_sub: Option<PendingSub>,
    pending_unsub: Option<PendingUnsub>,
}

impl Default for ForwardOp {
    fn default() -> Self {
        Self {
            stage: Stage::Idle,
            retries_left: 0,
            pending_sub: None,
            pending_unsub: None,
        }
    }
}

impl SessionOp for ForwardOp {
    fn on_client_msg(
        &mut self,
        state: &mut SessionState,
        driver: &mut dyn SessionDriver,
        msg: &Message,
    ) -> Outcome {
        match msg {
            Message::Subscribe(sub) if self.stage == Stage::Idle => {
                let topic_name = match &sub.topic {
                    TopicSelector::Name(name) => name.clone(),
                    TopicSelector::Ref(topic_ref) => {
                        let resolved = match topic_ref {
                            mqttsn_core::topic::TopicRef::Normal(id) => {
                                state.reg_mgr.map_topic_name(*id)
                            }
                            mqttsn_core::topic::TopicRef::PreDefined(id) => state
                                .reg_mgr
                                .map_topic_name_by_kind(*id, crate::topic::TopicKind::Predefined),
                            mqttsn_core::topic::TopicRef::ShortName(_) => None,
                        };
                        match resolved {
                            Some(name) => name.to_string(),
                            None => {
                                driver.send_to_client(Message::SubAck(SubAckMsg {
                                    flags: mqttsn_core::flags::Flags::builder().build(),
                                    topic_id: 0,
                                    msg_id: sub.msg_id,
                                    return_code: ReturnCode::InvalidTopicId,
                                }));
                                return Outcome::Handled;
                            }
                        }
                    }
                };

                let Ok(filter) = TopicFilter::from_str(&topic_name) else {
                    driver.send_to_client(Message::SubAck(SubAckMsg {
                        flags: mqttsn_core::flags::Flags::builder().build(),
                        topic_id: 0,
                        msg_id: sub.msg_id,
                        return_code: ReturnCode::NotSupported,
                    }));
                    return Outcome::Handled;
                };

                let qos = sub.flags.qos().unwrap_or(QoSLevel::Zero);
                let core_qos = to_core_qos(qos);
                let packet = SubscribePacket::new(sub.msg_id, vec![(filter, core_qos)]);
                driver.send_to_broker(MqttPacket::Subscribe(packet));

                let (topic_id, _) = state
                    .reg_mgr
                    .map_topic_id(&topic_name)
                    .unwrap_or((0, false));
                self.stage = Stage::AwaitingSubAck(sub.msg_id, topic_id);
                self.pending_sub = Some(PendingSub {
                    topic_name,
                    qos: core_qos,
                });
                self.retries_left = state.retry_count;
                driver.program_tick(state.retry_period_ms);
                Outcome::Handled
            }

            Message::Unsubscribe(unsub) if self.stage == Stage::Idle => {
                let topic_name = match &unsub.topic {
                    TopicSelector::Name(name) => name.clone(),
                    TopicSelector::Ref(mqttsn_core::topic::TopicRef::Normal(id)) => state
                        .reg_mgr
                        .map_topic_name(*id)
                        .map(String::from)
                        .unwrap_or_default(),
                    TopicSelector::Ref(mqttsn_core::topic::TopicRef::PreDefined(id)) => state
                        .reg_mgr
                        .map_topic_name_by_kind(*id, crate::topic::TopicKind::Predefined)
                        .map(String::from)
                        .unwrap_or_default(),
                    TopicSelector::Ref(mqttsn_core::topic::TopicRef::ShortName(short)) => {
                        String::from_utf8_lossy(short).into_owned()
                    }
                };

                let Ok(filter) = TopicFilter::from_str(&topic_name) else {
                    driver.send_to_client(Message::UnsubAck(UnsubAckMsg::new(unsub.msg_id)));
                    return Outcome::Handled;
                };

                let packet = UnsubscribePacket::new(unsub.msg_id, vec![filter]);
                driver.send_to_broker(MqttPacket::Unsubscribe(packet));
                self.stage = Stage::AwaitingUnsubAck(unsub.msg_id);
                self.pending_unsub = Some(PendingUnsub { topic_name });
                self.retries_left = state.retry_count;
                driver.program_tick(state.retry_period_ms);
                Outcome::Handled
            }

            _ => Outcome::NotHandled,
        }
    }

    fn on_broker_packet(
        &mut self,
        _state: &mut SessionState,
        driver: &mut dyn SessionDriver,
        packet: &MqttPacket,
    ) -> Outcome {
        match packet {
            MqttPacket::SubAck(ack) if matches!(self.stage, Stage::AwaitingSubAck(id, _) if id == ack.id()) =>
            {
                driver.cancel_tick();
                let Stage::AwaitingSubAck(_, topic_id) = self.stage else {
                    unreachable!()
                };
                let granted = ack
                    .filters()
                    .first()
                    .copied()
                    .unwrap_or(SubAckQoS::Err);
                let (qos, return_code) = match granted {
                    SubAckQoS::QOS(qos) => (to_sn_qos(qos), ReturnCode::Accepted),
                    SubAckQoS::Err => (QoSLevel::Zero, ReturnCode::NotSupported),
                };
                driver.send_to_client(Message::SubAck(SubAckMsg {
                    flags: mqttsn_core::flags::Flags::builder().qos(qos).build(),
                    topic_id,
                    msg_id: ack.id(),
                    return_code,
                }));
                self.stage = Stage::Idle;
                self.pending_sub = None;
                Outcome::Handled
            }

            MqttPacket::UnsubAck(ack) if self.stage == Stage::AwaitingUnsubAck(ack.id()) => {
                driver.cancel_tick();
                driver.send_to_client(Message::UnsubAck(UnsubAckMsg::new(ack.id())));
                self.stage = Stage::Idle;
                self.pending_unsub = None;
                Outcome::Handled
            }

            _ => Outcome::NotHandled,
        }
    }

    fn on_tick(&mut self, state: &mut SessionState, driver: &mut dyn SessionDriver, _now_ms: u64) {
        match self.stage {
            Stage::Idle => {}

            Stage::AwaitingSubAck(msg_id, _) => {
                if self.retries_left == 0 {
                    log::warn!(
                        "client '{}' SUBSCRIBE to broker timed out, giving up",
                        state.client_id
                    );
                    driver.send_to_client(Message::SubAck(SubAckMsg {
                        flags: mqttsn_core::flags::Flags::builder().build(),
                        topic_id: 0,
                        msg_id,
                        return_code: ReturnCode::Congestion,
                    }));
                    self.stage = Stage::Idle;
                    self.pending_sub = None;
                    driver.cancel_tick();
                    return;
                }
                if let Some(pending) = &self.pending_sub {
                    if let Ok(filter) = TopicFilter::from_str(&pending.topic_name) {
                        let packet = SubscribePacket::new(msg_id, vec![(filter, pending.qos)]);
                        driver.send_to_broker(MqttPacket::Subscribe(packet));
                    }
                }
                self.retries_left -= 1;
                driver.program_tick(state.retry_period_ms);
            }

            Stage::AwaitingUnsubAck(msg_id) => {
                if self.retries_left == 0 {
                    log::warn!(
                        "client '{}' UNSUBSCRIBE to broker timed out, giving up",
                        state.client_id
                    );
                    driver.send_to_client(Message::UnsubAck(UnsubAckMsg::new(msg_id)));
                    self.stage = Stage::Idle;
                    self.pending_unsub = None;
                    driver.cancel_tick();
                    return;
                }
                if let Some(pending) = &self.pending_unsub {
                    if let Ok(filter) = TopicFilter::from_str(&pending.topic_name) {
                        let packet = UnsubscribePacket::new(msg_id, vec![filter]);
                        driver.send_to_broker(MqttPacket::Unsubscribe(packet));
                    }
                }
                self.retries_left -= 1;
                driver.program_tick(state.retry_period_ms);
            }
        }
    }
}
