use bytes::Bytes;

use mqtt_core::codec::v3::{ConnectPacket, MqttPacket, Will as BrokerWill};
use mqtt_core::qos::QosLevel;
use mqtt_core::topic::TopicName;
use mqttsn_core::msg::{
    ConnAckMsg, ConnectMsg, WillMsgMsg, WillMsgReqMsg, WillTopicMsg, WillTopicReqMsg,
};
use mqttsn_core::return_code::ReturnCode;
use mqttsn_core::Message;

use crate::driver::SessionDriver;
use crate::state::{ConnStatus, SessionState};
use crate::topic::WillInfo;

use super::{Outcome, SessionOp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Idle,
    AwaitingWillTopic,
    AwaitingWillMsg,
    AwaitingBrokerConnAck,
}

#[derive(Clone)]
struct Pending {
    clean_session: bool,
    keep_alive_s: u16,
    client_id: String,
    /// `true` when this CONNECT is being resent transparently after a
    /// driver-level broker reconnect (4.4.1 retry exhaustion, 4.4.7, 4.4.8)
    /// rather than because the client itself sent a CONNECT_SN. The client
    /// already has whatever CONNACK_SN it is going to get for this session;
    /// a resumed CONNECT must not generate a second one.
    resuming: bool,
}

/// The client id and clean-session flag of the last CONNECT the broker
/// actually accepted, kept around so a broker reconnect outside of the
/// CONNECT handshake (4.4.7's will update, 4.4.8's missed-ping recovery)
/// can rebuild an equivalent CONNECT without replaying the MQTT-SN
/// handshake with the client.
#[derive(Clone)]
struct Established {
    clean_session: bool,
    client_id: String,
}

/// Drives CONNECT end to end (4.4.1): the optional WILLTOPIC/WILLMSG
/// handshake, the broker TCP CONNECT, and the CONNACK_SN reply. Runs first
/// in the session's dispatch chain so nothing else observes a session
/// mid-handshake.
pub struct ConnectOp {
    stage: Stage,
    pending: Option<Pending>,
    established: Option<Established>,
    retries_left: u32,
}

impl Default for ConnectOp {
    fn default() -> Self {
        Self {
            stage: Stage::Idle,
            pending: None,
            established: None,
            retries_left: 0,
        }
    }
}

impl ConnectOp {
    fn fail_and_reset(&mut self, state: &mut SessionState, driver: &mut dyn SessionDriver) {
        let resuming = self.pending.as_ref().is_some_and(|p| p.resuming);
        if resuming {
            log::warn!(
                "client '{}' broker reconnect never got a CONNACK, giving up",
                state.client_id
            );
        } else {
            driver.send_to_client(Message::ConnAck(ConnAckMsg::new(ReturnCode::Congestion)));
        }
        self.stage = Stage::Idle;
        self.pending = None;
        state.conn_status = ConnStatus::Disconnected;
        state.broker_connected = false;
        state.reconnecting_broker = false;
        driver.cancel_tick();
    }

    fn send_broker_connect(&mut self, state: &mut SessionState, driver: &mut dyn SessionDriver) {
        let Some(pending) = &self.pending else { return };

        let will = state.will.as_ref().map(|w| {
            BrokerWill::new(
                TopicName::from_str(&w.topic).unwrap_or_else(|_| {
                    TopicName::from_str("will").expect("static literal is a valid topic name")
                }),
                String::from_utf8_lossy(&w.msg).into_owned(),
                w.qos,
                w.retain,
            )
        });

        let auth = driver.request_auth_info(&pending.client_id);
        let (username, password) = match (&state.username, &state.password) {
            (Some(u), p) => (Some(u.clone()), p.clone()),
            (None, _) => auth.unwrap_or((None, None)),
        };

        // MQTT-SN 1.2 §4.4.1 step 3: pad the broker-facing keepalive so the gateway's
        // own ping cadence tolerates jitter without the broker timing the link out first.
        let broker_keep_alive = (u32::from(pending.keep_alive_s) + u32::from(pending.keep_alive_s) / 2)
            .min(u32::from(u16::MAX)) as u16;

        let packet = ConnectPacket::new(
            pending.clean_session,
            broker_keep_alive,
            pending.client_id.clone(),
            will,
            username,
            password,
        );

        driver.send_to_broker(MqttPacket::Connect(packet));
        self.stage = Stage::AwaitingBrokerConnAck;
        self.retries_left = state.retry_count;
        driver.program_tick(state.retry_period_ms);
    }
}

impl SessionOp for ConnectOp {
    fn on_client_msg(
        &mut self,
        state: &mut SessionState,
        driver: &mut dyn SessionDriver,
        msg: &Message,
    ) -> Outcome {
        match msg {
            Message::Connect(ConnectMsg {
                flags,
                protocol_id,
                duration_s,
                client_id,
            }) => {
                if *protocol_id != mqttsn_core::msg::PROTOCOL_ID {
                    driver.send_to_client(Message::ConnAck(ConnAckMsg::new(
                        ReturnCode::NotSupported,
                    )));
                    return Outcome::Handled;
                }

                let client_id = if client_id.is_empty() {
                    state.default_client_id.clone()
                } else {
                    client_id.clone()
                };

                state.client_id = client_id.clone();
                state.keep_alive_s = *duration_s;
                state.will = None;

                self.pending = Some(Pending {
                    clean_session: flags.clean_session(),
                    keep_alive_s: *duration_s,
                    client_id,
                    resuming: false,
                });

                if flags.will() {
                    self.stage = Stage::AwaitingWillTopic;
                    self.retries_left = state.retry_count;
                    driver.send_to_client(Message::WillTopicReq(WillTopicReqMsg));
                    driver.program_tick(state.retry_period_ms);
                } else {
                    self.send_broker_connect(state, driver);
                }
                Outcome::Handled
            }

            Message::WillTopic(WillTopicMsg::Some { flags, topic })
                if self.stage == Stage::AwaitingWillTopic =>
            {
                driver.cancel_tick();
                let sn_qos = flags.qos().unwrap_or(mqttsn_core::qos::QoSLevel::Zero);
                let qos = QosLevel::try_from(u8::from(sn_qos)).unwrap_or(QosLevel::AtMostOnce);
                state.will = Some(WillInfo {
                    topic: topic.clone(),
                    msg: Bytes::new(),
                    qos,
                    retain: flags.retain(),
                });
                self.stage = Stage::AwaitingWillMsg;
                self.retries_left = state.retry_count;
                driver.send_to_client(Message::WillMsgReq(WillMsgReqMsg));
                driver.program_tick(state.retry_period_ms);
                Outcome::Handled
            }

            Message::WillTopic(WillTopicMsg::None) if self.stage == Stage::AwaitingWillTopic => {
                state.will = None;
                self.send_broker_connect(state, driver);
                Outcome::Handled
            }

            Message::WillMsg(WillMsgMsg { message })
                if self.stage == Stage::AwaitingWillMsg =>
            {
                if let Some(will) = &mut state.will {
                    will.msg = message.clone();
                }
                self.send_broker_connect(state, driver);
                Outcome::Handled
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
            MqttPacket::ConnAck(ack) if self.stage == Stage::AwaitingBrokerConnAck => {
                driver.cancel_tick();
                let resuming = self.pending.as_ref().is_some_and(|p| p.resuming);
                if ack.return_code() == mqtt_core::ConnectReturnCode::Accept {
                    state.conn_status = ConnStatus::Connected;
                    state.broker_connected = true;
                    state.reconnecting_broker = false;
                    if let Some(pending) = &self.pending {
                        self.established = Some(Established {
                            clean_session: pending.clean_session,
                            client_id: pending.client_id.clone(),
                        });
                    }
                    if !state.client_connect_reported {
                        driver.report_client_connected(&state.client_id);
                        state.client_connect_reported = true;
                    }
                    if !resuming {
                        driver.send_to_client(Message::ConnAck(ConnAckMsg::new(ReturnCode::Accepted)));
                    }
                    // Seeds the shared tick so PingOp's broker keepalive (4.4.8) can
                    // arm itself on the next firing; it re-programs on its own after that.
                    if state.keep_alive_s > 0 {
                        driver.program_tick(1);
                    }
                } else if resuming {
                    // A transparent reconnect that the broker itself refuses is reported
                    // the same way any other broker-link loss is, not as a fresh CONNACK_SN
                    // failure to a client that never asked to reconnect.
                    log::warn!(
                        "client '{}' broker reconnect was refused: {:?}",
                        state.client_id,
                        ack.return_code()
                    );
                    state.broker_connected = false;
                    state.reconnecting_broker = false;
                } else {
                    // Broker-side CONNACK failures map per the error taxonomy (§7): MQTT-SN has
                    // no code finer than NotSupported for an authorization refusal, and anything
                    // else is reported as transient congestion rather than a hard rejection.
                    let mapped = match ack.return_code() {
                        mqtt_core::ConnectReturnCode::NotAuthorized
                        | mqtt_core::ConnectReturnCode::BadUsernameOrPassword => {
                            ReturnCode::NotSupported
                        }
                        _ => ReturnCode::Congestion,
                    };
                    driver.send_to_client(Message::ConnAck(ConnAckMsg::new(mapped)));
                }
                self.stage = Stage::Idle;
                self.pending = None;
                Outcome::Handled
            }
            _ => Outcome::NotHandled,
        }
    }

    fn on_tick(&mut self, state: &mut SessionState, driver: &mut dyn SessionDriver, _now_ms: u64) {
        match self.stage {
            Stage::AwaitingBrokerConnAck => {
                if self.retries_left == 0 {
                    self.fail_and_reset(state, driver);
                    return;
                }
                self.retries_left -= 1;
                state.broker_connected = false;
                state.reconnecting_broker = true;
                driver.request_broker_reconnect();
                driver.program_tick(state.retry_period_ms);
            }
            Stage::AwaitingWillTopic => {
                if self.retries_left == 0 {
                    self.fail_and_reset(state, driver);
                    return;
                }
                self.retries_left -= 1;
                driver.send_to_client(Message::WillTopicReq(WillTopicReqMsg));
                driver.program_tick(state.retry_period_ms);
            }
            Stage::AwaitingWillMsg => {
                if self.retries_left == 0 {
                    self.fail_and_reset(state, driver);
                    return;
                }
                self.retries_left -= 1;
                driver.send_to_client(Message::WillMsgReq(WillMsgReqMsg));
                driver.program_tick(state.retry_period_ms);
            }
            Stage::Idle => {}
        }
    }

    fn on_broker_connected(&mut self, state: &mut SessionState, driver: &mut dyn SessionDriver) {
        match self.stage {
            // The broker dropped mid-handshake retry; the client is still waiting on its
            // original CONNACK_SN, so just resend the same CONNECT under the same pending.
            Stage::AwaitingBrokerConnAck => {
                self.send_broker_connect(state, driver);
            }
            // A reconnect requested outside of the handshake (4.4.7 will update, 4.4.8
            // missed pings) on an already-established session: rebuild the CONNECT from
            // the last accepted identity and resend it without touching the client.
            Stage::Idle => {
                if let Some(established) = self.established.clone() {
                    self.pending = Some(Pending {
                        clean_session: established.clean_session,
                        keep_alive_s: state.keep_alive_s,
                        client_id: established.client_id,
                        resuming: true,
                    });
                    self.send_broker_connect(state, driver);
                }
            }
            _ => {}
        }
    }
}
