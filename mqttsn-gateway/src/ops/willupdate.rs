use mqtt_core::qos::QosLevel;
use mqttsn_core::msg::{WillMsgRespMsg, WillMsgUpdMsg, WillTopicRespMsg, WillTopicUpdMsg};
use mqttsn_core::return_code::ReturnCode;
use mqttsn_core::Message;

use crate::driver::SessionDriver;
use crate::state::SessionState;
use crate::topic::WillInfo;

use super::{Outcome, SessionOp};

/// Handles WILLTOPICUPD/WILLMSGUPD (4.4.7). Changes land in `state.will`
/// immediately, acked to the client right away, and if a broker
/// connection is already up a reconnect is requested so the new will
/// reaches the broker on the next CONNECT (MQTT has no in-band way to
/// update a will on a live connection). `WillUpdateOp` never touches
/// [`crate::ops::pubsend::PubSendOp`]/[`crate::ops::pubrecv::PubRecvOp`]
/// state directly.
#[derive(Default)]
pub struct WillUpdateOp;

impl SessionOp for WillUpdateOp {
    fn on_client_msg(
        &mut self,
        state: &mut SessionState,
        driver: &mut dyn SessionDriver,
        msg: &Message,
    ) -> Outcome {
        match msg {
            Message::WillTopicUpd(WillTopicUpdMsg::Delete) => {
                state.will = None;
                driver.send_to_client(Message::WillTopicResp(WillTopicRespMsg::new(
                    ReturnCode::Accepted,
                )));
                Outcome::Handled
            }

            Message::WillTopicUpd(WillTopicUpdMsg::Some { flags, topic }) => {
                let sn_qos = flags.qos().unwrap_or(mqttsn_core::qos::QoSLevel::Zero);
                let qos = QosLevel::try_from(u8::from(sn_qos)).unwrap_or(QosLevel::AtMostOnce);
                let existing_msg = state.will.as_ref().map(|w| w.msg.clone()).unwrap_or_default();
                state.will = Some(WillInfo {
                    topic: topic.clone(),
                    msg: existing_msg,
                    qos,
                    retain: flags.retain(),
                });
                driver.send_to_client(Message::WillTopicResp(WillTopicRespMsg::new(
                    ReturnCode::Accepted,
                )));
                if state.broker_connected {
                    state.broker_connected = false;
                    state.reconnecting_broker = true;
                    driver.request_broker_reconnect();
                }
                Outcome::Handled
            }

            Message::WillMsgUpd(WillMsgUpdMsg { message }) => {
                match &mut state.will {
                    Some(will) => {
                        will.msg = message.clone();
                        driver.send_to_client(Message::WillMsgResp(WillMsgRespMsg::new(
                            ReturnCode::Accepted,
                        )));
                        if state.broker_connected {
                            state.broker_connected = false;
                            state.reconnecting_broker = true;
                            driver.request_broker_reconnect();
                        }
                    }
                    None => {
                        driver.send_to_client(Message::WillMsgResp(WillMsgRespMsg::new(
                            ReturnCode::NotSupported,
                        )));
                    }
                }
                Outcome::Handled
            }

            _ => Outcome::NotHandled,
        }
    }
}

