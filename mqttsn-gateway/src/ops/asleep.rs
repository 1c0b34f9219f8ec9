use mqtt_core::qos::QosLevel;
use mqttsn_core::flags::Flags;
use mqttsn_core::msg::{PingReqMsg, PingRespMsg, PubRelMsg, PublishMsg, RegisterMsg};
use mqttsn_core::qos::QoSLevel;
use mqttsn_core::topic::{TopicIdType, TopicRef};
use mqttsn_core::Message;

use crate::driver::SessionDriver;
use crate::state::{ConnStatus, SessionState};
use crate::topic::PubInfo;

use super::{Outcome, SessionOp};

fn sn_qos(qos: QosLevel) -> QoSLevel {
    match qos {
        QosLevel::AtMostOnce => QoSLevel::Zero,
        QosLevel::AtLeastOnce => QoSLevel::One,
        QosLevel::ExactlyOnce => QoSLevel::Two,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Idle,
    AwaitingAck(u16),
}

/// Owns the sleeping-client lifecycle (4.4.3): buffering already happens in
/// [`SessionState::push_broker_pub`] from [`crate::ops::pubrecv::PubRecvOp`];
/// this op only drives the wake-up flush that a sleeping client's PINGREQ
/// triggers, delivering buffered publishes one at a time (never more than
/// one in flight) before replying with PINGRESP.
pub struct AsleepOp {
    stage: Stage,
    flushing: bool,
}

impl Default for AsleepOp {
    fn default() -> Self {
        Self {
            stage: Stage::Idle,
            flushing: false,
        }
    }
}

impl AsleepOp {
    fn flush_next(&mut self, state: &mut SessionState, driver: &mut dyn SessionDriver) {
        let Some(pub_info) = state.broker_pubs.pop_front() else {
            self.flushing = false;
            state.conn_status = ConnStatus::Connected;
            driver.send_to_client(Message::PingResp(PingRespMsg));
            return;
        };

        let (topic_id, is_new) = match state.reg_mgr.map_topic_id(&pub_info.topic) {
            Ok(pair) => pair,
            Err(_) => {
                self.flush_next(state, driver);
                return;
            }
        };

        if is_new {
            let reg_msg_id = state.next_msg_id();
            driver.send_to_client(Message::Register(RegisterMsg {
                topic_id,
                msg_id: reg_msg_id,
                topic_name: pub_info.topic.clone(),
            }));
        }

        let msg_id = state.next_msg_id();
        let flags = Flags::builder()
            .dup(pub_info.dup)
            .qos(sn_qos(pub_info.qos))
            .retain(pub_info.retain)
            .topic_id_type(TopicIdType::Normal)
            .build();

        driver.send_to_client(Message::Publish(PublishMsg {
            flags,
            topic: TopicRef::Normal(topic_id),
            msg_id,
            data: pub_info.payload,
        }));

        match pub_info.qos {
            QosLevel::AtMostOnce => self.flush_next(state, driver),
            QosLevel::AtLeastOnce | QosLevel::ExactlyOnce => {
                self.stage = Stage::AwaitingAck(msg_id);
                driver.program_tick(state.retry_period_ms);
            }
        }
    }
}

impl SessionOp for AsleepOp {
    fn on_client_msg(
        &mut self,
        state: &mut SessionState,
        driver: &mut dyn SessionDriver,
        msg: &Message,
    ) -> Outcome {
        match msg {
            Message::PingReq(PingReqMsg { client_id })
                if !client_id.is_empty() && state.conn_status == ConnStatus::Asleep =>
            {
                driver.cancel_tick();
                self.flushing = true;
                self.flush_next(state, driver);
                Outcome::Handled
            }

            Message::PubAck(ack) if self.flushing && self.stage == Stage::AwaitingAck(ack.msg_id) => {
                driver.cancel_tick();
                self.stage = Stage::Idle;
                self.flush_next(state, driver);
                Outcome::Handled
            }

            Message::PubComp(comp)
                if self.flushing && self.stage == Stage::AwaitingAck(comp.msg_id) =>
            {
                driver.cancel_tick();
                self.stage = Stage::Idle;
                self.flush_next(state, driver);
                Outcome::Handled
            }

            Message::PubRec(rec) if self.flushing && self.stage == Stage::AwaitingAck(rec.msg_id) => {
                driver.cancel_tick();
                driver.send_to_client(Message::PubRel(PubRelMsg::new(rec.msg_id)));
                driver.program_tick(state.retry_period_ms);
                Outcome::Handled
            }

            _ => Outcome::NotHandled,
        }
    }

    fn on_tick(&mut self, state: &mut SessionState, driver: &mut dyn SessionDriver, _now_ms: u64) {
        if !self.flushing {
            // The only other tick a sleeping session can have outstanding is the one
            // DISCONNECT armed for the negotiated sleep duration (4.4.3): if it fires
            // and the client never sent a wake-up PINGREQ, the session is gone.
            if state.conn_status == ConnStatus::Asleep {
                log::warn!(
                    "client '{}' did not wake before its sleep duration elapsed, terminating",
                    state.client_id
                );
                state.terminating = true;
                driver.cancel_tick();
                driver.request_terminate();
            }
            return;
        }
        log::warn!(
            "client '{}' did not ack a buffered publish during wake-up, dropping it",
            state.client_id
        );
        self.stage = Stage::Idle;
        self.flush_next(state, driver);
    }
}
