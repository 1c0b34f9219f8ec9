use mqtt_core::codec::v3::{MqttPacket, PingReqPacket};
use mqttsn_core::msg::{PingReqMsg, PingRespMsg};
use mqttsn_core::Message;

use crate::driver::SessionDriver;
use crate::state::{ConnStatus, SessionState};

use super::{Outcome, SessionOp};

/// How far below `keepAlive_s` the gateway pings the broker on the
/// connected client's behalf (4.4.8): ping at 0.9x so a dead broker is
/// caught before the client's own keepalive would have expired.
const KEEPALIVE_FRACTION_MILLIS: u64 = 900;

const MAX_MISSED_PINGS: u32 = 2;

/// PINGREQ/PINGRESP in both directions, plus the gateway's own keepalive
/// ping to the broker while a client is connected (4.4.8). A client
/// PINGREQ carrying a non-empty `clientId` is the sleeping-client wake-up
/// signal and is left for [`crate::ops::asleep::AsleepOp`], which runs
/// before this op in the session's dispatch chain.
///
/// The broker-side ping is armed once [`crate::ops::connect::ConnectOp`]
/// programs the first tick after a successful CONNACK and then keeps
/// itself alive: each firing either sends the next PINGREQ or, finding
/// one already outstanding, counts a miss. Two consecutive misses trigger
/// a broker reconnect.
pub struct PingOp {
    due_ms: u64,
    awaiting_pong: bool,
    missed: u32,
}

impl Default for PingOp {
    fn default() -> Self {
        Self {
            due_ms: 0,
            awaiting_pong: false,
            missed: 0,
        }
    }
}

impl PingOp {
    fn interval_ms(state: &SessionState) -> Option<u64> {
        if state.keep_alive_s == 0 {
            return None;
        }
        Some((u64::from(state.keep_alive_s) * 1000 * KEEPALIVE_FRACTION_MILLIS) / 1000)
    }

    fn arm(&mut self, state: &SessionState, driver: &mut dyn SessionDriver, now_ms: u64, interval_ms: u64) {
        self.due_ms = now_ms + interval_ms;
        driver.program_tick(interval_ms.min(u32::MAX as u64) as u32);
        let _ = state;
    }
}

impl SessionOp for PingOp {
    fn on_client_msg(
        &mut self,
        state: &mut SessionState,
        driver: &mut dyn SessionDriver,
        msg: &Message,
    ) -> Outcome {
        let Message::PingReq(PingReqMsg { client_id }) = msg else {
            return Outcome::NotHandled;
        };
        if !client_id.is_empty() && state.conn_status == ConnStatus::Asleep {
            return Outcome::NotHandled;
        }

        if state.broker_connected {
            driver.send_to_broker(MqttPacket::PingReq(PingReqPacket::new()));
        }
        driver.send_to_client(Message::PingResp(PingRespMsg));
        Outcome::Handled
    }

    fn on_broker_packet(
        &mut self,
        _state: &mut SessionState,
        _driver: &mut dyn SessionDriver,
        packet: &MqttPacket,
    ) -> Outcome {
        match packet {
            MqttPacket::PingResp(_) => {
                self.awaiting_pong = false;
                self.missed = 0;
                Outcome::Handled
            }
            _ => Outcome::NotHandled,
        }
    }

    fn on_tick(&mut self, state: &mut SessionState, driver: &mut dyn SessionDriver, now_ms: u64) {
        if state.conn_status != ConnStatus::Connected || !state.broker_connected {
            self.due_ms = 0;
            self.awaiting_pong = false;
            self.missed = 0;
            return;
        }

        let Some(interval_ms) = Self::interval_ms(state) else {
            return;
        };

        if self.due_ms == 0 {
            self.arm(state, driver, now_ms, interval_ms);
            return;
        }

        if now_ms < self.due_ms {
            return;
        }

        if self.awaiting_pong {
            self.missed += 1;
            if self.missed >= MAX_MISSED_PINGS {
                log::warn!(
                    "client '{}' broker connection missed {} consecutive PINGRESPs, reconnecting",
                    state.client_id,
                    self.missed
                );
                state.broker_connected = false;
                state.reconnecting_broker = true;
                driver.request_broker_reconnect();
                self.missed = 0;
                self.awaiting_pong = false;
                self.due_ms = 0;
                return;
            }
        }

        driver.send_to_broker(MqttPacket::PingReq(PingReqPacket::new()));
        self.awaiting_pong = true;
        self.arm(state, driver, now_ms, interval_ms);
    }
}

#[cfg(test)]
mod ping {
    use super::*;
    use bytes::Bytes;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct RecordingDriver {
        to_client: Vec<Message>,
        to_broker: Vec<MqttPacket>,
        ticks: VecDeque<u32>,
        reconnects: u32,
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
        fn request_broker_reconnect(&mut self) {
            self.reconnects += 1;
        }
        fn report_client_connected(&mut self, _client_id: &str) {}
        fn request_auth_info(&mut self, _client_id: &str) -> Option<(Option<String>, Option<Bytes>)> {
            None
        }
    }

    fn connected_state() -> SessionState {
        let mut state = SessionState::new(String::from("c1"), crate::topic::RegMgr::default());
        state.conn_status = ConnStatus::Connected;
        state.broker_connected = true;
        state.keep_alive_s = 10;
        state
    }

    #[test]
    fn arms_itself_then_pings_once_due() {
        let mut state = connected_state();
        let mut driver = RecordingDriver::default();
        let mut op = PingOp::default();

        op.on_tick(&mut state, &mut driver, 0);
        assert!(driver.to_broker.is_empty());
        assert_eq!(op.due_ms, 9000);

        op.on_tick(&mut state, &mut driver, 9000);
        assert_eq!(driver.to_broker.len(), 1);
        assert!(op.awaiting_pong);
    }

    #[test]
    fn two_missed_pongs_trigger_reconnect() {
        let mut state = connected_state();
        let mut driver = RecordingDriver::default();
        let mut op = PingOp::default();

        op.on_tick(&mut state, &mut driver, 0);
        op.on_tick(&mut state, &mut driver, 9000);
        op.on_tick(&mut state, &mut driver, 18000);
        assert_eq!(op.missed, 1);
        op.on_tick(&mut state, &mut driver, 27000);

        assert_eq!(driver.reconnects, 1);
        assert_eq!(op.missed, 0);
    }

    #[test]
    fn broker_pong_resets_the_miss_counter() {
        let mut state = connected_state();
        let mut driver = RecordingDriver::default();
        let mut op = PingOp::default();

        op.on_tick(&mut state, &mut driver, 0);
        op.on_tick(&mut state, &mut driver, 9000);
        assert!(op.awaiting_pong);

        op.on_broker_packet(
            &mut state,
            &mut driver,
            &MqttPacket::PingResp(mqtt_core::codec::v3::PingRespPacket::new()),
        );
        assert!(!op.awaiting_pong);
        assert_eq!(op.missed, 0);
    }
}
