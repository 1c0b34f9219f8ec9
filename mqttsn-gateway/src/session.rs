use bytes::Bytes;

use mqtt_core::codec::v3::{FixedHeader, MqttPacket};
use mqtt_core::Decode;
use mqttsn_core::{decode_one, Message};

use crate::driver::SessionDriver;
use crate::error::GatewayError;
use crate::ops::{
    asleep::AsleepOp, connect::ConnectOp, disconnect::DisconnectOp, forward::ForwardOp,
    ping::PingOp, pubrecv::PubRecvOp, pubsend::PubSendOp, willupdate::WillUpdateOp, Outcome,
    SessionOp,
};
use crate::state::SessionState;
use crate::topic::RegMgr;

/// Composes the eight [`SessionOp`]s into one per-client state machine
/// (component C5/C6). Dispatch order is fixed and load-bearing: Connect
/// must see CONNECT-adjacent messages before anything else does (a CONNECT
/// mid-handshake is meaningless to the other ops), Disconnect and Asleep
/// must claim their messages before the publish/forward ops get a look, and
/// WillUpdate/Ping run last since nothing else cares about their frames.
pub struct Session {
    pub state: SessionState,
    connect: ConnectOp,
    disconnect: DisconnectOp,
    asleep: AsleepOp,
    pubsend: PubSendOp,
    pubrecv: PubRecvOp,
    forward: ForwardOp,
    willupdate: WillUpdateOp,
    ping: PingOp,
}

impl Session {
    pub fn new(default_client_id: String, reg_mgr: RegMgr) -> Self {
        Self {
            state: SessionState::new(default_client_id, reg_mgr),
            connect: ConnectOp::default(),
            disconnect: DisconnectOp::default(),
            asleep: AsleepOp::default(),
            pubsend: PubSendOp::default(),
            pubrecv: PubRecvOp::default(),
            forward: ForwardOp::default(),
            willupdate: WillUpdateOp::default(),
            ping: PingOp::default(),
        }
    }

    fn enter(&mut self) {
        self.state.call_stack_count += 1;
    }

    fn exit(&mut self) {
        self.state.call_stack_count = self.state.call_stack_count.saturating_sub(1);
    }

    /// Starts (or restarts) the session. Until this is called no public
    /// entry point does anything; per §6/§5's cancellation model this also
    /// re-admits a session previously shut down with [`Self::stop`].
    pub fn start(&mut self) -> bool {
        if self.state.running {
            return false;
        }
        self.state.running = true;
        true
    }

    /// Stops the session: clears any outstanding tick and marks it so every
    /// other public entry point becomes a no-op until [`Self::start`] is
    /// called again (§5's "Cancellation & timeouts").
    pub fn stop(&mut self, driver: &mut dyn SessionDriver) {
        if !self.state.running {
            return;
        }
        self.state.running = false;
        driver.cancel_tick();
    }

    /// Adds a predefined topic-id mapping (§6, §4.2's `add_predefined`).
    pub fn add_predefined_topic(&mut self, name: &str, id: u16) -> bool {
        self.state.reg_mgr.add_predefined(name, id)
    }

    /// Narrows or widens the registered-id allocation range (§6, §4.2's
    /// `set_range`).
    pub fn set_topic_id_alloc_range(&mut self, min: u16, max: u16) -> bool {
        self.state.reg_mgr.set_range(min, max)
    }

    /// Decodes one MQTT-SN frame from the client and dispatches it through
    /// the op chain in order, stopping at the first op that claims it.
    pub fn on_client_frame(
        &mut self,
        driver: &mut dyn SessionDriver,
        bytes: &Bytes,
        timestamp_ms: u64,
    ) -> Result<usize, GatewayError> {
        if !self.state.running {
            return Ok(0);
        }

        let Some((msg, consumed)) = decode_one(bytes)? else {
            return Ok(0);
        };

        self.enter();
        self.state.timestamp_ms = timestamp_ms;
        self.state.last_msg_timestamp_ms = timestamp_ms;

        let handled = self.connect.on_client_msg(&mut self.state, driver, &msg) == Outcome::Handled
            || self.disconnect.on_client_msg(&mut self.state, driver, &msg) == Outcome::Handled
            || self.asleep.on_client_msg(&mut self.state, driver, &msg) == Outcome::Handled
            || self.pubsend.on_client_msg(&mut self.state, driver, &msg) == Outcome::Handled
            || self.pubrecv.on_client_msg(&mut self.state, driver, &msg) == Outcome::Handled
            || self.forward.on_client_msg(&mut self.state, driver, &msg) == Outcome::Handled
            || self.willupdate.on_client_msg(&mut self.state, driver, &msg) == Outcome::Handled
            || self.ping.on_client_msg(&mut self.state, driver, &msg) == Outcome::Handled;

        if !handled {
            log::debug!(
                "client '{}' sent a {:?} frame no op claimed",
                self.state.client_id,
                msg.msg_type()
            );
        }

        self.exit();
        Ok(consumed)
    }

    /// Decodes one MQTT v3.1.1 packet from the broker TCP connection and
    /// dispatches it through the same op chain.
    pub fn on_broker_bytes(
        &mut self,
        driver: &mut dyn SessionDriver,
        bytes: &mut Bytes,
    ) -> Result<(), GatewayError> {
        if !self.state.running {
            return Ok(());
        }

        let f_header = FixedHeader::decode(bytes)?;
        let packet = MqttPacket::decode(f_header, bytes)?;
        self.dispatch_broker_packet(driver, &packet);
        Ok(())
    }

    fn dispatch_broker_packet(&mut self, driver: &mut dyn SessionDriver, packet: &MqttPacket) {
        self.enter();

        let handled = self.connect.on_broker_packet(&mut self.state, driver, packet)
            == Outcome::Handled
            || self.disconnect.on_broker_packet(&mut self.state, driver, packet)
                == Outcome::Handled
            || self.asleep.on_broker_packet(&mut self.state, driver, packet) == Outcome::Handled
            || self.pubsend.on_broker_packet(&mut self.state, driver, packet) == Outcome::Handled
            || self.pubrecv.on_broker_packet(&mut self.state, driver, packet) == Outcome::Handled
            || self.forward.on_broker_packet(&mut self.state, driver, packet) == Outcome::Handled
            || self
                .willupdate
                .on_broker_packet(&mut self.state, driver, packet)
                == Outcome::Handled
            || self.ping.on_broker_packet(&mut self.state, driver, packet) == Outcome::Handled;

        if !handled {
            log::debug!("broker sent a {:?} packet no op claimed", packet);
        }

        self.exit();
    }

    /// Called by the driver when the coalesced per-session timer fires.
    /// Every op gets a chance to act; unlike message dispatch this is not a
    /// first-match chain since more than one op can have something
    /// outstanding (e.g. a retry and a sleep-duration expiry). `now_ms` is
    /// the driver's current monotonic clock reading, used by ops that track
    /// an absolute deadline (e.g. the broker keepalive ping) rather than a
    /// bare retry countdown.
    pub fn on_tick(&mut self, driver: &mut dyn SessionDriver, now_ms: u64) {
        if !self.state.running {
            return;
        }

        self.enter();
        self.state.timestamp_ms = now_ms;
        self.connect.on_tick(&mut self.state, driver, now_ms);
        self.disconnect.on_tick(&mut self.state, driver, now_ms);
        self.asleep.on_tick(&mut self.state, driver, now_ms);
        self.pubsend.on_tick(&mut self.state, driver, now_ms);
        self.pubrecv.on_tick(&mut self.state, driver, now_ms);
        self.forward.on_tick(&mut self.state, driver, now_ms);
        self.willupdate.on_tick(&mut self.state, driver, now_ms);
        self.ping.on_tick(&mut self.state, driver, now_ms);
        self.exit();
    }

    /// Called by the driver on the very first successful broker TCP connect
    /// for this session, where [`crate::ops::connect::ConnectOp`] has already
    /// queued the CONNECT packet itself and no op needs to react further.
    pub fn on_broker_connected(&mut self) {
        self.state.broker_connected = true;
        self.state.reconnecting_broker = false;
    }

    /// Called by the driver once a TCP connection opened in response to an
    /// explicit [`crate::driver::SessionDriver::request_broker_reconnect`]
    /// succeeds. Unlike [`Self::on_broker_connected`], nothing may be queued
    /// yet here, so every op gets a chance to resend whatever the broker
    /// needs as the first packet on the new connection (only
    /// [`crate::ops::connect::ConnectOp`] currently does).
    pub fn on_broker_reconnected(&mut self, driver: &mut dyn SessionDriver) {
        self.enter();
        self.connect.on_broker_connected(&mut self.state, driver);
        self.disconnect.on_broker_connected(&mut self.state, driver);
        self.asleep.on_broker_connected(&mut self.state, driver);
        self.pubsend.on_broker_connected(&mut self.state, driver);
        self.pubrecv.on_broker_connected(&mut self.state, driver);
        self.forward.on_broker_connected(&mut self.state, driver);
        self.willupdate.on_broker_connected(&mut self.state, driver);
        self.ping.on_broker_connected(&mut self.state, driver);
        self.exit();
    }

    pub fn is_terminating(&self) -> bool {
        self.state.terminating
    }
}

#[cfg(test)]
mod session {
    use super::*;
    use crate::driver::SessionDriver as _;
    use mqttsn_core::codec::Encode;
    use mqttsn_core::flags::Flags;
    use mqttsn_core::msg::ConnectMsg;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct RecordingDriver {
        to_client: Vec<Message>,
        to_broker: Vec<MqttPacket>,
        ticks: VecDeque<u32>,
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
        fn cancel_tick(&mut self) {}
        fn request_terminate(&mut self) {
            self.terminated = true;
        }
        fn request_broker_reconnect(&mut self) {}
        fn report_client_connected(&mut self, _client_id: &str) {}
        fn request_auth_info(&mut self, _client_id: &str) -> Option<(Option<String>, Option<Bytes>)> {
            None
        }
    }

    #[test]
    fn connect_without_will_goes_straight_to_broker() {
        let mut session = Session::new(String::from("default"), RegMgr::default());
        let mut driver = RecordingDriver::default();

        let connect = Message::Connect(ConnectMsg {
            flags: Flags::builder().clean_session(true).build(),
            protocol_id: mqttsn_core::msg::PROTOCOL_ID,
            duration_s: 30,
            client_id: String::from("c1"),
        });
        let bytes = connect.encode().expect("frame encodes");

        session
            .on_client_frame(&mut driver, &bytes, 0)
            .expect("decode succeeds");

        assert_eq!(driver.to_broker.len(), 1);
        assert!(matches!(driver.to_broker[0], MqttPacket::Connect(_)));
    }
}
