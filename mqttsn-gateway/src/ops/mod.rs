pub mod asleep;
pub mod connect;
pub mod disconnect;
pub mod forward;
pub mod ping;
pub mod pubrecv;
pub mod pubsend;
pub mod willupdate;

use mqtt_core::codec::v3::MqttPacket;
use mqttsn_core::Message;

use crate::driver::SessionDriver;
use crate::state::SessionState;

/// What a [`SessionOp`] did with an event it was offered.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The op fully handled the event; no other op in the chain sees it.
    Handled,
    /// The op has no interest in this event; try the next op.
    NotHandled,
}

/// One of the closed set of operations [`crate::session::Session`] dispatches
/// events through, in a fixed order (4.3/4.4). Ops share `SessionState`
/// directly rather than each owning a private slice of it, the same way the
/// donor broker keeps one `ActiveSession` struct instead of per-feature
/// actors.
pub trait SessionOp {
    fn on_client_msg(
        &mut self,
        _state: &mut SessionState,
        _driver: &mut dyn SessionDriver,
        _msg: &Message,
    ) -> Outcome {
        Outcome::NotHandled
    }

    fn on_broker_packet(
        &mut self,
        _state: &mut SessionState,
        _driver: &mut dyn SessionDriver,
        _packet: &MqttPacket,
    ) -> Outcome {
        Outcome::NotHandled
    }

    /// Called whenever the session's single coalesced timer fires, with the
    /// driver's current monotonic clock reading. Ops with nothing
    /// outstanding should simply return without reprogramming; ops that
    /// track an absolute deadline (rather than a bare retry countdown) need
    /// `now_ms` to tell whether it is actually their turn.
    fn on_tick(&mut self, _state: &mut SessionState, _driver: &mut dyn SessionDriver, _now_ms: u64) {}

    /// Called after the driver has re-established the broker TCP connection
    /// following a `request_broker_reconnect()` call (4.4.1 retry
    /// exhaustion, 4.4.7's transparent reconnect, 4.4.8's missed-ping
    /// reconnect). Only [`crate::ops::connect::ConnectOp`] implements this:
    /// it is the only op that owns enough state (the client id, clean
    /// session flag and current will) to rebuild and resend the MQTT
    /// CONNECT that must be the first packet on any new connection.
    fn on_broker_connected(&mut self, _state: &mut SessionState, _driver: &mut dyn SessionDriver) {}
}
