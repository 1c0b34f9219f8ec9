use mqtt_core::codec::v3::{DisconnectPacket, MqttPacket};
use mqttsn_core::msg::DisconnectMsg;
use mqttsn_core::Message;

use crate::driver::SessionDriver;
use crate::state::{ConnStatus, SessionState};

use super::{Outcome, SessionOp};

/// Handles the client-initiated DISCONNECT (4.4.2). A bare DISCONNECT tears
/// the session down; a DISCONNECT carrying a duration instead transitions
/// the session to [`ConnStatus::Asleep`] and leaves buffering/wake-up to
/// [`crate::ops::asleep::AsleepOp`].
#[derive(Default)]
pub struct DisconnectOp;

impl SessionOp for DisconnectOp {
    fn on_client_msg(
        &mut self,
        state: &mut SessionState,
        driver: &mut dyn SessionDriver,
        msg: &Message,
    ) -> Outcome {
        let Message::Disconnect(disconnect) = msg else {
            return Outcome::NotHandled;
        };

        match disconnect.duration_s {
            Some(duration_s) => {
                state.conn_status = ConnStatus::Asleep;
                state.keep_alive_s = duration_s;
                driver.send_to_client(Message::Disconnect(DisconnectMsg::sleep(duration_s)));
                let grace_ms = (u32::from(duration_s) * 1000 * 11) / 10;
                driver.program_tick(grace_ms);
            }
            None => {
                state.conn_status = ConnStatus::Disconnected;
                state.pending_client_disconnect = true;
                if state.broker_connected {
                    driver.send_to_broker(MqttPacket::Disconnect(DisconnectPacket::new()));
                }
                driver.send_to_client(Message::Disconnect(DisconnectMsg::final_disconnect()));
                state.terminating = true;
                driver.cancel_tick();
                driver.request_terminate();
            }
        }

        Outcome::Handled
    }
}
