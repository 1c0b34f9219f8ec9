use std::sync::Arc;

use bytes::Bytes;

use mqtt_core::codec::v3::MqttPacket;
use mqttsn_core::Message;

use mqttsn_gateway::config::GatewayConfig;
use mqttsn_gateway::driver::{GatewayDriver, SessionDriver};

/// What a [`Session`](mqttsn_gateway::Session) or
/// [`Gateway`](mqttsn_gateway::Gateway) call produced, collected so the
/// async event loop can perform the actual socket I/O after the
/// (synchronous) core logic returns. One of these is built fresh for every
/// call into the core, the same way the test `RecordingDriver`s the core
/// crate ships work.
pub struct SessionOutbox {
    pub to_client: Vec<Message>,
    pub to_broker: Vec<MqttPacket>,
    pub tick_ms: Option<u32>,
    pub tick_cancelled: bool,
    pub terminate: bool,
    pub reconnect_broker: bool,
    pub newly_connected_client: Option<String>,
    config: Arc<GatewayConfig>,
}

impl SessionOutbox {
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        Self {
            to_client: Vec::new(),
            to_broker: Vec::new(),
            tick_ms: None,
            tick_cancelled: false,
            terminate: false,
            reconnect_broker: false,
            newly_connected_client: None,
            config,
        }
    }
}

impl SessionDriver for SessionOutbox {
    fn send_to_client(&mut self, msg: Message) {
        self.to_client.push(msg);
    }

    fn send_to_broker(&mut self, packet: MqttPacket) {
        self.to_broker.push(packet);
    }

    fn program_tick(&mut self, ms: u32) {
        self.tick_ms = Some(ms);
    }

    fn cancel_tick(&mut self) {
        self.tick_ms = None;
        self.tick_cancelled = true;
    }

    fn request_terminate(&mut self) {
        self.terminate = true;
    }

    fn request_broker_reconnect(&mut self) {
        self.reconnect_broker = true;
    }

    fn report_client_connected(&mut self, client_id: &str) {
        self.newly_connected_client = Some(client_id.to_string());
    }

    fn request_auth_info(&mut self, client_id: &str) -> Option<(Option<String>, Option<Bytes>)> {
        self.config.auth_for(client_id)
    }
}

/// Same idea as [`SessionOutbox`] for the gateway-wide advertiser.
#[derive(Default)]
pub struct GatewayOutbox {
    pub broadcasts: Vec<Message>,
    pub tick_ms: Option<u32>,
}

impl GatewayDriver for GatewayOutbox {
    fn broadcast(&mut self, msg: Message) {
        self.broadcasts.push(msg);
    }

    fn program_tick(&mut self, ms: u32) {
        self.tick_ms = Some(ms);
    }
}
