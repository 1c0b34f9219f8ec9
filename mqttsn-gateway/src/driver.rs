use bytes::Bytes;

use mqtt_core::codec::v3::MqttPacket;
use mqttsn_core::Message;

/// Callback surface a [`crate::session::Session`] uses to ask its host for
/// I/O and scheduling. The session never touches a socket directly; the
/// driver binary (`mqttsn-gatewayd`) is the only thing that implements this.
pub trait SessionDriver {
    /// Sends an MQTT-SN frame to the client this session belongs to.
    fn send_to_client(&mut self, msg: Message);

    /// Sends an MQTT v3.1.1 packet to the broker TCP connection for this
    /// session.
    fn send_to_broker(&mut self, packet: MqttPacket);

    /// Requests a callback into [`crate::session::Session::on_tick`] no
    /// sooner than `ms` from now. A session reprograms this at most once per
    /// public entry (see `call_stack_count`); the driver is expected to
    /// coalesce it into a single timer per session.
    fn program_tick(&mut self, ms: u32);

    /// Cancels any outstanding tick previously requested with
    /// `program_tick`.
    fn cancel_tick(&mut self);

    /// The session has reached a terminal state and its resources (socket
    /// registration, broker connection) may be torn down.
    fn request_terminate(&mut self);

    /// The broker TCP connection dropped or failed to connect; the driver
    /// should establish a new one and call back into
    /// [`crate::session::Session::on_broker_connected`].
    fn request_broker_reconnect(&mut self);

    /// Informs the driver that the client's logical connection came up
    /// (first successful CONNECT), so it can be surfaced to operators or
    /// metrics exactly once per session lifetime.
    fn report_client_connected(&mut self, client_id: &str);

    /// Looks up statically configured credentials for `client_id`, used
    /// when the MQTT-SN CONNECT carried no username/password of its own.
    fn request_auth_info(&mut self, client_id: &str) -> Option<(Option<String>, Option<Bytes>)>;
}

/// Callback surface the gateway-wide advertise broadcaster (component C8)
/// uses to ask its host for scheduling and broadcast I/O.
pub trait GatewayDriver {
    /// Broadcasts `msg` (always an ADVERTISE) to the gateway's broadcast
    /// address.
    fn broadcast(&mut self, msg: Message);

    /// Requests a callback into [`crate::gateway::Gateway::on_tick`] no
    /// sooner than `ms` from now.
    fn program_tick(&mut self, ms: u32);
}
