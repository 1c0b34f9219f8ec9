use std::collections::VecDeque;

use bytes::Bytes;

use crate::topic::{PubInfo, RegMgr, WillInfo};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnStatus {
    Disconnected,
    Connected,
    Asleep,
}

/// The shared data block every [`crate::ops::SessionOp`] reads and writes
/// (component C5). Owned exclusively by one [`crate::session::Session`];
/// never shared across sessions except for the read-only predefined-topic
/// and auth tables installed at construction (see
/// [`crate::config::GatewayConfig`]).
pub struct SessionState {
    pub conn_status: ConnStatus,
    pub broker_connected: bool,
    pub reconnecting_broker: bool,
    pub pending_client_disconnect: bool,
    pub client_connect_reported: bool,
    pub terminating: bool,
    pub running: bool,

    pub retry_period_ms: u32,
    pub retry_count: u32,

    /// `0` means no tick is currently outstanding.
    pub tick_req_ms: u32,
    pub timestamp_ms: u64,
    pub last_msg_timestamp_ms: u64,

    pub client_id: String,
    pub default_client_id: String,
    pub username: Option<String>,
    pub password: Option<Bytes>,
    pub keep_alive_s: u16,
    pub pub_only_keep_alive_s: u16,
    pub pub_only_client: bool,

    pub will: Option<WillInfo>,

    pub broker_pubs: VecDeque<PubInfo>,
    pub sleep_pub_acc_limit: Option<usize>,

    pub reg_mgr: RegMgr,

    /// Reentrancy guard: incremented on every public [`crate::session::Session`]
    /// entry, decremented on exit. Timer reprogramming and op re-evaluation
    /// are deferred until this returns to zero.
    pub call_stack_count: u32,

    /// Monotonic counter for `msgId`s the gateway itself originates
    /// (REGISTER_SN/PUBLISH_SN sent broker->client). Kept separate from
    /// `timestamp_ms`/`last_msg_timestamp_ms`, which track wall-clock time
    /// and are overwritten with the driver's real clock reading on every
    /// inbound client frame.
    next_msg_id_seq: u16,
}

impl SessionState {
    pub fn new(default_client_id: String, reg_mgr: RegMgr) -> Self {
        Self {
            conn_status: ConnStatus::Disconnected,
            broker_connected: false,
            reconnecting_broker: false,
            pending_client_disconnect: false,
            client_connect_reported: false,
            terminating: false,
            running: true,
            retry_period_ms: 10_000,
            retry_count: 3,
            tick_req_ms: 0,
            timestamp_ms: 0,
            last_msg_timestamp_ms: 0,
            client_id: String::new(),
            default_client_id,
            username: None,
            password: None,
            keep_alive_s: 0,
            pub_only_keep_alive_s: 60,
            pub_only_client: false,
            will: None,
            broker_pubs: VecDeque::new(),
            sleep_pub_acc_limit: None,
            reg_mgr,
            call_stack_count: 0,
            next_msg_id_seq: 0,
        }
    }

    /// Allocates the next `msgId` the gateway uses for a REGISTER_SN or
    /// PUBLISH_SN it originates itself (4.4.5, 4.4.3's wake-up flush).
    /// Wraps past `u16::MAX`; never `0` is not special-cased here since
    /// MQTT-SN only reserves `msgId = 0` for messages that don't expect a
    /// reply, which these always do.
    pub fn next_msg_id(&mut self) -> u16 {
        self.next_msg_id_seq = self.next_msg_id_seq.wrapping_add(1);
        self.next_msg_id_seq
    }

    /// Pushes a buffered broker publish, dropping the newest arrival when
    /// `sleep_pub_acc_limit` is exceeded (spec S6/open question: observed
    /// via a log, not a protocol-level signal — see `DESIGN.md`).
    pub fn push_broker_pub(&mut self, pub_info: PubInfo) {
        if let Some(limit) = self.sleep_pub_acc_limit {
            if self.broker_pubs.len() >= limit {
                log::warn!(
                    "sleep_pub_acc_limit ({limit}) reached for client '{}', dropping publish to '{}'",
                    self.client_id,
                    pub_info.topic
                );
                return;
            }
        }
        self.broker_pubs.push_back(pub_info);
    }
}
