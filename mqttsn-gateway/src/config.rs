use std::{fs, path::Path};

use serde::Deserialize;

/// `client_id, username, password` — consulted by Connect's
/// `request_auth_info` callback when no credentials were supplied inline.
#[derive(Deserialize, Clone, Debug)]
pub struct AuthEntry {
    pub client_id: String,
    pub username: String,
    pub password: String,
}

/// `client_id, topic, topic_id`. An empty `client_id` applies to every
/// session; a non-empty one scopes the entry to that client only (see
/// `original_source/gateway/include/mqttsn/gateway/gateway_all.h`).
#[derive(Deserialize, Clone, Debug)]
pub struct PredefinedTopicEntry {
    #[serde(default)]
    pub client_id: String,
    pub topic: String,
    pub topic_id: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct TopicIdAllocRange {
    pub min: u16,
    pub max: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BrokerTcp {
    pub address: String,
    pub port: u16,
}

fn default_retry_period_ms() -> u32 {
    10_000
}
fn default_retry_count() -> u32 {
    3
}
fn default_pub_only_keep_alive() -> u16 {
    60
}
fn default_advertise_period_s() -> u16 {
    60
}
fn default_gw_id() -> u8 {
    1
}
fn default_udp_bind() -> String {
    String::from("0.0.0.0:10000")
}
fn default_udp_broadcast() -> String {
    String::from("255.255.255.255:10000")
}

/// Loaded from a `toml` file, following the same `serde::Deserialize` +
/// `try_from(&Path)` shape the donor broker uses for `MqttConfig`. Key
/// names map 1:1 onto the flat `mqttsn_*`/`mqtt_*` keys the spec's External
/// Interfaces section defines; multi-value keys deserialize as arrays of
/// tables.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct GatewayConfig {
    #[serde(default = "default_gw_id")]
    pub mqttsn_gw_id: u8,
    #[serde(default = "default_advertise_period_s")]
    pub mqttsn_advertise: u16,
    #[serde(default = "default_retry_period_ms")]
    pub mqttsn_retry_period: u32,
    #[serde(default = "default_retry_count")]
    pub mqttsn_retry_count: u32,
    #[serde(default)]
    pub mqttsn_default_client_id: String,
    #[serde(default = "default_pub_only_keep_alive")]
    pub mqttsn_pub_only_keep_alive: u16,
    pub mqttsn_sleeping_client_msg_limit: Option<usize>,
    #[serde(default)]
    pub mqttsn_predefined_topic: Vec<PredefinedTopicEntry>,
    #[serde(default)]
    pub mqttsn_auth: Vec<AuthEntry>,
    pub mqttsn_topic_id_alloc_range: Option<TopicIdAllocRange>,
    pub mqtt_broker_tcp: BrokerTcp,

    /// Address the driver binary's client-facing UDP socket binds to.
    /// Not part of the wire spec's configuration table; supplements it the
    /// same way the donor broker's `[connection]` table carries its own
    /// `ip`/`port` keys alongside the protocol-level ones.
    #[serde(default = "default_udp_bind")]
    pub mqttsn_udp_bind: String,
    /// Destination address the ADVERTISE beacon is sent to.
    #[serde(default = "default_udp_broadcast")]
    pub mqttsn_udp_broadcast: String,
}

impl Default for BrokerTcp {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1"),
            port: 1883,
        }
    }
}

impl GatewayConfig {
    pub fn try_from_path(path: &Path) -> Result<Self, toml::de::Error> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                log::warn!(
                    "Could not load file: {} to initialize the gateway configuration.",
                    path.display()
                );
                log::error!("{err}");
                panic!("missing gateway config file");
            }
        };

        let config: GatewayConfig = toml::from_str(&contents)?;

        if let Some(range) = &config.mqttsn_topic_id_alloc_range {
            if !(range.min > 0 && range.min <= range.max && range.max <= 0xFFFE) {
                log::warn!(
                    "mqttsn_topic_id_alloc_range [{}, {}] is invalid, falling back to [1, 0xFFFE]",
                    range.min,
                    range.max
                );
            }
        }

        if config.mqttsn_retry_count == 0 {
            log::warn!("mqttsn_retry_count of 0 disables retries entirely, confirm this is intended");
        }

        Ok(config)
    }

    /// Entries with an empty `client_id` apply to every session.
    pub fn predefined_topics_for(&self, client_id: &str) -> Vec<(&str, u16)> {
        self.mqttsn_predefined_topic
            .iter()
            .filter(|e| e.client_id.is_empty() || e.client_id == client_id)
            .map(|e| (e.topic.as_str(), e.topic_id))
            .collect()
    }

    pub fn auth_for(&self, client_id: &str) -> Option<(Option<String>, Option<bytes::Bytes>)> {
        self.mqttsn_auth
            .iter()
            .find(|e| e.client_id == client_id)
            .map(|e| {
                (
                    Some(e.username.clone()),
                    Some(bytes::Bytes::from(e.password.clone().into_bytes())),
                )
            })
    }

    pub fn topic_id_alloc_range(&self) -> (u16, u16) {
        match &self.mqttsn_topic_id_alloc_range {
            Some(range) if range.min > 0 && range.min <= range.max && range.max <= 0xFFFE => {
                (range.min, range.max)
            }
            _ => (1, 0xFFFE),
        }
    }
}

#[cfg(test)]
mod config {
    use super::*;

    #[test]
    fn predefined_topics_are_scoped_by_client_id() {
        let config = GatewayConfig {
            mqttsn_predefined_topic: vec![
                PredefinedTopicEntry {
                    client_id: String::new(),
                    topic: String::from("global"),
                    topic_id: 1,
                },
                PredefinedTopicEntry {
                    client_id: String::from("c1"),
                    topic: String::from("scoped"),
                    topic_id: 2,
                },
            ],
            ..Default::default()
        };

        let for_c1 = config.predefined_topics_for("c1");
        assert_eq!(for_c1.len(), 2);

        let for_c2 = config.predefined_topics_for("c2");
        assert_eq!(for_c2, vec![("global", 1)]);
    }
}
