use bytes::Bytes;

use crate::error::{GatewayError, GatewayErrorKind};

/// Topic ids `0x0000` and `0xFFFF` are reserved by MQTT-SN 1.2 and are never
/// handed out by [`RegMgr::map_topic_id`] or accepted by
/// [`RegMgr::add_predefined`].
const RESERVED_IDS: [u16; 2] = [0x0000, 0xFFFF];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopicKind {
    Predefined,
    Registered,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicEntry {
    pub topic_name: String,
    pub topic_id: u16,
    pub kind: TopicKind,
}

/// The per-session topic-name <-> topic-id table (component C4).
///
/// Predefined entries are loaded once at session start (from
/// [`crate::config::GatewayConfig`]) and never evicted. Registered entries
/// come from REGISTER_SN/SUBSCRIBE_SN and are allocated round-robin inside
/// `range`, wrapping past `max` back to `min` and skipping both ids already
/// in use and the two reserved values.
#[derive(Clone, Debug)]
pub struct RegMgr {
    entries: Vec<TopicEntry>,
    range: (u16, u16),
    last_allocated: u16,
}

impl Default for RegMgr {
    fn default() -> Self {
        Self::new(1, 0xFFFE)
    }
}

impl RegMgr {
    pub fn new(min: u16, max: u16) -> Self {
        Self {
            entries: Vec::new(),
            range: (min, max),
            last_allocated: min.wrapping_sub(1).max(RESERVED_IDS[0]),
        }
    }

    pub fn range(&self) -> (u16, u16) {
        self.range
    }

    pub fn entries(&self) -> &[TopicEntry] {
        &self.entries
    }

    fn is_reserved(id: u16) -> bool {
        RESERVED_IDS.contains(&id)
    }

    fn find_by_name(&self, name: &str) -> Option<&TopicEntry> {
        self.entries.iter().find(|e| e.topic_name == name)
    }

    fn find_by_id(&self, id: u16) -> Option<&TopicEntry> {
        self.entries.iter().find(|e| e.topic_id == id)
    }

    pub fn map_topic_name(&self, id: u16) -> Option<&str> {
        self.find_by_id(id).map(|e| e.topic_name.as_str())
    }

    /// Like [`Self::map_topic_name`] but only resolves entries of `kind`,
    /// for the `PreDefined` `topicIdType` case (4.4.4) where a Normal
    /// (registered) entry sharing the same id must not be matched.
    pub fn map_topic_name_by_kind(&self, id: u16, kind: TopicKind) -> Option<&str> {
        self.find_by_id(id)
            .filter(|e| e.kind == kind)
            .map(|e| e.topic_name.as_str())
    }

    /// Looks up an existing entry (predefined or registered) by name, or
    /// allocates the next free id in `range`. Returns `(id, is_new)`.
    pub fn map_topic_id(&mut self, name: &str) -> Result<(u16, bool), GatewayError> {
        if let Some(entry) = self.find_by_name(name) {
            return Ok((entry.topic_id, false));
        }

        let (min, max) = self.range;
        let span = max - min + 1;
        let mut candidate = self.last_allocated;

        for _ in 0..span {
            candidate = if candidate >= max { min } else { candidate + 1 };

            if Self::is_reserved(candidate) || self.find_by_id(candidate).is_some() {
                continue;
            }

            self.entries.push(TopicEntry {
                topic_name: name.to_string(),
                topic_id: candidate,
                kind: TopicKind::Registered,
            });
            self.last_allocated = candidate;
            return Ok((candidate, true));
        }

        Err(GatewayError::new(
            GatewayErrorKind::Allocation,
            format!("no free topic ids remain in range [{min}, {max}]"),
        ))
    }

    /// Predefined entries cannot be discarded; this is a no-op for them.
    pub fn discard_registration(&mut self, id: u16) {
        self.entries
            .retain(|e| !(e.topic_id == id && e.kind == TopicKind::Registered));
    }

    pub fn add_predefined(&mut self, name: &str, id: u16) -> bool {
        let (min, max) = self.range;
        if Self::is_reserved(id) || id < min || id > max {
            return false;
        }
        if self.find_by_id(id).is_some() || self.find_by_name(name).is_some() {
            return false;
        }
        self.entries.push(TopicEntry {
            topic_name: name.to_string(),
            topic_id: id,
            kind: TopicKind::Predefined,
        });
        true
    }

    pub fn set_range(&mut self, min: u16, max: u16) -> bool {
        if !(min > 0 && min <= max && max <= 0xFFFE) {
            return false;
        }
        let out_of_range = self
            .entries
            .iter()
            .any(|e| e.kind == TopicKind::Registered && (e.topic_id < min || e.topic_id > max));
        if out_of_range {
            return false;
        }
        self.range = (min, max);
        true
    }
}

/// `{topic, msg, qos, retain}` captured during the CONNECT will handshake
/// (4.4.1) and published by the driver on abnormal session termination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WillInfo {
    pub topic: String,
    pub msg: Bytes,
    pub qos: mqtt_core::qos::QosLevel,
    pub retain: bool,
}

impl Default for WillInfo {
    fn default() -> Self {
        Self {
            topic: String::new(),
            msg: Bytes::new(),
            qos: mqtt_core::qos::QosLevel::AtMostOnce,
            retain: false,
        }
    }
}

/// A buffered broker->client publish, held for a sleeping client (4.4.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PubInfo {
    pub topic: String,
    pub payload: Bytes,
    pub qos: mqtt_core::qos::QosLevel,
    pub retain: bool,
    pub dup: bool,
}

#[cfg(test)]
mod reg_mgr {
    use super::*;

    #[test]
    fn allocates_round_robin_and_skips_reserved() {
        let mut mgr = RegMgr::new(0xFFFD, 0xFFFE);
        let (id, is_new) = mgr.map_topic_id("a").expect("first alloc");
        assert!(is_new);
        assert_eq!(id, 0xFFFD);

        let (id2, _) = mgr.map_topic_id("b").expect("second alloc");
        assert_eq!(id2, 0xFFFE);

        let err = mgr.map_topic_id("c").expect_err("range exhausted");
        assert_eq!(err.kind(), GatewayErrorKind::Allocation);
    }

    #[test]
    fn repeated_lookup_is_stable() {
        let mut mgr = RegMgr::default();
        let (id, is_new) = mgr.map_topic_id("a/b").unwrap();
        assert!(is_new);
        let (id2, is_new2) = mgr.map_topic_id("a/b").unwrap();
        assert_eq!(id, id2);
        assert!(!is_new2);
    }

    #[test]
    fn predefined_rejects_duplicate_name_or_id() {
        let mut mgr = RegMgr::default();
        assert!(mgr.add_predefined("sys/status", 10));
        assert!(!mgr.add_predefined("sys/status", 11));
        assert!(!mgr.add_predefined("sys/other", 10));
    }

    #[test]
    fn predefined_entries_survive_discard() {
        let mut mgr = RegMgr::default();
        mgr.add_predefined("sys/status", 10);
        mgr.discard_registration(10);
        assert_eq!(mgr.map_topic_name(10), Some("sys/status"));
    }

    #[test]
    fn set_range_rejects_when_registered_entries_fall_outside() {
        let mut mgr = RegMgr::default();
        mgr.map_topic_id("a").unwrap();
        assert!(!mgr.set_range(5, 10));
        assert!(mgr.set_range(1, 0xFFFE));
    }
}
