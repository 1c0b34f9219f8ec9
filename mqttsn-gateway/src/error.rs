use std::{error::Error, fmt::Display};

/// Mirrors the `{kind, message}` shape `mqtt-core`/`mqttsn-core` use for
/// their wire-level errors, lifted one layer up to the session-level faults
/// the taxonomy in the design notes describes: topic resolution, allocation,
/// retry exhaustion and unrecoverable inconsistency.
#[derive(Debug, Clone)]
pub struct GatewayError {
    kind: GatewayErrorKind,
    message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: String) -> Self {
        Self { kind, message }
    }

    pub fn kind(&self) -> GatewayErrorKind {
        self.kind
    }
}

impl Error for GatewayError {}

impl Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayErrorKind {
    TopicResolution,
    Allocation,
    RetryExhaustion,
    Fatal,
}

impl From<mqttsn_core::err::DecodeError> for GatewayError {
    fn from(value: mqttsn_core::err::DecodeError) -> Self {
        Self::new(GatewayErrorKind::Fatal, value.to_string())
    }
}

impl From<mqtt_core::err::DecodeError> for GatewayError {
    fn from(value: mqtt_core::err::DecodeError) -> Self {
        Self::new(GatewayErrorKind::Fatal, value.to_string())
    }
}
