use std::{error::Error, fmt::Display};

#[derive(Debug, Clone)]
pub struct EncodeError {
    kind: EncodeErrorKind,
    message: String,
}

impl EncodeError {
    pub fn new(kind: EncodeErrorKind, message: String) -> Self {
        return Self { kind, message };
    }

    pub fn kind(&self) -> EncodeErrorKind {
        return self.kind;
    }
}

impl Error for EncodeError {}

impl Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[derive(Clone, Debug, Copy, PartialEq)]
pub enum EncodeErrorKind {
    OversizedPayload,
    OversizedClientId,
}

#[derive(Debug, Clone)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    message: String,
}

impl Error for DecodeError {}

impl Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind, message: String) -> Self {
        return Self { kind, message };
    }

    pub fn kind(&self) -> DecodeErrorKind {
        return self.kind;
    }

    /// `true` when the buffer may simply be a partial frame — the caller must
    /// retain the bytes and wait for more, rather than discarding them.
    pub fn is_not_enough_data(&self) -> bool {
        self.kind == DecodeErrorKind::NotEnoughData
    }
}

/// Mirrors the `{Ok, NotEnoughData, ProtocolError, InvalidMsgId,
/// MsgAllocFailure}` decode outcomes, refined with the concrete reasons a
/// frame can be rejected.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DecodeErrorKind {
    NotEnoughData,
    ProtocolError,
    InvalidMsgId,
    MsgAllocFailure,
    MalformedLength,
    Utf8ParseError,
    InvalidFlags,
    InvalidTopicIdType,
    InvalidReturnCode,
    InvalidMsgType,
    InvalidProtocolId,
    InvalidQoS,
}
