//! Reply kinds and the acknowledgment state machine.

use crate::{EnvelopeError, EnvelopeResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Kind of reply carried by an envelope.
///
/// `Ack` and `Error` are terminal. `Received` and `Progress` are advisory and
/// may be skipped entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    /// Request accepted for processing (`RCV`).
    Received,
    /// Intermediate progress report (`FDB`).
    Progress,
    /// Command completed successfully (`ACK`).
    Ack,
    /// Command failed (`ERROR`).
    Error,
}

impl ReplyKind {
    /// Wire tag for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ReplyKind::Received => "RCV",
            ReplyKind::Progress => "FDB",
            ReplyKind::Ack => "ACK",
            ReplyKind::Error => "ERROR",
        }
    }

    /// Whether this kind ends a conversation.
    pub fn is_terminal(self) -> bool {
        matches!(self, ReplyKind::Ack | ReplyKind::Error)
    }
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplyKind {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RCV" | "RECEIVED" => Ok(ReplyKind::Received),
            // Older senders used PROCESSING for progress reports.
            "FDB" | "PROGRESS" | "PROCESSING" => Ok(ReplyKind::Progress),
            "ACK" => Ok(ReplyKind::Ack),
            "ERROR" => Ok(ReplyKind::Error),
            _ => Err(EnvelopeError::UnknownReplyKind(s.to_string())),
        }
    }
}

impl Serialize for ReplyKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Deserialize an optional reply kind where an empty string means "no reply kind".
pub(crate) fn deserialize_reply_kind<'de, D>(deserializer: D) -> Result<Option<ReplyKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Acknowledgment state of one conversation, as seen by the replier.
///
/// `Idle -> Received -> (Progress)* -> {Acknowledged | Errored}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckState {
    #[default]
    Idle,
    Received,
    Progress,
    Acknowledged,
    Errored,
}

impl AckState {
    /// Whether the conversation has ended.
    pub fn is_terminal(self) -> bool {
        matches!(self, AckState::Acknowledged | AckState::Errored)
    }

    /// Compute the state after emitting a reply of `kind`.
    pub fn advance(self, kind: ReplyKind) -> EnvelopeResult<AckState> {
        let next = match (self, kind) {
            (AckState::Acknowledged | AckState::Errored, _) => None,
            (AckState::Idle, ReplyKind::Received) => Some(AckState::Received),
            (_, ReplyKind::Received) => None,
            (_, ReplyKind::Progress) => Some(AckState::Progress),
            (_, ReplyKind::Ack) => Some(AckState::Acknowledged),
            (_, ReplyKind::Error) => Some(AckState::Errored),
        };

        next.ok_or(EnvelopeError::InvalidTransition { from: self, kind })
    }
}
