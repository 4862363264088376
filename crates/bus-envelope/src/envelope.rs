//! The message envelope and its JSON wire form.
//!
//! One JSON object per message:
//!
//! ```json
//! {"component":"3dviewer","comp_phys":"3dviewer","sender":"runner",
//!  "command":"set_density","arg1":"40","arg2":"","UUID":"...",
//!  "reply":"","reply type":"ACK","tick count":7,"comp_type":"other"}
//! ```

use crate::reply::deserialize_reply_kind;
use crate::{EnvelopeError, EnvelopeResult, Identity, ReplyKind};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Component type written when none is configured.
pub const DEFAULT_COMPONENT_TYPE: &str = "other";

fn default_component_type() -> String {
    DEFAULT_COMPONENT_TYPE.to_string()
}

/// Scripted senders write numbers, booleans and nulls where strings belong.
/// Scalars become their JSON text and null becomes empty.
fn deserialize_loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or scalar, got {}",
            other
        ))),
    }
}

/// The tick count is diagnostic; floats truncate, numeric strings parse, and
/// anything else reads as absent.
fn deserialize_loose_sequence<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let sequence = match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed.parse::<i64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f as i64)
            })
        }
        _ => None,
    };
    Ok(sequence)
}

/// One message exchanged over the bus.
///
/// Envelopes are built once, serialized, and dropped. Requests carry no reply
/// kind; replies echo the request's addressing, command, arguments and
/// correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "component", default, deserialize_with = "deserialize_loose_string")]
    logical_address: String,
    #[serde(rename = "comp_phys", default, deserialize_with = "deserialize_loose_string")]
    physical_address: String,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    sender: String,
    command: String,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    arg1: String,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    arg2: String,
    #[serde(rename = "UUID", alias = "uuid")]
    correlation_id: String,
    #[serde(rename = "reply", default, deserialize_with = "deserialize_loose_string")]
    reply_text: String,
    #[serde(
        rename = "reply type",
        default,
        deserialize_with = "deserialize_reply_kind",
        skip_serializing_if = "Option::is_none"
    )]
    reply_kind: Option<ReplyKind>,
    #[serde(
        rename = "tick count",
        default,
        deserialize_with = "deserialize_loose_sequence",
        skip_serializing_if = "Option::is_none"
    )]
    sequence: Option<i64>,
    #[serde(rename = "comp_type", default = "default_component_type")]
    component_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl Envelope {
    /// Create a request with a fresh correlation id.
    pub fn request(logical_address: &str, physical_address: &str, command: &str) -> Self {
        Self {
            logical_address: logical_address.to_string(),
            physical_address: physical_address.to_string(),
            sender: String::new(),
            command: command.to_string(),
            arg1: String::new(),
            arg2: String::new(),
            correlation_id: uuid::Uuid::new_v4().to_string(),
            reply_text: String::new(),
            reply_kind: None,
            sequence: None,
            component_type: default_component_type(),
            data: None,
        }
    }

    /// Create a reply to `request`, published by `replier`.
    pub fn reply_to(request: &Envelope, replier: &Identity, kind: ReplyKind, text: &str) -> Self {
        Self {
            logical_address: request.logical_address.clone(),
            physical_address: request.physical_address.clone(),
            sender: replier.physical_address.clone(),
            command: request.command.clone(),
            arg1: request.arg1.clone(),
            arg2: request.arg2.clone(),
            correlation_id: request.correlation_id.clone(),
            reply_text: text.to_string(),
            reply_kind: Some(kind),
            sequence: request.sequence,
            component_type: replier.component_type.clone(),
            data: None,
        }
    }

    /// Set both positional arguments.
    pub fn with_args(mut self, arg1: &str, arg2: &str) -> Self {
        self.arg1 = arg1.to_string();
        self.arg2 = arg2.to_string();
        self
    }

    /// Set the sender.
    pub fn with_sender(mut self, sender: &str) -> Self {
        self.sender = sender.to_string();
        self
    }

    /// Set the diagnostic sequence number.
    pub fn with_sequence(mut self, sequence: i64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Set the component type.
    pub fn with_component_type(mut self, component_type: &str) -> Self {
        self.component_type = component_type.to_string();
        self
    }

    /// Set the correlation id.
    pub fn with_correlation_id(mut self, correlation_id: &str) -> Self {
        self.correlation_id = correlation_id.to_string();
        self
    }

    /// Attach a structured payload.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn logical_address(&self) -> &str {
        &self.logical_address
    }

    pub fn physical_address(&self) -> &str {
        &self.physical_address
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn arg1(&self) -> &str {
        &self.arg1
    }

    pub fn arg2(&self) -> &str {
        &self.arg2
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn reply_kind(&self) -> Option<ReplyKind> {
        self.reply_kind
    }

    pub fn reply_text(&self) -> &str {
        &self.reply_text
    }

    pub fn sequence(&self) -> Option<i64> {
        self.sequence
    }

    pub fn component_type(&self) -> &str {
        &self.component_type
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    /// Whether this envelope is a reply rather than a request.
    pub fn is_reply(&self) -> bool {
        self.reply_kind.is_some()
    }

    /// Whether this envelope is a terminal reply (`ACK` or `ERROR`).
    pub fn is_terminal(&self) -> bool {
        self.reply_kind.is_some_and(ReplyKind::is_terminal)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> EnvelopeResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON string.
    ///
    /// Missing string fields default to empty; `command` and `UUID` are required
    /// and the correlation id must not be blank.
    pub fn from_json(json: &str) -> EnvelopeResult<Self> {
        let envelope: Envelope = serde_json::from_str(json)?;
        if envelope.correlation_id.trim().is_empty() {
            return Err(EnvelopeError::MissingCorrelationId);
        }
        Ok(envelope)
    }
}
