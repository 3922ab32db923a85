//! # sensordash-ws-protocol
//!
//! Shared wire protocol types for the sensordash realtime sensor feed.
//!
//! Used by:
//!
//! - **`sensordash-ws-client`**: the dashboard side connection manager
//! - **`sensordash-cli`**: the development simulator server
//!
//! # Wire Protocol
//!
//! All frames are JSON text frames.
//!
//! ## Client → Server ([`ClientMessage`])
//!
//! Sent once, in this order, every time a connection opens:
//!
//! - `{"token": "<bearer>"}` (or `{"token": null}`): [`AuthMessage`]
//! - `{"action": "subscribe", "sensor": "#"}`: [`SubscribeMessage`]
//!
//! ## Server → Client ([`InboundFrame`])
//!
//! - `{"topic": "<prefix>/<clientId>/<sensorId>", "values": "<json>"}`: the
//!   `values` string is itself JSON: an array of `{type, value}` pairs, a bare
//!   number, or `{"value": n}`.
//! - `{"type": "<prefix>/<clientId>/<sensorId>", "message": "{\"value\": n}"}`:
//!   the earlier single-scalar shape, still accepted.
//!
//! Every accepted frame decodes into a [`DecodedFrame`]. Anything else is a
//! [`DecodeError`] and the frame is meant to be dropped by the caller.
//!
//! # Topic Matching
//!
//! [`topic_matches`] implements MQTT-style wildcard matching (`#` for
//! multi-level, `+` or `*` for single-level).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Value type assigned when the feed carries a bare scalar.
pub const DEFAULT_VALUE_TYPE: &str = "value";

/// Subscription pattern matching every sensor.
pub const SUBSCRIBE_ALL: &str = "#";

/// Minimum number of `/`-separated topic segments: prefix, client, sensor.
pub const MIN_TOPIC_SEGMENTS: usize = 3;

// ════════════════════════════════════════════════════════════════════
// Client → Server
// ════════════════════════════════════════════════════════════════════

/// Authentication frame sent immediately after the connection opens.
///
/// A missing token is sent as an explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthMessage {
    pub token: Option<String>,
}

impl AuthMessage {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

/// Subscription action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Subscribe,
    Unsubscribe,
}

/// Subscription frame: `{"action": "subscribe", "sensor": "<pattern>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeMessage {
    pub action: Action,
    /// Topic pattern, wildcards supported (`#` = every sensor).
    pub sensor: String,
}

impl SubscribeMessage {
    /// Subscribe to the given sensor pattern.
    pub fn subscribe(pattern: impl Into<String>) -> Self {
        Self {
            action: Action::Subscribe,
            sensor: pattern.into(),
        }
    }

    /// Wildcard subscription to every sensor.
    pub fn all() -> Self {
        Self::subscribe(SUBSCRIBE_ALL)
    }
}

/// Any frame a dashboard client sends to the server.
///
/// Untagged: the subscription shape is tried first because an auth frame
/// carries nothing but its `token` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    Subscription(SubscribeMessage),
    Auth(AuthMessage),
}

impl From<AuthMessage> for ClientMessage {
    fn from(msg: AuthMessage) -> Self {
        Self::Auth(msg)
    }
}

impl From<SubscribeMessage> for ClientMessage {
    fn from(msg: SubscribeMessage) -> Self {
        Self::Subscription(msg)
    }
}

// ════════════════════════════════════════════════════════════════════
// Server → Client
// ════════════════════════════════════════════════════════════════════

/// One `(type, value)` pair as it appears inside a `values` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: f64,
}

impl TypedValue {
    pub fn new(value_type: impl Into<String>, value: f64) -> Self {
        Self {
            value_type: value_type.into(),
            value,
        }
    }

    /// A scalar carrying the [`DEFAULT_VALUE_TYPE`].
    pub fn scalar(value: f64) -> Self {
        Self::new(DEFAULT_VALUE_TYPE, value)
    }
}

/// Raw inbound envelope, before the nested payload is decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InboundFrame {
    /// Canonical shape: `{"topic": "...", "values": "<json>"}`.
    Topic { topic: String, values: Value },

    /// Earlier shape: `{"type": "...", "message": "{\"value\": n}"}`.
    Legacy {
        #[serde(rename = "type")]
        kind: String,
        message: Value,
    },
}

impl InboundFrame {
    /// Build a canonical frame with the `values` array JSON-encoded as a string.
    pub fn sensor(
        prefix: &str,
        client_id: &str,
        sensor_id: &str,
        values: &[TypedValue],
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::Topic {
            topic: format!("{prefix}/{client_id}/{sensor_id}"),
            values: Value::String(serde_json::to_string(values)?),
        })
    }
}

/// `prefix/clientId/sensorId` split out of a topic string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub prefix: String,
    pub client_id: String,
    pub sensor_id: String,
}

impl Topic {
    /// Split a topic into prefix, client id and sensor id.
    ///
    /// Segments past the third stay part of the sensor id, so
    /// `user/c1/board/t` addresses sensor `board/t` on client `c1`.
    pub fn parse(topic: &str) -> Result<Self, DecodeError> {
        let mut parts = topic.splitn(MIN_TOPIC_SEGMENTS, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(prefix), Some(client_id), Some(sensor_id))
                if !client_id.is_empty() && !sensor_id.is_empty() =>
            {
                Ok(Self {
                    prefix: prefix.to_string(),
                    client_id: client_id.to_string(),
                    sensor_id: sensor_id.to_string(),
                })
            }
            _ => Err(DecodeError::InvalidTopic(topic.to_string())),
        }
    }

    /// Reassemble the topic string.
    pub fn as_topic(&self) -> String {
        format!("{}/{}/{}", self.prefix, self.client_id, self.sensor_id)
    }
}

/// A fully decoded sensor frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub topic: Topic,
    pub values: Vec<TypedValue>,
}

// ════════════════════════════════════════════════════════════════════
// Decoding
// ════════════════════════════════════════════════════════════════════

/// Reasons an inbound frame is dropped.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame, or its nested payload, is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Valid JSON that matches neither frame shape.
    #[error("unrecognised frame shape")]
    UnknownShape,

    /// Topic does not split into `prefix/clientId/sensorId`.
    #[error("invalid topic '{0}': expected <prefix>/<clientId>/<sensorId>")]
    InvalidTopic(String),

    /// Nested payload is JSON but not a usable set of values.
    #[error("invalid values payload: {0}")]
    InvalidValues(String),
}

/// Decode one inbound text frame.
pub fn decode_frame(text: &str) -> Result<DecodedFrame, DecodeError> {
    let raw: Value = serde_json::from_str(text)?;
    let frame: InboundFrame =
        serde_json::from_value(raw).map_err(|_| DecodeError::UnknownShape)?;

    let (topic, payload) = match frame {
        InboundFrame::Topic { topic, values } => (topic, values),
        InboundFrame::Legacy { kind, message } => (kind, message),
    };

    let topic = Topic::parse(&topic)?;
    let values = decode_values(payload)?;
    Ok(DecodedFrame { topic, values })
}

/// Decode a `values` / `message` payload into typed values.
///
/// A string payload is parsed as nested JSON first; the result (or a payload
/// that was already structured) may be an array of `{type, value}` pairs, a
/// bare number, or an object with a numeric `value` and optional `type`.
pub fn decode_values(payload: Value) -> Result<Vec<TypedValue>, DecodeError> {
    let payload = match payload {
        Value::String(nested) => serde_json::from_str(&nested)?,
        other => other,
    };

    match payload {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(DecodeError::InvalidValues("empty values array".into()));
            }
            items
                .into_iter()
                .map(|item| {
                    serde_json::from_value::<TypedValue>(item)
                        .map_err(|e| DecodeError::InvalidValues(e.to_string()))
                })
                .collect()
        }
        Value::Number(n) => n
            .as_f64()
            .map(|v| vec![TypedValue::scalar(v)])
            .ok_or_else(|| DecodeError::InvalidValues(format!("unrepresentable number {n}"))),
        Value::Object(map) => {
            let value = map
                .get("value")
                .and_then(Value::as_f64)
                .ok_or_else(|| DecodeError::InvalidValues("object without numeric 'value'".into()))?;
            let value_type = map
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_VALUE_TYPE);
            Ok(vec![TypedValue::new(value_type, value)])
        }
        other => Err(DecodeError::InvalidValues(format!(
            "expected array, number or object, got {other}"
        ))),
    }
}

// ════════════════════════════════════════════════════════════════════
// Topic matching
// ════════════════════════════════════════════════════════════════════

/// Returns `true` if `topic` matches `pattern`.
///
/// Follows MQTT wildcard conventions:
///
/// | Pattern  | Semantics                         |
/// |----------|-----------------------------------|
/// | `#`      | Multi-level wildcard (all topics) |
/// | `a/#`    | Everything under `a/`             |
/// | `a/+/c`  | Single-level wildcard in segment  |
/// | `a/*/c`  | Same as `+`                       |
/// | `a/b/c`  | Exact match                       |
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    if pattern == topic || pattern == SUBSCRIBE_ALL {
        return true;
    }

    let mut pattern_parts = pattern.split('/');
    let mut topic_parts = topic.split('/');

    loop {
        match (pattern_parts.next(), topic_parts.next()) {
            // `a/#` also matches `a` itself
            (Some("#"), _) => return true,
            (Some("+" | "*"), Some(_)) => {}
            (Some(p), Some(t)) if p == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

// ════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════
