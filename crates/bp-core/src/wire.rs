//! Wire protocol between the plugin and the external document editor.
//!
//! Every frame is a JSON object whose keys are message types:
//! `{ "FloatSlots": [...] }`. Outbound frames carry exactly one key; inbound
//! frames may carry several, each decoded on its own so one bad payload does
//! not poison the rest.

use crate::id::NodeId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::fmt;

// ─── Message types ───────────────────────────────────────────────────────

/// Every message type the channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageType {
    FloatSlots,
    StringSlots,
    ImageSlots,
    SeedSlot,
    Switchers,
    RenderStatus,
    Progress,
    Alert,
    Queue,
    PsConnected,
}

impl MessageType {
    pub const ALL: [MessageType; 10] = [
        MessageType::FloatSlots,
        MessageType::StringSlots,
        MessageType::ImageSlots,
        MessageType::SeedSlot,
        MessageType::Switchers,
        MessageType::RenderStatus,
        MessageType::Progress,
        MessageType::Alert,
        MessageType::Queue,
        MessageType::PsConnected,
    ];

    /// Envelope key on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::FloatSlots => "FloatSlots",
            MessageType::StringSlots => "StringSlots",
            MessageType::ImageSlots => "ImageSlots",
            MessageType::SeedSlot => "SeedSlot",
            MessageType::Switchers => "switchers",
            MessageType::RenderStatus => "render_status",
            MessageType::Progress => "progress",
            MessageType::Alert => "alert",
            MessageType::Queue => "queue",
            MessageType::PsConnected => "psConnected",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == key)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Host node state ─────────────────────────────────────────────────────

/// Execution mode of a host node (LiteGraph numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeMode {
    #[default]
    Always,
    OnEvent,
    Never,
    OnTrigger,
    Bypass,
}

impl NodeMode {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => NodeMode::Always,
            1 => NodeMode::OnEvent,
            2 => NodeMode::Never,
            3 => NodeMode::OnTrigger,
            _ => NodeMode::Bypass,
        }
    }

    /// Nodes in "always" mode count as active on the wire.
    pub fn is_active(self) -> bool {
        self == NodeMode::Always
    }
}

// ─── Slot values ─────────────────────────────────────────────────────────

/// Value of a string slot node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextValue {
    pub value: String,
}

/// Image slots carry identity only; pixels travel over HTTP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ImageValue {}

/// Shared state of every seed manager node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeedState {
    pub seed: u64,
    pub autorandom: bool,
}

impl Default for SeedState {
    fn default() -> Self {
        Self {
            seed: 1379,
            autorandom: false,
        }
    }
}

// ─── Switchers ───────────────────────────────────────────────────────────

/// How many groups a switcher node lets the user enable at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Restriction {
    #[default]
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "max one")]
    MaxOne,
    #[serde(rename = "always one")]
    AlwaysOne,
}

impl Restriction {
    /// `default → max one → always one → default`.
    pub fn next(self) -> Self {
        match self {
            Restriction::Default => Restriction::MaxOne,
            Restriction::MaxOne => Restriction::AlwaysOne,
            Restriction::AlwaysOne => Restriction::Default,
        }
    }

    pub fn from_property(raw: &str) -> Self {
        match raw {
            "max one" => Restriction::MaxOne,
            "always one" => Restriction::AlwaysOne,
            _ => Restriction::Default,
        }
    }
}

/// One toggle of a switcher node, by normalised name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleWidget {
    pub name: String,
    pub selected: bool,
}

/// Full outbound record of one switcher node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleRecord {
    pub id: NodeId,
    pub title: String,
    #[serde(rename = "type")]
    pub restriction: Restriction,
    pub widgets: Vec<ToggleWidget>,
}

// ─── Generation status ───────────────────────────────────────────────────

/// Render state reported to the external editor. The spellings are part of
/// the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RenderStatus {
    #[serde(rename = "genrating")]
    Generating,
    #[serde(rename = "genrated")]
    Generated,
    #[serde(rename = "genrate_error")]
    Error,
}

// ─── Inbound payloads ────────────────────────────────────────────────────

/// Inbound float slot entry. Member ids are ignored; matching is by title.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FloatUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
}

/// Inbound string slot entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StringUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// Inbound seed state. Accepts the loose shapes the editor sends: numeric
/// strings for the seed, `"enable"`/`"disable"` for the flag.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SeedUpdate {
    #[serde(deserialize_with = "lenient_seed")]
    pub seed: u64,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub autorandom: bool,
}

/// Inbound switcher state for one node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SwitcherUpdate {
    #[serde(rename = "switcherId", alias = "id")]
    pub switcher_id: NodeId,
    #[serde(default)]
    pub widgets: Vec<ToggleWidget>,
}

fn lenient_seed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    use serde::de::Error;
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.floor() as u64))
            .ok_or_else(|| D::Error::custom(format!("seed out of range: {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.floor() as u64)
            .ok_or_else(|| D::Error::custom(format!("seed is not numeric: {s:?}"))),
        other => Err(D::Error::custom(format!("unexpected seed: {other}"))),
    }
}

fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => s == "enable" || s == "true",
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    })
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    FloatSlots(Vec<FloatUpdate>),
    StringSlots(Vec<StringUpdate>),
    SeedSlot(SeedUpdate),
    Switchers(SwitcherUpdate),
    Alert(String),
    Queue,
    PsConnected,
}

/// Decode a list payload that may arrive as an array, a single object, or a
/// JSON string wrapping either.
fn one_or_many<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, String> {
    match value {
        Value::String(s) => {
            let inner: Value = serde_json::from_str(&s).map_err(|e| e.to_string())?;
            one_or_many(inner)
        }
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(|e| e.to_string()))
            .collect(),
        other => Ok(vec![serde_json::from_value(other).map_err(|e| e.to_string())?]),
    }
}

fn decode_one(kind: MessageType, payload: Value) -> Result<Option<Inbound>, String> {
    let msg = match kind {
        MessageType::FloatSlots => Inbound::FloatSlots(one_or_many(payload)?),
        MessageType::StringSlots => Inbound::StringSlots(one_or_many(payload)?),
        MessageType::SeedSlot => {
            Inbound::SeedSlot(serde_json::from_value(payload).map_err(|e| e.to_string())?)
        }
        MessageType::Switchers => {
            Inbound::Switchers(serde_json::from_value(payload).map_err(|e| e.to_string())?)
        }
        MessageType::Alert => Inbound::Alert(match payload {
            Value::String(s) => s,
            other => other.to_string(),
        }),
        MessageType::Queue => Inbound::Queue,
        MessageType::PsConnected => Inbound::PsConnected,
        // Outbound-only types echoed back are ignored.
        MessageType::ImageSlots | MessageType::RenderStatus | MessageType::Progress => {
            return Ok(None);
        }
    };
    Ok(Some(msg))
}

/// Decode one inbound frame into its messages.
///
/// # Errors
/// Returns an error when the frame is not a JSON object. Individual keys that
/// fail to decode are logged and skipped.
pub fn decode_frame(text: &str) -> Result<Vec<Inbound>, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| format!("invalid frame: {e}"))?;
    let Value::Object(map) = value else {
        return Err(format!("frame is not an object: {text}"));
    };

    let mut out = Vec::with_capacity(map.len());
    for (key, payload) in map {
        let Some(kind) = MessageType::from_key(&key) else {
            log::debug!("ignoring unknown message type {key:?}");
            continue;
        };
        match decode_one(kind, payload) {
            Ok(Some(msg)) => out.push(msg),
            Ok(None) => {}
            Err(e) => log::error!("dropping malformed {kind} payload: {e}"),
        }
    }
    Ok(out)
}

/// Serialize an outbound payload once, keeping struct field order.
///
/// # Errors
/// Returns an error when `value` cannot be serialized.
pub fn to_payload<T: Serialize + ?Sized>(value: &T) -> Result<Box<RawValue>, String> {
    serde_json::value::to_raw_value(value).map_err(|e| e.to_string())
}

/// Encode a single-key outbound frame. A null payload goes out as `true`.
///
/// # Errors
/// Returns an error when the envelope cannot be serialized.
pub fn encode_frame(kind: MessageType, payload: &RawValue) -> Result<String, String> {
    let substituted;
    let payload = if payload.get() == "null" {
        substituted = to_payload(&true)?;
        &*substituted
    } else {
        payload
    };
    let mut envelope = BTreeMap::new();
    envelope.insert(kind.as_str(), payload);
    serde_json::to_string(&envelope).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn message_keys_roundtrip() {
        for kind in MessageType::ALL {
            assert_eq!(MessageType::from_key(kind.as_str()), Some(kind));
        }
        assert_eq!(MessageType::from_key("latestVer"), None);
    }

    #[test]
    fn float_slots_accepts_single_object_and_string() {
        let single = decode_frame(r#"{"FloatSlots":{"title":"MAIN","value":0.3}}"#).unwrap();
        let wrapped =
            decode_frame(r#"{"FloatSlots":"[{\"title\":\"MAIN\",\"value\":0.3}]"}"#).unwrap();
        let expected = vec![Inbound::FloatSlots(vec![FloatUpdate {
            title: Some("MAIN".into()),
            value: Some(0.3),
            min: None,
            max: None,
            step: None,
        }])];
        assert_eq!(single, expected);
        assert_eq!(wrapped, expected);
    }

    #[test]
    fn bad_key_does_not_drop_siblings() {
        let msgs = decode_frame(r#"{"SeedSlot":{"seed":[]},"alert":"hi"}"#).unwrap();
        assert_eq!(msgs, vec![Inbound::Alert("hi".into())]);
    }

    #[test]
    fn non_object_frame_is_error() {
        assert!(decode_frame("[1,2]").is_err());
        assert!(decode_frame("not json").is_err());
    }

    #[test]
    fn seed_accepts_loose_shapes() {
        let msgs =
            decode_frame(r#"{"SeedSlot":{"seed":"4242","autorandom":"enable"}}"#).unwrap();
        assert_eq!(
            msgs,
            vec![Inbound::SeedSlot(SeedUpdate {
                seed: 4242,
                autorandom: true
            })]
        );
    }

    #[test]
    fn switcher_accepts_id_alias() {
        let msgs = decode_frame(
            r#"{"switchers":{"id":7,"widgets":[{"name":"Faces","selected":true}]}}"#,
        )
        .unwrap();
        match &msgs[0] {
            Inbound::Switchers(update) => assert_eq!(update.switcher_id, NodeId(7)),
            other => panic!("expected switchers, got {other:?}"),
        }
    }

    #[test]
    fn encode_wraps_payload_under_key() {
        let status = to_payload(&RenderStatus::Generated).unwrap();
        assert_eq!(
            encode_frame(MessageType::RenderStatus, &status).unwrap(),
            r#"{"render_status":"genrated"}"#
        );
        let null = to_payload(&()).unwrap();
        assert_eq!(encode_frame(MessageType::Queue, &null).unwrap(), r#"{"queue":true}"#);
    }

    #[test]
    fn encode_keeps_field_order() {
        let record = ToggleRecord {
            id: NodeId(1),
            title: "Muter".into(),
            restriction: Restriction::Default,
            widgets: Vec::new(),
        };
        let payload = to_payload(&[record]).unwrap();
        assert_eq!(
            encode_frame(MessageType::Switchers, &payload).unwrap(),
            r#"{"switchers":[{"id":1,"title":"Muter","type":"default","widgets":[]}]}"#
        );
    }

    #[test]
    fn toggle_record_uses_type_key() {
        let record = ToggleRecord {
            id: NodeId(4),
            title: "Group Muter".into(),
            restriction: Restriction::MaxOne,
            widgets: vec![ToggleWidget {
                name: "Upscale".into(),
                selected: false,
            }],
        };
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"id":4,"title":"Group Muter","type":"max one","widgets":[{"name":"Upscale","selected":false}]}"#
        );
    }
}
