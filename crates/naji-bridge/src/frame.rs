//! Wire Frames
//!
//! Defines the frames exchanged with the host. Outbound frames are always
//! `{type, payload}` with an object payload; inbound frames are classified
//! leniently because the channel is shared with unrelated traffic.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::BridgeError;
use crate::events::EventKind;
use crate::session::{Theme, UserProfile, WalletInfo};

/// Handshake sent once the inbound listener is live.
pub const NAJI_SDK_INIT: &str = "NAJI_SDK_INIT";
/// Host → guest session metadata.
pub const NAJI_INIT_DATA: &str = "NAJI_INIT_DATA";
/// Host → guest reply to a request.
pub const NAJI_ASYNC_RESPONSE: &str = "NAJI_ASYNC_RESPONSE";
/// Host → guest unsolicited event.
pub const NAJI_EVENT: &str = "NAJI_EVENT";
/// Payload key carrying the correlation id of a request.
pub const REQ_ID_KEY: &str = "reqId";

// ─────────────────────────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────────────────────────

/// A frame sent from the guest to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundFrame {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Map<String, Value>,
}

impl OutboundFrame {
    /// Build a notification frame. A unit or `null` payload becomes `{}`.
    pub fn notify(kind: impl Into<String>, payload: impl Serialize) -> Result<Self, BridgeError> {
        let kind = kind.into();
        let payload = payload_object(&kind, payload)?;
        Ok(Self { kind, payload })
    }

    /// Build a request frame with `reqId` merged into the payload.
    pub fn request(
        kind: impl Into<String>,
        payload: impl Serialize,
        req_id: &str,
    ) -> Result<Self, BridgeError> {
        let mut frame = Self::notify(kind, payload)?;
        frame
            .payload
            .insert(REQ_ID_KEY.to_string(), Value::String(req_id.to_string()));
        Ok(frame)
    }

    /// The correlation id, if this is a request frame.
    pub fn request_id(&self) -> Option<&str> {
        self.payload.get(REQ_ID_KEY).and_then(Value::as_str)
    }

    /// Render as a JSON value.
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(2);
        map.insert("type".to_string(), Value::String(self.kind.clone()));
        map.insert("payload".to_string(), Value::Object(self.payload.clone()));
        Value::Object(map)
    }
}

fn payload_object(kind: &str, payload: impl Serialize) -> Result<Map<String, Value>, BridgeError> {
    let value = serde_json::to_value(payload).map_err(|e| BridgeError::InvalidPayload {
        kind: kind.to_string(),
        reason: e.to_string(),
    })?;

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(BridgeError::InvalidPayload {
            kind: kind.to_string(),
            reason: format!("payload must be an object, got {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

/// A classified frame received from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Init(InitData),
    Reply(Reply),
    Event(EventFrame),
}

/// Session metadata carried by an init frame. Each field is independently
/// optional; absent or malformed fields are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitData {
    pub user: Option<UserProfile>,
    pub theme: Option<Theme>,
    pub platform: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub wallet: Option<WalletInfo>,
}

/// Reply to an outstanding request.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub req_id: String,
    pub result: Value,
    pub error: Option<String>,
}

impl Reply {
    /// Success value or the host's failure message. Never both.
    pub fn into_outcome(self) -> Result<Value, String> {
        match self.error {
            Some(message) => Err(message),
            None => Ok(self.result),
        }
    }
}

/// Unsolicited event pushed by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFrame {
    pub name: String,
    pub payload: Value,
}

impl EventFrame {
    pub fn kind(&self) -> EventKind {
        EventKind::from_name(&self.name)
    }
}

impl InboundFrame {
    /// Classify raw inbound data. Returns `None` for anything that is not a
    /// well-formed bridge frame; the caller discards those silently.
    pub fn parse(data: &Value) -> Option<Self> {
        let frame = data.as_object()?;
        let kind = frame.get("type")?.as_str()?;

        match kind {
            NAJI_INIT_DATA => Some(InboundFrame::Init(InitData::from_frame(frame))),
            NAJI_ASYNC_RESPONSE => {
                let req_id = frame.get(REQ_ID_KEY)?.as_str()?.to_string();
                Some(InboundFrame::Reply(Reply {
                    req_id,
                    result: frame.get("result").cloned().unwrap_or(Value::Null),
                    error: frame.get("error").and_then(error_message),
                }))
            }
            NAJI_EVENT => {
                let name = frame.get("eventName")?.as_str()?.to_string();
                Some(InboundFrame::Event(EventFrame {
                    name,
                    payload: frame.get("payload").cloned().unwrap_or(Value::Null),
                }))
            }
            _ => None,
        }
    }
}

impl InitData {
    fn from_frame(frame: &Map<String, Value>) -> Self {
        Self {
            user: frame.get("user").and_then(UserProfile::from_value),
            theme: frame.get("theme").and_then(Value::as_str).and_then(Theme::parse),
            platform: frame
                .get("platform")
                .and_then(Value::as_str)
                .map(str::to_string),
            permissions: frame.get("permissions").and_then(Value::as_array).map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            }),
            wallet: frame.get("wallet").and_then(WalletInfo::from_value),
        }
    }
}

/// Interpret a reply's `error` field. Falsy values mean "no error".
fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Object(map) => Some(
            map.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
        ),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notify_frame_shape() {
        let frame = OutboundFrame::notify("OPEN_LINK", json!({"url": "https://naji.me"})).unwrap();
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"type": "OPEN_LINK", "payload": {"url": "https://naji.me"}})
        );
        assert_eq!(frame.to_value(), serde_json::to_value(&frame).unwrap());
        assert_eq!(frame.request_id(), None);
    }

    #[test]
    fn test_empty_payloads() {
        let frame = OutboundFrame::notify(NAJI_SDK_INIT, ()).unwrap();
        assert!(frame.payload.is_empty());

        let frame = OutboundFrame::notify("APP_READY", Value::Null).unwrap();
        assert_eq!(frame.to_value(), json!({"type": "APP_READY", "payload": {}}));
    }

    #[test]
    fn test_request_merges_req_id() {
        let frame = OutboundFrame::request("STORAGE_GET", json!({"key": "score"}), "abc123").unwrap();
        assert_eq!(frame.request_id(), Some("abc123"));
        assert_eq!(frame.payload["key"], "score");
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let err = OutboundFrame::notify("SHOW_ALERT", "hello").unwrap_err();
        assert!(matches!(err, BridgeError::InvalidPayload { ref kind, .. } if kind == "SHOW_ALERT"));
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn test_parse_discards_garbage() {
        assert_eq!(InboundFrame::parse(&json!("NAJI_INIT_DATA")), None);
        assert_eq!(InboundFrame::parse(&json!(null)), None);
        assert_eq!(InboundFrame::parse(&json!({"payload": {}})), None);
        assert_eq!(InboundFrame::parse(&json!({"type": 7})), None);
        assert_eq!(InboundFrame::parse(&json!({"type": "webpackOk"})), None);
        // Replies and events need their correlation fields.
        assert_eq!(InboundFrame::parse(&json!({"type": NAJI_ASYNC_RESPONSE, "result": 1})), None);
        assert_eq!(InboundFrame::parse(&json!({"type": NAJI_EVENT, "eventName": 3})), None);
    }

    #[test]
    fn test_parse_reply() {
        let frame = InboundFrame::parse(&json!({
            "type": NAJI_ASYNC_RESPONSE,
            "reqId": "r1",
            "result": 42
        }))
        .unwrap();

        let InboundFrame::Reply(reply) = frame else {
            panic!("expected reply");
        };
        assert_eq!(reply.req_id, "r1");
        assert_eq!(reply.into_outcome(), Ok(json!(42)));
    }

    #[test]
    fn test_reply_error_truthiness() {
        let parse = |error: Value| match InboundFrame::parse(&json!({
            "type": NAJI_ASYNC_RESPONSE,
            "reqId": "r",
            "result": true,
            "error": error
        })) {
            Some(InboundFrame::Reply(reply)) => reply.into_outcome(),
            other => panic!("unexpected {:?}", other),
        };

        assert_eq!(parse(json!(null)), Ok(json!(true)));
        assert_eq!(parse(json!("")), Ok(json!(true)));
        assert_eq!(parse(json!(false)), Ok(json!(true)));
        assert_eq!(parse(json!("User cancelled")), Err("User cancelled".to_string()));
        assert_eq!(parse(json!({"message": "boom", "code": 4})), Err("boom".to_string()));
        assert_eq!(parse(json!({"code": 4})), Err("{\"code\":4}".to_string()));
    }

    #[test]
    fn test_parse_event() {
        let frame = InboundFrame::parse(&json!({
            "type": NAJI_EVENT,
            "eventName": "themeChanged",
            "payload": {"theme": "dark"}
        }))
        .unwrap();

        let InboundFrame::Event(event) = frame else {
            panic!("expected event");
        };
        assert_eq!(event.kind(), EventKind::ThemeChanged);
        assert_eq!(event.payload, json!({"theme": "dark"}));
    }

    #[test]
    fn test_parse_init_defaults_each_field() {
        let frame = InboundFrame::parse(&json!({
            "type": NAJI_INIT_DATA,
            "user": {"username": "ann"},
            "theme": 12,
            "permissions": ["storage", 5, "wallet"]
        }))
        .unwrap();

        let InboundFrame::Init(init) = frame else {
            panic!("expected init");
        };
        assert_eq!(init.user.unwrap().username.as_deref(), Some("ann"));
        assert_eq!(init.theme, None);
        assert_eq!(init.platform, None);
        assert_eq!(init.permissions, Some(vec!["storage".to_string(), "wallet".to_string()]));
        assert_eq!(init.wallet, None);
    }
}
