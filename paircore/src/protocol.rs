//! JSON text frames exchanged with the pairing-events endpoint.
//!
//! Client to server:
//! - `{"action": "subscribe", "number": "<phone>"}`
//! - `{"action": "ping"}`
//!
//! Server to client, tagged on `eventType` with the payload under `data`:
//! - `qrCode` carrying `{number, qr}`
//! - `authenticated` and `ready` carrying `{number}`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event is missing its `{0}` field")]
    MissingField(&'static str),
    #[error("event field `{0}` has an unexpected type")]
    InvalidField(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum OutboundFrame {
    Subscribe { number: String },
    Ping,
}

impl OutboundFrame {
    pub fn subscribe(number: impl Into<String>) -> Self {
        Self::Subscribe {
            number: number.into(),
        }
    }

    pub fn encode(&self) -> String {
        // Both variants are plain string maps; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    QrCode { number: String, qr: String },
    Authenticated { number: String },
    Ready { number: String },
    /// An `eventType` this client does not know about.
    Unknown(String),
}

impl InboundEvent {
    pub fn event_type(&self) -> &str {
        match self {
            InboundEvent::QrCode { .. } => "qrCode",
            InboundEvent::Authenticated { .. } => "authenticated",
            InboundEvent::Ready { .. } => "ready",
            InboundEvent::Unknown(kind) => kind,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "eventType")]
    event_type: String,
    #[serde(default)]
    data: Value,
}

/// Decodes one server frame.
pub fn parse_inbound(text: &str) -> Result<InboundEvent, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(text)?;

    let event = match envelope.event_type.as_str() {
        "qrCode" => {
            let data = payload(&envelope.data)?;
            InboundEvent::QrCode {
                number: number_field(data)?,
                qr: match data.get("qr") {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(qr)) => qr.clone(),
                    Some(_) => return Err(ProtocolError::InvalidField("qr")),
                },
            }
        }
        "authenticated" => InboundEvent::Authenticated {
            number: number_field(payload(&envelope.data)?)?,
        },
        "ready" => InboundEvent::Ready {
            number: number_field(payload(&envelope.data)?)?,
        },
        _ => InboundEvent::Unknown(envelope.event_type),
    };
    Ok(event)
}

fn payload(data: &Value) -> Result<&serde_json::Map<String, Value>, ProtocolError> {
    data.as_object().ok_or(ProtocolError::MissingField("data"))
}

/// Servers emit the number either as a string or as a bare JSON number.
/// Both are reduced to their trimmed string form.
fn number_field(data: &serde_json::Map<String, Value>) -> Result<String, ProtocolError> {
    match data.get("number") {
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        None | Some(Value::Null) => Err(ProtocolError::MissingField("number")),
        Some(_) => Err(ProtocolError::InvalidField("number")),
    }
}

pub fn numbers_match(received: &str, expected: &str) -> bool {
    received.trim() == expected.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_frames_match_wire_format() {
        let subscribe: Value =
            serde_json::from_str(&OutboundFrame::subscribe("51987654321").encode()).unwrap();
        assert_eq!(
            subscribe,
            serde_json::json!({"action": "subscribe", "number": "51987654321"})
        );

        let ping: Value = serde_json::from_str(&OutboundFrame::Ping.encode()).unwrap();
        assert_eq!(ping, serde_json::json!({"action": "ping"}));
    }

    #[test]
    fn test_parse_qr_code_event() {
        let event = parse_inbound(
            r#"{"eventType":"qrCode","data":{"number":" 51987654321 ","qr":"2@abc,def"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::QrCode {
                number: "51987654321".into(),
                qr: "2@abc,def".into()
            }
        );
    }

    #[test]
    fn test_numeric_number_is_coerced() {
        let event =
            parse_inbound(r#"{"eventType":"ready","data":{"number":51987654321}}"#).unwrap();
        assert_eq!(
            event,
            InboundEvent::Ready {
                number: "51987654321".into()
            }
        );
    }

    #[test]
    fn test_missing_qr_decodes_as_empty() {
        let event = parse_inbound(r#"{"eventType":"qrCode","data":{"number":"1"}}"#).unwrap();
        assert_eq!(
            event,
            InboundEvent::QrCode {
                number: "1".into(),
                qr: String::new()
            }
        );
    }

    #[test]
    fn test_unknown_event_type() {
        let event = parse_inbound(r#"{"eventType":"pong","data":{}}"#).unwrap();
        assert_eq!(event, InboundEvent::Unknown("pong".into()));
        assert_eq!(event.event_type(), "pong");
    }

    #[test]
    fn test_malformed_frames_are_errors() {
        assert!(matches!(
            parse_inbound("not json"),
            Err(ProtocolError::Json(_))
        ));
        assert!(matches!(
            parse_inbound(r#"{"eventType":"authenticated"}"#),
            Err(ProtocolError::MissingField("data"))
        ));
        assert!(matches!(
            parse_inbound(r#"{"eventType":"ready","data":{"number":[1]}}"#),
            Err(ProtocolError::InvalidField("number"))
        ));
    }

    #[test]
    fn test_numbers_match_ignores_surrounding_whitespace() {
        assert!(numbers_match(" 51987654321 ", "51987654321"));
        assert!(!numbers_match("51999999999", "51987654321"));
    }
}
