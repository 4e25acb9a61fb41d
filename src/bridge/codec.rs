//! Wire codec for bridge envelopes.
//!
//! One JSON object per text frame. Inbound frames are classified by their
//! `type` field; the only outbound frame is `{"type":"send","to":...,"text":...}`.
//! Decoding is tolerant: missing payload fields default, garbage becomes a
//! `CodecError` instead of crossing component boundaries as a panic.

use serde::Deserialize;

use crate::error::CodecError;

/// How much of a bad frame is kept for diagnostics.
const EXCERPT_LEN: usize = 100;

/// One decoded unit of bridge communication.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A chat message, direct or group.
    Message(InboundMessage),
    /// Connection status report from the peer (e.g. "connected").
    Status(String),
    /// Pairing prompt — the operator scans a QR code in the bridge terminal.
    AuthPrompt,
    /// Error reported by the peer.
    Error(String),
}

/// Payload of a `message` frame.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InboundMessage {
    /// Legacy phone-number JID (`<phone>@s.whatsapp.net`). Deprecated
    /// upstream; may be empty on newer accounts.
    #[serde(default)]
    pub pn: String,
    /// Sender JID in the newer linked-identity form. This is the full
    /// address replies must be sent to.
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "isGroup")]
    pub is_group: bool,
    /// Network-assigned message id.
    #[serde(default)]
    pub id: Option<String>,
    /// Unix timestamp in seconds, as reported by the network.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Decode one text frame from the bridge.
pub fn decode(raw: &str) -> Result<InboundEvent, CodecError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|_| CodecError::Malformed {
        excerpt: excerpt(raw),
    })?;

    let kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();

    match kind.as_str() {
        "message" => {
            let msg: InboundMessage =
                serde_json::from_value(value).map_err(|_| CodecError::Malformed {
                    excerpt: excerpt(raw),
                })?;
            Ok(InboundEvent::Message(msg))
        }
        "status" => Ok(InboundEvent::Status(field(&value, "status"))),
        "qr" => Ok(InboundEvent::AuthPrompt),
        "error" => Ok(InboundEvent::Error(field(&value, "error"))),
        _ => Err(CodecError::UnknownKind { kind }),
    }
}

/// Encode an outbound send request for `chat_id`.
pub fn encode_send(to: &str, text: &str) -> String {
    serde_json::json!({
        "type": "send",
        "to": to,
        "text": text,
    })
    .to_string()
}

fn field(value: &serde_json::Value, name: &str) -> String {
    value
        .get(name)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// First `EXCERPT_LEN` chars of the frame, on a char boundary.
fn excerpt(raw: &str) -> String {
    raw.chars().take(EXCERPT_LEN).collect()
}
