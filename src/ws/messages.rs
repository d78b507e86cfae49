//! Wire frame parsing and error payloads.
//!
//! Inbound frames are JSON objects with an `action` discriminator and
//! action-specific fields. Outbound traffic is either a broadcast
//! [`crate::domain::RoomEvent`] (serialized with its `type` tag) or a
//! `{"error": ...}` object sent to the originating connection only.

use serde_json::{Value, json};

use crate::error::GatewayError;

/// Parses an inbound text frame into `(action, params)`.
///
/// The whole frame is handed to the action as its parameter object, so
/// actions read their fields the same way regardless of nesting.
///
/// # Errors
///
/// Returns [`GatewayError::ProtocolError`] for malformed JSON and
/// [`GatewayError::UnknownAction`] when the `action` field is missing or
/// not a string.
pub fn parse_frame(text: &str) -> Result<(String, Value), GatewayError> {
    let frame: Value = serde_json::from_str(text).map_err(|_| GatewayError::ProtocolError)?;
    let action = frame
        .get("action")
        .and_then(Value::as_str)
        .ok_or(GatewayError::UnknownAction)?
        .to_string();
    Ok((action, frame))
}

/// Serializes an error for the originating connection:
/// `{"error": "<message>"}`.
#[must_use]
pub fn error_payload(error: &GatewayError) -> String {
    json!({ "error": error.to_string() }).to_string()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parse_extracts_action_and_keeps_fields() {
        let parsed = parse_frame(r#"{"action": "submit_vote", "vote": 5}"#);
        let Ok((action, params)) = parsed else {
            panic!("expected parse to succeed");
        };
        assert_eq!(action, "submit_vote");
        assert_eq!(params.get("vote"), Some(&json!(5)));
    }

    #[test]
    fn malformed_json_is_a_protocol_error() {
        let parsed = parse_frame("{nope");
        assert!(matches!(parsed, Err(GatewayError::ProtocolError)));
    }

    #[test]
    fn missing_action_field_is_unknown_action() {
        assert!(matches!(
            parse_frame(r#"{"vote": 5}"#),
            Err(GatewayError::UnknownAction)
        ));
        assert!(matches!(
            parse_frame(r#"{"action": 7}"#),
            Err(GatewayError::UnknownAction)
        ));
    }

    #[test]
    fn error_payload_is_flat_error_object() {
        assert_eq!(
            error_payload(&GatewayError::ProtocolError),
            r#"{"error":"Invalid JSON format"}"#
        );
        assert_eq!(
            error_payload(&GatewayError::UnknownAction),
            r#"{"error":"Invalid action"}"#
        );
    }
}
