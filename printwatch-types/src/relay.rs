//! Payload forwarded to the downstream relay consumer.

/// Action the relay performs on forwarded text.
pub const ACTION_PROCESS_TEXT: &str = "process_text";

/// One outbound message to the relay.
///
/// The credential is sent under the `API_KEY` key on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelayPayload {
    #[cfg_attr(feature = "serde", serde(rename = "API_KEY"))]
    pub credential: String,
    pub action: String,
    pub text: String,
}

impl RelayPayload {
    /// Build a `process_text` payload.
    pub fn process_text(credential: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            action: ACTION_PROCESS_TEXT.to_string(),
            text: text.into(),
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let payload = RelayPayload::process_text("secret", "Notify:The printer is ready.");
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["API_KEY"], "secret");
        assert_eq!(value["action"], "process_text");
        assert_eq!(value["text"], "Notify:The printer is ready.");
        assert!(value.get("credential").is_none());
    }
}
