use serde::{Deserialize, Serialize};

/// Inbound messages from the transcription service, discriminated by the
/// `type` field. Payloads that do not match one of these shapes fail to
/// parse and are silently discarded by the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Provisional text; replaces the current partial segment wholesale
    Partial { text: String },
    /// Finalized text; trimmed and appended to the committed transcript
    Final { text: String },
    /// Status display only
    Info { message: String },
    /// Status display plus diagnostics
    Error { message: String },
}

impl ServerMessage {
    /// Parse a text frame, returning `None` for anything unrecognized.
    pub fn parse(payload: &str) -> Option<Self> {
        serde_json::from_str(payload).ok()
    }
}

/// Outbound control message configuring the session language.
///
/// Sent once on connect and again on every language change. An empty
/// language code asks the service to auto-detect.
#[derive(Debug, Clone, Serialize)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "setLanguage")]
    pub set_language: String,
}

impl ControlMessage {
    pub fn set_language(code: impl Into<String>) -> Self {
        Self {
            kind: "control",
            set_language: code.into(),
        }
    }
}

/// Outbound client-side error report; the service logs these.
#[derive(Debug, Clone, Serialize)]
pub struct ClientErrorMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    pub message: String,
}

impl ClientErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: "client-error",
            message: message.into(),
        }
    }
}
