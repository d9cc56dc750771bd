use serde::{Deserialize, Serialize};

/// Which stage of recognition produced a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    /// Best-effort text for audio not yet confirmed as a phrase
    Partial,
    /// A phrase boundary reached while streaming
    Phrase,
    /// The single terminal answer for the session
    Final,
}

/// Outbound transcript message, sent as a JSON text frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    #[serde(rename = "type")]
    pub kind: ResultKind,
    pub text: String,
}

impl TranscriptMessage {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Partial,
            text: text.into(),
        }
    }

    pub fn phrase(text: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Phrase,
            text: text.into(),
        }
    }

    pub fn final_result(text: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Final,
            text: text.into(),
        }
    }

    pub fn is_final(&self) -> bool {
        self.kind == ResultKind::Final
    }
}
