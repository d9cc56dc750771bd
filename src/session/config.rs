use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::DEFAULT_SAMPLE_RATE;

/// Configuration for a streaming recognition session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "session-3f1c...")
    pub session_id: String,

    /// Sample rate of inbound PCM (the recognizer expects 16kHz)
    pub sample_rate: u32,

    /// Close the session if no frame arrives for this long
    /// Default: none
    pub idle_timeout: Option<Duration>,
}

impl SessionConfig {
    /// Same settings, fresh session ID
    pub fn for_new_session(&self) -> Self {
        Self {
            session_id: new_session_id(),
            ..self.clone()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: new_session_id(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            idle_timeout: None,
        }
    }
}

fn new_session_id() -> String {
    format!("session-{}", uuid::Uuid::new_v4())
}
