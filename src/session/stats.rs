use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::SessionState;

/// Which finalization tier produced the terminal answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalSource {
    /// Text flushed out of the recognizer at end of stream
    Flush,
    /// Last phrase finalized while streaming
    LastPhrase,
    /// Last partial seen while streaming, never confirmed
    LastPartial,
    /// Nothing recognized at all
    Empty,
}

/// Statistics about a streaming session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Session identifier
    pub session_id: String,

    /// Current lifecycle state
    pub state: SessionState,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Audio frames fed to the recognizer
    pub frames_received: usize,

    /// Samples fed to the recognizer
    pub samples_received: usize,

    /// Partial messages produced
    pub partials_emitted: usize,

    /// Phrase messages produced
    pub phrases_emitted: usize,

    /// Tier that produced the terminal answer, once finalized
    pub final_source: Option<FinalSource>,
}

impl SessionStats {
    /// Seconds of audio received, given the sample rate
    pub fn audio_secs(&self, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.samples_received as f64 / sample_rate as f64
    }
}
