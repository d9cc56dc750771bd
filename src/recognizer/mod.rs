//! Incremental speech recognizer boundary
//!
//! The engine itself is external. This module defines the capability set the
//! streaming session consumes:
//! - `feed`: submit 16kHz mono PCM, learn whether a phrase boundary was reached
//! - `partial_text`: best-effort text of the unfinished tail
//! - `final_text`: finalized text since the last boundary
//!
//! Backends:
//! - Vosk (feature `vosk`, links against libvosk)
//! - Scripted (deterministic double for tests and local runs)

pub mod scripted;
#[cfg(feature = "vosk")]
pub mod vosk;

use anyhow::Result;

pub use scripted::{FeedLog, ScriptStep, ScriptedFactory, ScriptedRecognizer};
#[cfg(feature = "vosk")]
pub use self::vosk::VoskFactory;

/// One recognizer instance, owned by exactly one session
///
/// Calls may block for a while (native decoding); callers must keep them off
/// the async executor.
pub trait Recognizer: Send {
    /// Submit PCM samples. Returns `true` when the audio since the last
    /// boundary holds one or more complete phrases.
    ///
    /// An empty slice is a flush request, not audio.
    fn feed(&mut self, samples: &[i16]) -> Result<bool>;

    /// Current best guess for the not-yet-finalized tail (may be empty)
    fn partial_text(&mut self) -> Result<String>;

    /// Finalized text since the last boundary. Only meaningful once per boundary.
    fn final_text(&mut self) -> Result<String>;
}

/// Builds fresh recognizer instances from shared, read-only model data
pub trait RecognizerFactory: Send + Sync {
    /// Create a new recognizer for a session
    fn create(&self) -> Result<Box<dyn Recognizer>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
