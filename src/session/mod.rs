//! Streaming recognition sessions
//!
//! A `RecognitionSession` owns one recognizer and turns inbound frames into
//! transcript messages:
//! - audio frames are fed incrementally, producing partial or phrase results
//! - the end-of-stream sentinel runs the finalization fallback
//! - any recognizer fault closes the session
//!
//! Lifecycle: Streaming -> Finalizing -> Closed, each entered once.

mod config;
mod session;
mod stats;

pub use config::SessionConfig;
pub use session::{RecognitionSession, SessionState, Step};
pub use stats::{FinalSource, SessionStats};
