pub mod audio;
pub mod config;
pub mod error;
pub mod protocol;
pub mod recognizer;
pub mod server;
pub mod session;

pub use audio::{FrameDecoder, InboundFrame};
pub use config::Config;
pub use error::{SessionError, SessionResult};
pub use protocol::{ResultKind, TranscriptMessage};
pub use recognizer::{Recognizer, RecognizerFactory, ScriptStep, ScriptedFactory};
pub use server::{create_router, AppState};
pub use session::{FinalSource, RecognitionSession, SessionConfig, SessionState, SessionStats};
