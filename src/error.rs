//! Per-session error taxonomy
//!
//! Every failure inside a streaming session is local to that session. The
//! variant decides which close code the client sees.

use axum::extract::ws::close_code;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// A text frame arrived where binary audio was expected
    #[error("unsupported frame: {0}")]
    UnsupportedFrame(String),

    /// Binary payload that cannot be read as PCM16LE or WAV
    #[error("malformed audio: {0}")]
    Malformed(String),

    /// The recognition engine reported a fault
    #[error("recognizer failure: {0}")]
    Recognizer(String),

    /// The connection failed underneath the session
    #[error("transport failure: {0}")]
    Transport(String),

    /// No frame arrived within the configured idle window
    #[error("session idle for {0}s")]
    Idle(u64),

    /// Anything else that went wrong while driving the session
    #[error("internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Close code sent to the client, if the connection is still usable
    pub fn close_code(&self) -> Option<u16> {
        match self {
            SessionError::UnsupportedFrame(_) => Some(close_code::UNSUPPORTED),
            SessionError::Malformed(_) => Some(close_code::INVALID),
            SessionError::Recognizer(_) | SessionError::Idle(_) | SessionError::Internal(_) => {
                Some(close_code::ERROR)
            }
            // Peer is gone, nothing to answer
            SessionError::Transport(_) => None,
        }
    }
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
