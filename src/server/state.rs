use crate::recognizer::RecognizerFactory;
use crate::session::SessionConfig;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Shared application state for HTTP and websocket handlers
///
/// Nothing here is mutated by sessions except the counters.
#[derive(Clone)]
pub struct AppState {
    /// Builds one recognizer per session from the shared model
    pub factory: Arc<dyn RecognizerFactory>,

    /// Settings copied into every new session
    pub session_template: SessionConfig,

    /// Concurrent session limit, if any
    limiter: Option<Arc<Semaphore>>,
    max_sessions: Option<usize>,

    /// Session counters
    counters: Arc<SessionCounters>,
}

#[derive(Debug, Default)]
struct SessionCounters {
    active: AtomicUsize,
    total: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

/// Snapshot of session counters, served at `/stats`
#[derive(Debug, Clone, Serialize)]
pub struct ServerStats {
    pub recognizer: String,
    pub active_sessions: usize,
    pub total_sessions: usize,
    pub completed_sessions: usize,
    pub failed_sessions: usize,
    pub max_sessions: Option<usize>,
}

/// How a session ended, for the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Completed,
    Abandoned,
    Failed,
}

impl AppState {
    pub fn new(factory: Arc<dyn RecognizerFactory>, session_template: SessionConfig) -> Self {
        Self {
            factory,
            session_template,
            limiter: None,
            max_sessions: None,
            counters: Arc::new(SessionCounters::default()),
        }
    }

    /// Cap concurrent sessions (0 = unlimited)
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = match max_sessions {
            0 => None,
            n => Some(n),
        };
        self.limiter = self.max_sessions.map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    /// Reserve a session slot. `None` means the server is full.
    pub fn try_reserve(&self) -> Option<SessionSlot> {
        let permit = match &self.limiter {
            Some(limiter) => Some(Arc::clone(limiter).try_acquire_owned().ok()?),
            None => None,
        };

        Some(SessionSlot {
            _permit: permit,
            counters: Arc::clone(&self.counters),
        })
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            recognizer: self.factory.name().to_string(),
            active_sessions: self.counters.active.load(Ordering::SeqCst),
            total_sessions: self.counters.total.load(Ordering::SeqCst),
            completed_sessions: self.counters.completed.load(Ordering::SeqCst),
            failed_sessions: self.counters.failed.load(Ordering::SeqCst),
            max_sessions: self.max_sessions,
        }
    }
}

/// A reserved session slot; released on drop
pub struct SessionSlot {
    _permit: Option<OwnedSemaphorePermit>,
    counters: Arc<SessionCounters>,
}

impl SessionSlot {
    /// Mark the session as running
    pub fn start(&self) {
        self.counters.active.fetch_add(1, Ordering::SeqCst);
        self.counters.total.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark the session as ended
    pub fn finish(self, end: SessionEnd) {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        match end {
            SessionEnd::Completed => {
                self.counters.completed.fetch_add(1, Ordering::SeqCst);
            }
            SessionEnd::Failed => {
                self.counters.failed.fetch_add(1, Ordering::SeqCst);
            }
            SessionEnd::Abandoned => {}
        }
    }
}
