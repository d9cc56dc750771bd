use super::config::SessionConfig;
use super::stats::{FinalSource, SessionStats};
use crate::audio::InboundFrame;
use crate::error::{SessionError, SessionResult};
use crate::protocol::TranscriptMessage;
use crate::recognizer::Recognizer;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Streaming,
    Finalizing,
    Closed,
}

/// Result of handling one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Keep streaming after emitting the message
    Continue(TranscriptMessage),
    /// Terminal answer; emit it and close normally
    Finish(TranscriptMessage),
    /// Session is past streaming, the frame has no effect
    Ignored,
}

/// Per-connection recognition state machine
///
/// Recognizer calls block; drive this from a blocking worker, never directly on
/// the async executor.
pub struct RecognitionSession {
    /// Session configuration
    config: SessionConfig,

    /// Exclusively owned recognizer, released once the session closes
    recognizer: Option<Box<dyn Recognizer>>,

    /// Lifecycle state
    state: SessionState,

    /// Most recent non-empty partial text
    last_partial: String,

    /// Most recent non-empty phrase text seen while streaming
    last_final: String,

    /// When the session started
    started_at: chrono::DateTime<chrono::Utc>,

    frames_received: usize,
    samples_received: usize,
    partials_emitted: usize,
    phrases_emitted: usize,
    final_source: Option<FinalSource>,
}

impl RecognitionSession {
    /// Create a new session around a freshly built recognizer
    pub fn new(config: SessionConfig, recognizer: Box<dyn Recognizer>) -> Self {
        info!("Creating recognition session: {}", config.session_id);

        Self {
            config,
            recognizer: Some(recognizer),
            state: SessionState::Streaming,
            last_partial: String::new(),
            last_final: String::new(),
            started_at: Utc::now(),
            frames_received: 0,
            samples_received: 0,
            partials_emitted: 0,
            phrases_emitted: 0,
            final_source: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_partial(&self) -> &str {
        &self.last_partial
    }

    pub fn last_final(&self) -> &str {
        &self.last_final
    }

    /// Whether the recognizer is still held
    pub fn has_recognizer(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Handle one inbound frame
    ///
    /// On error the session is already closed and its recognizer released.
    pub fn handle_frame(&mut self, frame: InboundFrame) -> SessionResult<Step> {
        if self.state != SessionState::Streaming {
            debug!("Ignoring frame in state {:?}", self.state);
            return Ok(Step::Ignored);
        }

        let result = match frame {
            InboundFrame::Audio(samples) => self.accept_audio(&samples).map(Step::Continue),
            InboundFrame::EndOfStream => self.finish().map(Step::Finish),
        };

        if let Err(e) = &result {
            warn!("Session {} failed: {}", self.config.session_id, e);
            self.close();
        }

        result
    }

    /// Abandon the session (client went away, idle, transport error)
    ///
    /// No finalization is attempted.
    pub fn abort(&mut self) {
        if self.state != SessionState::Closed {
            info!(
                "Abandoning session {} in state {:?}",
                self.config.session_id, self.state
            );
        }
        self.close();
    }

    /// Get current session statistics
    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            session_id: self.config.session_id.clone(),
            state: self.state,
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_received: self.frames_received,
            samples_received: self.samples_received,
            partials_emitted: self.partials_emitted,
            phrases_emitted: self.phrases_emitted,
            final_source: self.final_source,
        }
    }

    /// Feed one audio chunk and classify the result
    ///
    /// Every chunk yields a message; only non-empty text is remembered for
    /// the finalization fallback.
    fn accept_audio(&mut self, samples: &[i16]) -> SessionResult<TranscriptMessage> {
        let recognizer = self.recognizer()?;

        let boundary = recognizer.feed(samples).map_err(recognizer_error)?;

        let message = if boundary {
            let text = recognizer.final_text().map_err(recognizer_error)?;
            debug!("Phrase: {}", text);
            if !text.is_empty() {
                self.last_final = text.clone();
            }
            self.phrases_emitted += 1;
            TranscriptMessage::phrase(text)
        } else {
            let text = recognizer.partial_text().map_err(recognizer_error)?;
            debug!("Partial: {}", text);
            if !text.is_empty() {
                self.last_partial = text.clone();
            }
            self.partials_emitted += 1;
            TranscriptMessage::partial(text)
        };

        self.frames_received += 1;
        self.samples_received += samples.len();

        Ok(message)
    }

    /// End of stream: run the finalization fallback and close
    fn finish(&mut self) -> SessionResult<TranscriptMessage> {
        info!(
            "End of stream for session {}, finalizing...",
            self.config.session_id
        );
        self.state = SessionState::Finalizing;

        let recognizer = self.recognizer()?;

        // Flush; both outcomes may carry usable text
        let boundary = recognizer.feed(&[]).map_err(recognizer_error)?;
        let flushed = recognizer.final_text().map_err(recognizer_error)?;
        debug!("Flush returned boundary={} text={:?}", boundary, flushed);

        let (source, text) = if !flushed.is_empty() {
            (FinalSource::Flush, flushed)
        } else if !self.last_final.is_empty() {
            (FinalSource::LastPhrase, self.last_final.clone())
        } else if !self.last_partial.is_empty() {
            (FinalSource::LastPartial, self.last_partial.clone())
        } else {
            (FinalSource::Empty, String::new())
        };

        match source {
            FinalSource::Flush => info!("Final result: {}", text),
            FinalSource::LastPhrase => info!("Using last phrase as final result: {}", text),
            FinalSource::LastPartial => info!("Using last partial as final result: {}", text),
            FinalSource::Empty => info!("No results found, sending empty text"),
        }

        self.final_source = Some(source);
        self.close();

        Ok(TranscriptMessage::final_result(text))
    }

    fn recognizer(&mut self) -> SessionResult<&mut Box<dyn Recognizer>> {
        self.recognizer
            .as_mut()
            .ok_or_else(|| SessionError::Internal("recognizer already released".to_string()))
    }

    fn close(&mut self) {
        self.state = SessionState::Closed;
        self.recognizer = None;
    }
}

fn recognizer_error(e: anyhow::Error) -> SessionError {
    SessionError::Recognizer(format!("{:#}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ResultKind;
    use crate::recognizer::{ScriptStep, ScriptedRecognizer};

    fn session(steps: Vec<ScriptStep>) -> RecognitionSession {
        RecognitionSession::new(
            SessionConfig::default(),
            Box::new(ScriptedRecognizer::new(steps)),
        )
    }

    fn audio() -> InboundFrame {
        InboundFrame::Audio(vec![1, 2, 3, 4])
    }

    fn finish(session: &mut RecognitionSession) -> TranscriptMessage {
        match session.handle_frame(InboundFrame::EndOfStream).unwrap() {
            Step::Finish(msg) => msg,
            other => panic!("expected Finish, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_and_phrase_classification() {
        let mut s = session(vec![ScriptStep::partial("hel"), ScriptStep::phrase("hello")]);

        assert_eq!(
            s.handle_frame(audio()).unwrap(),
            Step::Continue(TranscriptMessage::partial("hel"))
        );
        assert_eq!(s.last_partial(), "hel");

        assert_eq!(
            s.handle_frame(audio()).unwrap(),
            Step::Continue(TranscriptMessage::phrase("hello"))
        );
        assert_eq!(s.last_final(), "hello");
        assert_eq!(s.state(), SessionState::Streaming);
    }

    #[test]
    fn test_empty_results_are_emitted_but_not_stored() {
        let mut s = session(vec![
            ScriptStep::partial("one"),
            ScriptStep::partial(""),
            ScriptStep::phrase(""),
        ]);

        s.handle_frame(audio()).unwrap();
        assert_eq!(
            s.handle_frame(audio()).unwrap(),
            Step::Continue(TranscriptMessage::partial(""))
        );
        assert_eq!(
            s.handle_frame(audio()).unwrap(),
            Step::Continue(TranscriptMessage::phrase(""))
        );
        assert_eq!(s.last_partial(), "one");
        assert_eq!(s.last_final(), "");
    }

    #[test]
    fn test_values_are_replaced_not_appended() {
        let mut s = session(vec![
            ScriptStep::partial("a"),
            ScriptStep::partial("a b"),
            ScriptStep::phrase("first"),
            ScriptStep::phrase("second"),
        ]);
        for _ in 0..4 {
            s.handle_frame(audio()).unwrap();
        }
        assert_eq!(s.last_partial(), "a b");
        assert_eq!(s.last_final(), "second");
    }

    #[test]
    fn test_fallback_flush_wins() {
        let mut s = session(vec![
            ScriptStep::partial("par"),
            ScriptStep::phrase("earlier"),
            ScriptStep::phrase("flushed"),
        ]);
        s.handle_frame(audio()).unwrap();
        s.handle_frame(audio()).unwrap();

        assert_eq!(finish(&mut s), TranscriptMessage::final_result("flushed"));
        assert_eq!(s.stats().final_source, Some(FinalSource::Flush));
    }

    #[test]
    fn test_fallback_flush_without_boundary_still_counts() {
        let mut s = session(vec![ScriptStep::phrase("earlier"), ScriptStep::pending("tail")]);
        s.handle_frame(audio()).unwrap();

        assert_eq!(finish(&mut s).text, "tail");
        assert_eq!(s.stats().final_source, Some(FinalSource::Flush));
    }

    #[test]
    fn test_fallback_last_phrase() {
        let mut s = session(vec![
            ScriptStep::phrase("hello"),
            ScriptStep::partial("wor"),
            ScriptStep::phrase(""),
        ]);
        s.handle_frame(audio()).unwrap();
        s.handle_frame(audio()).unwrap();

        assert_eq!(finish(&mut s).text, "hello");
        assert_eq!(s.stats().final_source, Some(FinalSource::LastPhrase));
    }

    #[test]
    fn test_fallback_last_partial() {
        let mut s = session(vec![ScriptStep::partial("maybe"), ScriptStep::partial("")]);
        s.handle_frame(audio()).unwrap();

        assert_eq!(finish(&mut s).text, "maybe");
        assert_eq!(s.stats().final_source, Some(FinalSource::LastPartial));
    }

    #[test]
    fn test_fallback_all_empty_is_not_an_error() {
        let mut s = session(vec![]);
        let msg = finish(&mut s);

        assert_eq!(msg.kind, ResultKind::Final);
        assert_eq!(msg.text, "");
        assert_eq!(s.stats().final_source, Some(FinalSource::Empty));
        assert_eq!(s.state(), SessionState::Closed);
    }

    #[test]
    fn test_end_to_end_hello_world() {
        let mut s = session(vec![
            ScriptStep::phrase("hello"),
            ScriptStep::phrase("world"),
            ScriptStep::phrase(""),
        ]);

        assert_eq!(
            s.handle_frame(audio()).unwrap(),
            Step::Continue(TranscriptMessage::phrase("hello"))
        );
        assert_eq!(
            s.handle_frame(audio()).unwrap(),
            Step::Continue(TranscriptMessage::phrase("world"))
        );
        assert_eq!(finish(&mut s), TranscriptMessage::final_result("world"));
    }

    #[test]
    fn test_sentinel_flushes_once_and_is_not_audio() {
        let recognizer = ScriptedRecognizer::new(vec![ScriptStep::partial("x")]);
        let log = recognizer.feed_log();
        let mut s = RecognitionSession::new(SessionConfig::default(), Box::new(recognizer));

        s.handle_frame(audio()).unwrap();
        finish(&mut s);

        // One audio feed, then exactly one flush
        assert_eq!(*log.lock().unwrap(), vec![4, 0]);
        assert_eq!(s.stats().frames_received, 1);
        assert_eq!(s.stats().samples_received, 4);
    }

    #[test]
    fn test_second_sentinel_is_ignored() {
        let mut s = session(vec![ScriptStep::phrase("done")]);
        finish(&mut s);

        assert_eq!(s.handle_frame(InboundFrame::EndOfStream).unwrap(), Step::Ignored);
        assert_eq!(s.handle_frame(audio()).unwrap(), Step::Ignored);
    }

    #[test]
    fn test_recognizer_fault_closes_session() {
        let mut s = session(vec![
            ScriptStep::partial("ok"),
            ScriptStep::Fail("bad samples".to_string()),
        ]);
        s.handle_frame(audio()).unwrap();

        let err = s.handle_frame(audio()).unwrap_err();
        assert!(matches!(err, SessionError::Recognizer(_)));
        assert!(err.to_string().contains("bad samples"));
        assert_eq!(s.state(), SessionState::Closed);
        assert!(!s.has_recognizer());

        // No finalization after a fault
        assert_eq!(s.handle_frame(InboundFrame::EndOfStream).unwrap(), Step::Ignored);
    }

    #[test]
    fn test_fault_during_flush_closes_without_final() {
        let mut s = session(vec![ScriptStep::Fail("flush failed".to_string())]);
        let err = s.handle_frame(InboundFrame::EndOfStream).unwrap_err();

        assert!(matches!(err, SessionError::Recognizer(_)));
        assert_eq!(s.state(), SessionState::Closed);
        assert_eq!(s.stats().final_source, None);
    }

    #[test]
    fn test_abort_releases_recognizer() {
        let mut s = session(vec![ScriptStep::partial("hi")]);
        s.handle_frame(audio()).unwrap();
        s.abort();

        assert_eq!(s.state(), SessionState::Closed);
        assert!(!s.has_recognizer());
        assert_eq!(s.handle_frame(audio()).unwrap(), Step::Ignored);
    }
}
