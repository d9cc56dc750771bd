use axum::extract::ws::{CloseFrame, Message};
use futures::{Sink, SinkExt};
use std::borrow::Cow;
use std::fmt::Display;
use tracing::{debug, warn};

use crate::error::{SessionError, SessionResult};
use crate::protocol::TranscriptMessage;

/// Close reasons must fit in a control frame
const MAX_CLOSE_REASON_BYTES: usize = 123;

/// Writes a session's transcript messages to the client, in order
///
/// Messages go out one at a time, each awaited before the next is accepted.
/// After the final message nothing else is sent except the close frame.
pub struct ResultEmitter<S> {
    sink: S,
    sent: usize,
    finished: bool,
    closed: bool,
}

impl<S> ResultEmitter<S>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            sent: 0,
            finished: false,
            closed: false,
        }
    }

    /// Serialize and send one transcript message
    pub async fn emit(&mut self, message: &TranscriptMessage) -> SessionResult<()> {
        if self.finished || self.closed {
            warn!("Dropping {:?} message after session end", message.kind);
            return Ok(());
        }

        let json = serde_json::to_string(message)
            .map_err(|e| SessionError::Internal(format!("Failed to serialize message: {}", e)))?;

        self.sink
            .send(Message::Text(json))
            .await
            .map_err(|e| SessionError::Transport(format!("Failed to send message: {}", e)))?;

        self.sent += 1;
        if message.is_final() {
            self.finished = true;
        }

        debug!("Sent {:?} message #{}", message.kind, self.sent);
        Ok(())
    }

    /// Send a close frame; later calls are no-ops
    pub async fn close(&mut self, code: u16, reason: &str) -> SessionResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let frame = CloseFrame {
            code,
            reason: Cow::Owned(truncate_reason(reason).to_string()),
        };

        self.sink
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| SessionError::Transport(format!("Failed to send close frame: {}", e)))
    }
}

fn truncate_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON_BYTES {
        return reason;
    }
    let mut end = MAX_CLOSE_REASON_BYTES;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::close_code;
    use futures::channel::mpsc;
    use futures::StreamExt;

    fn text_of(message: Message) -> String {
        match message {
            Message::Text(text) => text,
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_emits_in_order_then_closes() {
        let (tx, mut rx) = mpsc::unbounded();
        let mut emitter = ResultEmitter::new(tx);

        emitter.emit(&TranscriptMessage::partial("hel")).await.unwrap();
        emitter.emit(&TranscriptMessage::phrase("hello")).await.unwrap();
        emitter.emit(&TranscriptMessage::final_result("hello")).await.unwrap();
        emitter.close(close_code::NORMAL, "end of stream").await.unwrap();

        assert_eq!(
            text_of(rx.next().await.unwrap()),
            r#"{"type":"partial","text":"hel"}"#
        );
        assert_eq!(
            text_of(rx.next().await.unwrap()),
            r#"{"type":"phrase","text":"hello"}"#
        );
        assert_eq!(
            text_of(rx.next().await.unwrap()),
            r#"{"type":"final","text":"hello"}"#
        );
        match rx.next().await.unwrap() {
            Message::Close(Some(frame)) => assert_eq!(frame.code, 1000),
            other => panic!("expected close, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_nothing_after_final() {
        let (tx, mut rx) = mpsc::unbounded();
        let mut emitter = ResultEmitter::new(tx);

        emitter.emit(&TranscriptMessage::final_result("done")).await.unwrap();
        emitter.emit(&TranscriptMessage::final_result("again")).await.unwrap();
        emitter.emit(&TranscriptMessage::partial("late")).await.unwrap();
        drop(emitter);

        let received: Vec<Message> = rx.collect().await;
        assert_eq!(received.len(), 1);
        assert!(text_of(received[0].clone()).contains("done"));
    }

    #[tokio::test]
    async fn test_close_is_sent_once() {
        let (tx, rx) = mpsc::unbounded();
        let mut emitter = ResultEmitter::new(tx);

        emitter.close(close_code::ERROR, "boom").await.unwrap();
        emitter.close(close_code::NORMAL, "again").await.unwrap();
        drop(emitter);

        let received: Vec<Message> = rx.collect().await;
        assert_eq!(received.len(), 1);
    }

    #[tokio::test]
    async fn test_send_failure_is_transport_error() {
        let (tx, rx) = mpsc::unbounded::<Message>();
        drop(rx);
        let mut emitter = ResultEmitter::new(tx);

        let err = emitter.emit(&TranscriptMessage::partial("x")).await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[test]
    fn test_truncate_reason_respects_char_boundaries() {
        let long = "é".repeat(100);
        let truncated = truncate_reason(&long);
        assert!(truncated.len() <= MAX_CLOSE_REASON_BYTES);
        assert!(long.starts_with(truncated));
    }
}
