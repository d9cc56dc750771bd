use axum::extract::ws::{close_code, Message, WebSocket};
use futures::{Sink, Stream, StreamExt};
use std::fmt::Display;
use std::net::SocketAddr;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::emitter::ResultEmitter;
use super::state::{AppState, SessionEnd, SessionSlot};
use crate::audio::{FrameDecoder, InboundFrame};
use crate::error::{SessionError, SessionResult};
use crate::session::{RecognitionSession, SessionConfig, SessionStats, Step};

/// How a session that did not fail came to an end
#[derive(Debug)]
pub enum SessionOutcome {
    /// Final message sent, connection closed normally
    Completed(SessionStats),
    /// Client left before the end-of-stream sentinel
    Abandoned(SessionStats),
}

/// Run one websocket connection as a recognition session
pub async fn handle_socket(
    socket: WebSocket,
    remote_addr: SocketAddr,
    state: AppState,
    slot: SessionSlot,
) {
    let config = state.session_template.for_new_session();
    let span = info_span!("session", id = %config.session_id, remote = %remote_addr);

    async move {
        info!("Client connected from {}", remote_addr);
        slot.start();

        let (sink, stream) = socket.split();
        let end = run_session(&state, config, sink, stream).await;

        slot.finish(end);
        info!("Connection closed for {}", remote_addr);
    }
    .instrument(span)
    .await
}

/// Build the session, drive it to completion and close the connection
///
/// Failures stay inside this session; they are logged and answered with a
/// close code where the connection still allows it.
pub async fn run_session<S, R, E>(
    state: &AppState,
    config: SessionConfig,
    sink: S,
    mut stream: R,
) -> SessionEnd
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut emitter = ResultEmitter::new(sink);

    let recognizer = match state.factory.create() {
        Ok(recognizer) => recognizer,
        Err(e) => {
            error!("Failed to create {} recognizer: {:#}", state.factory.name(), e);
            if let Err(close_err) = emitter
                .close(close_code::ERROR, "recognizer unavailable")
                .await
            {
                debug!("Could not send close frame: {}", close_err);
            }
            return SessionEnd::Failed;
        }
    };

    let sample_rate = config.sample_rate;
    let decoder = FrameDecoder::new(sample_rate);
    let session = RecognitionSession::new(config, recognizer);

    match drive(session, &mut stream, &mut emitter, decoder).await {
        Ok(SessionOutcome::Completed(stats)) => {
            info!(
                "Session complete: {} frames ({:.1}s audio), {} partials, {} phrases, final from {:?} ({:.1}s)",
                stats.frames_received,
                stats.audio_secs(sample_rate),
                stats.partials_emitted,
                stats.phrases_emitted,
                stats.final_source,
                stats.duration_secs
            );
            SessionEnd::Completed
        }
        Ok(SessionOutcome::Abandoned(stats)) => {
            info!(
                "Client left before end of stream after {} frames",
                stats.frames_received
            );
            SessionEnd::Abandoned
        }
        Err(e) => {
            match &e {
                SessionError::Transport(_) => warn!("Session aborted: {}", e),
                _ => error!("Session failed: {}", e),
            }
            if let Some(code) = e.close_code() {
                if let Err(close_err) = emitter.close(code, &e.to_string()).await {
                    debug!("Could not send close frame: {}", close_err);
                }
            }
            SessionEnd::Failed
        }
    }
}

/// Read frames one at a time and push each through the session
///
/// The next frame is not read until the current one has been recognized and
/// its result sent.
async fn drive<S, R, E>(
    mut session: RecognitionSession,
    stream: &mut R,
    emitter: &mut ResultEmitter<S>,
    decoder: FrameDecoder,
) -> SessionResult<SessionOutcome>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let idle_timeout = session.config().idle_timeout;

    loop {
        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    session.abort();
                    return Err(SessionError::Idle(limit.as_secs()));
                }
            },
            None => stream.next().await,
        };

        let payload = match next {
            Some(Ok(Message::Binary(data))) => data,
            Some(Ok(Message::Text(text))) => {
                session.abort();
                return Err(SessionError::UnsupportedFrame(format!(
                    "expected binary audio, got {} bytes of text",
                    text.len()
                )));
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => {
                session.abort();
                return Ok(SessionOutcome::Abandoned(session.stats()));
            }
            Some(Err(e)) => {
                session.abort();
                return Err(SessionError::Transport(e.to_string()));
            }
        };

        let frame = match decoder.decode(&payload) {
            Ok(frame) => frame,
            Err(e) => {
                session.abort();
                return Err(e);
            }
        };

        let (returned, step) = process_frame(session, frame).await?;
        session = returned;

        match step? {
            Step::Continue(message) => {
                if let Err(e) = emitter.emit(&message).await {
                    session.abort();
                    return Err(e);
                }
            }
            Step::Ignored => {}
            Step::Finish(message) => {
                emitter.emit(&message).await?;
                emitter.close(close_code::NORMAL, "end of stream").await?;
                return Ok(SessionOutcome::Completed(session.stats()));
            }
        }
    }
}

/// Run the session's recognizer work for one frame on the blocking pool
async fn process_frame(
    mut session: RecognitionSession,
    frame: InboundFrame,
) -> SessionResult<(RecognitionSession, SessionResult<Step>)> {
    tokio::task::spawn_blocking(move || {
        let step = session.handle_frame(frame);
        (session, step)
    })
    .await
    .map_err(|e| SessionError::Internal(format!("recognizer task failed: {}", e)))
}
