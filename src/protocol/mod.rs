pub mod messages;

pub use messages::{ResultKind, TranscriptMessage};
