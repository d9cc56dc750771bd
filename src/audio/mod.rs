pub mod frame;
pub mod wav;

pub use frame::{FrameDecoder, InboundFrame};
pub use wav::{is_wav_container, strip_wav_header, WavHeader};

/// Sample rate the recognizer expects (16kHz mono PCM)
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;
