use tracing::debug;

use super::wav::{is_wav_container, strip_wav_header};
use super::DEFAULT_SAMPLE_RATE;
use crate::error::{SessionError, SessionResult};

/// One inbound binary message, classified
///
/// The zero-length payload is a control signal, never audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// 16-bit mono PCM samples at the configured rate
    Audio(Vec<i16>),
    /// Client has no more audio; finalize the session
    EndOfStream,
}

impl InboundFrame {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, InboundFrame::EndOfStream)
    }
}

/// Turns raw binary payloads into [`InboundFrame`]s
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    sample_rate: u32,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl FrameDecoder {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Decode a binary payload (raw PCM16LE or a WAV container)
    pub fn decode(&self, payload: &[u8]) -> SessionResult<InboundFrame> {
        if payload.is_empty() {
            return Ok(InboundFrame::EndOfStream);
        }

        let pcm = if is_wav_container(payload) {
            let (header, pcm) = strip_wav_header(payload, self.sample_rate)?;
            debug!(
                "Stripped {}-byte WAV header ({}Hz, {} ch)",
                header.data_offset, header.sample_rate, header.channels
            );
            pcm
        } else {
            payload
        };

        Ok(InboundFrame::Audio(pcm_to_samples(pcm)?))
    }
}

/// Convert little-endian 16-bit PCM bytes to samples
pub fn pcm_to_samples(pcm: &[u8]) -> SessionResult<Vec<i16>> {
    if pcm.len() % 2 != 0 {
        return Err(SessionError::Malformed(format!(
            "PCM payload has odd length {}",
            pcm.len()
        )));
    }

    Ok(pcm
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_is_end_of_stream() {
        let decoder = FrameDecoder::default();
        assert_eq!(decoder.decode(&[]).unwrap(), InboundFrame::EndOfStream);
    }

    #[test]
    fn test_raw_pcm() {
        let samples: Vec<i16> = vec![100, -200, 300, -400];
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

        let frame = FrameDecoder::default().decode(&bytes).unwrap();
        assert_eq!(frame, InboundFrame::Audio(samples));
    }

    #[test]
    fn test_odd_length_is_malformed() {
        let result = FrameDecoder::default().decode(&[1, 2, 3]);
        assert!(matches!(result, Err(SessionError::Malformed(_))));
    }

    #[test]
    fn test_header_only_wav_is_empty_audio_not_sentinel() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        hound::WavWriter::new(&mut cursor, spec)
            .unwrap()
            .finalize()
            .unwrap();

        let frame = FrameDecoder::default().decode(&cursor.into_inner()).unwrap();
        assert_eq!(frame, InboundFrame::Audio(Vec::new()));
        assert!(!frame.is_end_of_stream());
    }
}
