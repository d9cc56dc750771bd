use hound::{SampleFormat, WavReader};
use std::io::Cursor;

use crate::error::{SessionError, SessionResult};

/// Format details read from a WAV container header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Byte offset of the first PCM sample (44 for canonical headers)
    pub data_offset: usize,
}

/// Whether the payload starts with a `RIFF....WAVE` signature
pub fn is_wav_container(payload: &[u8]) -> bool {
    payload.len() >= 12 && &payload[0..4] == b"RIFF" && &payload[8..12] == b"WAVE"
}

/// Parse the WAV header and return it along with the PCM bytes that follow it
///
/// Only 16-bit integer mono at `expected_rate` is accepted, since that is the
/// only layout the recognizer can consume.
pub fn strip_wav_header(payload: &[u8], expected_rate: u32) -> SessionResult<(WavHeader, &[u8])> {
    let reader = WavReader::new(Cursor::new(payload))
        .map_err(|e| SessionError::Malformed(format!("invalid WAV header: {}", e)))?;

    let spec = reader.spec();
    // Reader stops right at the start of the data chunk
    let data_offset = reader.into_inner().position() as usize;

    let header = WavHeader {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        data_offset,
    };

    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(SessionError::Malformed(format!(
            "unsupported WAV sample format: {} bits {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }
    if spec.channels != 1 {
        return Err(SessionError::Malformed(format!(
            "expected mono audio, got {} channels",
            spec.channels
        )));
    }
    if spec.sample_rate != expected_rate {
        return Err(SessionError::Malformed(format!(
            "expected {}Hz audio, got {}Hz",
            expected_rate, spec.sample_rate
        )));
    }

    Ok((header, &payload[data_offset.min(payload.len())..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_detects_container() {
        let bytes = wav_bytes(16000, 1, &[1, 2, 3]);
        assert!(is_wav_container(&bytes));
        assert!(!is_wav_container(&[0u8; 64]));
        assert!(!is_wav_container(b"RIFF"));
    }

    #[test]
    fn test_strips_canonical_header() {
        let bytes = wav_bytes(16000, 1, &[100, -200, 300]);
        let (header, pcm) = strip_wav_header(&bytes, 16000).unwrap();

        assert_eq!(header.data_offset, 44);
        assert_eq!(header.channels, 1);
        assert_eq!(pcm.len(), 6);
        assert_eq!(i16::from_le_bytes([pcm[0], pcm[1]]), 100);
        assert_eq!(i16::from_le_bytes([pcm[2], pcm[3]]), -200);
    }

    #[test]
    fn test_rejects_stereo() {
        let bytes = wav_bytes(16000, 2, &[1, 2, 3, 4]);
        assert!(matches!(
            strip_wav_header(&bytes, 16000),
            Err(SessionError::Malformed(_))
        ));
    }

    #[test]
    fn test_rejects_wrong_rate() {
        let bytes = wav_bytes(44100, 1, &[1, 2]);
        let err = strip_wav_header(&bytes, 16000).unwrap_err();
        assert!(err.to_string().contains("44100"));
    }

    #[test]
    fn test_rejects_truncated_header() {
        let bytes = wav_bytes(16000, 1, &[1, 2]);
        assert!(strip_wav_header(&bytes[..20], 16000).is_err());
    }
}
