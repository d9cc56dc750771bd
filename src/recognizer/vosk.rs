use anyhow::{anyhow, bail, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use vosk::{CompleteResult, DecodingState, Model};

use super::{Recognizer, RecognizerFactory};

/// Loads a Vosk model once and builds per-session recognizers from it
pub struct VoskFactory {
    model: Arc<Model>,
    sample_rate: f32,
}

impl VoskFactory {
    pub fn load(model_path: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        info!("Loading Vosk model: {}", model_path.display());

        let model = Model::new(model_path.to_string_lossy())
            .ok_or_else(|| anyhow!("Failed to load Vosk model from {}", model_path.display()))?;

        info!("Vosk model loaded");

        Ok(Self {
            model: Arc::new(model),
            sample_rate: sample_rate as f32,
        })
    }
}

impl RecognizerFactory for VoskFactory {
    fn create(&self) -> Result<Box<dyn Recognizer>> {
        let recognizer = vosk::Recognizer::new(&self.model, self.sample_rate)
            .ok_or_else(|| anyhow!("Failed to create Vosk recognizer"))?;

        Ok(Box::new(VoskRecognizer { recognizer }))
    }

    fn name(&self) -> &str {
        "vosk"
    }
}

struct VoskRecognizer {
    recognizer: vosk::Recognizer,
}

impl Recognizer for VoskRecognizer {
    fn feed(&mut self, samples: &[i16]) -> Result<bool> {
        let state = self
            .recognizer
            .accept_waveform(samples)
            .map_err(|e| anyhow!("Vosk rejected waveform: {:?}", e))?;

        match state {
            DecodingState::Finalized => Ok(true),
            DecodingState::Running => Ok(false),
            DecodingState::Failed => bail!("Vosk decoding failed"),
        }
    }

    fn partial_text(&mut self) -> Result<String> {
        Ok(self.recognizer.partial_result().partial.to_string())
    }

    fn final_text(&mut self) -> Result<String> {
        let text = match self.recognizer.result() {
            CompleteResult::Single(single) => single.text.to_string(),
            CompleteResult::Multiple(multiple) => multiple
                .alternatives
                .first()
                .map(|alt| alt.text.to_string())
                .unwrap_or_default(),
        };
        Ok(text)
    }
}
