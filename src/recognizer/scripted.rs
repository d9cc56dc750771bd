use anyhow::{bail, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Recognizer, RecognizerFactory};

/// What the scripted recognizer does on one `feed` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// `feed` returns `false`; `partial_text` yields the text
    Partial(String),
    /// `feed` returns `true`; `final_text` yields the text
    Phrase(String),
    /// `feed` returns `false` but `final_text` still yields the text
    Pending(String),
    /// `feed` fails with the given message
    Fail(String),
    /// `feed` blocks for the delay, then behaves like the inner step
    Slow(Duration, Box<ScriptStep>),
}

impl ScriptStep {
    pub fn partial(text: &str) -> Self {
        ScriptStep::Partial(text.to_string())
    }

    pub fn phrase(text: &str) -> Self {
        ScriptStep::Phrase(text.to_string())
    }

    pub fn pending(text: &str) -> Self {
        ScriptStep::Pending(text.to_string())
    }

    pub fn slow(delay: Duration, then: ScriptStep) -> Self {
        ScriptStep::Slow(delay, Box::new(then))
    }
}

/// Sample counts of every `feed` call, in order (0 = flush)
pub type FeedLog = Arc<Mutex<Vec<usize>>>;

/// Recognizer that replays a fixed script, one step per `feed` call
///
/// Once the script runs out, every `feed` reports an incomplete phrase with
/// empty text.
pub struct ScriptedRecognizer {
    steps: VecDeque<ScriptStep>,
    partial: String,
    final_text: String,
    poison: Option<i16>,
    log: FeedLog,
}

impl ScriptedRecognizer {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps: steps.into(),
            partial: String::new(),
            final_text: String::new(),
            poison: None,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail any `feed` whose samples contain `sample`
    pub fn with_poison(mut self, sample: i16) -> Self {
        self.poison = Some(sample);
        self
    }

    /// Handle to the feed log (stays valid after the recognizer is dropped)
    pub fn feed_log(&self) -> FeedLog {
        Arc::clone(&self.log)
    }

    fn apply(&mut self, step: Option<ScriptStep>) -> Result<bool> {
        match step {
            Some(ScriptStep::Partial(text)) => {
                self.partial = text;
                self.final_text.clear();
                Ok(false)
            }
            Some(ScriptStep::Phrase(text)) => {
                self.final_text = text;
                self.partial.clear();
                Ok(true)
            }
            Some(ScriptStep::Pending(text)) => {
                self.partial = text.clone();
                self.final_text = text;
                Ok(false)
            }
            Some(ScriptStep::Fail(msg)) => bail!("{}", msg),
            Some(ScriptStep::Slow(delay, then)) => {
                // Stands in for a decoder that holds its thread
                std::thread::sleep(delay);
                self.apply(Some(*then))
            }
            None => {
                self.partial.clear();
                self.final_text.clear();
                Ok(false)
            }
        }
    }
}

impl Recognizer for ScriptedRecognizer {
    fn feed(&mut self, samples: &[i16]) -> Result<bool> {
        if let Ok(mut log) = self.log.lock() {
            log.push(samples.len());
        }

        if let Some(poison) = self.poison {
            if samples.contains(&poison) {
                bail!("invalid sample data: {}", poison);
            }
        }

        let step = self.steps.pop_front();
        self.apply(step)
    }

    fn partial_text(&mut self) -> Result<String> {
        Ok(self.partial.clone())
    }

    fn final_text(&mut self) -> Result<String> {
        // Consumed once per boundary
        Ok(std::mem::take(&mut self.final_text))
    }
}

/// Hands out scripted recognizers, one per session
///
/// Queued scripts are used in creation order; after that every session gets
/// the default script.
pub struct ScriptedFactory {
    default_script: Vec<ScriptStep>,
    queued: Mutex<VecDeque<Vec<ScriptStep>>>,
    poison: Option<i16>,
    logs: Mutex<Vec<FeedLog>>,
}

impl ScriptedFactory {
    pub fn new(default_script: Vec<ScriptStep>) -> Self {
        Self {
            default_script,
            queued: Mutex::new(VecDeque::new()),
            poison: None,
            logs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_queue(mut self, scripts: Vec<Vec<ScriptStep>>) -> Self {
        self.queued = Mutex::new(scripts.into());
        self
    }

    /// Every recognizer fails when fed a frame containing `sample`
    pub fn with_poison(mut self, sample: i16) -> Self {
        self.poison = Some(sample);
        self
    }

    /// Feed logs of all recognizers created so far
    pub fn feed_logs(&self) -> Vec<FeedLog> {
        self.logs.lock().map(|logs| logs.clone()).unwrap_or_default()
    }
}

impl RecognizerFactory for ScriptedFactory {
    fn create(&self) -> Result<Box<dyn Recognizer>> {
        let script = match self.queued.lock() {
            Ok(mut queued) => queued.pop_front(),
            Err(_) => bail!("scripted factory lock poisoned"),
        }
        .unwrap_or_else(|| self.default_script.clone());

        let mut recognizer = ScriptedRecognizer::new(script);
        if let Some(poison) = self.poison {
            recognizer = recognizer.with_poison(poison);
        }

        if let Ok(mut logs) = self.logs.lock() {
            logs.push(recognizer.feed_log());
        }

        Ok(Box::new(recognizer))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
