use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::session::SessionConfig;

/// Environment variable prefix (`STT__SERVER__PORT=2700`)
pub const ENV_PREFIX: &str = "STT";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub server: ServerConfig,
    pub recognizer: RecognizerConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Maximum concurrent sessions (0 = unlimited)
    pub max_sessions: usize,
    /// Close sessions that send nothing for this long (0 = never)
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognizerConfig {
    pub model_path: String,
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Upper bound on threads running recognizer calls
    pub max_blocking_threads: usize,
}

impl Config {
    /// Load defaults, then the optional config file, then `STT__*` env vars
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "stt-stream")?
            .set_default("server.bind", "0.0.0.0")?
            .set_default("server.port", 2700)?
            .set_default("server.max_sessions", 0)?
            .set_default("server.idle_timeout_secs", 0)?
            .set_default("recognizer.model_path", "model")?
            .set_default("recognizer.sample_rate", 16000)?
            .set_default("runtime.max_blocking_threads", 64)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;

        let cfg: Self = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        cfg.validate()?;

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.recognizer.sample_rate == 0 {
            anyhow::bail!("recognizer.sample_rate must be positive");
        }
        if self.runtime.max_blocking_threads == 0 {
            anyhow::bail!("runtime.max_blocking_threads must be positive");
        }
        Ok(())
    }

    /// Socket address string to listen on
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }

    /// Model path with `~` expanded
    pub fn model_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.recognizer.model_path).as_ref())
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.server.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Template for per-connection session settings
    pub fn session_template(&self) -> SessionConfig {
        SessionConfig {
            sample_rate: self.recognizer.sample_rate,
            idle_timeout: self.idle_timeout(),
            ..SessionConfig::default()
        }
    }
}
