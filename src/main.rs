use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use stt_stream::{server, AppState, Config, RecognizerFactory};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stt-stream")]
#[command(about = "Streaming speech recognition over websockets")]
struct Args {
    /// Config file (without extension)
    #[arg(short, long, default_value = "config/stt-stream")]
    config: String,

    /// Address to bind (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Recognition model directory (overrides config)
    #[arg(short, long)]
    model: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)?;
    if let Some(bind) = args.bind {
        cfg.server.bind = bind;
    }
    if let Some(port) = args.port {
        cfg.server.port = port;
    }
    if let Some(model) = args.model {
        cfg.recognizer.model_path = model;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Server will bind to {}", cfg.listen_addr());
    info!("Recognizer threads: up to {}", cfg.runtime.max_blocking_threads);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(cfg.runtime.max_blocking_threads)
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run(cfg))
}

async fn run(cfg: Config) -> Result<()> {
    let factory = load_recognizer(&cfg)?;

    let state = AppState::new(factory, cfg.session_template())
        .with_max_sessions(cfg.server.max_sessions);

    server::serve(&cfg.listen_addr(), state).await
}

#[cfg(feature = "vosk")]
fn load_recognizer(cfg: &Config) -> Result<Arc<dyn RecognizerFactory>> {
    use stt_stream::recognizer::VoskFactory;

    // Loaded once, shared read-only by every session
    let factory = VoskFactory::load(cfg.model_path(), cfg.recognizer.sample_rate)?;
    Ok(Arc::new(factory))
}

#[cfg(not(feature = "vosk"))]
fn load_recognizer(cfg: &Config) -> Result<Arc<dyn RecognizerFactory>> {
    anyhow::bail!(
        "No recognition engine compiled in (model: {}); rebuild with `--features vosk`",
        cfg.model_path().display()
    )
}
