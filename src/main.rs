use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use composer_server::config::{AppConfig, CliConfig, FileConfig};
use composer_server::generation::{GenerationService, HttpSynthesizer, Synthesizer};
use composer_server::server::{metrics, run_server, RequestsLoggingLevel, ServerState};
use composer_server::{FsArtifactStore, HistoryLedger};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in it override the flags below.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The address to bind.
    #[clap(long, default_value = "127.0.0.1")]
    pub host: String,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 5000)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Max age in seconds advertised on downloaded tracks.
    #[clap(long, default_value_t = 3600)]
    pub content_cache_age_sec: usize,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Where generated tracks are written. Created if missing.
    #[clap(long, value_parser = parse_path)]
    pub audio_dir: Option<PathBuf>,

    /// URL of the text-to-audio inference service.
    #[clap(long)]
    pub synthesizer_url: Option<String>,

    /// Timeout in seconds for a single generation call. No timeout when unset.
    #[clap(long)]
    pub synthesizer_timeout_sec: Option<u64>,

    /// Maximum number of audio tokens the model may produce.
    #[clap(long, default_value_t = 256)]
    pub max_length: usize,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            host: self.host.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            content_cache_age_sec: self.content_cache_age_sec,
            frontend_dir_path: self.frontend_dir_path.clone(),
            audio_dir: self.audio_dir.clone(),
            synthesizer_url: self.synthesizer_url.clone(),
            synthesizer_timeout_sec: self.synthesizer_timeout_sec,
            max_length: self.max_length,
        }
    }
}

async fn load_synthesizer(config: &AppConfig) -> Option<Arc<dyn Synthesizer>> {
    let url = match &config.synthesizer_url {
        Some(url) => url.clone(),
        None => {
            error!("No synthesizer URL configured, generation is disabled");
            return None;
        }
    };

    info!("Loading music generation model from {}...", url);
    match HttpSynthesizer::connect(url, config.synthesizer_timeout_sec).await {
        Ok(synthesizer) => {
            info!("Music generation model loaded");
            Some(Arc::new(synthesizer))
        }
        Err(err) => {
            error!("Failed to load music generation model: {:#}", err);
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    info!("Storing generated audio in {:?}", config.audio_dir);
    let artifact_store = Arc::new(
        FsArtifactStore::new(&config.audio_dir)
            .with_context(|| format!("Failed to prepare audio dir {:?}", config.audio_dir))?,
    );

    let synthesizer = load_synthesizer(&config).await;
    let generation_service = Arc::new(GenerationService::new(
        synthesizer,
        artifact_store,
        Arc::new(HistoryLedger::new()),
        config.sampling.clone(),
    ));

    let state = ServerState::new(config.server_config(), generation_service);
    info!("Ready to serve at port {}!", config.port);
    run_server(state).await
}
