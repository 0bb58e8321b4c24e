mod file_config;

pub use file_config::{FileConfig, SynthesizerConfig};

use crate::generation::SamplingParams;
use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_AUDIO_DIR: &str = "generated_audio";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub host: String,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
    pub audio_dir: Option<PathBuf>,
    pub synthesizer_url: Option<String>,
    pub synthesizer_timeout_sec: Option<u64>,
    pub max_length: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        let server = ServerConfig::default();
        CliConfig {
            host: server.host,
            port: server.port,
            metrics_port: server.metrics_port,
            logging_level: server.requests_logging_level,
            content_cache_age_sec: server.content_cache_age_sec,
            frontend_dir_path: None,
            audio_dir: None,
            synthesizer_url: None,
            synthesizer_timeout_sec: None,
            max_length: SamplingParams::default().max_length,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
    pub audio_dir: PathBuf,

    // Inference service
    pub synthesizer_url: Option<String>,
    /// Unset means generation calls are never cut short.
    pub synthesizer_timeout_sec: Option<u64>,
    pub sampling: SamplingParams,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let audio_dir = file
            .audio_dir
            .map(PathBuf::from)
            .or_else(|| cli.audio_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIO_DIR));

        // Missing is fine, the store creates it.
        if audio_dir.exists() && !audio_dir.is_dir() {
            bail!("audio_dir is not a directory: {:?}", audio_dir);
        }

        let host = file.host.unwrap_or_else(|| cli.host.clone());
        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port {
            bail!("port and metrics_port must differ, both are {}", port);
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let content_cache_age_sec = file
            .content_cache_age_sec
            .unwrap_or(cli.content_cache_age_sec);
        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let synth_file = file.synthesizer.unwrap_or_default();
        let synthesizer_url = synth_file.url.or_else(|| cli.synthesizer_url.clone());
        let synthesizer_timeout_sec = synth_file.timeout_sec.or(cli.synthesizer_timeout_sec);

        let max_length = synth_file.max_length.unwrap_or(cli.max_length);
        if max_length == 0 {
            bail!("max_length must be greater than zero");
        }
        let sampling = SamplingParams {
            do_sample: synth_file
                .do_sample
                .unwrap_or(SamplingParams::default().do_sample),
            max_length,
        };

        Ok(Self {
            host,
            port,
            metrics_port,
            logging_level,
            content_cache_age_sec,
            frontend_dir_path,
            audio_dir,
            synthesizer_url,
            synthesizer_timeout_sec,
            sampling,
        })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            host: self.host.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            content_cache_age_sec: self.content_cache_age_sec,
            frontend_dir_path: self.frontend_dir_path.clone(),
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
