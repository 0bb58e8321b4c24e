//! Music generation pipeline.
//!
//! A request goes through prompt composition, model invocation, clamping and
//! quantization, artifact persistence and finally a history append. The
//! history entry is only written after the artifact is safely on disk.

mod client;
mod synthesizer;

pub use client::HttpSynthesizer;
pub use synthesizer::{SamplingParams, SynthesizedAudio, Synthesizer};

use crate::artifact_store::{new_artifact_id, retrieval_path, ArtifactStore, GeneratedArtifact};
use crate::history::{HistoryEntry, HistoryLedger};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

pub const DEFAULT_GENRE: &str = "Any";
pub const DEFAULT_MOOD: &str = "Calm";

/// Scale applied to clamped float samples before truncation to i16.
const I16_SCALE: f32 = 32767.0;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Music generation model not available")]
    ServiceUnavailable,

    #[error("Please enter a theme or prompt")]
    BadRequest,

    #[error("{0}")]
    Failed(String),
}

/// A validated generation request with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub genre: String,
    pub mood: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, genre: Option<String>, mood: Option<String>) -> Self {
        Self {
            prompt: prompt.into(),
            genre: genre.unwrap_or_else(|| DEFAULT_GENRE.to_string()),
            mood: mood.unwrap_or_else(|| DEFAULT_MOOD.to_string()),
        }
    }

    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    /// The instruction sent to the model.
    pub fn instruction(&self) -> String {
        format!(
            "Create a {} style track with a {} mood. Theme: {}",
            self.genre, self.mood, self.prompt
        )
    }
}

/// Clamp to [-1.0, 1.0] and truncate to signed 16-bit. NaN becomes 0.
pub fn quantize(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| (sample.clamp(-1.0, 1.0) * I16_SCALE) as i16)
        .collect()
}

pub struct GenerationService {
    synthesizer: Option<Arc<dyn Synthesizer>>,
    artifact_store: Arc<dyn ArtifactStore>,
    history: Arc<HistoryLedger>,
    sampling: SamplingParams,
}

impl GenerationService {
    /// `synthesizer` is `None` when the model failed to load at startup, in
    /// which case every generation fails with `ServiceUnavailable`.
    pub fn new(
        synthesizer: Option<Arc<dyn Synthesizer>>,
        artifact_store: Arc<dyn ArtifactStore>,
        history: Arc<HistoryLedger>,
        sampling: SamplingParams,
    ) -> Self {
        Self {
            synthesizer,
            artifact_store,
            history,
            sampling,
        }
    }

    pub fn is_available(&self) -> bool {
        self.synthesizer.is_some()
    }

    pub fn history(&self) -> &Arc<HistoryLedger> {
        &self.history
    }

    pub fn artifact_store(&self) -> &Arc<dyn ArtifactStore> {
        &self.artifact_store
    }

    /// Run the full pipeline and return the retrieval path of the new artifact.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let synthesizer = self
            .synthesizer
            .as_ref()
            .ok_or(GenerationError::ServiceUnavailable)?;

        if !request.has_prompt() {
            return Err(GenerationError::BadRequest);
        }

        let instruction = request.instruction();
        info!("Generating: {}", instruction);

        let audio = synthesizer
            .synthesize(&instruction, &self.sampling)
            .await
            .map_err(|e| {
                error!("Music generation failed: {:#}", e);
                GenerationError::Failed(format!("{:#}", e))
            })?;

        let artifact = GeneratedArtifact::new(
            new_artifact_id(),
            quantize(&audio.samples),
            audio.sample_rate,
            audio.channels,
        );
        let id = artifact.id.clone();

        let store = self.artifact_store.clone();
        tokio::task::spawn_blocking(move || store.write(&artifact))
            .await
            .map_err(|e| GenerationError::Failed(e.to_string()))?
            .map_err(|e| {
                error!("Failed to persist artifact {}: {}", id, e);
                GenerationError::Failed(e.to_string())
            })?;

        self.history
            .append(HistoryEntry::from_request(id.clone(), request));
        info!("Generated artifact {}", id);

        Ok(retrieval_path(&id))
    }
}
