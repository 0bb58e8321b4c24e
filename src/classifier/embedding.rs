use super::TrainingError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pretrained audio embedding network, treated as opaque.
///
/// Returns one embedding per analysis frame. All frames have the same width.
#[async_trait]
pub trait EmbeddingExtractor: Send + Sync {
    async fn extract(&self, waveform: &[f32], sample_rate: u32) -> Result<Vec<Vec<f32>>>;
}

#[derive(Serialize)]
struct EmbedBody<'a> {
    waveform: &'a [f32],
    sample_rate: u32,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// HTTP client for an embedding service exposing `POST /embed`.
pub struct HttpEmbeddingExtractor {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEmbeddingExtractor {
    pub fn new(base_url: String, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl EmbeddingExtractor for HttpEmbeddingExtractor {
    async fn extract(&self, waveform: &[f32], sample_rate: u32) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbedBody {
                waveform,
                sample_rate,
            })
            .send()
            .await
            .context("Failed to reach embedding service")?;

        if !response.status().is_success() {
            anyhow::bail!("Embedding service returned status {}", response.status());
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;
        Ok(parsed.embeddings)
    }
}

/// Averages per-frame embeddings into a single vector.
pub fn mean_over_time(frames: &[Vec<f32>]) -> Result<Vec<f32>, TrainingError> {
    let width = match frames.first() {
        Some(first) if !first.is_empty() => first.len(),
        _ => {
            return Err(TrainingError::InvalidDataset(
                "extractor returned no embedding frames".to_string(),
            ))
        }
    };

    let mut sum = vec![0.0_f32; width];
    for frame in frames {
        if frame.len() != width {
            return Err(TrainingError::InvalidDataset(format!(
                "embedding frame width {} differs from {}",
                frame.len(),
                width
            )));
        }
        for (acc, value) in sum.iter_mut().zip(frame) {
            *acc += value;
        }
    }

    let scale = 1.0 / frames.len() as f32;
    Ok(sum.into_iter().map(|v| v * scale).collect())
}
