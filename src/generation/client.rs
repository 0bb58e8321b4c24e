//! HTTP client for an external text-to-audio inference service.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::synthesizer::{SamplingParams, SynthesizedAudio, Synthesizer};

#[derive(Serialize)]
struct GenerateBody<'a> {
    inputs: &'a str,
    parameters: &'a SamplingParams,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    audio: AudioPayload,
    sampling_rate: u32,
}

/// Either a flat mono buffer or one buffer per channel.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AudioPayload {
    Mono(Vec<f32>),
    Channels(Vec<Vec<f32>>),
}

impl AudioPayload {
    /// Returns interleaved samples and the channel count.
    fn into_interleaved(self) -> Result<(Vec<f32>, u16)> {
        match self {
            AudioPayload::Mono(samples) => Ok((samples, 1)),
            AudioPayload::Channels(mut channels) => {
                if channels.is_empty() {
                    anyhow::bail!("Model returned no audio channels");
                }
                if channels.len() == 1 {
                    return Ok((channels.remove(0), 1));
                }
                let num_channels = u16::try_from(channels.len())
                    .context("Model returned too many audio channels")?;
                let len = channels[0].len();
                if channels.iter().any(|c| c.len() != len) {
                    anyhow::bail!("Model returned channels of different lengths");
                }
                let mut interleaved = Vec::with_capacity(len * channels.len());
                for idx in 0..len {
                    for channel in &channels {
                        interleaved.push(channel[idx]);
                    }
                }
                Ok((interleaved, num_channels))
            }
        }
    }
}

/// HTTP client for communicating with the synthesizer service.
pub struct HttpSynthesizer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSynthesizer {
    /// Create a new synthesizer client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the inference service (e.g., "http://localhost:8080")
    /// * `timeout_sec` - Request timeout in seconds, `None` waits indefinitely
    pub fn new(base_url: String, timeout_sec: Option<u64>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout_sec) = timeout_sec {
            builder = builder.timeout(Duration::from_secs(timeout_sec));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        // Ensure base_url doesn't have trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// Create a client and verify that the model is loaded and reachable.
    pub async fn connect(base_url: String, timeout_sec: Option<u64>) -> Result<Self> {
        let synthesizer = Self::new(base_url, timeout_sec)?;
        synthesizer.health_check().await?;
        Ok(synthesizer)
    }

    /// Check if the synthesizer service is healthy.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to connect to synthesizer service")?;

        if response.status().is_success() {
            Ok(())
        } else {
            anyhow::bail!(
                "Synthesizer health check failed with status: {}",
                response.status()
            )
        }
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(
        &self,
        instruction: &str,
        params: &SamplingParams,
    ) -> Result<SynthesizedAudio> {
        let url = format!("{}/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&GenerateBody {
                inputs: instruction,
                parameters: params,
            })
            .send()
            .await
            .context("Failed to reach synthesizer service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Synthesizer returned status {}: {}", status, body.trim());
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse synthesizer response")?;
        let (samples, channels) = parsed.audio.into_interleaved()?;

        Ok(SynthesizedAudio {
            samples,
            channels,
            sample_rate: parsed.sampling_rate,
        })
    }
}
