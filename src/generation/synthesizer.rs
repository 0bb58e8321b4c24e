//! Text-to-audio model abstraction.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Sampling parameters forwarded to the model as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamplingParams {
    pub do_sample: bool,
    pub max_length: usize,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            do_sample: true,
            max_length: 256,
        }
    }
}

/// Raw model output: float samples, interleaved when multi-channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl SynthesizedAudio {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: 1,
            sample_rate,
        }
    }
}

/// An opaque text-to-audio model.
///
/// Calls may take tens of seconds and may fail; implementations must not
/// mutate shared state so a single instance can serve concurrent requests.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        instruction: &str,
        params: &SamplingParams,
    ) -> Result<SynthesizedAudio>;
}
