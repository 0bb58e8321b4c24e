//! Stand-ins for the text-to-audio model

use async_trait::async_trait;
use composer_server::generation::{SamplingParams, SynthesizedAudio, Synthesizer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Returns fixed audio and records every instruction it receives
pub struct MockSynthesizer {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
    calls: AtomicUsize,
    instructions: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MockSynthesizer {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            calls: AtomicUsize::new(0),
            instructions: Mutex::new(Vec::new()),
        }
    }

    pub fn silence(seconds: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; seconds * sample_rate as usize], 1, sample_rate)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn instructions(&self) -> Vec<String> {
        self.instructions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        instruction: &str,
        _params: &SamplingParams,
    ) -> anyhow::Result<SynthesizedAudio> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.instructions
            .lock()
            .unwrap()
            .push(instruction.to_string());
        Ok(SynthesizedAudio {
            samples: self.samples.clone(),
            channels: self.channels,
            sample_rate: self.sample_rate,
        })
    }
}

/// Always fails with the given message
pub struct FailingSynthesizer {
    pub message: String,
}

#[async_trait]
impl Synthesizer for FailingSynthesizer {
    async fn synthesize(
        &self,
        _instruction: &str,
        _params: &SamplingParams,
    ) -> anyhow::Result<SynthesizedAudio> {
        anyhow::bail!("{}", self.message)
    }
}
