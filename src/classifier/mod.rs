//! Offline genre classifier training.
//!
//! Audio files are turned into fixed-length embeddings by an external
//! extractor, then a small feed-forward network is trained on top of them.

mod dataset;
mod embedding;
mod ffmpeg;
mod labels;
mod model;
mod split;
mod trainer;

pub use dataset::{
    load_waveform, scan_dataset, LabeledFile, AUDIO_EXTENSIONS, DEFAULT_GENRES, TARGET_SAMPLE_RATE,
};
pub use embedding::{mean_over_time, EmbeddingExtractor, HttpEmbeddingExtractor};
pub use ffmpeg::check_ffmpeg_available;
pub use labels::{one_hot, LabelEncoder};
pub use model::{GenreClassifier, LayerSummary};
pub use split::train_test_split;
pub use trainer::{
    extract_dataset, train, EmbeddingDataset, EpochReport, TrainedClassifier, TrainingConfig,
    LABELS_FILE_NAME, WEIGHTS_FILE_NAME,
};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to walk dataset directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to decode audio: {0}")]
    Wav(#[from] hound::Error),

    #[error("Failed to decode {path:?} with ffmpeg: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Failed to resample audio: {0}")]
    Resample(String),

    #[error("Embedding extraction failed for {path:?}: {message}")]
    Embedding { path: PathBuf, message: String },

    #[error("Genre directory not found: {0:?}")]
    MissingGenre(PathBuf),

    #[error("Audio file has no samples: {0:?}")]
    EmptyAudio(PathBuf),

    #[error("Dataset is invalid: {0}")]
    InvalidDataset(String),

    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("Label file error: {0}")]
    Labels(#[from] serde_json::Error),
}
