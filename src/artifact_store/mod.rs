//! Persistence of generated audio artifacts.
//!
//! Every successful generation produces exactly one artifact, keyed by a
//! short random identifier. Artifacts are written once and then only read.

mod fs_store;

pub use fs_store::FsArtifactStore;

use thiserror::Error;
use uuid::Uuid;

/// Number of hex characters kept from a v4 UUID to form an artifact id.
pub const ARTIFACT_ID_LEN: usize = 12;

/// Errors that can occur while reading or writing artifacts.
#[derive(Debug, Error)]
pub enum ArtifactStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),
}

/// Quantized audio ready to be persisted.
///
/// `samples` are interleaved when `channels > 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedArtifact {
    pub id: String,
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl GeneratedArtifact {
    pub fn new(id: String, samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        Self {
            id,
            samples,
            sample_rate,
            channels,
        }
    }
}

/// Trait for artifact storage backends.
pub trait ArtifactStore: Send + Sync {
    /// Persist an artifact, overwriting any previous file with the same id.
    fn write(&self, artifact: &GeneratedArtifact) -> Result<(), ArtifactStoreError>;

    /// Read the encoded audio file for the given id.
    fn read(&self, id: &str) -> Result<Vec<u8>, ArtifactStoreError>;
}

/// Generate a fresh artifact identifier.
pub fn new_artifact_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(ARTIFACT_ID_LEN);
    id
}

/// Identifiers are plain tokens, anything else can never name an artifact.
pub fn is_valid_artifact_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// The path clients use to fetch an artifact.
pub fn retrieval_path(id: &str) -> String {
    format!("/download/{}", id)
}

/// File name used both on disk and as the download attachment name.
pub fn artifact_file_name(id: &str) -> String {
    format!("music_{}.wav", id)
}
