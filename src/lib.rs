//! Composer Server Library
//!
//! This library exposes the internal modules for testing and for the
//! `composer-server` and `cli-train` binaries.

pub mod artifact_store;
pub mod classifier;
pub mod config;
pub mod generation;
pub mod history;
pub mod server;

// Re-export commonly used types for convenience
pub use artifact_store::{ArtifactStore, FsArtifactStore, GeneratedArtifact};
pub use generation::{GenerationError, GenerationRequest, GenerationService, Synthesizer};
pub use history::{HistoryEntry, HistoryLedger};
pub use server::{run_server, RequestsLoggingLevel};
