//! Shared constants for end-to-end tests

// ============================================================================
// Request Data
// ============================================================================

pub const SUNSET_PROMPT: &str = "sunset over mountains";

pub const JAZZ_GENRE: &str = "jazz";

pub const CALM_MOOD: &str = "Calm";

pub const EMPTY_PROMPT_ERROR: &str = "Please enter a theme or prompt";

pub const MODEL_UNAVAILABLE_ERROR: &str = "Music generation model not available";

// ============================================================================
// Mock Model Output
// ============================================================================

/// Sample rate of the audio produced by the default mock synthesizer
pub const MOCK_SAMPLE_RATE: u32 = 16000;

/// Length of the audio produced by the default mock synthesizer
pub const MOCK_DURATION_SECS: usize = 1;

// ============================================================================
// Timeouts
// ============================================================================

#[allow(dead_code)]
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

#[allow(dead_code)]
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

#[allow(dead_code)]
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
