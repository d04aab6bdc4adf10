//! Key detection modules
//!
//! Detect musical key using:
//! - Krumhansl-Kessler templates (24 keys)
//! - Pearson correlation against the time-averaged chroma

pub mod detector;
pub mod templates;

pub use detector::detect_key;
pub use templates::KeyTemplates;

use crate::analysis::result::Key;

/// Key reported when detection fails
pub const FALLBACK_KEY: Key = Key::Major(0);

/// Confidence reported alongside [`FALLBACK_KEY`]
pub const FALLBACK_KEY_CONFIDENCE: f32 = 0.5;

/// Key detection result
#[derive(Debug, Clone)]
pub struct KeyDetectionResult {
    /// Detected key (best match)
    pub key: Key,

    /// `(correlation + 1) / 2`, in [0, 1]
    pub confidence: f32,

    /// All 24 key correlations (ranked, highest first)
    pub all_scores: Vec<(Key, f32)>,
}

impl KeyDetectionResult {
    /// C major at confidence 0.5
    pub fn fallback() -> Self {
        Self {
            key: FALLBACK_KEY,
            confidence: FALLBACK_KEY_CONFIDENCE,
            all_scores: Vec::new(),
        }
    }
}
