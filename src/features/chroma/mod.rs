//! Chroma extraction modules
//!
//! Extract pitch-class distribution (12 semitones) from audio:
//! - Constant-Q transform
//! - CQT chroma and CENS
//! - Normalization strategies
//! - Temporal smoothing
//!
//! The chroma used by key and chord detection is a fixed blend of the two
//! variants: the CQT chroma keeps timing sharp while CENS suppresses noise.

pub mod cqt;
pub mod extractor;
pub mod normalization;
pub mod smoothing;

pub use extractor::extract_chroma;

use crate::config::AnalysisConfig;
use crate::error::{StageError, StageResult};

/// Energy per pitch class, index 0 = C
pub type ChromaVector = [f32; 12];

/// Blended chroma frames on the shared hop grid
#[derive(Debug, Clone, PartialEq)]
pub struct Chromagram {
    /// `weight · cqt + (1 - weight) · cens` per frame
    pub frames: Vec<ChromaVector>,
}

impl Chromagram {
    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if there are no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Compute the blended chromagram of a (harmonic) signal
///
/// # Errors
///
/// Returns `StageError` if chroma extraction fails or yields no frames
pub fn compute_chromagram(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> StageResult<Chromagram> {
    let (cqt, cens) = extract_chroma(samples, sample_rate, config)?;
    let frames = blend(&cqt, &cens, config.cqt_blend_weight);
    if frames.is_empty() {
        return Err(StageError::EmptyIntermediate("no chroma frames".to_string()));
    }
    log::debug!("Chromagram: {} frames", frames.len());
    Ok(Chromagram { frames })
}

/// Element-wise `weight · a + (1 - weight) · b`, truncated to the shorter input
pub fn blend(a: &[ChromaVector], b: &[ChromaVector], weight: f32) -> Vec<ChromaVector> {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let mut out = [0.0f32; 12];
            for i in 0..12 {
                out[i] = weight * x[i] + (1.0 - weight) * y[i];
            }
            out
        })
        .collect()
}
