//! Key detection algorithm
//!
//! Matches the time-averaged chroma distribution against Krumhansl-Kessler
//! templates to detect the musical key of an audio track.
//!
//! # Algorithm
//!
//! 1. Average chroma over all frames and normalize the result to sum to 1
//! 2. Pearson correlation with each of the 24 rotated templates
//!    (a degenerate correlation, e.g. from a flat profile, counts as 0)
//! 3. Best correlation wins; candidates are visited C major, C minor,
//!    C# major, ... so ties resolve to the earliest
//! 4. `confidence = (corr + 1) / 2`
//!
//! # Reference
//!
//! Krumhansl, C. L., & Kessler, E. J. (1982). Tracing the Dynamic Changes in Perceived
//! Tonal Organization in a Spatial Representation of Musical Keys. *Psychological Review*,
//! 89(4), 334-368.

use super::templates::KeyTemplates;
use super::KeyDetectionResult;
use crate::analysis::result::Key;
use crate::error::{StageError, StageResult};
use crate::features::chroma::ChromaVector;
use crate::features::spectrum::EPSILON;

/// Detect musical key from chroma vectors
///
/// # Arguments
///
/// * `chroma_vectors` - 12-element chroma vectors (one per frame)
/// * `templates` - Key templates (Krumhansl-Kessler profiles)
///
/// # Returns
///
/// Key detection result with the best key, its confidence and all 24 scores
/// ranked highest first
///
/// # Errors
///
/// `StageError::EmptyIntermediate` if there are no chroma vectors
///
/// # Example
///
/// ```
/// use linear_analysis::analysis::result::Key;
/// use linear_analysis::features::key::{detector::detect_key, templates::KeyTemplates};
///
/// let templates = KeyTemplates::new();
/// // A C major profile correlates perfectly with its own template
/// let frames = vec![templates.major[0]; 4];
/// let result = detect_key(&frames, &templates)?;
/// assert_eq!(result.key, Key::Major(0));
/// assert!(result.confidence > 0.99);
/// # Ok::<(), linear_analysis::error::StageError>(())
/// ```
pub fn detect_key(
    chroma_vectors: &[ChromaVector],
    templates: &KeyTemplates,
) -> StageResult<KeyDetectionResult> {
    if chroma_vectors.is_empty() {
        return Err(StageError::EmptyIntermediate(
            "no chroma vectors for key detection".to_string(),
        ));
    }

    let n = chroma_vectors.len() as f32;
    let mut profile = [0.0f32; 12];
    for frame in chroma_vectors {
        for (p, &x) in profile.iter_mut().zip(frame.iter()) {
            *p += x / n;
        }
    }
    let total: f32 = profile.iter().sum();
    for p in profile.iter_mut() {
        *p /= total + EPSILON;
    }

    let mut scores = Vec::with_capacity(24);
    for root in 0..12 {
        scores.push((
            Key::Major(root as u32),
            pearson(&profile, templates.get_major_template(root)),
        ));
        scores.push((
            Key::Minor(root as u32),
            pearson(&profile, templates.get_minor_template(root)),
        ));
    }

    let (key, correlation) = scores
        .iter()
        .copied()
        .fold(None, |best: Option<(Key, f32)>, (k, s)| match best {
            Some((_, b)) if s <= b => best,
            _ => Some((k, s)),
        })
        .ok_or_else(|| StageError::EmptyIntermediate("no key candidates".to_string()))?;

    let confidence = ((correlation + 1.0) / 2.0).clamp(0.0, 1.0);

    let mut all_scores = scores;
    all_scores.sort_by(|a, b| b.1.total_cmp(&a.1));

    log::debug!(
        "Detected key: {} (r={:.3}, confidence={:.3})",
        key.name(),
        correlation,
        confidence
    );

    Ok(KeyDetectionResult {
        key,
        confidence,
        all_scores,
    })
}

/// Pearson correlation; 0 when either input has no variance
fn pearson(a: &[f32; 12], b: &[f32; 12]) -> f32 {
    let mean_a = a.iter().sum::<f32>() / 12.0;
    let mean_b = b.iter().sum::<f32>() / 12.0;

    let mut cov = 0.0f32;
    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let r = cov / (var_a * var_b).sqrt();
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}
