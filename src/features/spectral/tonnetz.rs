//! Tonal centroid (Tonnetz) features
//!
//! Each chroma frame is scaled to unit sum and projected onto three circles:
//! fifths (`7π/6` per semitone), minor thirds (`3π/2`) and major thirds
//! (`2π/3`, radius 0.5). The six coordinates are
//! `[sin, cos]` of each circle in that order.
//!
//! # Reference
//!
//! Harte, C., Sandler, M., & Gasser, M. (2006). Detecting Harmonic Change in Musical Audio.
//! *Proceedings of the 1st ACM Workshop on Audio and Music Computing Multimedia*.

use std::f32::consts::PI;

use crate::analysis::result::TonnetzFeatures;
use crate::error::{StageError, StageResult};
use crate::features::chroma::normalization::l1_normalize;
use crate::features::chroma::ChromaVector;

/// Angle step per semitone and radius of each circle
const CIRCLES: [(f32, f32); 3] = [(7.0 * PI / 6.0, 1.0), (3.0 * PI / 2.0, 1.0), (2.0 * PI / 3.0, 0.5)];

/// Project chroma frames into 6-D tonal space
///
/// # Arguments
///
/// * `chroma` - Chroma frames on the shared frame axis
/// * `frame_times` - Frame times; the output is truncated to the shorter input
///
/// # Errors
///
/// `StageError::EmptyIntermediate` if there is no chroma
pub fn extract_tonnetz(chroma: &[ChromaVector], frame_times: &[f32]) -> StageResult<TonnetzFeatures> {
    if chroma.is_empty() {
        return Err(StageError::EmptyIntermediate(
            "no chroma frames for tonnetz".to_string(),
        ));
    }

    let n = chroma.len().min(frame_times.len());
    let tonnetz = chroma[..n].iter().map(tonal_centroid).collect();

    Ok(TonnetzFeatures {
        tonnetz,
        timestamps: frame_times[..n].to_vec(),
    })
}

/// Tonal centroid of one chroma frame (zero frame maps to the origin)
pub fn tonal_centroid(chroma: &ChromaVector) -> [f32; 6] {
    let mut weights = *chroma;
    l1_normalize(&mut weights);

    let mut out = [0.0f32; 6];
    for (c, &(step, radius)) in CIRCLES.iter().enumerate() {
        for (pc, &w) in weights.iter().enumerate() {
            let angle = step * pc as f32;
            out[2 * c] += w * radius * angle.sin();
            out[2 * c + 1] += w * radius * angle.cos();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pitch_class_c() {
        let mut c = [0.0f32; 12];
        c[0] = 1.0;
        let t = tonal_centroid(&c);
        let expected = [0.0, 1.0, 0.0, 1.0, 0.0, 0.5];
        for (a, b) in t.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_chromatic_cluster_cancels() {
        // Uniform chroma sums every circle to zero
        let t = tonal_centroid(&[1.0; 12]);
        assert!(t.iter().all(|x| x.abs() < 1e-5));
        assert_eq!(tonal_centroid(&[0.0; 12]), [0.0; 6]);
    }

    #[test]
    fn test_scaling_invariance() {
        let mut a = [0.0f32; 12];
        a[0] = 1.0;
        a[4] = 0.5;
        a[7] = 0.8;
        let mut b = a;
        for x in b.iter_mut() {
            *x *= 3.0;
        }
        let (ta, tb) = (tonal_centroid(&a), tonal_centroid(&b));
        for (x, y) in ta.iter().zip(tb.iter()) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_truncates_to_frame_axis() {
        let chroma = vec![[0.5f32; 12]; 10];
        let times: Vec<f32> = (0..7).map(|i| i as f32 * 0.1).collect();
        let features = extract_tonnetz(&chroma, &times).unwrap();
        assert_eq!(features.tonnetz.len(), 7);
        assert_eq!(features.timestamps, times);
        assert!(extract_tonnetz(&[], &times).is_err());
    }
}
