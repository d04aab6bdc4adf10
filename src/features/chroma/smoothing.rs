//! Chroma Energy Normalized Statistics (CENS)
//!
//! Turns raw pitch-class energy into a representation that is robust to
//! dynamics and small timing deviations:
//!
//! 1. L1-normalize each frame
//! 2. Quantize each bin: `Σ 0.25 · [x > step]` for steps 0.4, 0.2, 0.1, 0.05
//! 3. Smooth along time with a normalized Hann window (zero outside the signal)
//! 4. L2-normalize each frame
//!
//! # Reference
//!
//! Müller, M., Kurth, F., & Clausen, M. (2005). Audio Matching via Chroma-Based
//! Statistical Features. *Proceedings of ISMIR*.

use super::normalization::{l1_normalize, l2_normalize};
use super::ChromaVector;
use crate::features::spectrum::hann_window_symmetric;

/// Quantization thresholds, each contributing `QUANT_WEIGHT`
const QUANT_STEPS: [f32; 4] = [0.4, 0.2, 0.1, 0.05];
const QUANT_WEIGHT: f32 = 0.25;

/// Compute CENS frames from raw (unnormalized) chroma
///
/// # Arguments
///
/// * `raw` - Pitch-class energy per frame
/// * `window_size` - Smoothing length in frames (default: 11); 0 or 1 disables smoothing
///
/// # Returns
///
/// One L2-normalized vector per input frame (silent frames stay zero)
pub fn chroma_cens(raw: &[ChromaVector], window_size: usize) -> Vec<ChromaVector> {
    let quantized: Vec<ChromaVector> = raw
        .iter()
        .map(|frame| {
            let mut c = *frame;
            l1_normalize(&mut c);
            c.map(quantize)
        })
        .collect();

    let mut smoothed = if window_size > 1 {
        smooth_chroma(&quantized, window_size)
    } else {
        quantized
    };

    for frame in smoothed.iter_mut() {
        l2_normalize(frame);
    }

    log::debug!(
        "CENS: {} frames, smoothing window {}",
        smoothed.len(),
        window_size
    );

    smoothed
}

fn quantize(x: f32) -> f32 {
    QUANT_STEPS
        .iter()
        .filter(|&&step| x > step)
        .count() as f32
        * QUANT_WEIGHT
}

/// Smooth chroma vectors over time with a unit-sum Hann window
///
/// The window is a symmetric Hann of `window_size + 2` points with the zero
/// end points dropped. Frames outside the signal count as zero.
pub fn smooth_chroma(chroma: &[ChromaVector], window_size: usize) -> Vec<ChromaVector> {
    let full = hann_window_symmetric(window_size + 2);
    let window = &full[1..=window_size];
    let total: f32 = window.iter().sum();
    let half = (window_size / 2) as isize;
    let n = chroma.len() as isize;

    (0..n)
        .map(|t| {
            let mut out = [0.0f32; 12];
            for (k, &w) in window.iter().enumerate() {
                let j = t + k as isize - half;
                if (0..n).contains(&j) {
                    let frame = &chroma[j as usize];
                    for (o, &x) in out.iter_mut().zip(frame.iter()) {
                        *o += w / total * x;
                    }
                }
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::chroma::normalization::l2_norm;

    fn frame_with(bin: usize, value: f32) -> ChromaVector {
        let mut c = [0.0f32; 12];
        c[bin] = value;
        c
    }

    #[test]
    fn test_quantize_steps() {
        assert_eq!(quantize(0.5), 1.0);
        assert_eq!(quantize(0.3), 0.75);
        assert_eq!(quantize(0.15), 0.5);
        assert_eq!(quantize(0.07), 0.25);
        assert_eq!(quantize(0.05), 0.0);
        assert_eq!(quantize(0.0), 0.0);
    }

    #[test]
    fn test_cens_frames_are_unit_length() {
        let raw: Vec<ChromaVector> = (0..40).map(|_| frame_with(9, 2.0)).collect();
        let cens = chroma_cens(&raw, 11);
        assert_eq!(cens.len(), 40);
        for frame in &cens {
            assert!((l2_norm(frame) - 1.0).abs() < 1e-5);
            assert!((frame[9] - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_cens_silence_stays_zero() {
        let raw = vec![[0.0f32; 12]; 20];
        let cens = chroma_cens(&raw, 11);
        assert!(cens.iter().all(|f| f.iter().all(|&x| x == 0.0)));
    }

    #[test]
    fn test_smoothing_spreads_an_isolated_frame() {
        let mut raw = vec![[0.0f32; 12]; 21];
        raw[10] = frame_with(0, 1.0);
        let smooth = smooth_chroma(&raw, 5);
        assert!(smooth[10][0] > smooth[9][0]);
        assert!(smooth[9][0] > 0.0);
        assert_eq!(smooth[13][0], 0.0);
        let total: f32 = smooth.iter().map(|f| f[0]).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }
}
