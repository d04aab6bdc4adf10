//! Harmonic-percussive source separation (HPSS)
//!
//! Median-filtering separation (Fitzgerald 2010) with soft masks (Driedger et al. 2014):
//!
//! 1. Complex STFT of the signal
//! 2. Harmonic enhancement: median filter each bin along time
//! 3. Percussive enhancement: median filter each frame along frequency
//! 4. Soft masks `M_H = H^p / (H^p + (β_H·P)^p)`, `M_P = P^p / (P^p + (β_P·H)^p)`
//! 5. Masked spectrograms resynthesised with the inverse STFT
//!
//! # Reference
//!
//! Fitzgerald, D. (2010). Harmonic/Percussive Separation using Median Filtering.
//! *Proceedings of the 13th International Conference on Digital Audio Effects (DAFx-10)*.
//!
//! Driedger, J., Müller, M., & Disch, S. (2014). Extending Harmonic-Percussive Separation
//! of Audio Signals. *Proceedings of ISMIR*.

use rayon::prelude::*;
use rustfft::num_complex::Complex;

use crate::config::AnalysisConfig;
use crate::error::{StageError, StageResult};
use crate::features::spectrum::{compute_complex_stft, istft, magnitude};
use crate::io::Signal;

/// Harmonic and percussive components of a signal
///
/// Both buffers have exactly the length of the source signal.
#[derive(Debug, Clone)]
pub struct HarmonicPercussiveSplit {
    /// Sustained, tonal component
    pub harmonic: Vec<f32>,
    /// Transient, broadband component
    pub percussive: Vec<f32>,
}

impl HarmonicPercussiveSplit {
    /// Degraded split: the unmodified signal stands in for both components
    pub fn passthrough(signal: &Signal) -> Self {
        Self {
            harmonic: signal.samples().to_vec(),
            percussive: signal.samples().to_vec(),
        }
    }
}

/// Separate a signal into harmonic and percussive components
///
/// # Arguments
///
/// * `signal` - Input signal
/// * `config` - Uses `frame_size`, `hop_size`, `hpss_kernel_size`, both margins and
///   `hpss_mask_power`
///
/// # Errors
///
/// Returns `StageError` if the STFT cannot be computed or the resynthesis produces
/// non-finite samples. Callers fall back to [`HarmonicPercussiveSplit::passthrough`].
pub fn separate(signal: &Signal, config: &AnalysisConfig) -> StageResult<HarmonicPercussiveSplit> {
    let kernel = config.hpss_kernel_size;
    if kernel == 0 {
        return Err(StageError::InvalidParameter("hpss_kernel_size must be > 0".to_string()));
    }

    let stft = compute_complex_stft(signal.samples(), config.frame_size, config.hop_size)?;
    let mags = magnitude(&stft);

    log::debug!(
        "HPSS: {} frames, kernel={}, margins=({:.1}, {:.1})",
        mags.len(),
        kernel,
        config.hpss_margin_harmonic,
        config.hpss_margin_percussive
    );

    let harmonic_enhanced = median_filter_time(&mags, kernel);
    let percussive_enhanced = median_filter_frequency(&mags, kernel);

    let mut harmonic_stft: Vec<Vec<Complex<f32>>> = Vec::with_capacity(stft.len());
    let mut percussive_stft: Vec<Vec<Complex<f32>>> = Vec::with_capacity(stft.len());

    for (t, frame) in stft.iter().enumerate() {
        let h_row = &harmonic_enhanced[t];
        let p_row = &percussive_enhanced[t];
        let mut h_frame = Vec::with_capacity(frame.len());
        let mut p_frame = Vec::with_capacity(frame.len());
        for (k, &x) in frame.iter().enumerate() {
            let mask_h = soft_mask(
                h_row[k],
                config.hpss_margin_harmonic * p_row[k],
                config.hpss_mask_power,
            );
            let mask_p = soft_mask(
                p_row[k],
                config.hpss_margin_percussive * h_row[k],
                config.hpss_mask_power,
            );
            h_frame.push(x * mask_h);
            p_frame.push(x * mask_p);
        }
        harmonic_stft.push(h_frame);
        percussive_stft.push(p_frame);
    }

    let n = signal.len();
    let harmonic = istft(&harmonic_stft, config.frame_size, config.hop_size, n)?;
    let percussive = istft(&percussive_stft, config.frame_size, config.hop_size, n)?;

    if harmonic.iter().chain(percussive.iter()).any(|x| !x.is_finite()) {
        return Err(StageError::Numerical("non-finite samples after HPSS".to_string()));
    }

    Ok(HarmonicPercussiveSplit {
        harmonic,
        percussive,
    })
}

/// Soft mask `x^p / (x^p + ref^p)`, computed relative to `max(x, ref)` for stability
///
/// Zero where both inputs vanish.
fn soft_mask(x: f32, reference: f32, power: f32) -> f32 {
    let z = x.max(reference);
    if z < f32::MIN_POSITIVE {
        return 0.0;
    }
    let mask = (x / z).powf(power);
    let ref_mask = (reference / z).powf(power);
    mask / (mask + ref_mask)
}

/// Median of `window`, reordering it in place
fn median_in_place(window: &mut [f32]) -> f32 {
    let mid = window.len() / 2;
    let (_, median, _) =
        window.select_nth_unstable_by(mid, |a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    *median
}

/// 1-D median filter with half-sample symmetric reflection at the edges
fn median_filter_1d(input: &[f32], kernel: usize) -> Vec<f32> {
    let n = input.len();
    if n == 0 {
        return Vec::new();
    }
    let half = kernel / 2;
    let reflect = |i: isize| -> f32 {
        let n = n as isize;
        let mut j = i;
        // d c b a | a b c d | d c b a
        loop {
            if j < 0 {
                j = -j - 1;
            } else if j >= n {
                j = 2 * n - j - 1;
            } else {
                return input[j as usize];
            }
        }
    };

    let mut window = vec![0.0f32; kernel];
    (0..n)
        .map(|i| {
            for (w, slot) in window.iter_mut().enumerate() {
                *slot = reflect(i as isize + w as isize - half as isize);
            }
            median_in_place(&mut window)
        })
        .collect()
}

/// Median filter each frequency bin across time
fn median_filter_time(mags: &[Vec<f32>], kernel: usize) -> Vec<Vec<f32>> {
    let n_frames = mags.len();
    let n_bins = mags.first().map(|f| f.len()).unwrap_or(0);

    let filtered_bins: Vec<Vec<f32>> = (0..n_bins)
        .into_par_iter()
        .map(|k| {
            let series: Vec<f32> = mags.iter().map(|frame| frame[k]).collect();
            median_filter_1d(&series, kernel)
        })
        .collect();

    (0..n_frames)
        .map(|t| filtered_bins.iter().map(|bin| bin[t]).collect())
        .collect()
}

/// Median filter each frame across frequency
fn median_filter_frequency(mags: &[Vec<f32>], kernel: usize) -> Vec<Vec<f32>> {
    mags.par_iter()
        .map(|frame| median_filter_1d(frame, kernel))
        .collect()
}
