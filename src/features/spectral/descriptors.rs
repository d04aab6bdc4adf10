//! Frame-wise spectral shape descriptors
//!
//! All descriptors are computed from the centred magnitude STFT `S`:
//!
//! - centroid: `Σ f·S / Σ S`
//! - bandwidth: `sqrt(Σ Ŝ·(f - centroid)²)` with `Ŝ = S / Σ S`
//! - rolloff: lowest bin frequency at which the cumulative magnitude reaches
//!   `rolloff_percent` of the frame total
//! - zero-crossing rate: sign changes per sample over the same centred frames
//!
//! Silent frames give 0 for every descriptor.

use crate::analysis::result::SpectralFeatures;
use crate::config::AnalysisConfig;
use crate::error::{StageError, StageResult};
use crate::features::spectrum::{compute_stft, fft_frequencies, frame_count, EPSILON};

/// Amplitudes at or below this count as zero (positive sign) for zero crossings
const ZERO_CROSSING_THRESHOLD: f32 = 1e-10;

/// Compute centroid, rolloff, bandwidth and zero-crossing rate per frame
///
/// # Arguments
///
/// * `samples` - Mono samples
/// * `sample_rate` - Sample rate in Hz
/// * `frame_times` - Shared frame time axis; the output is truncated to it
/// * `config` - Uses `frame_size`, `hop_size` and `rolloff_percent`
///
/// # Returns
///
/// Feature sequences of equal length `min(n_frames, frame_times.len())`
///
/// # Errors
///
/// - `StageError::InvalidParameter` if `rolloff_percent` is outside (0, 1]
/// - `StageError` from the STFT for empty input or invalid frame settings
pub fn extract_spectral_features(
    samples: &[f32],
    sample_rate: u32,
    frame_times: &[f32],
    config: &AnalysisConfig,
) -> StageResult<SpectralFeatures> {
    if !(config.rolloff_percent > 0.0 && config.rolloff_percent <= 1.0) {
        return Err(StageError::InvalidParameter(format!(
            "rolloff_percent must be in (0, 1], got {}",
            config.rolloff_percent
        )));
    }

    let spectrogram = compute_stft(samples, config.frame_size, config.hop_size)?;
    let freqs = fft_frequencies(sample_rate, config.frame_size);

    let mut centroid = Vec::with_capacity(spectrogram.len());
    let mut bandwidth = Vec::with_capacity(spectrogram.len());
    let mut rolloff = Vec::with_capacity(spectrogram.len());
    for frame in &spectrogram {
        let c = spectral_centroid(frame, &freqs);
        centroid.push(c);
        bandwidth.push(spectral_bandwidth(frame, &freqs, c));
        rolloff.push(spectral_rolloff(frame, &freqs, config.rolloff_percent));
    }

    let zcr = zero_crossing_rate(samples, config.frame_size, config.hop_size);

    let n = centroid.len().min(zcr.len()).min(frame_times.len());
    centroid.truncate(n);
    bandwidth.truncate(n);
    rolloff.truncate(n);
    let mut zero_crossing_rate = zcr;
    zero_crossing_rate.truncate(n);

    log::debug!("Spectral features: {} frames", n);

    Ok(SpectralFeatures {
        centroid,
        rolloff,
        bandwidth,
        zero_crossing_rate,
        timestamps: frame_times[..n].to_vec(),
    })
}

/// Magnitude-weighted mean frequency of one frame
pub fn spectral_centroid(frame: &[f32], freqs: &[f32]) -> f32 {
    let total: f32 = frame.iter().sum();
    if total <= EPSILON {
        return 0.0;
    }
    frame.iter().zip(freqs.iter()).map(|(s, f)| s * f).sum::<f32>() / total
}

/// Magnitude-weighted standard deviation of frequency around `centroid`
pub fn spectral_bandwidth(frame: &[f32], freqs: &[f32], centroid: f32) -> f32 {
    let total: f32 = frame.iter().sum();
    if total <= EPSILON {
        return 0.0;
    }
    frame
        .iter()
        .zip(freqs.iter())
        .map(|(s, f)| (s / total) * (f - centroid).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Lowest frequency below which `percent` of the frame's magnitude lies
pub fn spectral_rolloff(frame: &[f32], freqs: &[f32], percent: f32) -> f32 {
    let total: f32 = frame.iter().sum();
    if total <= EPSILON {
        return 0.0;
    }
    let threshold = percent * total;
    let mut cumulative = 0.0f32;
    for (s, &f) in frame.iter().zip(freqs.iter()) {
        cumulative += s;
        if cumulative >= threshold {
            return f;
        }
    }
    freqs.last().copied().unwrap_or(0.0)
}

/// Fraction of sign changes per centred, edge-padded frame
///
/// Near-zero samples count as positive. The first sample of a frame never
/// counts as a crossing.
pub fn zero_crossing_rate(samples: &[f32], frame_size: usize, hop_size: usize) -> Vec<f32> {
    if samples.is_empty() || frame_size == 0 || hop_size == 0 {
        return Vec::new();
    }

    let negative: Vec<bool> = samples
        .iter()
        .map(|&x| x.abs() > ZERO_CROSSING_THRESHOLD && x < 0.0)
        .collect();
    let pad = frame_size / 2;
    let last = samples.len() - 1;
    // Edge padding: indices before the start repeat sample 0, after the end the last one
    let sign_at = |padded: usize| -> bool { negative[padded.saturating_sub(pad).min(last)] };

    (0..frame_count(samples.len(), hop_size))
        .map(|t| {
            let start = t * hop_size;
            let crossings = (start + 1..start + frame_size)
                .filter(|&i| sign_at(i) != sign_at(i - 1))
                .count();
            crossings as f32 / frame_size as f32
        })
        .collect()
}
