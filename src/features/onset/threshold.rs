//! Adaptive thresholding and peak picking for onset envelopes
//!
//! A frame `n` of the envelope `x` is an onset when all of the following hold:
//!
//! 1. `x[n] == max(x[n - pre_max ..= n + post_max - 1])` (local maximum)
//! 2. `x[n] >= mean(x[n - pre_avg ..= n + post_avg - 1]) + delta` (above the local mean)
//! 3. `x[n] > 0`
//! 4. `n > previous_onset + wait` (minimum separation)
//!
//! The envelope is first rescaled to `[0, 1]` so that `delta` is relative to the
//! strongest event in the signal.
//!
//! # Reference
//!
//! Böck, S., Krebs, F., & Schedl, M. (2012). Evaluating the Online Capabilities of Onset
//! Detection Methods. *Proceedings of ISMIR*.

use crate::features::spectrum::EPSILON;

/// Window and threshold parameters for [`pick_peaks`] (all windows in frames)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakPickParams {
    /// Frames before `n` in the maximum window
    pub pre_max: usize,
    /// Frames after `n` in the maximum window (exclusive)
    pub post_max: usize,
    /// Frames before `n` in the averaging window
    pub pre_avg: usize,
    /// Frames after `n` in the averaging window (exclusive)
    pub post_avg: usize,
    /// Threshold offset above the local mean
    pub delta: f32,
    /// Frames to skip after an accepted peak
    pub wait: usize,
}

impl PeakPickParams {
    /// Parameters for general onset detection at the given frame rate
    ///
    /// 30 ms maximum window before the frame, 100 ms averaging window on both
    /// sides, 30 ms wait.
    pub fn for_onsets(sample_rate: u32, hop_size: usize, delta: f32) -> Self {
        let frames_per_second = sample_rate as f32 / hop_size as f32;
        let avg = (0.10 * frames_per_second) as usize;
        Self {
            pre_max: (0.03 * frames_per_second) as usize,
            post_max: 1,
            pre_avg: avg,
            post_avg: avg + 1,
            delta,
            wait: (0.03 * frames_per_second) as usize,
        }
    }

    /// Parameters for a band-limited drum envelope with a minimum spacing in seconds
    pub fn for_drums(sample_rate: u32, hop_size: usize, delta: f32, min_separation: f32) -> Self {
        Self {
            pre_max: 3,
            post_max: 3,
            pre_avg: 3,
            post_avg: 3,
            delta,
            wait: (min_separation * sample_rate as f32 / hop_size as f32) as usize,
        }
    }
}

/// Rescale an envelope to `[0, 1]`: `(x - min) / max(x - min)`
///
/// A flat envelope becomes all zeros.
pub fn normalize_envelope(envelope: &[f32]) -> Vec<f32> {
    let min = envelope.iter().copied().fold(f32::INFINITY, f32::min);
    if !min.is_finite() {
        return Vec::new();
    }
    let shifted: Vec<f32> = envelope.iter().map(|&x| x - min).collect();
    let max = shifted.iter().copied().fold(0.0f32, f32::max);
    if max <= EPSILON {
        return vec![0.0; envelope.len()];
    }
    shifted.into_iter().map(|x| x / max).collect()
}

/// Pick onset frames from an envelope
///
/// # Arguments
///
/// * `envelope` - Onset strength per frame (any scale; normalised internally)
/// * `params` - Window sizes, threshold and wait
///
/// # Returns
///
/// Increasing frame indices of accepted peaks
pub fn pick_peaks(envelope: &[f32], params: &PeakPickParams) -> Vec<usize> {
    let x = normalize_envelope(envelope);
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }

    let mut peaks = Vec::new();
    let mut last: Option<usize> = None;

    for i in 0..n {
        let value = x[i];
        if value <= 0.0 {
            continue;
        }

        let max_lo = i.saturating_sub(params.pre_max);
        let max_hi = (i + params.post_max.max(1)).min(n);
        let local_max = x[max_lo..max_hi].iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if value < local_max {
            continue;
        }

        let avg_lo = i.saturating_sub(params.pre_avg);
        let avg_hi = (i + params.post_avg.max(1)).min(n);
        let window = &x[avg_lo..avg_hi];
        let local_mean = window.iter().sum::<f32>() / window.len() as f32;
        if value < local_mean + params.delta {
            continue;
        }

        if let Some(prev) = last {
            if i <= prev + params.wait {
                continue;
            }
        }

        peaks.push(i);
        last = Some(i);
    }

    log::debug!(
        "Picked {} peaks from {} frames (delta={:.3}, wait={})",
        peaks.len(),
        n,
        params.delta,
        params.wait
    );

    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse_train(n: usize, period: usize, height: f32) -> Vec<f32> {
        (0..n)
            .map(|i| if i % period == 5 { height } else { 0.0 })
            .collect()
    }

    #[test]
    fn test_normalize_envelope() {
        let out = normalize_envelope(&[2.0, 4.0, 6.0]);
        assert_eq!(out, vec![0.0, 0.5, 1.0]);
        assert_eq!(normalize_envelope(&[3.0, 3.0]), vec![0.0, 0.0]);
        assert!(normalize_envelope(&[]).is_empty());
    }

    #[test]
    fn test_picks_isolated_impulses() {
        let env = impulse_train(100, 20, 1.0);
        let params = PeakPickParams::for_drums(22050, 512, 0.1, 0.1);
        assert_eq!(pick_peaks(&env, &params), vec![5, 25, 45, 65, 85]);
    }

    #[test]
    fn test_wait_suppresses_close_peaks() {
        let mut env = vec![0.0f32; 40];
        env[10] = 1.0;
        env[14] = 0.9;
        env[30] = 1.0;
        let params = PeakPickParams {
            pre_max: 1,
            post_max: 1,
            pre_avg: 1,
            post_avg: 1,
            delta: 0.05,
            wait: 6,
        };
        assert_eq!(pick_peaks(&env, &params), vec![10, 30]);
    }

    #[test]
    fn test_flat_envelope_has_no_peaks() {
        let params = PeakPickParams::for_onsets(22050, 512, 0.1);
        assert!(pick_peaks(&[0.3; 50], &params).is_empty());
    }

    #[test]
    fn test_delta_rejects_small_bumps() {
        let mut env = vec![0.0f32; 30];
        env[5] = 1.0;
        env[20] = 0.04;
        let params = PeakPickParams::for_drums(22050, 512, 0.05, 0.0);
        assert_eq!(pick_peaks(&env, &params), vec![5]);
    }

    #[test]
    fn test_onset_params_scale_with_frame_rate() {
        let params = PeakPickParams::for_onsets(22050, 512, 0.1);
        assert_eq!(params.pre_max, 1);
        assert_eq!(params.pre_avg, 4);
        assert_eq!(params.post_avg, 5);
        assert_eq!(params.wait, 1);
    }
}
