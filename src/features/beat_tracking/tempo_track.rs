//! Windowed tempo tracking
//!
//! Slides a fixed window over the percussive signal and estimates a local tempo
//! in each one, giving a tempo curve over time. The overall tempo is the median
//! of the curve and its confidence reflects how steady the curve is:
//!
//! `confidence = clamp(1 - std / mean, 0, 1)`
//!
//! The onset envelope is computed once for the whole signal and sliced per
//! window. Windows are independent, so they run in parallel when enabled.

use rayon::prelude::*;

use super::median;
use crate::config::AnalysisConfig;
use crate::error::{StageError, StageResult};
use crate::features::period::{estimate_tempo, TempoPrior};
use crate::features::spectrum::EPSILON;

/// Tempo reported when no window could be analysed
pub const DEFAULT_TEMPO: f32 = 120.0;

/// Confidence reported alongside [`DEFAULT_TEMPO`]
pub const DEFAULT_TEMPO_CONFIDENCE: f32 = 0.5;

/// Tempo curve and its summary
#[derive(Debug, Clone, PartialEq)]
pub struct TempoTrack {
    /// Median of `track` (BPM)
    pub bpm: f32,
    /// Steadiness of the curve in [0, 1]
    pub confidence: f32,
    /// Local tempo per window (BPM)
    pub track: Vec<f32>,
    /// Window start times in seconds
    pub times: Vec<f32>,
}

impl TempoTrack {
    /// 120 BPM at confidence 0.5 with an empty curve
    pub fn fallback() -> Self {
        Self {
            bpm: DEFAULT_TEMPO,
            confidence: DEFAULT_TEMPO_CONFIDENCE,
            track: Vec::new(),
            times: Vec::new(),
        }
    }

    fn from_track(track: Vec<f32>, times: Vec<f32>) -> Self {
        if track.is_empty() {
            return Self::fallback();
        }

        let n = track.len() as f32;
        let mean = track.iter().sum::<f32>() / n;
        let std = (track.iter().map(|&x| (x - mean) * (x - mean)).sum::<f32>() / n).sqrt();
        let confidence = (1.0 - std / (mean + EPSILON)).clamp(0.0, 1.0);

        Self {
            bpm: median(&track),
            confidence,
            track,
            times,
        }
    }
}

/// Track tempo over time
///
/// # Arguments
///
/// * `envelope` - Onset strength of the percussive signal (one value per hop)
/// * `n_samples` - Length of the percussive signal in samples
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Uses `tempo_window_size`, `tempo_window_hop`, `hop_size`,
///   `start_bpm`, `tempo_std_bpm`, `max_tempo` and `parallel`
///
/// # Returns
///
/// The tempo curve. Windows without onset energy are left out; if none remain
/// the result is [`TempoTrack::fallback`].
///
/// # Errors
///
/// `StageError::InvalidParameter` for a zero window, hop or sample rate
pub fn track_tempo(
    envelope: &[f32],
    n_samples: usize,
    sample_rate: u32,
    config: &AnalysisConfig,
) -> StageResult<TempoTrack> {
    let window = config.tempo_window_size;
    let hop = config.tempo_window_hop;
    if window == 0 || hop == 0 || config.hop_size == 0 || sample_rate == 0 {
        return Err(StageError::InvalidParameter(format!(
            "window={} hop={} stft_hop={} sample_rate={}",
            window, hop, config.hop_size, sample_rate
        )));
    }

    let prior = TempoPrior {
        start_bpm: config.start_bpm,
        std_octaves: config.tempo_std_bpm,
        max_tempo: config.max_tempo,
        interpolate: false,
    };

    let starts: Vec<usize> = (0..n_samples.saturating_sub(window)).step_by(hop).collect();
    let frames_per_window = window / config.hop_size + 1;

    let estimate = |&start: &usize| -> Option<(f32, f32)> {
        let first = start / config.hop_size;
        let last = (first + frames_per_window).min(envelope.len());
        if first >= last {
            return None;
        }
        let slice = &envelope[first..last];
        if slice.iter().all(|&x| x <= EPSILON) {
            return None;
        }
        match estimate_tempo(slice, sample_rate, config.hop_size, &prior) {
            Ok(bpm) => Some((start as f32 / sample_rate as f32, bpm)),
            Err(e) => {
                log::debug!("Tempo window at sample {} skipped: {}", start, e);
                None
            }
        }
    };

    let estimates: Vec<Option<(f32, f32)>> = if config.parallel {
        starts.par_iter().map(estimate).collect()
    } else {
        starts.iter().map(estimate).collect()
    };

    let (times, track): (Vec<f32>, Vec<f32>) = estimates.into_iter().flatten().unzip();

    let result = TempoTrack::from_track(track, times);
    log::debug!(
        "Tempo track: {} of {} windows, median {:.2} BPM, confidence {:.3}",
        result.track.len(),
        starts.len(),
        result.bpm,
        result.confidence
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bump_envelope(n_frames: usize, period: f32) -> Vec<f32> {
        let mut env = vec![0.0f32; n_frames];
        let mut centre = 0.0f32;
        while centre < n_frames as f32 {
            for (i, v) in env.iter_mut().enumerate() {
                let d = i as f32 - centre;
                if d.abs() < 5.0 {
                    *v += (-0.5 * d * d).exp();
                }
            }
            centre += period;
        }
        env
    }

    #[test]
    fn test_summary_statistics() {
        let t = TempoTrack::from_track(vec![100.0, 120.0, 140.0], vec![0.0, 0.1, 0.2]);
        assert_eq!(t.bpm, 120.0);
        // std = 16.33, mean = 120
        assert!((t.confidence - (1.0 - 16.3299 / 120.0)).abs() < 1e-3);
    }

    #[test]
    fn test_even_length_median() {
        let t = TempoTrack::from_track(vec![100.0, 110.0, 130.0, 140.0], vec![0.0; 4]);
        assert_eq!(t.bpm, 120.0);
    }

    #[test]
    fn test_empty_track_falls_back() {
        let t = TempoTrack::from_track(Vec::new(), Vec::new());
        assert_eq!(t, TempoTrack::fallback());
        assert_eq!(t.bpm, 120.0);
        assert_eq!(t.confidence, 0.5);
    }

    #[test]
    fn test_silence_gives_fallback() {
        let config = AnalysisConfig::default();
        let env = vec![0.0f32; 200];
        let t = track_tempo(&env, 200 * 512, 22050, &config).unwrap();
        assert_eq!(t, TempoTrack::fallback());
    }

    #[test]
    fn test_short_signal_has_no_windows() {
        let config = AnalysisConfig::default();
        let env = vec![1.0f32; 10];
        let t = track_tempo(&env, 8192, 22050, &config).unwrap();
        assert!(t.track.is_empty());
        assert_eq!(t.bpm, 120.0);
    }

    #[test]
    fn test_window_times_and_steady_track() {
        let config = AnalysisConfig::default();
        let n_samples = 22050 * 10;
        let env = bump_envelope(n_samples / 512 + 1, 22050.0 * 60.0 / 120.0 / 512.0);
        let t = track_tempo(&env, n_samples, 22050, &config).unwrap();

        assert!(!t.track.is_empty());
        assert_eq!(t.track.len(), t.times.len());
        assert_eq!(t.times[0], 0.0);
        assert!((t.times[1] - 2048.0 / 22050.0).abs() < 1e-6);
        assert!(t.track.iter().all(|&bpm| bpm > 0.0 && bpm < 320.0));
        assert!((0.0..=1.0).contains(&t.confidence));
        // Each window holds under a second of onsets; the prior keeps them near 120
        assert!((t.bpm - 120.0).abs() < 10.0, "got {}", t.bpm);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let n_samples = 22050 * 6;
        let env = bump_envelope(n_samples / 512 + 1, 17.0);
        let parallel = track_tempo(&env, n_samples, 22050, &AnalysisConfig::default()).unwrap();
        let sequential = track_tempo(
            &env,
            n_samples,
            22050,
            &AnalysisConfig {
                parallel: false,
                ..AnalysisConfig::default()
            },
        )
        .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = AnalysisConfig {
            tempo_window_size: 0,
            ..AnalysisConfig::default()
        };
        assert!(track_tempo(&[1.0; 100], 50_000, 22050, &config).is_err());
    }
}
