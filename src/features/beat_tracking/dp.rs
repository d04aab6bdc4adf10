//! Dynamic-programming beat tracker
//!
//! Picks the beat sequence that best trades onset strength against regularity
//! at a fixed tempo. For each frame `i` the cumulative score is
//!
//! `C[i] = L[i] + max_{p/2 <= i-j <= 2p} (C[j] - tightness * ln((i-j)/p)²)`
//!
//! where `L` is the onset envelope (normalised by its standard deviation and
//! smoothed by a narrow Gaussian) and `p` is the beat period in frames. The last
//! beat is the final strong local maximum of `C`; the rest follow by backtracking.
//! Weak beats at either end of the sequence are trimmed.
//!
//! # Reference
//!
//! Ellis, D. P. W. (2007). Beat Tracking by Dynamic Programming.
//! *Journal of New Music Research*, 36(1), 51-60.

use super::median;
use crate::error::{StageError, StageResult};
use crate::features::period::{estimate_tempo, TempoPrior};
use crate::features::spectrum::{frames_to_time, hann_window, EPSILON};

/// Beats found by the tracker
#[derive(Debug, Clone, PartialEq)]
pub struct BeatTrack {
    /// Tempo the tracker ran at (BPM)
    pub bpm: f32,
    /// Beat positions as envelope frame indices (strictly increasing)
    pub frames: Vec<usize>,
    /// Beat positions in seconds (strictly increasing)
    pub times: Vec<f32>,
}

/// Track beats in an onset envelope
///
/// The tempo is re-estimated on the full envelope with a prior centred on
/// `start_bpm` and refined to sub-frame precision; the tracker then runs at
/// that tempo.
///
/// # Arguments
///
/// * `envelope` - Onset strength per frame
/// * `sample_rate` - Sample rate in Hz
/// * `hop_size` - Hop size of the envelope in samples
/// * `start_bpm` - Tempo prior (usually the median of the windowed tempo track)
/// * `tightness` - Penalty on deviations from the beat period (default: 100)
/// * `max_tempo` - Upper bound on the tempo estimate
///
/// # Returns
///
/// The beat sequence. An envelope without energy yields no beats and reports
/// `start_bpm` as its tempo.
///
/// # Errors
///
/// - `StageError::InvalidParameter` for non-positive tempo or tightness
/// - Any error from tempo estimation
pub fn track_beats(
    envelope: &[f32],
    sample_rate: u32,
    hop_size: usize,
    start_bpm: f32,
    tightness: f32,
    max_tempo: f32,
) -> StageResult<BeatTrack> {
    if !(start_bpm > 0.0) || !(tightness > 0.0) {
        return Err(StageError::InvalidParameter(format!(
            "start_bpm={} tightness={}",
            start_bpm, tightness
        )));
    }

    if envelope.iter().all(|&x| x.abs() <= EPSILON) {
        log::debug!("Beat tracker: onset envelope is silent, no beats");
        return Ok(BeatTrack {
            bpm: start_bpm,
            frames: Vec::new(),
            times: Vec::new(),
        });
    }

    let prior = TempoPrior {
        start_bpm,
        std_octaves: 1.0,
        max_tempo,
        interpolate: true,
    };
    let bpm = estimate_tempo(envelope, sample_rate, hop_size, &prior)?;

    let frame_rate = sample_rate as f32 / hop_size as f32;
    let period = (frame_rate * 60.0 / bpm).round().max(1.0);

    let local = local_score(&normalize_onsets(envelope), period);
    let (backlink, cumscore) = dynamic_program(&local, period, tightness);

    let tail = last_beat(&cumscore).ok_or_else(|| {
        StageError::EmptyIntermediate("cumulative beat score has no local maximum".to_string())
    })?;

    let mut frames = Vec::new();
    let mut cursor = Some(tail);
    while let Some(i) = cursor {
        frames.push(i);
        cursor = backlink[i];
    }
    frames.reverse();

    let frames = trim_beats(&local, frames);
    let times = frames
        .iter()
        .map(|&f| frames_to_time(f, sample_rate, hop_size))
        .collect();

    log::debug!(
        "Beat tracker: {:.2} BPM, period {} frames, {} beats",
        bpm,
        period,
        frames.len()
    );

    Ok(BeatTrack { bpm, frames, times })
}

/// Divide by the sample standard deviation
fn normalize_onsets(envelope: &[f32]) -> Vec<f32> {
    let n = envelope.len();
    let std = if n > 1 {
        let mean = envelope.iter().sum::<f32>() / n as f32;
        let var = envelope.iter().map(|&x| (x - mean) * (x - mean)).sum::<f32>() / (n - 1) as f32;
        var.sqrt()
    } else {
        0.0
    };
    envelope.iter().map(|&x| x / (std + f32::MIN_POSITIVE)).collect()
}

/// Smooth with a Gaussian of standard deviation `period / 32`, spanning ±`period` frames
fn local_score(onsets: &[f32], period: f32) -> Vec<f32> {
    let half = period as isize;
    let window: Vec<f32> = (-half..=half)
        .map(|k| {
            let x = k as f32 * 32.0 / period;
            (-0.5 * x * x).exp()
        })
        .collect();

    let n = onsets.len() as isize;
    (0..n)
        .map(|i| {
            window
                .iter()
                .enumerate()
                .filter_map(|(k, &w)| {
                    let j = i + k as isize - half;
                    (0..n).contains(&j).then(|| onsets[j as usize] * w)
                })
                .sum()
        })
        .collect()
}

/// Forward pass: best predecessor and cumulative score for every frame
///
/// Frames before the first one reaching 1% of the strongest local score cannot
/// link backwards, so the beat sequence never starts in leading silence.
fn dynamic_program(local: &[f32], period: f32, tightness: f32) -> (Vec<Option<usize>>, Vec<f32>) {
    let n = local.len();
    let mut backlink = vec![None; n];
    let mut cumscore = vec![0.0f32; n];

    let score_threshold = 0.01 * local.iter().copied().fold(f32::MIN, f32::max);
    let nearest = ((period / 2.0).round() as usize).max(1);
    let farthest = (2.0 * period) as usize;
    let ln_period = period.ln();
    let mut first_beat = true;

    for i in 0..n {
        let mut best: Option<(usize, f32)> = None;
        if i >= nearest {
            let lo = i.saturating_sub(farthest);
            for j in (lo..=i - nearest).rev() {
                let deviation = ((i - j) as f32).ln() - ln_period;
                let score = cumscore[j] - tightness * deviation * deviation;
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((j, score));
                }
            }
        }

        cumscore[i] = local[i] + best.map_or(0.0, |(_, s)| s);

        if first_beat && local[i] < score_threshold {
            backlink[i] = None;
        } else {
            backlink[i] = best.map(|(j, _)| j);
            first_beat = false;
        }
    }

    (backlink, cumscore)
}

/// Last local maximum of the cumulative score above half the median local maximum
fn last_beat(cumscore: &[f32]) -> Option<usize> {
    let n = cumscore.len();
    let is_peak = |i: usize| {
        i > 0 && cumscore[i] > cumscore[i - 1] && (i + 1 == n || cumscore[i] >= cumscore[i + 1])
    };

    let peaks: Vec<f32> = (0..n).filter(|&i| is_peak(i)).map(|i| cumscore[i]).collect();
    if peaks.is_empty() {
        return None;
    }
    let med = median(&peaks);

    (0..n).rev().find(|&i| is_peak(i) && 2.0 * cumscore[i] > med)
}

/// Drop leading and trailing beats whose smoothed onset score is below half the RMS
fn trim_beats(local: &[f32], beats: Vec<usize>) -> Vec<usize> {
    if beats.is_empty() {
        return beats;
    }

    let scores: Vec<f32> = beats.iter().map(|&b| local[b]).collect();
    let window = hann_window(5);
    let half = (window.len() / 2) as isize;
    let n = scores.len() as isize;

    let smooth: Vec<f32> = (0..n)
        .map(|i| {
            window
                .iter()
                .enumerate()
                .filter_map(|(k, &w)| {
                    let j = i + half - k as isize;
                    (0..n).contains(&j).then(|| scores[j as usize] * w)
                })
                .sum()
        })
        .collect();

    let rms = (smooth.iter().map(|x| x * x).sum::<f32>() / smooth.len() as f32).sqrt();
    let threshold = 0.5 * rms;

    let first = smooth.iter().position(|&s| s >= threshold);
    let last = smooth.iter().rposition(|&s| s >= threshold);
    match (first, last) {
        (Some(a), Some(b)) => beats[a..=b].to_vec(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 22050;
    const HOP: usize = 512;

    fn bump_envelope(n_frames: usize, period: f32, offset: f32) -> (Vec<f32>, Vec<f32>) {
        let mut env = vec![0.0f32; n_frames];
        let mut centres = Vec::new();
        let mut centre = offset;
        while centre < n_frames as f32 {
            centres.push(centre);
            for (i, v) in env.iter_mut().enumerate() {
                let d = i as f32 - centre;
                if d.abs() < 5.0 {
                    *v += (-0.5 * d * d).exp();
                }
            }
            centre += period;
        }
        (env, centres)
    }

    #[test]
    fn test_beats_follow_regular_pulses() {
        let period = SR as f32 * 60.0 / 120.0 / HOP as f32;
        let (env, centres) = bump_envelope(1400, period, 10.0);
        let track = track_beats(&env, SR, HOP, 120.0, 100.0, 320.0).unwrap();

        assert!((track.bpm - 120.0).abs() < 2.0, "got {}", track.bpm);
        assert!(track.frames.len() > 50, "only {} beats", track.frames.len());
        assert!(track.frames.windows(2).all(|w| w[0] < w[1]));
        assert!(track.times.windows(2).all(|w| w[0] < w[1]));

        for &f in &track.frames {
            let nearest = centres
                .iter()
                .map(|&c| (c - f as f32).abs())
                .fold(f32::INFINITY, f32::min);
            assert!(nearest <= 2.0, "beat at frame {} is {} frames off", f, nearest);
        }

        let intervals: Vec<f32> = track.times.windows(2).map(|w| w[1] - w[0]).collect();
        let mean = intervals.iter().sum::<f32>() / intervals.len() as f32;
        assert!((mean - 0.5).abs() < 0.02, "mean interval {}", mean);
    }

    #[test]
    fn test_silence_has_no_beats() {
        let track = track_beats(&[0.0; 500], SR, HOP, 123.0, 100.0, 320.0).unwrap();
        assert!(track.frames.is_empty());
        assert!(track.times.is_empty());
        assert_eq!(track.bpm, 123.0);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(track_beats(&[1.0; 10], SR, HOP, 0.0, 100.0, 320.0).is_err());
        assert!(track_beats(&[1.0; 10], SR, HOP, 120.0, 0.0, 320.0).is_err());
    }

    #[test]
    fn test_local_score_peaks_at_onsets() {
        let mut onsets = vec![0.0f32; 64];
        onsets[30] = 1.0;
        let score = local_score(&onsets, 22.0);
        assert_eq!(score.len(), 64);
        let argmax = score
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc })
            .0;
        assert_eq!(argmax, 30);
        assert!((score[30] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_last_beat_requires_a_peak() {
        assert_eq!(last_beat(&[3.0, 2.0, 1.0]), None);
        assert_eq!(last_beat(&[0.0, 1.0, 0.5, 2.0, 1.0]), Some(3));
    }

    #[test]
    fn test_trim_drops_weak_edges() {
        let mut local = vec![0.0f32; 100];
        for b in [10, 30, 50, 70] {
            local[b] = 1.0;
        }
        // Beats at 90 and 95 sit on silence
        let beats = trim_beats(&local, vec![10, 30, 50, 70, 90, 95]);
        assert_eq!(beats.first(), Some(&10));
        assert!(!beats.contains(&95));
    }
}
