//! Time signature detection
//!
//! Infers the metre from inter-beat interval statistics. Supports the common
//! time signatures 4/4, 3/4 and 6/8.
//!
//! # Algorithm
//!
//! 1. Fewer than 8 beats: 4/4 at 0.5 (not enough evidence)
//! 2. Coefficient of variation of the intervals below 0.15: 4/4 at 0.8
//! 3. With at least 12 intervals, take the raw autocorrelation of the interval
//!    sequence:
//!    - `ac[3] > 0.7 * max(ac[1..6])`: 3/4 at 0.7
//!    - `ac[6] > 0.7 * max(ac[1..10])`: 6/8 at 0.7
//! 4. Otherwise 4/4 at 0.6
//!
//! The rules are evaluated in this order, so the result is a pure function of
//! the interval sequence.
//!
//! # Example
//!
//! ```
//! use linear_analysis::features::beat_tracking::time_signature::{
//!     detect_time_signature, TimeSignature,
//! };
//!
//! let beats: Vec<f32> = (0..16).map(|i| i as f32 * 0.5).collect();
//! let (time_sig, confidence) = detect_time_signature(&beats, 120.0)?;
//!
//! assert_eq!(time_sig, TimeSignature::FourFour);
//! assert_eq!(confidence, 0.8);
//! # Ok::<(), linear_analysis::error::StageError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{StageError, StageResult};
use crate::features::spectrum::EPSILON;

/// Minimum number of beats before anything but the default is reported
const MIN_BEATS: usize = 8;

/// Intervals at or below this coefficient of variation are treated as steady 4/4
const STEADY_CV: f32 = 0.15;

/// Minimum interval count for the autocorrelation rules
const MIN_INTERVALS_FOR_GROUPING: usize = 12;

/// Fraction of the neighbourhood maximum a grouping lag has to exceed
const GROUPING_RATIO: f32 = 0.7;

/// Musical time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSignature {
    /// 4/4 time (common time)
    #[serde(rename = "4/4")]
    FourFour,
    /// 3/4 time (waltz time)
    #[serde(rename = "3/4")]
    ThreeFour,
    /// 6/8 time (compound duple)
    #[serde(rename = "6/8")]
    SixEight,
}

impl TimeSignature {
    /// Get beats per bar for this time signature
    pub fn beats_per_bar(&self) -> u32 {
        match self {
            TimeSignature::FourFour => 4,
            TimeSignature::ThreeFour => 3,
            TimeSignature::SixEight => 6,
        }
    }

    /// Get name as string (e.g., "4/4", "3/4", "6/8")
    pub fn name(&self) -> &'static str {
        match self {
            TimeSignature::FourFour => "4/4",
            TimeSignature::ThreeFour => "3/4",
            TimeSignature::SixEight => "6/8",
        }
    }
}

impl std::fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Detect time signature from beat times
///
/// # Arguments
///
/// * `beats` - Beat times in seconds (sorted)
/// * `bpm_estimate` - Global tempo; only checked for validity
///
/// # Returns
///
/// Detected time signature with confidence score
///
/// # Errors
///
/// `StageError::InvalidParameter` if there are enough beats to analyse but the
/// tempo is not positive
pub fn detect_time_signature(
    beats: &[f32],
    bpm_estimate: f32,
) -> StageResult<(TimeSignature, f32)> {
    if beats.len() < MIN_BEATS {
        return Ok((TimeSignature::FourFour, 0.5));
    }

    if !(bpm_estimate > EPSILON) {
        return Err(StageError::InvalidParameter(format!(
            "invalid BPM for time signature detection: {:.2}",
            bpm_estimate
        )));
    }

    let intervals: Vec<f32> = beats.windows(2).map(|w| w[1] - w[0]).collect();
    let n = intervals.len() as f32;
    let mean = intervals.iter().sum::<f32>() / n;
    let variance = intervals.iter().map(|&x| (x - mean) * (x - mean)).sum::<f32>() / n;
    let cv = variance.sqrt() / (mean + EPSILON);

    log::debug!(
        "Time signature: {} intervals, mean={:.3}s, cv={:.3}",
        intervals.len(),
        mean,
        cv
    );

    if cv < STEADY_CV {
        return Ok((TimeSignature::FourFour, 0.8));
    }

    if intervals.len() >= MIN_INTERVALS_FOR_GROUPING {
        let ac = interval_autocorrelation(&intervals, 10);
        let max_in = |lo: usize, hi: usize| ac[lo..hi].iter().copied().fold(f32::MIN, f32::max);

        if ac[3] > GROUPING_RATIO * max_in(1, 6) {
            return Ok((TimeSignature::ThreeFour, 0.7));
        }
        if ac[6] > GROUPING_RATIO * max_in(1, 10) {
            return Ok((TimeSignature::SixEight, 0.7));
        }
    }

    Ok((TimeSignature::FourFour, 0.6))
}

/// Unnormalised autocorrelation `ac[k] = Σ x[i]·x[i+k]` for `k < max_lag`
fn interval_autocorrelation(intervals: &[f32], max_lag: usize) -> Vec<f32> {
    (0..max_lag)
        .map(|k| {
            intervals
                .iter()
                .zip(intervals.iter().skip(k))
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beats_from_intervals(intervals: &[f32]) -> Vec<f32> {
        let mut beats = vec![0.0f32];
        for &iv in intervals {
            let last = *beats.last().unwrap();
            beats.push(last + iv);
        }
        beats
    }

    #[test]
    fn test_steady_beats_are_four_four() {
        let beats: Vec<f32> = (0..64).map(|i| i as f32 * 0.5).collect();
        let (time_sig, confidence) = detect_time_signature(&beats, 120.0).unwrap();
        assert_eq!(time_sig, TimeSignature::FourFour);
        assert_eq!(confidence, 0.8);
    }

    #[test]
    fn test_time_signature_insufficient_beats() {
        let beats = vec![0.0, 0.5, 1.0, 1.5]; // Only 4 beats

        let (time_sig, confidence) = detect_time_signature(&beats, 120.0).unwrap();

        assert_eq!(time_sig, TimeSignature::FourFour);
        assert_eq!(confidence, 0.5);
    }

    #[test]
    fn test_irregular_but_short_defaults() {
        // 7 intervals: too few for the grouping rules
        let beats = beats_from_intervals(&[0.3, 0.7, 0.3, 0.7, 0.3, 0.7, 0.3]);
        let (time_sig, confidence) = detect_time_signature(&beats, 120.0).unwrap();
        assert_eq!(time_sig, TimeSignature::FourFour);
        assert_eq!(confidence, 0.6);
    }

    #[test]
    fn test_three_beat_grouping() {
        let pattern = [1.6, 0.2, 0.2, 0.2, 0.2, 0.2];
        let intervals: Vec<f32> = pattern.iter().cycle().take(18).copied().collect();
        let beats = beats_from_intervals(&intervals);
        let (time_sig, confidence) = detect_time_signature(&beats, 120.0).unwrap();
        assert_eq!(time_sig, TimeSignature::ThreeFour);
        assert_eq!(confidence, 0.7);
    }

    #[test]
    fn test_six_beat_grouping() {
        // Alternating intervals: lag 3 falls just short, lag 6 clears the ratio
        let intervals: Vec<f32> = [0.3, 0.7].iter().cycle().take(20).copied().collect();
        let beats = beats_from_intervals(&intervals);
        let (time_sig, confidence) = detect_time_signature(&beats, 120.0).unwrap();
        assert_eq!(time_sig, TimeSignature::SixEight);
        assert_eq!(confidence, 0.7);
    }

    #[test]
    fn test_deterministic() {
        let intervals: Vec<f32> = [0.4, 0.9, 0.5].iter().cycle().take(30).copied().collect();
        let beats = beats_from_intervals(&intervals);
        let a = detect_time_signature(&beats, 100.0).unwrap();
        let b = detect_time_signature(&beats, 100.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_bpm() {
        let beats: Vec<f32> = (0..10).map(|i| i as f32 * 0.5).collect();
        assert!(detect_time_signature(&beats, 0.0).is_err());
        assert!(detect_time_signature(&beats, f32::NAN).is_err());
    }

    #[test]
    fn test_time_signature_beats_per_bar() {
        assert_eq!(TimeSignature::FourFour.beats_per_bar(), 4);
        assert_eq!(TimeSignature::ThreeFour.beats_per_bar(), 3);
        assert_eq!(TimeSignature::SixEight.beats_per_bar(), 6);
    }

    #[test]
    fn test_time_signature_name() {
        assert_eq!(TimeSignature::FourFour.name(), "4/4");
        assert_eq!(TimeSignature::ThreeFour.name(), "3/4");
        assert_eq!(TimeSignature::SixEight.name(), "6/8");
        assert_eq!(
            serde_json::to_string(&TimeSignature::SixEight).unwrap(),
            "\"6/8\""
        );
    }
}
