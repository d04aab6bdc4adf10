//! Downbeats and per-beat strength

use crate::error::{StageError, StageResult};
use crate::features::spectrum::{time_to_frame, EPSILON};

/// Strength reported for every beat when no onset envelope is available
pub const DEFAULT_BEAT_STRENGTH: f32 = 0.5;

/// Mark every `beats_per_bar`-th beat, starting with the first, as a downbeat
///
/// # Errors
///
/// `StageError::InvalidParameter` if `beats_per_bar` is zero
pub fn detect_downbeats(beats: &[f32], beats_per_bar: usize) -> StageResult<Vec<f32>> {
    if beats_per_bar == 0 {
        return Err(StageError::InvalidParameter(
            "beats_per_bar must be > 0".to_string(),
        ));
    }
    Ok(beats.iter().step_by(beats_per_bar).copied().collect())
}

/// Every 4th beat, or nothing when there are fewer than four beats
pub fn fallback_downbeats(beats: &[f32]) -> Vec<f32> {
    if beats.len() < 4 {
        return Vec::new();
    }
    beats.iter().step_by(4).copied().collect()
}

/// Onset strength at each beat relative to the strongest frame of the envelope
///
/// # Arguments
///
/// * `envelope` - Onset strength of the percussive signal
/// * `beats` - Beat times in seconds
/// * `sample_rate` - Sample rate in Hz
/// * `hop_size` - Hop size of the envelope in samples
///
/// # Returns
///
/// One value in [0, 1] per beat, read from the frame nearest to the beat
///
/// # Errors
///
/// `StageError::EmptyIntermediate` if there are beats but no envelope
pub fn beat_strengths(
    envelope: &[f32],
    beats: &[f32],
    sample_rate: u32,
    hop_size: usize,
) -> StageResult<Vec<f32>> {
    if beats.is_empty() {
        return Ok(Vec::new());
    }
    if envelope.is_empty() {
        return Err(StageError::EmptyIntermediate(
            "no onset envelope for beat strength".to_string(),
        ));
    }

    let max = envelope.iter().copied().fold(0.0f32, f32::max);
    let last = envelope.len() - 1;

    Ok(beats
        .iter()
        .map(|&t| {
            let frame = time_to_frame(t, sample_rate, hop_size).min(last);
            (envelope[frame].max(0.0) / (max + EPSILON)).clamp(0.0, 1.0)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downbeats_every_nth_beat() {
        let beats: Vec<f32> = (0..10).map(|i| i as f32 * 0.5).collect();
        assert_eq!(detect_downbeats(&beats, 4).unwrap(), vec![0.0, 2.0, 4.0]);
        assert_eq!(detect_downbeats(&beats, 3).unwrap(), vec![0.0, 1.5, 3.0, 4.5]);
        assert!(detect_downbeats(&[], 4).unwrap().is_empty());
    }

    #[test]
    fn test_zero_beats_per_bar_fails() {
        assert!(detect_downbeats(&[0.0, 0.5], 0).is_err());
    }

    #[test]
    fn test_fallback_downbeats() {
        assert!(fallback_downbeats(&[0.0, 0.5, 1.0]).is_empty());
        assert_eq!(
            fallback_downbeats(&[0.0, 0.5, 1.0, 1.5, 2.0]),
            vec![0.0, 2.0]
        );
    }

    #[test]
    fn test_beat_strengths_normalised() {
        let mut env = vec![0.0f32; 100];
        env[43] = 4.0;
        env[86] = 2.0;
        let beats = [43.0 * 512.0 / 22050.0, 86.0 * 512.0 / 22050.0, 0.3];
        let s = beat_strengths(&env, &beats, 22050, 512).unwrap();
        assert!((s[0] - 1.0).abs() < 1e-6);
        assert!((s[1] - 0.5).abs() < 1e-6);
        assert_eq!(s[2], 0.0);
    }

    #[test]
    fn test_beat_past_envelope_uses_last_frame() {
        let env = vec![1.0f32, 2.0];
        let s = beat_strengths(&env, &[100.0], 22050, 512).unwrap();
        assert!((s[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_envelope() {
        assert!(beat_strengths(&[], &[0.5], 22050, 512).is_err());
        assert!(beat_strengths(&[], &[], 22050, 512).unwrap().is_empty());
    }
}
