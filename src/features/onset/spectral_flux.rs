//! Spectral flux onset strength
//!
//! Detects note and drum attacks as positive changes in a log-compressed mel
//! spectrogram:
//!
//! 1. Mel power spectrogram (Slaney filterbank), converted to dB with an 80 dB floor
//! 2. Per band, half-wave rectified first difference along time
//! 3. Mean over bands
//! 4. Shift right by the difference lag and a quarter window, which puts the peak
//!    of a sharp attack on the frame nearest to it
//!
//! The envelope has one value per STFT frame of the input.
//!
//! # Reference
//!
//! Böck, S., & Widmer, G. (2013). Maximum Filter Vibrato Suppression for Onset Detection.
//! *Proceedings of DAFx-13*.

use crate::error::{StageError, StageResult};
use crate::features::spectrum::{mel_spectrogram, power_to_db};

/// Compute the onset strength envelope of a signal
///
/// # Arguments
///
/// * `samples` - Mono samples
/// * `sample_rate` - Sample rate in Hz
/// * `frame_size` - STFT frame size (default: 2048)
/// * `hop_size` - STFT hop size (default: 512)
/// * `n_mels` - Mel bands (default: 128)
///
/// # Returns
///
/// Onset strength per frame (`1 + samples.len() / hop_size` values, all ≥ 0)
///
/// # Errors
///
/// Returns `StageError` if the spectrogram cannot be computed
pub fn onset_strength(
    samples: &[f32],
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
    n_mels: usize,
) -> StageResult<Vec<f32>> {
    if n_mels == 0 {
        return Err(StageError::InvalidParameter("n_mels must be > 0".to_string()));
    }

    let mut mel = mel_spectrogram(samples, sample_rate, frame_size, hop_size, n_mels)?;
    power_to_db(&mut mel, 1.0, 1e-10, 80.0);

    let n_frames = mel.len();
    let mut flux = Vec::with_capacity(n_frames);
    for t in 1..n_frames {
        let sum: f32 = mel[t]
            .iter()
            .zip(mel[t - 1].iter())
            .map(|(cur, prev)| (cur - prev).max(0.0))
            .sum();
        flux.push(sum / n_mels as f32);
    }

    // One frame of lag, plus the quarter window by which the leading edge of a
    // centred frame reaches an attack before the frame centre does
    let pad = 1 + frame_size / (4 * hop_size);
    let mut envelope = vec![0.0f32; pad];
    envelope.extend(flux);
    envelope.resize(n_frames, 0.0);

    log::debug!(
        "Onset strength: {} frames, max={:.3}",
        envelope.len(),
        envelope.iter().copied().fold(0.0f32, f32::max)
    );

    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clicks(sample_rate: u32, interval: usize, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        let mut samples = vec![0.0f32; n];
        for start in (0..n).step_by(interval) {
            for j in 0..64 {
                if start + j < n {
                    samples[start + j] = (1.0 - j as f32 / 64.0) * if j % 2 == 0 { 1.0 } else { -1.0 };
                }
            }
        }
        samples
    }

    #[test]
    fn test_envelope_length_matches_frames() {
        let samples = vec![0.0f32; 22050];
        let env = onset_strength(&samples, 22050, 2048, 512, 128).unwrap();
        assert_eq!(env.len(), 1 + 22050 / 512);
    }

    #[test]
    fn test_silence_has_flat_envelope() {
        let env = onset_strength(&vec![0.0f32; 22050], 22050, 2048, 512, 128).unwrap();
        assert!(env.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_clicks_produce_peaks_near_click_frames() {
        let sr = 22050;
        let interval = 11025; // 0.5 s
        let env = onset_strength(&clicks(sr, interval, 3.0), sr, 2048, 512, 128).unwrap();

        let max = env.iter().copied().fold(0.0f32, f32::max);
        assert!(max > 0.0);

        // Click at 1.0 s sits at frame ~43; the envelope should peak within a frame or two
        let click_frame = (sr as usize) / 512;
        let local_max = env[click_frame - 2..=click_frame + 2]
            .iter()
            .copied()
            .fold(0.0f32, f32::max);
        let between = env[click_frame + 10..click_frame + 15]
            .iter()
            .copied()
            .fold(0.0f32, f32::max);
        assert!(local_max > 2.0 * between);
    }

    #[test]
    fn test_attack_peak_lands_on_onset() {
        let sr = 22050u32;
        let mut state: u32 = 7;
        for offset in [0usize, 128, 256, 384] {
            let onset = sr as usize + offset;
            let mut samples = vec![0.0f32; 2 * sr as usize];
            for x in samples[onset..onset + 6615].iter_mut() {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                *x = 0.5 * ((state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0);
            }

            let env = onset_strength(&samples, sr, 2048, 512, 128).unwrap();
            let peak = env
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap();
            let error = peak as f32 * 512.0 / sr as f32 - onset as f32 / sr as f32;
            assert!(error.abs() < 0.02, "offset {}: peak {:.4}s off", offset, error);
        }
    }

    #[test]
    fn test_zero_mels_rejected() {
        assert!(onset_strength(&[0.0; 4096], 22050, 2048, 512, 0).is_err());
    }
}
