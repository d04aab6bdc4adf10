//! Mel-frequency cepstral coefficients
//!
//! Mel power spectrogram (Slaney filterbank) → dB (80 dB dynamic range) →
//! orthonormal DCT-II along the mel axis → first `n_mfcc` coefficients.

use crate::config::AnalysisConfig;
use crate::error::{StageError, StageResult};
use crate::features::spectrum::{mel_spectrogram, power_to_db};

/// Compute MFCCs per STFT frame
///
/// # Arguments
///
/// * `samples` - Mono samples
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Uses `frame_size`, `hop_size`, `n_mels` and `n_mfcc`
///
/// # Returns
///
/// `n_frames × n_mfcc` coefficients, frame-major
///
/// # Errors
///
/// - `StageError::InvalidParameter` if `n_mfcc` is 0 or exceeds `n_mels`
/// - `StageError` from the spectrogram for empty input
pub fn compute_mfcc(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> StageResult<Vec<Vec<f32>>> {
    if config.n_mfcc == 0 || config.n_mfcc > config.n_mels {
        return Err(StageError::InvalidParameter(format!(
            "n_mfcc must be in 1..={}, got {}",
            config.n_mels, config.n_mfcc
        )));
    }

    let mut mel = mel_spectrogram(
        samples,
        sample_rate,
        config.frame_size,
        config.hop_size,
        config.n_mels,
    )?;
    power_to_db(&mut mel, 1.0, 1e-10, 80.0);

    let basis = dct_basis(config.n_mfcc, config.n_mels);
    let coefficients: Vec<Vec<f32>> = mel
        .iter()
        .map(|frame| {
            basis
                .iter()
                .map(|row| row.iter().zip(frame.iter()).map(|(b, e)| b * e).sum())
                .collect()
        })
        .collect();

    log::debug!(
        "MFCC: {} frames x {} coefficients",
        coefficients.len(),
        config.n_mfcc
    );

    Ok(coefficients)
}

/// Orthonormal DCT-II basis (`n_coefficients × n_inputs`)
fn dct_basis(n_coefficients: usize, n_inputs: usize) -> Vec<Vec<f32>> {
    let n = n_inputs as f32;
    (0..n_coefficients)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_inputs)
                .map(|i| {
                    scale * (std::f32::consts::PI * k as f32 * (i as f32 + 0.5) / n).cos()
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dct_basis_is_orthonormal() {
        let basis = dct_basis(13, 128);
        for a in 0..13 {
            for b in 0..13 {
                let dot: f32 = basis[a].iter().zip(basis[b].iter()).map(|(x, y)| x * y).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-4, "rows {} and {}: {}", a, b, dot);
            }
        }
    }

    #[test]
    fn test_silence_only_has_dc() {
        let config = AnalysisConfig::default();
        let mfcc = compute_mfcc(&vec![0.0; 22050], 22050, &config).unwrap();
        assert_eq!(mfcc.len(), 1 + 22050 / config.hop_size);
        for frame in &mfcc {
            assert_eq!(frame.len(), 13);
            // Flat -100 dB spectrum
            assert!((frame[0] + 100.0 * (128.0f32).sqrt()).abs() < 0.1);
            assert!(frame[1..].iter().all(|c| c.abs() < 0.01));
        }
    }

    #[test]
    fn test_tone_differs_from_noise() {
        let sr = 22050;
        let config = AnalysisConfig::default();
        let tone: Vec<f32> = (0..sr as usize)
            .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / sr as f32).sin())
            .collect();
        // Deterministic broadband signal
        let mut state = 12345u32;
        let noise: Vec<f32> = (0..sr as usize)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
                (state >> 16) as f32 / 32768.0 - 1.0
            })
            .collect();

        let a = compute_mfcc(&tone, sr, &config).unwrap();
        let b = compute_mfcc(&noise, sr, &config).unwrap();
        let mid = a.len() / 2;
        let distance: f32 = a[mid].iter().zip(b[mid].iter()).map(|(x, y)| (x - y).powi(2)).sum();
        assert!(distance.sqrt() > 10.0);
    }

    #[test]
    fn test_invalid_coefficient_count() {
        let config = AnalysisConfig {
            n_mfcc: 0,
            ..AnalysisConfig::default()
        };
        assert!(compute_mfcc(&[0.1; 4096], 22050, &config).is_err());
    }
}
