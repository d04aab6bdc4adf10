//! Autocorrelation-based tempo estimation
//!
//! Finds the dominant periodicity of an onset strength envelope using
//! FFT-accelerated autocorrelation, weighted by a log-normal prior over tempo.
//!
//! # Algorithm
//!
//! 1. `ACF = IFFT(|FFT(envelope)|²)`, normalised so that `ACF[0] = 1`
//! 2. For every lag, `BPM = 60 * sample_rate / (lag * hop_size)`
//! 3. Score = `ln(1 + 1e6 * ACF[lag]) - 0.5 * ((log2(BPM) - log2(prior)) / std)²`
//! 4. Lags faster than `max_tempo` are excluded; the best-scoring lag wins
//!
//! The log compression keeps any genuine periodicity far above lags with no
//! support, so the prior only arbitrates between comparable peaks or decides
//! outright when the envelope is too short to contain a full period.
//!
//! # Reference
//!
//! Ellis, D. P. W. (2007). Beat Tracking by Dynamic Programming.
//! *Journal of New Music Research*, 36(1), 51-60.
//!
//! # Example
//!
//! ```
//! use linear_analysis::features::period::autocorrelation::{estimate_tempo, TempoPrior};
//!
//! // Impulse every 22 frames at 22050 Hz / 512 hop
//! let mut envelope = vec![0.0f32; 400];
//! for i in (0..400).step_by(22) {
//!     envelope[i] = 1.0;
//! }
//! let bpm = estimate_tempo(&envelope, 22050, 512, &TempoPrior::default())?;
//! assert!((bpm - 117.45).abs() < 1.0);
//! # Ok::<(), linear_analysis::error::StageError>(())
//! ```

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::{StageError, StageResult};
use crate::features::spectrum::EPSILON;

/// Longest period considered, in seconds
const MAX_PERIOD_SECONDS: f32 = 8.0;

/// Log-normal tempo prior and search bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoPrior {
    /// Centre of the prior in BPM
    pub start_bpm: f32,
    /// Standard deviation of the prior in octaves
    pub std_octaves: f32,
    /// Tempi at or above this are never returned
    pub max_tempo: f32,
    /// Refine the winning lag by parabolic interpolation of the ACF
    pub interpolate: bool,
}

impl Default for TempoPrior {
    fn default() -> Self {
        Self {
            start_bpm: 120.0,
            std_octaves: 1.0,
            max_tempo: 320.0,
            interpolate: false,
        }
    }
}

/// Estimate the tempo of an onset strength envelope
///
/// # Arguments
///
/// * `envelope` - Onset strength per frame
/// * `sample_rate` - Sample rate in Hz
/// * `hop_size` - Hop size of the envelope in samples
/// * `prior` - Tempo prior and bounds
///
/// # Returns
///
/// Tempo in BPM
///
/// # Errors
///
/// - `StageError::InvalidParameter` for a zero sample rate, hop size or prior
/// - `StageError::InsufficientData` if the envelope is empty or carries no energy
pub fn estimate_tempo(
    envelope: &[f32],
    sample_rate: u32,
    hop_size: usize,
    prior: &TempoPrior,
) -> StageResult<f32> {
    if sample_rate == 0 || hop_size == 0 {
        return Err(StageError::InvalidParameter(format!(
            "sample_rate={} hop_size={}",
            sample_rate, hop_size
        )));
    }
    if prior.start_bpm <= 0.0 || prior.std_octaves <= 0.0 || prior.max_tempo <= 0.0 {
        return Err(StageError::InvalidParameter(format!(
            "invalid tempo prior: {:?}",
            prior
        )));
    }
    if envelope.is_empty() {
        return Err(StageError::InsufficientData("empty onset envelope".to_string()));
    }

    let acf = compute_autocorrelation_fft(envelope);
    let acf0 = acf[0];
    if acf0 <= EPSILON {
        return Err(StageError::InsufficientData(
            "onset envelope carries no energy".to_string(),
        ));
    }

    let frame_rate = sample_rate as f32 / hop_size as f32;
    let max_lag = ((MAX_PERIOD_SECONDS * frame_rate).round() as usize).max(2);
    let lag_to_bpm = |lag: f32| 60.0 * frame_rate / lag;
    let log2_prior = prior.start_bpm.log2();

    let mut best: Option<(usize, f32)> = None;
    for lag in 1..=max_lag {
        let bpm = lag_to_bpm(lag as f32);
        if bpm >= prior.max_tempo {
            continue;
        }
        let strength = acf.get(lag).copied().unwrap_or(0.0) / acf0;
        let z = (bpm.log2() - log2_prior) / prior.std_octaves;
        let score = (1e6 * strength.max(0.0)).ln_1p() - 0.5 * z * z;
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((lag, score));
        }
    }

    let (lag, _) = best.ok_or_else(|| {
        StageError::InvalidParameter(format!("no lag below max_tempo={}", prior.max_tempo))
    })?;

    let refined = if prior.interpolate {
        parabolic_peak(&acf, lag)
    } else {
        lag as f32
    };

    let bpm = lag_to_bpm(refined);
    if !bpm.is_finite() || bpm <= 0.0 {
        return Err(StageError::Numerical(format!("tempo out of range: {}", bpm)));
    }

    log::debug!(
        "Autocorrelation tempo: lag={} (refined {:.2}) -> {:.2} BPM (prior {:.1})",
        lag,
        refined,
        bpm,
        prior.start_bpm
    );

    Ok(bpm)
}

/// Sub-frame position of the ACF peak around `lag`
///
/// Falls back to `lag` when the neighbours are unavailable or the peak is flat.
fn parabolic_peak(acf: &[f32], lag: usize) -> f32 {
    if lag == 0 || lag + 1 >= acf.len() {
        return lag as f32;
    }
    let (a, b, c) = (acf[lag - 1], acf[lag], acf[lag + 1]);
    let denom = a - 2.0 * b + c;
    if denom.abs() <= EPSILON || b < a || b < c {
        return lag as f32;
    }
    let offset = (0.5 * (a - c) / denom).clamp(-0.5, 0.5);
    lag as f32 + offset
}

/// Compute autocorrelation using FFT acceleration
///
/// Uses the identity: ACF = IFFT(|FFT(signal)|²). The signal is zero-padded to
/// at least twice its length so the result is linear, not circular. The transform
/// runs in f64: lags with no support must come out as (near) exact zeros because
/// the tempo score amplifies them by 1e6.
///
/// # Returns
///
/// Autocorrelation for lags `0..signal.len()`
pub fn compute_autocorrelation_fft(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    // FFT size: next power of 2 >= 2*n (for zero-padding)
    let fft_size = (2 * n).next_power_of_two();

    let mut fft_input: Vec<Complex<f64>> =
        signal.iter().map(|&x| Complex::new(x as f64, 0.0)).collect();
    fft_input.resize(fft_size, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut fft_input);

    for x in &mut fft_input {
        *x = Complex::new(x.norm_sqr(), 0.0);
    }

    let ifft = planner.plan_fft_inverse(fft_size);
    ifft.process(&mut fft_input);

    let scale = 1.0 / (fft_size as f64);
    fft_input[..n].iter().map(|x| (x.re * scale) as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulses(n: usize, positions: impl Iterator<Item = usize>) -> Vec<f32> {
        let mut env = vec![0.0f32; n];
        for p in positions {
            if p < n {
                env[p] = 1.0;
            }
        }
        env
    }

    #[test]
    fn test_compute_autocorrelation_fft() {
        // Simple periodic signal: [1, 0, 1, 0, 1, 0]
        let signal = vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let acf = compute_autocorrelation_fft(&signal);

        assert_eq!(acf.len(), signal.len());
        assert!((acf[0] - 3.0).abs() < 1e-4);
        assert!(acf[1].abs() < 1e-4);
        assert!((acf[2] - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_tempo_from_periodic_envelope() {
        // Period of 22 frames at 22050 Hz / 512 hop is 117.45 BPM
        let env = impulses(600, (0..600).step_by(22));
        let bpm = estimate_tempo(&env, 22050, 512, &TempoPrior::default()).unwrap();
        assert!((bpm - 117.45).abs() < 0.5, "got {}", bpm);
    }

    #[test]
    fn test_fractional_period_with_interpolation() {
        // Exact 120 BPM is 21.53 frames; model each beat as a smooth bump
        let period = 22050.0 * 60.0 / 120.0 / 512.0;
        let mut env = vec![0.0f32; 1400];
        for k in 0..64 {
            let centre = k as f32 * period;
            for (i, v) in env.iter_mut().enumerate() {
                let d = i as f32 - centre;
                if d.abs() < 5.0 {
                    *v += (-0.5 * d * d).exp();
                }
            }
        }
        let prior = TempoPrior {
            interpolate: true,
            ..TempoPrior::default()
        };
        let bpm = estimate_tempo(&env, 22050, 512, &prior).unwrap();
        assert!((bpm - 120.0).abs() < 1.5, "got {}", bpm);
    }

    #[test]
    fn test_prior_decides_short_envelope() {
        // Too short to contain a 120 BPM period: the prior alone picks the lag
        let env = impulses(16, std::iter::once(4));
        let bpm = estimate_tempo(&env, 22050, 512, &TempoPrior::default()).unwrap();
        assert!((bpm - 117.45).abs() < 0.5, "got {}", bpm);
    }

    #[test]
    fn test_silent_envelope_is_insufficient() {
        let result = estimate_tempo(&[0.0; 100], 22050, 512, &TempoPrior::default());
        assert!(matches!(result, Err(StageError::InsufficientData(_))));
    }

    #[test]
    fn test_invalid_params() {
        assert!(estimate_tempo(&[1.0; 10], 0, 512, &TempoPrior::default()).is_err());
        assert!(estimate_tempo(&[1.0; 10], 22050, 0, &TempoPrior::default()).is_err());
        assert!(estimate_tempo(&[], 22050, 512, &TempoPrior::default()).is_err());
    }

    #[test]
    fn test_max_tempo_is_respected() {
        // Period of 4 frames = 646 BPM, far above the limit
        let env = impulses(400, (0..400).step_by(4));
        let bpm = estimate_tempo(&env, 22050, 512, &TempoPrior::default()).unwrap();
        assert!(bpm < 320.0);
    }
}
