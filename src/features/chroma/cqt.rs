//! Constant-Q transform
//!
//! Computes a log-frequency magnitude spectrogram with a fixed number of bins
//! per octave using the spectral-kernel method: each bin's windowed complex
//! exponential is transformed once, sparsified, and applied to the FFT of every
//! analysis frame.
//!
//! Bin `k` is centred on `fmin · 2^(k / bins_per_octave)` with a Hann window of
//! `ceil(Q · sr / f_k)` samples, where `Q = 1 / (2^(1 / bins_per_octave) - 1)`.
//! Frames are centred on multiples of the hop, like the STFT frames.
//!
//! # Reference
//!
//! Brown, J. C., & Puckette, M. S. (1992). An efficient algorithm for the
//! calculation of a constant Q transform. *JASA*, 92(5), 2698-2701.

use std::sync::Arc;

use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::{StageError, StageResult};
use crate::features::spectrum::{frame_count, hann_window_symmetric};

/// Spectral kernel entries below this magnitude are dropped
const KERNEL_THRESHOLD: f32 = 0.0054;

/// Precomputed sparse spectral kernel for one sample rate and bin layout
pub struct ConstantQ {
    fft: Arc<dyn Fft<f32>>,
    fft_len: usize,
    /// Per bin: (FFT bin, conjugated and scaled kernel value)
    kernel: Vec<Vec<(usize, Complex<f32>)>>,
    frequencies: Vec<f32>,
}

impl std::fmt::Debug for ConstantQ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstantQ")
            .field("fft_len", &self.fft_len)
            .field("n_bins", &self.kernel.len())
            .finish()
    }
}

impl ConstantQ {
    /// Build the kernel
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Sample rate in Hz
    /// * `fmin` - Centre frequency of the lowest bin (default: 32.70 Hz)
    /// * `bins_per_octave` - Frequency resolution (default: 36)
    /// * `n_octaves` - Range (default: 7)
    ///
    /// # Errors
    ///
    /// `StageError::InvalidParameter` if any argument is zero or the top bin
    /// reaches the Nyquist frequency
    pub fn new(
        sample_rate: u32,
        fmin: f32,
        bins_per_octave: usize,
        n_octaves: usize,
    ) -> StageResult<Self> {
        if sample_rate == 0 || !(fmin > 0.0) || bins_per_octave == 0 || n_octaves == 0 {
            return Err(StageError::InvalidParameter(format!(
                "sample_rate={} fmin={} bins_per_octave={} n_octaves={}",
                sample_rate, fmin, bins_per_octave, n_octaves
            )));
        }

        let sr = sample_rate as f32;
        let n_bins = bins_per_octave * n_octaves;
        let frequencies: Vec<f32> = (0..n_bins)
            .map(|k| fmin * 2f32.powf(k as f32 / bins_per_octave as f32))
            .collect();

        let top = frequencies[n_bins - 1];
        if top >= sr / 2.0 {
            return Err(StageError::InvalidParameter(format!(
                "highest CQT bin {:.1} Hz exceeds Nyquist {:.1} Hz",
                top,
                sr / 2.0
            )));
        }

        let q = 1.0 / (2f32.powf(1.0 / bins_per_octave as f32) - 1.0);
        let longest = (q * sr / fmin).ceil() as usize;
        let fft_len = longest.next_power_of_two();

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_len);
        let scale = 1.0 / fft_len as f32;

        let kernel = frequencies
            .iter()
            .map(|&f| {
                let len = ((q * sr / f).ceil() as usize).clamp(1, fft_len);
                let window = hann_window_symmetric(len);
                let offset = (fft_len - len) / 2;

                let mut buffer = vec![Complex::new(0.0f32, 0.0); fft_len];
                for (n, &w) in window.iter().enumerate() {
                    let phase = 2.0 * std::f32::consts::PI * q * n as f32 / len as f32;
                    buffer[offset + n] = Complex::from_polar(w / len as f32, phase);
                }
                fft.process(&mut buffer);

                buffer
                    .into_iter()
                    .enumerate()
                    .filter(|(_, v)| v.norm() >= KERNEL_THRESHOLD)
                    .map(|(j, v)| (j, v.conj() * scale))
                    .collect()
            })
            .collect();

        log::debug!(
            "CQT kernel: {} bins from {:.2} Hz, fft_len={}",
            n_bins,
            fmin,
            fft_len
        );

        Ok(Self {
            fft,
            fft_len,
            kernel,
            frequencies,
        })
    }

    /// Centre frequency of every bin
    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    /// Magnitude CQT (`n_frames × n_bins`)
    ///
    /// # Arguments
    ///
    /// * `samples` - Mono samples
    /// * `hop_size` - Hop in samples
    /// * `parallel` - Spread frames over the rayon pool
    ///
    /// # Errors
    ///
    /// - `StageError::InvalidParameter` if `hop_size == 0`
    /// - `StageError::InsufficientData` if `samples` is empty
    pub fn transform(
        &self,
        samples: &[f32],
        hop_size: usize,
        parallel: bool,
    ) -> StageResult<Vec<Vec<f32>>> {
        if hop_size == 0 {
            return Err(StageError::InvalidParameter("hop_size must be > 0".to_string()));
        }
        if samples.is_empty() {
            return Err(StageError::InsufficientData("no samples for CQT".to_string()));
        }

        let pad = self.fft_len / 2;
        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let n_frames = frame_count(samples.len(), hop_size);
        let frame = |t: usize| -> Vec<f32> {
            let start = t * hop_size;
            let mut buffer: Vec<Complex<f32>> = padded[start..start + self.fft_len]
                .iter()
                .map(|&x| Complex::new(x, 0.0))
                .collect();
            self.fft.process(&mut buffer);

            self.kernel
                .iter()
                .map(|entries| {
                    entries
                        .iter()
                        .map(|&(j, k)| buffer[j] * k)
                        .sum::<Complex<f32>>()
                        .norm()
                })
                .collect()
        };

        let spectrogram: Vec<Vec<f32>> = if parallel {
            (0..n_frames).into_par_iter().map(frame).collect()
        } else {
            (0..n_frames).map(frame).collect()
        };

        if spectrogram.iter().flatten().any(|x| !x.is_finite()) {
            return Err(StageError::Numerical("non-finite CQT magnitude".to_string()));
        }

        Ok(spectrogram)
    }
}

/// Pitch class (0 = C) of a frequency: `round(12 · log2(f / 440) + 69) mod 12`
pub fn pitch_class(frequency: f32) -> usize {
    let midi = (12.0 * (frequency / 440.0).log2() + 69.0).round() as i64;
    midi.rem_euclid(12) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sr: u32, seconds: f32) -> Vec<f32> {
        (0..(sr as f32 * seconds) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    #[test]
    fn test_pitch_class() {
        assert_eq!(pitch_class(440.0), 9);
        assert_eq!(pitch_class(261.63), 0);
        assert_eq!(pitch_class(32.703), 0);
        assert_eq!(pitch_class(55.0), 9);
        assert_eq!(pitch_class(466.16), 10);
    }

    #[test]
    fn test_bin_layout() {
        let cqt = ConstantQ::new(22050, 32.703, 36, 7).unwrap();
        let f = cqt.frequencies();
        assert_eq!(f.len(), 252);
        assert!((f[36] - 65.406).abs() < 0.01);
        assert_eq!(pitch_class(f[0]), 0);
        assert_eq!(pitch_class(f[3]), 1);
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let sr = 22050;
        let cqt = ConstantQ::new(sr, 32.703, 36, 7).unwrap();
        let spec = cqt.transform(&sine(440.0, sr, 2.0), 512, false).unwrap();
        assert_eq!(spec.len(), frame_count(2 * sr as usize, 512));

        let mid = &spec[spec.len() / 2];
        let argmax = mid
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc })
            .0;
        assert!((cqt.frequencies()[argmax] - 440.0).abs() < 5.0);
        // Unit sine through a normalised Hann kernel: about a quarter
        assert!(mid[argmax] > 0.15 && mid[argmax] < 0.35, "{}", mid[argmax]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sr = 22050;
        let cqt = ConstantQ::new(sr, 32.703, 36, 7).unwrap();
        let x = sine(220.0, sr, 0.5);
        assert_eq!(
            cqt.transform(&x, 512, true).unwrap(),
            cqt.transform(&x, 512, false).unwrap()
        );
    }

    #[test]
    fn test_invalid_layout() {
        assert!(ConstantQ::new(8000, 32.703, 36, 8).is_err());
        assert!(ConstantQ::new(22050, 0.0, 36, 7).is_err());
    }
}
