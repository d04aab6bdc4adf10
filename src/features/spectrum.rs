//! Short-time Fourier analysis shared by every spectral stage
//!
//! All spectrograms are laid out frame-major (`n_frames × n_bins`), one inner
//! `Vec` per analysis hop. Frames are centred: the signal is zero-padded by
//! `frame_size / 2` on both sides, so frame `t` is centred on sample `t * hop`
//! and a signal of `n` samples yields `1 + n / hop` frames.
//!
//! # Example
//!
//! ```
//! use linear_analysis::features::spectrum::{compute_stft, frame_count};
//!
//! let samples = vec![0.0f32; 22050];
//! let magnitudes = compute_stft(&samples, 2048, 512)?;
//! assert_eq!(magnitudes.len(), frame_count(samples.len(), 512));
//! assert_eq!(magnitudes[0].len(), 1025);
//! # Ok::<(), linear_analysis::error::StageError>(())
//! ```

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::{StageError, StageResult};

/// Numerical stability epsilon
pub const EPSILON: f32 = 1e-10;

/// Periodic Hann window of length `n`
pub fn hann_window(n: usize) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos())
        .collect()
}

/// Symmetric Hann window of length `n` (both end points are zero)
pub fn hann_window_symmetric(n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..n)
            .map(|i| {
                0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / (n - 1) as f32).cos()
            })
            .collect(),
    }
}

/// Number of centred frames for a signal of `n_samples`
pub fn frame_count(n_samples: usize, hop_size: usize) -> usize {
    if hop_size == 0 {
        return 0;
    }
    1 + n_samples / hop_size
}

/// Time in seconds of the centre of frame `frame`
pub fn frames_to_time(frame: usize, sample_rate: u32, hop_size: usize) -> f32 {
    (frame * hop_size) as f32 / sample_rate as f32
}

/// Nearest frame index to time `seconds`
pub fn time_to_frame(seconds: f32, sample_rate: u32, hop_size: usize) -> usize {
    if seconds <= 0.0 || hop_size == 0 {
        return 0;
    }
    (seconds * sample_rate as f32 / hop_size as f32).round() as usize
}

/// Centre frequency of each FFT bin (`0 ..= sample_rate / 2`)
pub fn fft_frequencies(sample_rate: u32, frame_size: usize) -> Vec<f32> {
    let n_bins = frame_size / 2 + 1;
    (0..n_bins)
        .map(|k| k as f32 * sample_rate as f32 / frame_size as f32)
        .collect()
}

fn validate_frame_params(frame_size: usize, hop_size: usize) -> StageResult<()> {
    if frame_size < 2 || hop_size == 0 {
        return Err(StageError::InvalidParameter(format!(
            "frame_size={} hop_size={}",
            frame_size, hop_size
        )));
    }
    Ok(())
}

/// Complex STFT (`n_frames × (frame_size / 2 + 1)`)
///
/// # Errors
///
/// - `StageError::InvalidParameter` if `frame_size < 2` or `hop_size == 0`
/// - `StageError::InsufficientData` if `samples` is empty
pub fn compute_complex_stft(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
) -> StageResult<Vec<Vec<Complex<f32>>>> {
    validate_frame_params(frame_size, hop_size)?;
    if samples.is_empty() {
        return Err(StageError::InsufficientData("empty signal".to_string()));
    }

    let pad = frame_size / 2;
    let mut padded = vec![0.0f32; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);

    let n_frames = frame_count(samples.len(), hop_size);
    let n_bins = frame_size / 2 + 1;
    let window = hann_window(frame_size);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(frame_size);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); frame_size];

    let mut frames = Vec::with_capacity(n_frames);
    for t in 0..n_frames {
        let start = t * hop_size;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let x = padded.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(x * window[i], 0.0);
        }
        fft.process(&mut buffer);
        frames.push(buffer[..n_bins].to_vec());
    }

    log::debug!(
        "STFT: {} samples -> {} frames x {} bins (frame={}, hop={})",
        samples.len(),
        n_frames,
        n_bins,
        frame_size,
        hop_size
    );

    Ok(frames)
}

/// Magnitude STFT (`n_frames × (frame_size / 2 + 1)`)
pub fn compute_stft(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
) -> StageResult<Vec<Vec<f32>>> {
    let complex = compute_complex_stft(samples, frame_size, hop_size)?;
    Ok(magnitude(&complex))
}

/// Power STFT (`|X|²`)
pub fn compute_power_stft(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
) -> StageResult<Vec<Vec<f32>>> {
    let complex = compute_complex_stft(samples, frame_size, hop_size)?;
    Ok(complex
        .iter()
        .map(|frame| frame.iter().map(|c| c.norm_sqr()).collect())
        .collect())
}

/// Element-wise magnitude of a complex spectrogram
pub fn magnitude(spectrogram: &[Vec<Complex<f32>>]) -> Vec<Vec<f32>> {
    spectrogram
        .iter()
        .map(|frame| frame.iter().map(|c| c.norm()).collect())
        .collect()
}

/// Inverse STFT by weighted overlap-add
///
/// Inverts [`compute_complex_stft`]. Overlap-add output is divided by the summed
/// squared window wherever that sum is non-negligible, then the centring pad is
/// removed and the result is cut or zero-extended to `length` samples.
pub fn istft(
    spectrogram: &[Vec<Complex<f32>>],
    frame_size: usize,
    hop_size: usize,
    length: usize,
) -> StageResult<Vec<f32>> {
    validate_frame_params(frame_size, hop_size)?;
    if spectrogram.is_empty() {
        return Err(StageError::EmptyIntermediate("no STFT frames".to_string()));
    }

    let n_bins = frame_size / 2 + 1;
    let window = hann_window(frame_size);
    let total = frame_size + hop_size * (spectrogram.len() - 1);
    let mut output = vec![0.0f32; total];
    let mut window_sum = vec![0.0f32; total];

    let mut planner = FftPlanner::<f32>::new();
    let ifft = planner.plan_fft_inverse(frame_size);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); frame_size];
    let scale = 1.0 / frame_size as f32;

    for (t, frame) in spectrogram.iter().enumerate() {
        if frame.len() != n_bins {
            return Err(StageError::InvalidParameter(format!(
                "frame {} has {} bins, expected {}",
                t,
                frame.len(),
                n_bins
            )));
        }
        // Rebuild the full Hermitian spectrum
        for k in 0..n_bins {
            buffer[k] = frame[k];
        }
        for k in n_bins..frame_size {
            buffer[k] = frame[frame_size - k].conj();
        }
        ifft.process(&mut buffer);

        let start = t * hop_size;
        for i in 0..frame_size {
            output[start + i] += buffer[i].re * scale * window[i];
            window_sum[start + i] += window[i] * window[i];
        }
    }

    for (y, &w) in output.iter_mut().zip(window_sum.iter()) {
        if w > 1e-8 {
            *y /= w;
        }
    }

    let pad = frame_size / 2;
    let mut signal: Vec<f32> = output.into_iter().skip(pad).take(length).collect();
    signal.resize(length, 0.0);
    Ok(signal)
}

fn hz_to_mel(hz: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f32.ln() / 27.0;
    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f32.ln() / 27.0;
    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep * (mel - min_log_mel)).exp()
    } else {
        F_SP * mel
    }
}

/// Slaney-style mel filterbank (`n_mels × (frame_size / 2 + 1)`)
///
/// Triangular filters spaced on the Slaney mel scale between `fmin` and `fmax`,
/// each scaled to unit area.
pub fn mel_filterbank(
    sample_rate: u32,
    frame_size: usize,
    n_mels: usize,
    fmin: f32,
    fmax: f32,
) -> Vec<Vec<f32>> {
    let fft_freqs = fft_frequencies(sample_rate, frame_size);
    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);
    let mel_points: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
        .collect();

    (0..n_mels)
        .map(|m| {
            let (lo, centre, hi) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
            let enorm = 2.0 / (hi - lo).max(EPSILON);
            fft_freqs
                .iter()
                .map(|&f| {
                    let lower = (f - lo) / (centre - lo).max(EPSILON);
                    let upper = (hi - f) / (hi - centre).max(EPSILON);
                    lower.min(upper).max(0.0) * enorm
                })
                .collect()
        })
        .collect()
}

/// Project a power spectrogram onto a mel filterbank (`n_frames × n_mels`)
pub fn apply_filterbank(power: &[Vec<f32>], filterbank: &[Vec<f32>]) -> Vec<Vec<f32>> {
    power
        .iter()
        .map(|frame| {
            filterbank
                .iter()
                .map(|filter| filter.iter().zip(frame.iter()).map(|(w, p)| w * p).sum())
                .collect()
        })
        .collect()
}

/// Mel power spectrogram of `samples` (`n_frames × n_mels`)
pub fn mel_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
    n_mels: usize,
) -> StageResult<Vec<Vec<f32>>> {
    let power = compute_power_stft(samples, frame_size, hop_size)?;
    let filterbank = mel_filterbank(sample_rate, frame_size, n_mels, 0.0, sample_rate as f32 / 2.0);
    Ok(apply_filterbank(&power, &filterbank))
}

/// Convert a power spectrogram to decibels in place
///
/// `10·log10(max(amin, S)) - 10·log10(max(amin, reference))`, then floored at
/// `max - top_db` over the whole spectrogram.
pub fn power_to_db(spectrogram: &mut [Vec<f32>], reference: f32, amin: f32, top_db: f32) {
    let ref_db = 10.0 * reference.max(amin).log10();
    let mut max_db = f32::NEG_INFINITY;
    for frame in spectrogram.iter_mut() {
        for value in frame.iter_mut() {
            *value = 10.0 * value.max(amin).log10() - ref_db;
            max_db = max_db.max(*value);
        }
    }
    if max_db.is_finite() {
        let floor = max_db - top_db;
        for frame in spectrogram.iter_mut() {
            for value in frame.iter_mut() {
                *value = value.max(floor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_frame_count_is_centred() {
        let spec = compute_stft(&vec![0.1f32; 5000], 2048, 512).unwrap();
        assert_eq!(spec.len(), 1 + 5000 / 512);
        assert!(spec.iter().all(|f| f.len() == 1025));
    }

    #[test]
    fn test_sine_peak_bin() {
        let sr = 22050;
        let spec = compute_stft(&sine(1000.0, sr, sr as usize), 2048, 512).unwrap();
        let frame = &spec[spec.len() / 2];
        let (peak, _) = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        let expected = (1000.0 * 2048.0 / sr as f32).round() as usize;
        assert!((peak as i32 - expected as i32).abs() <= 1);
    }

    #[test]
    fn test_istft_reconstructs_signal() {
        let sr = 22050;
        let signal = sine(440.0, sr, 8000);
        let stft = compute_complex_stft(&signal, 2048, 512).unwrap();
        let rebuilt = istft(&stft, 2048, 512, signal.len()).unwrap();
        assert_eq!(rebuilt.len(), signal.len());
        let err: f32 = signal
            .iter()
            .zip(rebuilt.iter())
            .skip(1024)
            .take(6000)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max);
        assert!(err < 1e-3, "max reconstruction error {}", err);
    }

    #[test]
    fn test_invalid_params() {
        assert!(compute_stft(&[0.0; 10], 0, 512).is_err());
        assert!(compute_stft(&[0.0; 10], 2048, 0).is_err());
        assert!(compute_stft(&[], 2048, 512).is_err());
    }

    #[test]
    fn test_mel_filterbank_shape_and_coverage() {
        let fb = mel_filterbank(22050, 2048, 128, 0.0, 11025.0);
        assert_eq!(fb.len(), 128);
        assert!(fb.iter().all(|f| f.len() == 1025));
        assert!(fb.iter().all(|f| f.iter().any(|&w| w > 0.0)));
    }

    #[test]
    fn test_power_to_db_clamps_to_top_db() {
        let mut spec = vec![vec![1.0f32, 1e-12, 0.1]];
        power_to_db(&mut spec, 1.0, 1e-10, 80.0);
        assert!((spec[0][0] - 0.0).abs() < 1e-5);
        assert!((spec[0][1] + 80.0).abs() < 1e-4);
        assert!((spec[0][2] + 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_hann_windows() {
        let w = hann_window(4);
        assert!((w[0]).abs() < 1e-6);
        assert!((w[2] - 1.0).abs() < 1e-6);
        let s = hann_window_symmetric(5);
        assert!(s[0].abs() < 1e-6 && s[4].abs() < 1e-6);
        assert!((s[2] - 1.0).abs() < 1e-6);
    }
}
