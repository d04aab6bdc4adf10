//! Bass-note detection around a beat
//!
//! A short window centred on the beat is band-passed to the fundamental bass
//! range (zero-phase Butterworth), then the strongest FFT peak inside the band
//! is taken as the bass fundamental. The peak must hold its own against the
//! strongest bin of the unfiltered window, so a faint bass under a loud
//! midrange is not reported.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::config::AnalysisConfig;
use crate::features::chroma::cqt::pitch_class;
use crate::features::spectrum::EPSILON;
use crate::preprocessing::filter::BandFilter;

/// Bass pitch class (0-11) at `time`, if a clear fundamental is present
///
/// # Arguments
///
/// * `samples` - Signal to inspect (the percussive component in the pipeline)
/// * `sample_rate` - Sample rate in Hz
/// * `time` - Window centre in seconds
/// * `config` - Uses `bass_window_seconds`, `bass_band`, `bass_peak_ratio`, `bass_min_frequency`
///
/// # Returns
///
/// `None` when the window is empty, silent, or the peak fails the magnitude
/// and frequency checks
pub fn detect_bass_note(
    samples: &[f32],
    sample_rate: u32,
    time: f32,
    config: &AnalysisConfig,
) -> Option<u8> {
    if sample_rate == 0 || !time.is_finite() || time < 0.0 {
        return None;
    }

    let window = (config.bass_window_seconds * sample_rate as f32) as usize;
    let center = (time * sample_rate as f32) as usize;
    let start = center.saturating_sub(window / 2);
    let end = samples.len().min(center + window / 2);
    if end <= start {
        return None;
    }

    let (low, high) = config.bass_band;
    let filtered = BandFilter::band_pass(low, high, sample_rate).filtfilt(&samples[start..end]);

    let n = filtered.len();
    let fft = FftPlanner::<f32>::new().plan_fft_forward(n);
    let mut buffer: Vec<Complex<f32>> = filtered.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft.process(&mut buffer);

    let mut raw: Vec<Complex<f32>> = samples[start..end]
        .iter()
        .map(|&x| Complex::new(x, 0.0))
        .collect();
    fft.process(&mut raw);
    let raw_max = raw[1..=n / 2].iter().map(|c| c.norm()).fold(0.0f32, f32::max);

    let bin_hz = sample_rate as f32 / n as f32;
    let (peak_freq, peak_mag) = buffer[..=n / 2]
        .iter()
        .enumerate()
        .map(|(k, c)| (k as f32 * bin_hz, c.norm()))
        .filter(|(f, _)| *f >= low && *f <= high)
        .fold(None, |best: Option<(f32, f32)>, (f, m)| match best {
            Some((_, bm)) if m <= bm => best,
            _ => Some((f, m)),
        })?;

    if !peak_mag.is_finite() || peak_mag <= EPSILON {
        return None;
    }

    if peak_mag < config.bass_peak_ratio * raw_max || peak_freq < config.bass_min_frequency {
        return None;
    }

    let pc = pitch_class(peak_freq) as u8;
    log::debug!("Bass at {:.2}s: {:.1} Hz (pc {})", time, peak_freq, pc);
    Some(pc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sr: u32, seconds: f32) -> Vec<f32> {
        (0..(sr as f32 * seconds) as usize)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    #[test]
    fn test_detects_a2() {
        let sr = 22050;
        let signal = sine(110.0, sr, 2.0);
        let config = AnalysisConfig::default();
        assert_eq!(detect_bass_note(&signal, sr, 1.0, &config), Some(9));
    }

    #[test]
    fn test_detects_e2_near_signal_start() {
        let sr = 22050;
        let signal = sine(82.41, sr, 2.0);
        let config = AnalysisConfig::default();
        // Half window at t = 0
        assert_eq!(detect_bass_note(&signal, sr, 0.0, &config), Some(4));
    }

    #[test]
    fn test_faint_bass_under_loud_midrange() {
        let sr = 22050;
        let bass = sine(110.0, sr, 2.0);
        let mid = sine(1000.0, sr, 2.0);
        let mix: Vec<f32> = bass.iter().zip(&mid).map(|(b, m)| 0.1 * b + m).collect();

        let config = AnalysisConfig::default();
        assert_eq!(detect_bass_note(&mix, sr, 1.0, &config), None);

        let lenient = AnalysisConfig {
            bass_peak_ratio: 0.0,
            ..AnalysisConfig::default()
        };
        assert_eq!(detect_bass_note(&mix, sr, 1.0, &lenient), Some(9));
    }

    #[test]
    fn test_silence_has_no_bass() {
        let sr = 22050;
        let config = AnalysisConfig::default();
        assert_eq!(detect_bass_note(&vec![0.0; 44100], sr, 1.0, &config), None);
    }

    #[test]
    fn test_beat_past_end() {
        let sr = 22050;
        let signal = sine(110.0, sr, 1.0);
        let config = AnalysisConfig::default();
        assert_eq!(detect_bass_note(&signal, sr, 5.0, &config), None);
        assert_eq!(detect_bass_note(&signal, sr, -1.0, &config), None);
    }
}
