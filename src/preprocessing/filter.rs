//! Butterworth band filtering
//!
//! 4th-order Butterworth high-pass and low-pass sections (two cascaded RBJ biquads
//! each), applied forward and backward for zero phase. Band-pass filters are the
//! high-pass at the lower edge cascaded with the low-pass at the upper edge.
//!
//! # Example
//!
//! ```
//! use linear_analysis::preprocessing::filter::BandFilter;
//!
//! let samples = vec![0.0f32; 22050];
//! let kick = BandFilter::band_pass(40.0, 150.0, 22050).filtfilt(&samples);
//! assert_eq!(kick.len(), samples.len());
//! ```

use std::f64::consts::PI;

/// Q factors of the two biquads making up a 4th-order Butterworth section
const BUTTERWORTH_Q4: [f64; 2] = [0.541_196_100_146_197, 1.306_562_964_876_376_6];

/// Samples of odd-symmetric padding added at each end before filtering
const FILTFILT_PAD: usize = 27;

/// Second-order IIR section (transposed direct form II)
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    fn low_pass(cutoff: f64, sample_rate: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);
        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 - cos_w0) / 2.0 / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: (1.0 - cos_w0) / 2.0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    fn high_pass(cutoff: f64, sample_rate: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);
        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 + cos_w0) / 2.0 / a0,
            b1: -(1.0 + cos_w0) / a0,
            b2: (1.0 + cos_w0) / 2.0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    fn run(&self, data: &mut [f64]) {
        let (mut z1, mut z2) = (0.0f64, 0.0f64);
        for x in data.iter_mut() {
            let input = *x;
            let output = input * self.b0 + z1;
            z1 = input * self.b1 + z2 - self.a1 * output;
            z2 = input * self.b2 - self.a2 * output;
            *x = output;
        }
    }
}

/// Cascade of biquads forming a band-limiting filter
#[derive(Debug, Clone)]
pub struct BandFilter {
    sections: Vec<Biquad>,
}

impl BandFilter {
    /// 4th-order Butterworth low-pass
    pub fn low_pass(cutoff_hz: f32, sample_rate: u32) -> Self {
        let mut filter = Self { sections: Vec::new() };
        filter.push_low_pass(cutoff_hz, sample_rate);
        filter
    }

    /// 4th-order Butterworth high-pass
    pub fn high_pass(cutoff_hz: f32, sample_rate: u32) -> Self {
        let mut filter = Self { sections: Vec::new() };
        filter.push_high_pass(cutoff_hz, sample_rate);
        filter
    }

    /// Butterworth band-pass between `low_hz` and `high_hz`
    ///
    /// An edge at or above Nyquist is dropped (the band extends to Nyquist); an
    /// edge at or below 0 Hz is dropped likewise.
    pub fn band_pass(low_hz: f32, high_hz: f32, sample_rate: u32) -> Self {
        let mut filter = Self { sections: Vec::new() };
        filter.push_high_pass(low_hz, sample_rate);
        filter.push_low_pass(high_hz, sample_rate);
        filter
    }

    fn push_low_pass(&mut self, cutoff_hz: f32, sample_rate: u32) {
        let nyquist = sample_rate as f32 / 2.0;
        if cutoff_hz <= 0.0 || cutoff_hz >= nyquist {
            log::debug!("Low-pass cutoff {:.1} Hz outside (0, {:.1}), skipped", cutoff_hz, nyquist);
            return;
        }
        for q in BUTTERWORTH_Q4 {
            self.sections
                .push(Biquad::low_pass(cutoff_hz as f64, sample_rate as f64, q));
        }
    }

    fn push_high_pass(&mut self, cutoff_hz: f32, sample_rate: u32) {
        let nyquist = sample_rate as f32 / 2.0;
        if cutoff_hz <= 0.0 || cutoff_hz >= nyquist {
            log::debug!("High-pass cutoff {:.1} Hz outside (0, {:.1}), skipped", cutoff_hz, nyquist);
            return;
        }
        for q in BUTTERWORTH_Q4 {
            self.sections
                .push(Biquad::high_pass(cutoff_hz as f64, sample_rate as f64, q));
        }
    }

    /// Causal filtering (single forward pass)
    pub fn filter(&self, samples: &[f32]) -> Vec<f32> {
        let mut data: Vec<f64> = samples.iter().map(|&x| x as f64).collect();
        for section in &self.sections {
            section.run(&mut data);
        }
        data.into_iter().map(|x| x as f32).collect()
    }

    /// Zero-phase filtering: forward pass, then backward pass
    ///
    /// The signal is extended at both ends by odd reflection before filtering to
    /// reduce start-up transients, then trimmed back to the input length.
    pub fn filtfilt(&self, samples: &[f32]) -> Vec<f32> {
        if samples.is_empty() {
            return Vec::new();
        }
        if self.sections.is_empty() {
            return samples.to_vec();
        }

        let n = samples.len();
        let pad = FILTFILT_PAD.min(n - 1);
        let first = samples[0] as f64;
        let last = samples[n - 1] as f64;

        let mut data: Vec<f64> = Vec::with_capacity(n + 2 * pad);
        data.extend((1..=pad).rev().map(|i| 2.0 * first - samples[i] as f64));
        data.extend(samples.iter().map(|&x| x as f64));
        data.extend((1..=pad).map(|i| 2.0 * last - samples[n - 1 - i] as f64));

        for section in &self.sections {
            section.run(&mut data);
        }
        data.reverse();
        for section in &self.sections {
            section.run(&mut data);
        }
        data.reverse();

        data[pad..pad + n].iter().map(|&x| x as f32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn rms(x: &[f32]) -> f32 {
        (x.iter().map(|v| v * v).sum::<f32>() / x.len() as f32).sqrt()
    }

    #[test]
    fn test_band_pass_passes_in_band() {
        let input = sine(80.0, 22050, 1.0);
        let output = BandFilter::band_pass(40.0, 150.0, 22050).filtfilt(&input);
        let ratio = rms(&output[2000..20000]) / rms(&input[2000..20000]);
        assert!(ratio > 0.7, "in-band tone attenuated too much: {}", ratio);
    }

    #[test]
    fn test_band_pass_rejects_out_of_band() {
        let input = sine(2000.0, 22050, 1.0);
        let output = BandFilter::band_pass(40.0, 150.0, 22050).filtfilt(&input);
        let ratio = rms(&output[2000..20000]) / rms(&input[2000..20000]);
        assert!(ratio < 0.01, "out-of-band tone leaked: {}", ratio);
    }

    #[test]
    fn test_filtfilt_preserves_length() {
        let filter = BandFilter::band_pass(150.0, 400.0, 22050);
        assert_eq!(filter.filtfilt(&[0.5; 5]).len(), 5);
        assert!(filter.filtfilt(&[]).is_empty());
    }

    #[test]
    fn test_edge_above_nyquist_is_dropped() {
        // 6 kHz upper edge at 8 kHz sample rate: only the high-pass remains
        let filter = BandFilter::band_pass(2000.0, 6000.0, 8000);
        assert_eq!(filter.sections.len(), 2);
    }

    #[test]
    fn test_low_pass_passes_dc_region() {
        let input = sine(20.0, 22050, 1.0);
        let output = BandFilter::low_pass(100.0, 22050).filtfilt(&input);
        let ratio = rms(&output[2000..20000]) / rms(&input[2000..20000]);
        assert!(ratio > 0.9);
    }
}
