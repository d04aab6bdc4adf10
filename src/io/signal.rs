//! Immutable mono sample buffer shared read-only by every stage

use crate::error::AnalysisError;

/// Mono audio signal
///
/// Created once per analysis run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Signal {
    /// Wrap decoded samples
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for an empty buffer, a zero sample rate
    /// or non-finite samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::InvalidInput("Empty audio samples".to_string()));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput("Invalid sample rate".to_string()));
        }
        if let Some(idx) = samples.iter().position(|s| !s.is_finite()) {
            return Err(AnalysisError::InvalidInput(format!(
                "Non-finite sample at index {}",
                idx
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Sample buffer
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed signal; kept for API symmetry with slices
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_duration() {
        let signal = Signal::new(vec![0.0; 44100], 22050).unwrap();
        assert_eq!(signal.len(), 44100);
        assert!((signal.duration_seconds() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_signal_rejects_empty() {
        assert!(Signal::new(vec![], 22050).is_err());
        assert!(Signal::new(vec![0.0; 10], 0).is_err());
    }

    #[test]
    fn test_signal_rejects_nan() {
        assert!(Signal::new(vec![0.0, f32::NAN, 0.0], 22050).is_err());
    }
}
