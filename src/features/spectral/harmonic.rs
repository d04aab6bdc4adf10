//! Harmonic-content summary

use crate::analysis::result::HarmonicContent;
use crate::error::{StageError, StageResult};
use crate::features::chroma::ChromaVector;

/// Harmonic energy ratio and pitch salience
///
/// - `harmonic_ratio = Σ h² / (Σ y² + 1e-10)`
/// - `pitch_salience` = mean over frames of the largest chroma value
///
/// # Errors
///
/// - `StageError::EmptyIntermediate` if there is no chroma
/// - `StageError::Numerical` if either value is not finite
pub fn analyze_harmonic_content(
    harmonic: &[f32],
    full: &[f32],
    chroma: &[ChromaVector],
) -> StageResult<HarmonicContent> {
    if chroma.is_empty() {
        return Err(StageError::EmptyIntermediate(
            "no chroma frames for pitch salience".to_string(),
        ));
    }

    let harmonic_energy: f64 = harmonic.iter().map(|&x| (x as f64).powi(2)).sum();
    let total_energy: f64 = full.iter().map(|&x| (x as f64).powi(2)).sum();
    let harmonic_ratio = (harmonic_energy / (total_energy + 1e-10)) as f32;

    let pitch_salience = chroma
        .iter()
        .map(|frame| frame.iter().copied().fold(f32::NEG_INFINITY, f32::max))
        .sum::<f32>()
        / chroma.len() as f32;

    if !harmonic_ratio.is_finite() || !pitch_salience.is_finite() {
        return Err(StageError::Numerical(
            "non-finite harmonic content".to_string(),
        ));
    }

    Ok(HarmonicContent {
        harmonic_ratio,
        pitch_salience,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_and_salience() {
        let full = vec![1.0f32; 100];
        let harmonic = vec![0.5f32; 100];
        let mut a = [0.0f32; 12];
        a[9] = 1.0;
        let mut b = [0.2f32; 12];
        b[0] = 0.6;

        let content = analyze_harmonic_content(&harmonic, &full, &[a, b]).unwrap();
        assert!((content.harmonic_ratio - 0.25).abs() < 1e-6);
        assert!((content.pitch_salience - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_silence_has_zero_ratio() {
        let content =
            analyze_harmonic_content(&[0.0; 10], &[0.0; 10], &[[0.0f32; 12]; 3]).unwrap();
        assert_eq!(content.harmonic_ratio, 0.0);
        assert_eq!(content.pitch_salience, 0.0);
    }

    #[test]
    fn test_empty_chroma_is_an_error() {
        assert!(analyze_harmonic_content(&[1.0], &[1.0], &[]).is_err());
        let default = HarmonicContent::default();
        assert_eq!(default.harmonic_ratio, 0.5);
        assert_eq!(default.pitch_salience, 0.5);
    }
}
