//! Chroma vector extraction
//!
//! Folds a constant-Q magnitude spectrogram onto the 12 pitch classes and
//! derives the two chroma variants used downstream:
//!
//! - **CQT chroma**: max-normalized per frame, with bins below `threshold` of
//!   the frame maximum zeroed to suppress noise
//! - **CENS**: quantized and temporally smoothed (see [`super::smoothing`])

use super::cqt::{pitch_class, ConstantQ};
use super::normalization::{max_normalize, threshold as apply_threshold};
use super::smoothing::chroma_cens;
use super::ChromaVector;
use crate::config::AnalysisConfig;
use crate::error::StageResult;

/// Sum CQT magnitudes that share a pitch class
///
/// # Arguments
///
/// * `spectrogram` - CQT magnitudes (`n_frames × n_bins`)
/// * `frequencies` - Centre frequency of each CQT bin
///
/// # Returns
///
/// Raw (unnormalized) pitch-class energy per frame
pub fn fold_to_chroma(spectrogram: &[Vec<f32>], frequencies: &[f32]) -> Vec<ChromaVector> {
    let classes: Vec<usize> = frequencies.iter().map(|&f| pitch_class(f)).collect();
    spectrogram
        .iter()
        .map(|frame| {
            let mut chroma = [0.0f32; 12];
            for (&magnitude, &pc) in frame.iter().zip(classes.iter()) {
                chroma[pc] += magnitude;
            }
            chroma
        })
        .collect()
}

/// Max-normalize each frame and zero bins below `threshold`
pub fn cqt_chroma(raw: &[ChromaVector], threshold: f32) -> Vec<ChromaVector> {
    raw.iter()
        .map(|frame| {
            let mut c = *frame;
            max_normalize(&mut c);
            apply_threshold(&mut c, threshold);
            c
        })
        .collect()
}

/// Extract raw chroma, CQT chroma and CENS from a (harmonic) signal
///
/// # Arguments
///
/// * `samples` - Mono samples
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Uses `cqt_fmin`, `bins_per_octave`, `n_octaves`, `hop_size`,
///   `cqt_threshold`, `cens_smoothing_window` and `parallel`
///
/// # Returns
///
/// `(cqt_chroma, cens)`, both with `1 + samples.len() / hop_size` frames
///
/// # Errors
///
/// Returns `StageError` if the constant-Q transform cannot be computed
pub fn extract_chroma(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> StageResult<(Vec<ChromaVector>, Vec<ChromaVector>)> {
    log::debug!(
        "Extracting chroma: {} samples at {} Hz",
        samples.len(),
        sample_rate
    );

    let cqt = ConstantQ::new(
        sample_rate,
        config.cqt_fmin,
        config.bins_per_octave,
        config.n_octaves,
    )?;
    let spectrogram = cqt.transform(samples, config.hop_size, config.parallel)?;
    let raw = fold_to_chroma(&spectrogram, cqt.frequencies());

    let cqt_frames = cqt_chroma(&raw, config.cqt_threshold);
    let cens_frames = chroma_cens(&raw, config.cens_smoothing_window);

    Ok((cqt_frames, cens_frames))
}
