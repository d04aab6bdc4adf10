//! General onset detection and percussive/harmonic classification
//!
//! Onsets are picked from the onset strength of the full mix. Each one is then
//! labelled by whichever HPSS component carries more mean absolute amplitude in
//! a short window starting at the onset.

use super::spectral_flux::onset_strength;
use super::threshold::{pick_peaks, PeakPickParams};
use super::HarmonicPercussiveSplit;
use crate::analysis::result::{OnsetClass, OnsetEvent};
use crate::config::AnalysisConfig;
use crate::error::StageResult;
use crate::features::spectrum::frames_to_time;
use crate::io::Signal;

/// Detect onsets on the full signal and classify each one
///
/// # Arguments
///
/// * `signal` - Full mix
/// * `split` - Harmonic/percussive components of the same signal
/// * `config` - Uses `frame_size`, `hop_size`, `n_mels`, `onset_delta` and
///   `onset_classification_window`
///
/// # Returns
///
/// Onset events in time order. `strength` is the raw envelope value at the onset frame.
///
/// # Errors
///
/// Returns `StageError` if the onset envelope cannot be computed
pub fn detect_onsets(
    signal: &Signal,
    split: &HarmonicPercussiveSplit,
    config: &AnalysisConfig,
) -> StageResult<Vec<OnsetEvent>> {
    let sr = signal.sample_rate();
    let envelope = onset_strength(
        signal.samples(),
        sr,
        config.frame_size,
        config.hop_size,
        config.n_mels,
    )?;

    let params = PeakPickParams::for_onsets(sr, config.hop_size, config.onset_delta);
    let frames = pick_peaks(&envelope, &params);

    let events: Vec<OnsetEvent> = frames
        .into_iter()
        .map(|frame| {
            let sample = frame * config.hop_size;
            OnsetEvent {
                time: frames_to_time(frame, sr, config.hop_size),
                strength: envelope[frame],
                classification: classify_onset(split, sample, config.onset_classification_window),
            }
        })
        .collect();

    log::debug!(
        "Detected {} onsets ({} percussive, {} harmonic)",
        events.len(),
        events
            .iter()
            .filter(|e| e.classification == OnsetClass::Percussive)
            .count(),
        events
            .iter()
            .filter(|e| e.classification == OnsetClass::Harmonic)
            .count()
    );

    Ok(events)
}

/// Label an onset at `sample` by comparing component energy in `[sample, sample + window)`
///
/// Percussive wins only when strictly louder. An onset whose window starts past the
/// end of the signal, or is empty, is `Unknown`.
pub fn classify_onset(split: &HarmonicPercussiveSplit, sample: usize, window: usize) -> OnsetClass {
    let len = split.harmonic.len().min(split.percussive.len());
    if sample >= len || window == 0 {
        return OnsetClass::Unknown;
    }
    let end = (sample + window).min(len);

    let mean_abs = |x: &[f32]| x.iter().map(|v| v.abs()).sum::<f32>() / x.len() as f32;
    let percussive = mean_abs(&split.percussive[sample..end]);
    let harmonic = mean_abs(&split.harmonic[sample..end]);

    if percussive > harmonic {
        OnsetClass::Percussive
    } else {
        OnsetClass::Harmonic
    }
}
