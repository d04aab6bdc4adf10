//! Result assembly
//!
//! Merges the per-stage outputs into an [`AnalysisResult`], stamps the global
//! metadata and checks the invariants every artifact must satisfy:
//!
//! - beat times are finite and strictly increasing
//! - one drum-grid entry and one beat strength per beat, in beat order
//! - chord events are time-ordered with inversions in 0..=3 and bass pitch classes in 0..=11
//! - every confidence lies in [0, 1]
//! - spectral sequences share one length
//! - no NaN or infinity anywhere in the numeric payload
//!
//! A violation means a stage broke its contract; it aborts the run with
//! `AnalysisError::AssemblyError` instead of producing a malformed artifact.

use super::result::{
    AnalysisResult, BeatGrid, ChordEvent, ChromaFrame, DrumGridEntry, HarmonicContent, Metadata,
    MfccFrame, OnsetEvent, SpectralFeatures, TonnetzFeatures,
};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::beat_tracking::{TempoTrack, TimeSignature};
use crate::features::chroma::ChromaVector;
use crate::features::key::KeyDetectionResult;
use crate::io::Signal;

/// Everything the stages produced, after fallbacks have been applied
#[derive(Debug, Clone)]
pub struct StageOutputs {
    /// Windowed tempo curve and its summary
    pub tempo: TempoTrack,
    /// Tempo the beat tracker ran at (BPM)
    pub tempo_bpm: f32,
    /// Beat times in seconds
    pub beats: Vec<f32>,
    /// Onset strength per beat
    pub beat_strengths: Vec<f32>,
    /// Downbeat times in seconds
    pub downbeats: Vec<f32>,
    /// Detected time signature and its confidence
    pub time_signature: (TimeSignature, f32),
    /// Key detection outcome
    pub key: KeyDetectionResult,
    /// Blended chroma frames
    pub chroma: Vec<ChromaVector>,
    /// Shared frame time axis
    pub frame_times: Vec<f32>,
    /// MFCCs per frame
    pub mfcc: Vec<Vec<f32>>,
    /// Spectral descriptors
    pub spectral: SpectralFeatures,
    /// General onsets
    pub onsets: Vec<OnsetEvent>,
    /// Harmonic ratio and salience
    pub harmonic: HarmonicContent,
    /// Tonal centroids
    pub tonnetz: TonnetzFeatures,
    /// Chord candidates
    pub events: Vec<ChordEvent>,
    /// Kick/snare per beat
    pub drum_grid: Vec<DrumGridEntry>,
}

/// Build and validate the final result
///
/// # Errors
///
/// `AnalysisError::AssemblyError` naming the first violated invariant
pub fn assemble(
    signal: &Signal,
    config: &AnalysisConfig,
    outputs: StageOutputs,
) -> Result<AnalysisResult, AnalysisError> {
    let (time_signature, time_signature_confidence) = outputs.time_signature;

    let metadata = Metadata {
        duration_seconds: signal.duration_seconds(),
        sample_rate: signal.sample_rate(),
        frame_hop_seconds: config.hop_seconds(signal.sample_rate()),
        detected_key: outputs.key.key.root_name().to_string(),
        detected_mode: outputs.key.key.mode().to_string(),
        key_confidence: outputs.key.confidence,
        time_signature,
        time_signature_confidence,
        algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let beat_grid = BeatGrid {
        tempo_bpm: outputs.tempo_bpm,
        tempo_confidence: outputs.tempo.confidence,
        tempo_track: outputs.tempo.track,
        tempo_track_times: outputs.tempo.times,
        beat_timestamps: outputs.beats,
        beat_strengths: outputs.beat_strengths,
        downbeat_timestamps: outputs.downbeats,
        time_signature,
        drum_grid: outputs.drum_grid,
    };

    let chroma_frames = outputs
        .chroma
        .iter()
        .zip(outputs.frame_times.iter())
        .map(|(chroma, &timestamp)| ChromaFrame {
            timestamp,
            chroma: *chroma,
        })
        .collect();

    let mfcc_frames = outputs
        .mfcc
        .into_iter()
        .zip(outputs.frame_times.iter())
        .map(|(mfcc, &timestamp)| MfccFrame { timestamp, mfcc })
        .collect();

    let result = AnalysisResult {
        metadata,
        beat_grid,
        events: outputs.events,
        chroma_frames,
        mfcc_frames,
        spectral_features: outputs.spectral,
        onsets: outputs.onsets,
        harmonic_content: outputs.harmonic,
        tonnetz_features: outputs.tonnetz,
    };

    validate(&result)?;

    log::info!(
        "Assembled result: {:.1} BPM, {} beats, key {} {}, {} chord events",
        result.beat_grid.tempo_bpm,
        result.beat_grid.beat_timestamps.len(),
        result.metadata.detected_key,
        result.metadata.detected_mode,
        result.events.len()
    );

    Ok(result)
}

/// Check every artifact invariant
///
/// # Errors
///
/// `AnalysisError::AssemblyError` describing the first violation found
pub fn validate(result: &AnalysisResult) -> Result<(), AnalysisError> {
    let grid = &result.beat_grid;
    let beats = &grid.beat_timestamps;

    if !(grid.tempo_bpm.is_finite() && grid.tempo_bpm > 0.0) {
        return fail(format!("tempo must be positive, got {}", grid.tempo_bpm));
    }
    finite("beat_timestamps", beats)?;
    if let Some(i) = beats.windows(2).position(|w| w[1] <= w[0]) {
        return fail(format!(
            "beat_timestamps not strictly increasing at index {} ({} -> {})",
            i + 1,
            beats[i],
            beats[i + 1]
        ));
    }

    if grid.drum_grid.len() != beats.len() {
        return fail(format!(
            "drum_grid has {} entries for {} beats",
            grid.drum_grid.len(),
            beats.len()
        ));
    }
    for (entry, &beat) in grid.drum_grid.iter().zip(beats.iter()) {
        if entry.time != beat {
            return fail(format!("drum_grid entry at {} does not match beat {}", entry.time, beat));
        }
        unit_interval("kick_confidence", entry.kick_confidence)?;
        unit_interval("snare_confidence", entry.snare_confidence)?;
    }

    if grid.beat_strengths.len() != beats.len() {
        return fail(format!(
            "{} beat strengths for {} beats",
            grid.beat_strengths.len(),
            beats.len()
        ));
    }
    for &s in &grid.beat_strengths {
        unit_interval("beat_strength", s)?;
    }

    if grid.tempo_track.len() != grid.tempo_track_times.len() {
        return fail("tempo_track and tempo_track_times differ in length".to_string());
    }
    finite("tempo_track", &grid.tempo_track)?;
    finite("downbeat_timestamps", &grid.downbeat_timestamps)?;
    unit_interval("tempo_confidence", grid.tempo_confidence)?;

    let meta = &result.metadata;
    unit_interval("key_confidence", meta.key_confidence)?;
    unit_interval("time_signature_confidence", meta.time_signature_confidence)?;
    if !meta.duration_seconds.is_finite() || !meta.frame_hop_seconds.is_finite() {
        return fail("non-finite metadata".to_string());
    }

    for pair in result.events.windows(2) {
        if pair[1].timestamp <= pair[0].timestamp {
            return fail(format!(
                "chord events out of order at {}",
                pair[1].timestamp
            ));
        }
    }
    for event in &result.events {
        unit_interval("chord confidence", event.confidence)?;
        if event.chord_inversion > 3 {
            return fail(format!("chord inversion {} out of range", event.chord_inversion));
        }
        if event.bass_pitch_class.is_some_and(|pc| pc > 11) {
            return fail(format!("bass pitch class {:?} out of range", event.bass_pitch_class));
        }
        if !event.timestamp.is_finite() {
            return fail("non-finite chord timestamp".to_string());
        }
    }

    for frame in &result.chroma_frames {
        finite("chroma", &frame.chroma)?;
    }
    for frame in &result.mfcc_frames {
        finite("mfcc", &frame.mfcc)?;
    }

    let spectral = &result.spectral_features;
    let n = spectral.timestamps.len();
    if spectral.centroid.len() != n
        || spectral.rolloff.len() != n
        || spectral.bandwidth.len() != n
        || spectral.zero_crossing_rate.len() != n
    {
        return fail("spectral feature sequences differ in length".to_string());
    }
    finite("spectral centroid", &spectral.centroid)?;
    finite("spectral rolloff", &spectral.rolloff)?;
    finite("spectral bandwidth", &spectral.bandwidth)?;
    finite("zero crossing rate", &spectral.zero_crossing_rate)?;

    for onset in &result.onsets {
        if !onset.time.is_finite() || !onset.strength.is_finite() {
            return fail("non-finite onset".to_string());
        }
    }

    let harmonic = &result.harmonic_content;
    finite(
        "harmonic content",
        &[harmonic.harmonic_ratio, harmonic.pitch_salience],
    )?;

    let tonnetz = &result.tonnetz_features;
    if tonnetz.tonnetz.len() != tonnetz.timestamps.len() {
        return fail("tonnetz and its timestamps differ in length".to_string());
    }
    for frame in &tonnetz.tonnetz {
        finite("tonnetz", frame)?;
    }

    Ok(())
}

fn fail(message: String) -> Result<(), AnalysisError> {
    Err(AnalysisError::AssemblyError(message))
}

fn finite(what: &str, values: &[f32]) -> Result<(), AnalysisError> {
    match values.iter().position(|x| !x.is_finite()) {
        Some(i) => fail(format!("{}[{}] is not finite", what, i)),
        None => Ok(()),
    }
}

fn unit_interval(what: &str, value: f32) -> Result<(), AnalysisError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        fail(format!("{} {} outside [0, 1]", what, value))
    }
}
