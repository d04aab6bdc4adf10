//! # Linear Analysis
//!
//! Offline music analysis: one mono signal in, one structured result out.
//!
//! ## Features
//!
//! - **Rhythm**: harmonic/percussive separation, windowed tempo track, dynamic-programming
//!   beat tracker, time signature, downbeats and per-beat strength
//! - **Harmony**: constant-Q / CENS chroma, Krumhansl-Schmuckler key, 72-template chord
//!   recognition with bass note and inversion
//! - **Drums**: kick and snare presence on every beat
//! - **Timbre**: MFCC, spectral centroid/rolloff/bandwidth, zero-crossing rate, onsets,
//!   harmonic ratio and Tonnetz
//!
//! ## Quick Start
//!
//! ```no_run
//! use linear_analysis::{analyze_audio, AnalysisConfig};
//!
//! // Mono f32 samples in [-1, 1]
//! let samples: Vec<f32> = vec![0.0; 22050 * 10];
//!
//! let result = analyze_audio(&samples, 22050, AnalysisConfig::default())?;
//!
//! println!("Tempo: {:.1} BPM", result.beat_grid.tempo_bpm);
//! println!("Key: {} {}", result.metadata.detected_key, result.metadata.detected_mode);
//! # Ok::<(), linear_analysis::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Signal → HPSS → tempo / beats → rhythm → chroma / key → features
//!        → onsets → harmonic content → Tonnetz → chords → drums → result
//! ```
//!
//! Every stage returns `StageResult<T>`. A failing stage is replaced by its
//! documented default and the run continues; only loading and final assembly
//! can fail the whole analysis.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod output;
pub mod preprocessing;

use std::path::Path;

// Re-export main types
pub use analysis::progress::{LogProgress, NullProgress, PipelineStage, ProgressEvent, ProgressSink};
pub use analysis::result::{AnalysisResult, BeatGrid, ChordEvent, DrumGridEntry, Key, Metadata};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, StageError, StageResult};
pub use io::Signal;
pub use output::{JsonFileWriter, ResultWriter};

use analysis::assembler::{assemble, StageOutputs};
use analysis::result::{HarmonicContent, SpectralFeatures, TonnetzFeatures};
use features::beat_tracking::{
    beat_strengths, detect_downbeats, detect_time_signature, fallback_downbeats, track_beats,
    track_tempo, BeatTrack, TempoTrack, TimeSignature, DEFAULT_BEAT_STRENGTH,
};
use features::chord::recognize_chords;
use features::chroma::compute_chromagram;
use features::drums::{detect_drums, empty_grid};
use features::key::{detect_key, KeyDetectionResult, KeyTemplates};
use features::onset::{detect_onsets, onset_strength, separate, HarmonicPercussiveSplit};
use features::spectral::{analyze_harmonic_content, compute_mfcc, extract_spectral_features, extract_tonnetz};
use features::spectrum::{frame_count, frames_to_time};

/// Analyze raw samples
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Analysis configuration parameters
///
/// # Errors
///
/// - `AnalysisError::InvalidInput` for empty or non-finite samples, a zero sample
///   rate or an invalid configuration
/// - `AnalysisError::AssemblyError` if the result violates an invariant
///
/// # Example
///
/// ```no_run
/// use linear_analysis::{analyze_audio, AnalysisConfig};
///
/// let samples = vec![0.0f32; 22050 * 5]; // 5 seconds of silence
/// let result = analyze_audio(&samples, 22050, AnalysisConfig::default())?;
/// assert!(result.beat_grid.beat_timestamps.is_empty());
/// # Ok::<(), linear_analysis::AnalysisError>(())
/// ```
pub fn analyze_audio(
    samples: &[f32],
    sample_rate: u32,
    config: AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    analyze_audio_with_progress(samples, sample_rate, config, &NullProgress)
}

/// [`analyze_audio`] with progress notifications
///
/// # Errors
///
/// Same as [`analyze_audio`]
pub fn analyze_audio_with_progress(
    samples: &[f32],
    sample_rate: u32,
    config: AnalysisConfig,
    progress: &dyn ProgressSink,
) -> Result<AnalysisResult, AnalysisError> {
    let signal = Signal::new(samples.to_vec(), sample_rate)?;
    analyze_signal(&signal, &config, progress)
}

/// Decode, resample and analyze an audio file
///
/// The file is resampled to `config.analysis_sample_rate` before analysis.
///
/// # Errors
///
/// - `AnalysisError::Io` if the file cannot be opened
/// - `AnalysisError::UnsupportedFormat` / `DecodingError` if it cannot be decoded
/// - Anything [`analyze_signal`] returns
pub fn analyze_file(
    path: &Path,
    config: &AnalysisConfig,
    progress: &dyn ProgressSink,
) -> Result<AnalysisResult, AnalysisError> {
    config.validate()?;

    report(progress, PipelineStage::Loading);
    let signal = io::load_signal(path, config.analysis_sample_rate)?;
    log::debug!(
        "Loaded {}: {:.2}s at {} Hz",
        path.display(),
        signal.duration_seconds(),
        signal.sample_rate()
    );
    report(progress, PipelineStage::Loaded);

    analyze_signal(&signal, config, progress)
}

/// Run the full pipeline on a loaded signal
///
/// Stages run in a fixed order and report their boundaries to `progress`.
/// A stage that fails is replaced by its default (logged with `log::warn!`).
///
/// # Errors
///
/// - `AnalysisError::InvalidInput` for an invalid configuration
/// - `AnalysisError::AssemblyError` if the assembled result violates an invariant
pub fn analyze_signal(
    signal: &Signal,
    config: &AnalysisConfig,
    progress: &dyn ProgressSink,
) -> Result<AnalysisResult, AnalysisError> {
    config.validate()?;

    let sr = signal.sample_rate();
    let hop = config.hop_size;
    let samples = signal.samples();

    log::debug!(
        "Starting analysis: {} samples at {} Hz",
        signal.len(),
        sr
    );

    // Harmonic/percussive separation
    report(progress, PipelineStage::Hpss);
    let split = separate(signal, config).unwrap_or_else(|e| {
        log::warn!("HPSS failed ({}), using the unmodified signal", e);
        HarmonicPercussiveSplit::passthrough(signal)
    });
    report(progress, PipelineStage::HpssComplete);

    // Tempo and beats on the percussive component
    report(progress, PipelineStage::BeatTracking);
    let envelope = onset_strength(&split.percussive, sr, config.frame_size, hop, config.n_mels)
        .unwrap_or_else(|e| {
            log::warn!("Percussive onset envelope failed ({}), tracking without one", e);
            Vec::new()
        });

    let tempo = track_tempo(&envelope, signal.len(), sr, config).unwrap_or_else(|e| {
        log::warn!("Tempo tracking failed ({}), using the default tempo", e);
        TempoTrack::fallback()
    });

    let beats = track_beats(&envelope, sr, hop, tempo.bpm, config.tightness, config.max_tempo)
        .unwrap_or_else(|e| {
            log::warn!("Beat tracking failed ({}), no beats", e);
            BeatTrack {
                bpm: tempo.bpm,
                frames: Vec::new(),
                times: Vec::new(),
            }
        });
    report(progress, PipelineStage::BeatsDetected);

    // Meter, downbeats and beat strength
    let time_signature = detect_time_signature(&beats.times, beats.bpm).unwrap_or_else(|e| {
        log::warn!("Time signature detection failed ({}), assuming 4/4", e);
        (TimeSignature::FourFour, 0.5)
    });

    let downbeats = detect_downbeats(&beats.times, time_signature.0.beats_per_bar() as usize)
        .unwrap_or_else(|e| {
            log::warn!("Downbeat assignment failed ({}), using every 4th beat", e);
            fallback_downbeats(&beats.times)
        });

    let strengths = beat_strengths(&envelope, &beats.times, sr, hop).unwrap_or_else(|e| {
        log::warn!("Beat strength failed ({}), using {}", e, DEFAULT_BEAT_STRENGTH);
        vec![DEFAULT_BEAT_STRENGTH; beats.times.len()]
    });
    report(progress, PipelineStage::RhythmAnalysis);

    // Chroma and key on the harmonic component
    report(progress, PipelineStage::ChromaExtraction);
    let chroma = compute_chromagram(&split.harmonic, sr, config)
        .map(|c| c.frames)
        .unwrap_or_else(|e| {
            log::warn!("Chroma extraction failed ({}), no chroma", e);
            Vec::new()
        });

    let key = detect_key(&chroma, &KeyTemplates::new()).unwrap_or_else(|e| {
        log::warn!("Key detection failed ({}), using C major", e);
        KeyDetectionResult::fallback()
    });
    report(progress, PipelineStage::KeyDetected);

    // Shared frame axis for every frame-level feature
    let frame_times: Vec<f32> = (0..frame_count(signal.len(), hop))
        .map(|i| frames_to_time(i, sr, hop))
        .collect();

    report(progress, PipelineStage::FeatureExtraction);
    let mfcc = compute_mfcc(samples, sr, config).unwrap_or_else(|e| {
        log::warn!("MFCC failed ({}), no MFCC frames", e);
        Vec::new()
    });
    let spectral = extract_spectral_features(samples, sr, &frame_times, config).unwrap_or_else(|e| {
        log::warn!("Spectral features failed ({}), leaving them empty", e);
        SpectralFeatures::default()
    });

    report(progress, PipelineStage::OnsetDetection);
    let onsets = detect_onsets(signal, &split, config).unwrap_or_else(|e| {
        log::warn!("Onset detection failed ({}), no onsets", e);
        Vec::new()
    });

    report(progress, PipelineStage::HarmonicAnalysis);
    let harmonic = analyze_harmonic_content(&split.harmonic, samples, &chroma).unwrap_or_else(|e| {
        log::warn!("Harmonic content failed ({}), using defaults", e);
        HarmonicContent::default()
    });

    report(progress, PipelineStage::Tonnetz);
    let tonnetz = extract_tonnetz(&chroma, &frame_times).unwrap_or_else(|e| {
        log::warn!("Tonnetz failed ({}), leaving it empty", e);
        TonnetzFeatures::default()
    });

    // Beat-synchronous harmony and drums
    report(progress, PipelineStage::ChordDetection);
    let events = recognize_chords(&chroma, &beats.times, &split.percussive, sr, config)
        .unwrap_or_else(|e| {
            log::warn!("Chord recognition failed ({}), no chord events", e);
            Vec::new()
        });

    report(progress, PipelineStage::DrumDetection);
    let drum_grid = detect_drums(&split.percussive, sr, &beats.times, config).unwrap_or_else(|e| {
        log::warn!("Drum detection failed ({}), empty drum grid", e);
        empty_grid(&beats.times)
    });

    report(progress, PipelineStage::Finalizing);
    assemble(
        signal,
        config,
        StageOutputs {
            tempo,
            tempo_bpm: beats.bpm,
            beats: beats.times,
            beat_strengths: strengths,
            downbeats,
            time_signature,
            key,
            chroma,
            frame_times,
            mfcc,
            spectral,
            onsets,
            harmonic,
            tonnetz,
            events,
            drum_grid,
        },
    )
}

fn report(progress: &dyn ProgressSink, stage: PipelineStage) {
    log::debug!("Stage: {}", stage);
    progress.on_progress(&ProgressEvent::from(stage));
}
