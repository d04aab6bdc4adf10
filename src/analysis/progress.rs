//! Pipeline progress notifications
//!
//! The pipeline reports each stage boundary it crosses to a [`ProgressSink`].
//! Percentages never decrease within a run. Any `Fn(&ProgressEvent)` closure is
//! a sink:
//!
//! ```
//! use linear_analysis::analysis::progress::{PipelineStage, ProgressEvent, ProgressSink};
//! use std::cell::RefCell;
//!
//! let seen = RefCell::new(Vec::new());
//! let sink = |event: &ProgressEvent| seen.borrow_mut().push(event.percent);
//! sink.on_progress(&ProgressEvent::from(PipelineStage::Hpss));
//! assert_eq!(*seen.borrow(), vec![15]);
//! ```

use std::fmt;

/// Stage boundaries in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    /// Decoding started
    Loading,
    /// Audio decoded and resampled
    Loaded,
    /// Harmonic/percussive separation started
    Hpss,
    /// Harmonic/percussive separation finished
    HpssComplete,
    /// Tempo and beat tracking started
    BeatTracking,
    /// Beat grid available
    BeatsDetected,
    /// Time signature, downbeats and beat strengths done
    RhythmAnalysis,
    /// Chroma extraction started
    ChromaExtraction,
    /// Key detected
    KeyDetected,
    /// MFCC and spectral descriptors started
    FeatureExtraction,
    /// General onset detection started
    OnsetDetection,
    /// Harmonic-content summary started
    HarmonicAnalysis,
    /// Tonnetz started
    Tonnetz,
    /// Chord recognition started
    ChordDetection,
    /// Drum detection started
    DrumDetection,
    /// Result assembly started
    Finalizing,
}

impl PipelineStage {
    /// Every stage, in the order the pipeline reports them
    pub const ALL: [PipelineStage; 16] = [
        PipelineStage::Loading,
        PipelineStage::Loaded,
        PipelineStage::Hpss,
        PipelineStage::HpssComplete,
        PipelineStage::BeatTracking,
        PipelineStage::BeatsDetected,
        PipelineStage::RhythmAnalysis,
        PipelineStage::ChromaExtraction,
        PipelineStage::KeyDetected,
        PipelineStage::FeatureExtraction,
        PipelineStage::OnsetDetection,
        PipelineStage::HarmonicAnalysis,
        PipelineStage::Tonnetz,
        PipelineStage::ChordDetection,
        PipelineStage::DrumDetection,
        PipelineStage::Finalizing,
    ];

    /// Wire name, e.g. `"hpss_complete"`
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::Loading => "loading",
            PipelineStage::Loaded => "loaded",
            PipelineStage::Hpss => "hpss",
            PipelineStage::HpssComplete => "hpss_complete",
            PipelineStage::BeatTracking => "beat_tracking",
            PipelineStage::BeatsDetected => "beats_detected",
            PipelineStage::RhythmAnalysis => "rhythm_analysis",
            PipelineStage::ChromaExtraction => "chroma_extraction",
            PipelineStage::KeyDetected => "key_detected",
            PipelineStage::FeatureExtraction => "feature_extraction",
            PipelineStage::OnsetDetection => "onset_detection",
            PipelineStage::HarmonicAnalysis => "harmonic_analysis",
            PipelineStage::Tonnetz => "tonnetz",
            PipelineStage::ChordDetection => "chord_detection",
            PipelineStage::DrumDetection => "drum_detection",
            PipelineStage::Finalizing => "finalizing",
        }
    }

    /// Completion percentage reported at this boundary
    pub fn percent(&self) -> u8 {
        match self {
            PipelineStage::Loading => 5,
            PipelineStage::Loaded => 10,
            PipelineStage::Hpss => 15,
            PipelineStage::HpssComplete => 25,
            PipelineStage::BeatTracking => 30,
            PipelineStage::BeatsDetected => 40,
            PipelineStage::RhythmAnalysis => 45,
            PipelineStage::ChromaExtraction => 50,
            PipelineStage::KeyDetected => 55,
            PipelineStage::FeatureExtraction => 60,
            PipelineStage::OnsetDetection => 65,
            PipelineStage::HarmonicAnalysis => 70,
            PipelineStage::Tonnetz => 75,
            PipelineStage::ChordDetection => 80,
            PipelineStage::DrumDetection => 85,
            PipelineStage::Finalizing => 90,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One progress notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Boundary just crossed
    pub stage: PipelineStage,
    /// 0-100, non-decreasing within a run
    pub percent: u8,
}

impl From<PipelineStage> for ProgressEvent {
    fn from(stage: PipelineStage) -> Self {
        Self {
            stage,
            percent: stage.percent(),
        }
    }
}

/// Receiver of progress notifications
pub trait ProgressSink {
    /// Called once per stage boundary, in order
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent),
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Forwards notifications to `log::info!`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        log::info!("[{:>3}%] {}", event.percent, event.stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentages_are_non_decreasing() {
        let percents: Vec<u8> = PipelineStage::ALL.iter().map(|s| s.percent()).collect();
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(percents.first(), Some(&5));
        assert_eq!(percents.last(), Some(&90));
    }

    #[test]
    fn test_stage_order_matches_declaration() {
        let mut sorted = PipelineStage::ALL;
        sorted.sort();
        assert_eq!(sorted, PipelineStage::ALL);
    }

    #[test]
    fn test_names() {
        assert_eq!(PipelineStage::HpssComplete.name(), "hpss_complete");
        assert_eq!(PipelineStage::KeyDetected.to_string(), "key_detected");
        let names: std::collections::HashSet<&str> =
            PipelineStage::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names.len(), PipelineStage::ALL.len());
    }

    #[test]
    fn test_closure_sink() {
        let seen = std::cell::RefCell::new(Vec::new());
        let sink = |e: &ProgressEvent| seen.borrow_mut().push(e.stage);
        sink.on_progress(&PipelineStage::Loading.into());
        sink.on_progress(&PipelineStage::Finalizing.into());
        NullProgress.on_progress(&PipelineStage::Loading.into());
        assert_eq!(
            *seen.borrow(),
            vec![PipelineStage::Loading, PipelineStage::Finalizing]
        );
    }
}
