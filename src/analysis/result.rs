//! Analysis result types
//!
//! Every record here is plain data with a fixed shape: the JSON layout produced
//! by serde is the artifact handed to hosts. Field names follow the artifact
//! (`snake_case`, except the drum grid which is `camelCase`).

use serde::{Deserialize, Serialize};

use crate::features::beat_tracking::TimeSignature;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Name of a pitch class (0 = C)
pub fn pitch_class_name(pitch_class: usize) -> &'static str {
    NOTE_NAMES[pitch_class % 12]
}

/// Musical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Major key (0 = C, 1 = C#, ..., 11 = B)
    Major(u32),
    /// Minor key (0 = C, 1 = C#, ..., 11 = B)
    Minor(u32),
}

impl Key {
    /// Get key name in musical notation (e.g., "C", "Am", "F#", "D#m")
    ///
    /// # Example
    ///
    /// ```
    /// use linear_analysis::analysis::result::Key;
    ///
    /// assert_eq!(Key::Major(0).name(), "C");
    /// assert_eq!(Key::Major(6).name(), "F#");
    /// assert_eq!(Key::Minor(9).name(), "Am");
    /// assert_eq!(Key::Minor(1).name(), "C#m");
    /// ```
    pub fn name(&self) -> String {
        match self {
            Key::Major(_) => self.root_name().to_string(),
            Key::Minor(_) => format!("{}m", self.root_name()),
        }
    }

    /// Tonic pitch class (0 = C)
    pub fn root(&self) -> u32 {
        match self {
            Key::Major(i) | Key::Minor(i) => *i % 12,
        }
    }

    /// Tonic name without the mode ("A" for both A major and A minor)
    pub fn root_name(&self) -> &'static str {
        pitch_class_name(self.root() as usize)
    }

    /// "major" or "minor"
    pub fn mode(&self) -> &'static str {
        match self {
            Key::Major(_) => "major",
            Key::Minor(_) => "minor",
        }
    }
}

/// Global facts about the analysed signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Signal length in seconds
    pub duration_seconds: f32,

    /// Sample rate the analysis ran at (Hz)
    pub sample_rate: u32,

    /// Spacing of the shared frame grid in seconds
    pub frame_hop_seconds: f32,

    /// Tonic name, e.g. "A"
    pub detected_key: String,

    /// "major" or "minor"
    pub detected_mode: String,

    /// Key confidence (0.0-1.0)
    pub key_confidence: f32,

    /// Detected time signature
    pub time_signature: TimeSignature,

    /// Time signature confidence (0.0-1.0)
    pub time_signature_confidence: f32,

    /// Crate version that produced the result
    pub algorithm_version: String,
}

/// Beat grid structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatGrid {
    /// Tempo the beat tracker ran at (BPM)
    pub tempo_bpm: f32,

    /// Steadiness of the windowed tempo track (0.0-1.0)
    pub tempo_confidence: f32,

    /// Local tempo per analysis window (BPM)
    pub tempo_track: Vec<f32>,

    /// Start time of each tempo window in seconds
    pub tempo_track_times: Vec<f32>,

    /// All beat times in seconds (strictly increasing)
    pub beat_timestamps: Vec<f32>,

    /// Onset strength at each beat (0.0-1.0)
    pub beat_strengths: Vec<f32>,

    /// Downbeat times (beat 1) in seconds
    pub downbeat_timestamps: Vec<f32>,

    /// Detected time signature
    pub time_signature: TimeSignature,

    /// One entry per beat
    pub drum_grid: Vec<DrumGridEntry>,
}

/// Drum classes reported in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Drum {
    /// Bass drum
    Kick,
    /// Snare drum
    Snare,
}

/// Kick/snare presence at one beat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrumGridEntry {
    /// Beat time in seconds
    pub time: f32,
    /// Drums present at this beat
    pub drums: Vec<Drum>,
    /// A kick onset lies within tolerance of the beat
    pub has_kick: bool,
    /// A snare onset lies within tolerance of the beat
    pub has_snare: bool,
    /// 0 when `has_kick` is false
    pub kick_confidence: f32,
    /// 0 when `has_snare` is false
    pub snare_confidence: f32,
}

/// Chord quality families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChordQuality {
    /// Major triad
    Major,
    /// Minor triad
    Minor,
    /// Dominant seventh
    Dominant7,
    /// Major seventh
    Major7,
    /// Minor seventh
    Minor7,
    /// Suspended fourth
    Suspended,
    /// No chord
    Unknown,
}

impl ChordQuality {
    /// Suffix appended to the root in chord labels ("", "m", "7", "maj7", "m7", "sus4")
    pub fn suffix(&self) -> &'static str {
        match self {
            ChordQuality::Major | ChordQuality::Unknown => "",
            ChordQuality::Minor => "m",
            ChordQuality::Dominant7 => "7",
            ChordQuality::Major7 => "maj7",
            ChordQuality::Minor7 => "m7",
            ChordQuality::Suspended => "sus4",
        }
    }
}

/// Chord candidate at a beat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordEvent {
    /// Beat time in seconds
    pub timestamp: f32,
    /// Always "chord_candidate"
    pub event_type: String,
    /// Label such as "Am", "G7" or "N"
    pub chord: String,
    /// Quality family of `chord`
    pub chord_quality: ChordQuality,
    /// 0 (root position) to 3 (seventh in the bass)
    pub chord_inversion: u8,
    /// Detected bass pitch class (0-11)
    pub bass_pitch_class: Option<u8>,
    /// Template match (0.0-1.0)
    pub confidence: f32,
    /// Producer tag
    pub source: String,
}

/// Blended chroma at one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromaFrame {
    /// Frame centre in seconds
    pub timestamp: f32,
    /// Pitch-class energy, index 0 = C
    pub chroma: [f32; 12],
}

/// MFCCs at one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MfccFrame {
    /// Frame centre in seconds
    pub timestamp: f32,
    /// Cepstral coefficients
    pub mfcc: Vec<f32>,
}

/// Frame-wise spectral descriptors, all of equal length
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralFeatures {
    /// Spectral centroid (Hz)
    pub centroid: Vec<f32>,
    /// Rolloff frequency (Hz)
    pub rolloff: Vec<f32>,
    /// Spectral bandwidth (Hz)
    pub bandwidth: Vec<f32>,
    /// Fraction of sign changes per frame
    pub zero_crossing_rate: Vec<f32>,
    /// Frame centres in seconds
    pub timestamps: Vec<f32>,
}

/// Spectral descriptors of one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralFrame {
    /// Frame centre in seconds
    pub timestamp: f32,
    /// Spectral centroid (Hz)
    pub centroid: f32,
    /// Rolloff frequency (Hz)
    pub rolloff: f32,
    /// Spectral bandwidth (Hz)
    pub bandwidth: f32,
    /// Zero-crossing rate
    pub zero_crossing_rate: f32,
}

impl SpectralFeatures {
    /// Number of complete frames
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// True if there are no frames
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Iterate the descriptors frame by frame
    pub fn frames(&self) -> impl Iterator<Item = SpectralFrame> + '_ {
        (0..self.len()).map(move |i| SpectralFrame {
            timestamp: self.timestamps[i],
            centroid: self.centroid[i],
            rolloff: self.rolloff[i],
            bandwidth: self.bandwidth[i],
            zero_crossing_rate: self.zero_crossing_rate[i],
        })
    }
}

/// How an onset was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnsetClass {
    /// Percussive component dominates after the onset
    Percussive,
    /// Harmonic component dominates after the onset
    Harmonic,
    /// Onset too close to the end of the signal to decide
    Unknown,
}

/// A detected note or drum attack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnsetEvent {
    /// Onset time in seconds
    #[serde(rename = "timestamp")]
    pub time: f32,
    /// Onset strength envelope value at the onset
    pub strength: f32,
    /// Percussive / harmonic / unknown
    #[serde(rename = "type")]
    pub classification: OnsetClass,
}

/// Harmonic-content summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarmonicContent {
    /// Harmonic energy over total energy
    pub harmonic_ratio: f32,
    /// Mean per-frame maximum of the chroma
    pub pitch_salience: f32,
}

impl Default for HarmonicContent {
    fn default() -> Self {
        Self {
            harmonic_ratio: 0.5,
            pitch_salience: 0.5,
        }
    }
}

/// Tonal centroid vectors on the shared frame grid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TonnetzFeatures {
    /// Fifths (x, y), minor thirds (x, y), major thirds (x, y) per frame
    pub tonnetz: Vec<[f32; 6]>,
    /// Frame centres in seconds
    pub timestamps: Vec<f32>,
}

/// Tonal centroid of one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TonnetzFrame {
    /// Frame centre in seconds
    pub timestamp: f32,
    /// 6-dimensional tonal centroid
    pub tonnetz: [f32; 6],
}

impl TonnetzFeatures {
    /// Iterate the centroids frame by frame
    pub fn frames(&self) -> impl Iterator<Item = TonnetzFrame> + '_ {
        self.timestamps
            .iter()
            .zip(self.tonnetz.iter())
            .map(|(&timestamp, &tonnetz)| TonnetzFrame { timestamp, tonnetz })
    }
}

/// Complete analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Global facts and key / time signature
    pub metadata: Metadata,

    /// Tempo, beats, downbeats and drums
    pub beat_grid: BeatGrid,

    /// Chord candidates in time order
    pub events: Vec<ChordEvent>,

    /// Blended chroma per frame
    pub chroma_frames: Vec<ChromaFrame>,

    /// MFCCs per frame
    pub mfcc_frames: Vec<MfccFrame>,

    /// Centroid, rolloff, bandwidth and zero-crossing rate
    pub spectral_features: SpectralFeatures,

    /// General onsets in time order
    pub onsets: Vec<OnsetEvent>,

    /// Harmonic ratio and pitch salience
    pub harmonic_content: HarmonicContent,

    /// Tonal centroids per frame
    pub tonnetz_features: TonnetzFeatures,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_name_major() {
        assert_eq!(Key::Major(0).name(), "C");
        assert_eq!(Key::Major(1).name(), "C#");
        assert_eq!(Key::Major(6).name(), "F#");
        assert_eq!(Key::Major(11).name(), "B");
    }

    #[test]
    fn test_key_name_minor() {
        assert_eq!(Key::Minor(0).name(), "Cm");
        assert_eq!(Key::Minor(9).name(), "Am");
        assert_eq!(Key::Minor(11).name(), "Bm");
    }

    #[test]
    fn test_key_root_and_mode() {
        assert_eq!(Key::Minor(9).root_name(), "A");
        assert_eq!(Key::Minor(9).mode(), "minor");
        assert_eq!(Key::Major(4).root_name(), "E");
        assert_eq!(Key::Major(4).mode(), "major");
        assert_eq!(Key::Major(14).root(), 2);
    }

    #[test]
    fn test_drum_grid_entry_is_camel_case() {
        let entry = DrumGridEntry {
            time: 0.5,
            drums: vec![Drum::Kick],
            has_kick: true,
            has_snare: false,
            kick_confidence: 0.8,
            snare_confidence: 0.0,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["hasKick"], true);
        assert_eq!(json["hasSnare"], false);
        assert_eq!(json["drums"][0], "kick");
        assert!(json.get("kickConfidence").is_some());
        assert!(json.get("snareConfidence").is_some());
    }

    #[test]
    fn test_onset_event_field_names() {
        let onset = OnsetEvent {
            time: 1.25,
            strength: 3.0,
            classification: OnsetClass::Percussive,
        };
        let json = serde_json::to_value(&onset).unwrap();
        assert_eq!(json["timestamp"], 1.25);
        assert_eq!(json["type"], "percussive");
    }

    #[test]
    fn test_chord_quality_serialization() {
        assert_eq!(
            serde_json::to_string(&ChordQuality::Dominant7).unwrap(),
            "\"dominant7\""
        );
        assert_eq!(
            serde_json::to_string(&ChordQuality::Suspended).unwrap(),
            "\"suspended\""
        );
        assert_eq!(ChordQuality::Major7.suffix(), "maj7");
    }

    #[test]
    fn test_spectral_frames() {
        let features = SpectralFeatures {
            centroid: vec![100.0, 200.0],
            rolloff: vec![1.0, 2.0],
            bandwidth: vec![3.0, 4.0],
            zero_crossing_rate: vec![0.1, 0.2],
            timestamps: vec![0.0, 0.5],
        };
        let frames: Vec<SpectralFrame> = features.frames().collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].centroid, 200.0);
        assert_eq!(frames[1].timestamp, 0.5);
    }
}
