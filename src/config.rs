//! Configuration parameters for audio analysis

use serde::{Deserialize, Serialize};

/// Analysis configuration parameters
///
/// All durations are in seconds, frequencies in Hz and frame counts in STFT hops
/// unless noted otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // Loading
    /// Sample rate the decoder resamples to (default: 22050)
    pub analysis_sample_rate: u32,

    // STFT parameters
    /// Frame size for STFT (default: 2048)
    pub frame_size: usize,

    /// Hop size for STFT (default: 512)
    pub hop_size: usize,

    // Harmonic-percussive separation
    /// Median filter length in frames/bins (default: 31)
    pub hpss_kernel_size: usize,

    /// Harmonic mask margin (default: 1.0)
    pub hpss_margin_harmonic: f32,

    /// Percussive mask margin (default: 5.0)
    /// Larger values push ambiguous energy out of the percussive part
    pub hpss_margin_percussive: f32,

    /// Soft mask exponent (default: 2.0)
    pub hpss_mask_power: f32,

    // Tempo and beats
    /// Window length in samples for the windowed tempo track (default: 8192)
    pub tempo_window_size: usize,

    /// Hop between tempo windows in samples (default: 2048)
    pub tempo_window_hop: usize,

    /// Prior tempo for windowed estimates (default: 120.0)
    pub start_bpm: f32,

    /// Prior width in octaves (default: 1.0)
    pub tempo_std_bpm: f32,

    /// Upper bound for any tempo estimate (default: 320.0)
    pub max_tempo: f32,

    /// Beat tracker tightness: how strongly beats stick to the tempo (default: 100.0)
    pub tightness: f32,

    // Chroma
    /// Lowest constant-Q bin (default: 32.70 Hz, C1)
    pub cqt_fmin: f32,

    /// Constant-Q bins per octave (default: 36)
    pub bins_per_octave: usize,

    /// Octaves covered by the constant-Q transform (default: 7)
    pub n_octaves: usize,

    /// Relative threshold below which CQT chroma bins are zeroed (default: 0.1)
    pub cqt_threshold: f32,

    /// CENS temporal smoothing window in frames (default: 11)
    pub cens_smoothing_window: usize,

    /// Weight of CQT chroma in the blend; CENS gets `1 - cqt_blend_weight` (default: 0.6)
    pub cqt_blend_weight: f32,

    // Chords
    /// A repeated chord label is emitted again only at this confidence (default: 0.7)
    pub chord_repeat_confidence: f32,

    /// Bass analysis window centred on each beat (default: 0.2 s)
    pub bass_window_seconds: f32,

    /// Bass band (default: 40-200 Hz)
    pub bass_band: (f32, f32),

    /// In-band bass peak must reach this fraction of the strongest bin of the
    /// unfiltered window (default: 0.3)
    pub bass_peak_ratio: f32,

    /// Bass peaks below this frequency are rejected (default: 30.0 Hz)
    pub bass_min_frequency: f32,

    // Drums
    /// Kick band (default: 40-150 Hz)
    pub kick_band: (f32, f32),

    /// Snare body band (default: 150-400 Hz)
    pub snare_body_band: (f32, f32),

    /// Snare crack band (default: 2000-6000 Hz)
    pub snare_crack_band: (f32, f32),

    /// Gain applied to the crack band before summing with the body (default: 0.5)
    pub snare_crack_weight: f32,

    /// Peak-picking delta for kicks (default: 0.05)
    pub kick_delta: f32,

    /// Peak-picking delta for snares (default: 0.1)
    pub snare_delta: f32,

    /// Minimum spacing between kick onsets (default: 0.10 s)
    pub kick_min_separation: f32,

    /// Minimum spacing between snare onsets (default: 0.15 s)
    pub snare_min_separation: f32,

    /// Beat-to-onset tolerance (default: 0.05 s)
    pub drum_tolerance: f32,

    /// Half-width of the energy window around a beat, in samples (default: 512)
    pub drum_energy_half_window: usize,

    /// Mean absolute amplitude is multiplied by this before clamping to 1 (default: 10.0)
    pub drum_energy_gain: f32,

    /// Bands quieter than this (dB relative to the percussive peak) are treated as silent (default: -30.0)
    pub drum_band_floor_db: f32,

    /// An onset is kept only if its band carries at least this fraction of the
    /// other drum band's energy around it (default: 0.35)
    pub drum_band_dominance: f32,

    // Spectral features
    /// Number of MFCC coefficients (default: 13)
    pub n_mfcc: usize,

    /// Mel bands for MFCC and onset strength (default: 128)
    pub n_mels: usize,

    /// Spectral rolloff energy fraction (default: 0.85)
    pub rolloff_percent: f32,

    /// Peak-picking delta for general onsets (default: 0.1)
    pub onset_delta: f32,

    /// Window after an onset used to classify it, in samples (default: 1024)
    pub onset_classification_window: usize,

    /// Use rayon for windowed tempo tracking and the CQT (default: true)
    /// Output is identical either way.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            analysis_sample_rate: 22050,
            frame_size: 2048,
            hop_size: 512,
            hpss_kernel_size: 31,
            hpss_margin_harmonic: 1.0,
            hpss_margin_percussive: 5.0,
            hpss_mask_power: 2.0,
            tempo_window_size: 8192,
            tempo_window_hop: 2048,
            start_bpm: 120.0,
            tempo_std_bpm: 1.0,
            max_tempo: 320.0,
            tightness: 100.0,
            cqt_fmin: 32.703_197,
            bins_per_octave: 36,
            n_octaves: 7,
            cqt_threshold: 0.1,
            cens_smoothing_window: 11,
            cqt_blend_weight: 0.6,
            chord_repeat_confidence: 0.7,
            bass_window_seconds: 0.2,
            bass_band: (40.0, 200.0),
            bass_peak_ratio: 0.3,
            bass_min_frequency: 30.0,
            kick_band: (40.0, 150.0),
            snare_body_band: (150.0, 400.0),
            snare_crack_band: (2000.0, 6000.0),
            snare_crack_weight: 0.5,
            kick_delta: 0.05,
            snare_delta: 0.1,
            kick_min_separation: 0.10,
            snare_min_separation: 0.15,
            drum_tolerance: 0.05,
            drum_energy_half_window: 512,
            drum_energy_gain: 10.0,
            drum_band_floor_db: -30.0,
            drum_band_dominance: 0.35,
            n_mfcc: 13,
            n_mels: 128,
            rolloff_percent: 0.85,
            onset_delta: 0.1,
            onset_classification_window: 1024,
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    /// Duration of one STFT hop in seconds at `sample_rate`
    pub fn hop_seconds(&self, sample_rate: u32) -> f32 {
        self.hop_size as f32 / sample_rate as f32
    }

    /// Reject configurations no stage can work with
    pub fn validate(&self) -> Result<(), crate::error::AnalysisError> {
        use crate::error::AnalysisError;

        if self.frame_size == 0 || self.hop_size == 0 {
            return Err(AnalysisError::InvalidInput(
                "Frame size and hop size must be > 0".to_string(),
            ));
        }
        if self.hop_size > self.frame_size {
            return Err(AnalysisError::InvalidInput(format!(
                "Hop size ({}) must not exceed frame size ({})",
                self.hop_size, self.frame_size
            )));
        }
        if self.analysis_sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Analysis sample rate must be > 0".to_string(),
            ));
        }
        if self.bins_per_octave == 0 || self.bins_per_octave % 12 != 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "bins_per_octave must be a positive multiple of 12, got {}",
                self.bins_per_octave
            )));
        }
        if !self.drum_band_dominance.is_finite() || self.drum_band_dominance < 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "drum_band_dominance must be >= 0, got {}",
                self.drum_band_dominance
            )));
        }
        if !(0.0..=1.0).contains(&self.cqt_blend_weight) {
            return Err(AnalysisError::InvalidInput(format!(
                "cqt_blend_weight must be in [0, 1], got {}",
                self.cqt_blend_weight
            )));
        }
        Ok(())
    }
}
