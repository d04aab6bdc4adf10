//! Onset detection modules
//!
//! - Harmonic-percussive source separation (HPSS)
//! - Spectral flux onset strength
//! - Adaptive peak picking
//! - Onset classification (percussive / harmonic)

pub mod classify;
pub mod hpss;
pub mod spectral_flux;
pub mod threshold;

pub use classify::{classify_onset, detect_onsets};
pub use hpss::{separate, HarmonicPercussiveSplit};
pub use spectral_flux::onset_strength;
pub use threshold::{pick_peaks, PeakPickParams};
