//! Feature extraction modules
//!
//! This module contains all feature extraction algorithms:
//! - Shared STFT and mel helpers
//! - HPSS, onset strength and onset detection
//! - Tempo estimation and beat tracking
//! - Chroma extraction and key detection
//! - Chord recognition
//! - Kick / snare detection
//! - Spectral, cepstral and tonal features

pub mod beat_tracking;
pub mod chord;
pub mod chroma;
pub mod drums;
pub mod key;
pub mod onset;
pub mod period;
pub mod spectral;
pub mod spectrum;
