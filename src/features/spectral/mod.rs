//! Timbre and tonal summary features
//!
//! - Spectral centroid, rolloff, bandwidth and zero-crossing rate
//! - MFCCs
//! - Harmonic ratio and pitch salience
//! - Tonnetz (tonal centroid)

pub mod descriptors;
pub mod harmonic;
pub mod mfcc;
pub mod tonnetz;

pub use descriptors::extract_spectral_features;
pub use harmonic::analyze_harmonic_content;
pub use mfcc::compute_mfcc;
pub use tonnetz::extract_tonnetz;
