//! Period estimation
//!
//! Converts an onset strength envelope into a tempo estimate using
//! autocorrelation with a log-normal tempo prior.

pub mod autocorrelation;

pub use autocorrelation::{compute_autocorrelation_fft, estimate_tempo, TempoPrior};
