//! Audio I/O modules
//!
//! Audio decoding with Symphonia and the immutable [`Signal`] buffer.

pub mod decoder;
pub mod signal;

pub use decoder::{decode_audio, load_signal};
pub use signal::Signal;
