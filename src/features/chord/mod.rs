//! Chord recognition
//!
//! - Static bank of 72 weighted templates (12 roots × 6 qualities)
//! - Unit-length chroma matched by dot product
//! - Bass note from a band-limited FFT around each beat, mapped to an inversion
//! - Beat-synchronous event emission with repeat suppression

pub mod bass;
pub mod matcher;
pub mod recognizer;
pub mod templates;

pub use bass::detect_bass_note;
pub use matcher::{match_chord, ChordMatch, NO_CHORD};
pub use recognizer::{inversion, recognize_chords};
pub use templates::{ChordTemplate, CHORD_TEMPLATES};
