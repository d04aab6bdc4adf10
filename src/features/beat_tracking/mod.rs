//! Beat tracking modules
//!
//! Turn the percussive onset envelope into a beat grid:
//! - Windowed tempo track (local tempo over time)
//! - Dynamic-programming beat tracker
//! - Time signature from beat intervals
//! - Downbeats and beat strength

pub mod downbeats;
pub mod dp;
pub mod tempo_track;
pub mod time_signature;

pub use downbeats::{beat_strengths, detect_downbeats, fallback_downbeats, DEFAULT_BEAT_STRENGTH};
pub use dp::{track_beats, BeatTrack};
pub use tempo_track::{track_tempo, TempoTrack};
pub use time_signature::{detect_time_signature, TimeSignature};

/// Median of a non-empty slice (mean of the two middle values for even lengths)
pub(crate) fn median(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}
