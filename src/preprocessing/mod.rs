//! Signal conditioning modules
//!
//! - Channel mixing (multi-channel to mono)
//! - Butterworth band filtering (zero-phase)

pub mod channel_mixer;
pub mod filter;
