//! Kick and snare detection on the beat grid
//!
//! The percussive component is split into drum bands with zero-phase
//! Butterworth band-passes:
//!
//! - kick: 40-150 Hz
//! - snare: 150-400 Hz body plus a 2-6 kHz crack at half weight
//!
//! Each band gets its own onset envelope and peak picker with a minimum
//! spacing (100 ms kick, 150 ms snare). A beat carries a drum when one of that
//! drum's onsets lies within the tolerance window; the confidence falls off
//! linearly with the onset distance and scales with band energy at the beat.
//!
//! Two guards keep filter leakage from turning into hits:
//!
//! - a band whose peak sits more than `drum_band_floor_db` below the percussive
//!   peak is treated as silent
//! - an onset survives only if its band holds at least `drum_band_dominance`
//!   of the other band's energy around it, so the attack of a low kick does not
//!   also register as a snare

use crate::analysis::result::{Drum, DrumGridEntry};
use crate::config::AnalysisConfig;
use crate::error::{StageError, StageResult};
use crate::features::onset::spectral_flux::onset_strength;
use crate::features::onset::threshold::{pick_peaks, PeakPickParams};
use crate::features::spectrum::{frames_to_time, EPSILON};
use crate::preprocessing::filter::BandFilter;

/// Onset settings for one drum band
struct BandDetector {
    delta: f32,
    min_separation: f32,
}

/// Detect kick and snare presence at every beat
///
/// # Arguments
///
/// * `percussive` - Percussive component of the signal
/// * `sample_rate` - Sample rate in Hz
/// * `beats` - Beat times in seconds, increasing
/// * `config` - Drum bands, onset thresholds, tolerance and energy settings
///
/// # Returns
///
/// Exactly one entry per beat, in beat order
///
/// # Errors
///
/// - `StageError::InvalidParameter` for a zero sample rate or non-positive tolerance
/// - `StageError` from the onset envelope if a band cannot be analysed
pub fn detect_drums(
    percussive: &[f32],
    sample_rate: u32,
    beats: &[f32],
    config: &AnalysisConfig,
) -> StageResult<Vec<DrumGridEntry>> {
    if sample_rate == 0 {
        return Err(StageError::InvalidParameter("sample rate must be > 0".to_string()));
    }
    if config.drum_tolerance <= 0.0 {
        return Err(StageError::InvalidParameter(format!(
            "drum tolerance must be > 0, got {}",
            config.drum_tolerance
        )));
    }
    if beats.is_empty() {
        return Ok(Vec::new());
    }

    let kick = BandFilter::band_pass(config.kick_band.0, config.kick_band.1, sample_rate)
        .filtfilt(percussive);

    let body = BandFilter::band_pass(config.snare_body_band.0, config.snare_body_band.1, sample_rate)
        .filtfilt(percussive);
    let crack =
        BandFilter::band_pass(config.snare_crack_band.0, config.snare_crack_band.1, sample_rate)
            .filtfilt(percussive);
    let snare: Vec<f32> = body
        .iter()
        .zip(crack.iter())
        .map(|(b, c)| b + config.snare_crack_weight * c)
        .collect();

    let floor = peak_abs(percussive) * 10f32.powf(config.drum_band_floor_db / 20.0);

    let kick_onsets = band_onsets(
        &kick,
        sample_rate,
        floor,
        &BandDetector {
            delta: config.kick_delta,
            min_separation: config.kick_min_separation,
        },
        config,
    )?;
    let snare_onsets = band_onsets(
        &snare,
        sample_rate,
        floor,
        &BandDetector {
            delta: config.snare_delta,
            min_separation: config.snare_min_separation,
        },
        config,
    )?;

    let half_window = config.frame_size / 2;
    let kick_onsets = dominant_onsets(
        &kick_onsets,
        &kick,
        &snare,
        sample_rate,
        half_window,
        config.drum_band_dominance,
    );
    let snare_onsets = dominant_onsets(
        &snare_onsets,
        &snare,
        &kick,
        sample_rate,
        half_window,
        config.drum_band_dominance,
    );

    log::debug!(
        "Drum onsets: {} kick, {} snare",
        kick_onsets.len(),
        snare_onsets.len()
    );

    let grid = beats
        .iter()
        .map(|&t| {
            let kick_hit = beat_hit(&kick_onsets, &kick, t, sample_rate, config);
            let snare_hit = beat_hit(&snare_onsets, &snare, t, sample_rate, config);

            let mut drums = Vec::with_capacity(2);
            if kick_hit.is_some() {
                drums.push(Drum::Kick);
            }
            if snare_hit.is_some() {
                drums.push(Drum::Snare);
            }

            DrumGridEntry {
                time: t,
                drums,
                has_kick: kick_hit.is_some(),
                has_snare: snare_hit.is_some(),
                kick_confidence: kick_hit.unwrap_or(0.0),
                snare_confidence: snare_hit.unwrap_or(0.0),
            }
        })
        .collect();

    Ok(grid)
}

/// Grid with one drum-less entry per beat, used when detection fails
pub fn empty_grid(beats: &[f32]) -> Vec<DrumGridEntry> {
    beats
        .iter()
        .map(|&time| DrumGridEntry {
            time,
            drums: Vec::new(),
            has_kick: false,
            has_snare: false,
            kick_confidence: 0.0,
            snare_confidence: 0.0,
        })
        .collect()
}

/// Onset times of one band; none if the band is below the floor
fn band_onsets(
    band: &[f32],
    sample_rate: u32,
    floor: f32,
    detector: &BandDetector,
    config: &AnalysisConfig,
) -> StageResult<Vec<f32>> {
    let peak = peak_abs(band);
    if peak <= EPSILON || peak < floor {
        return Ok(Vec::new());
    }

    let envelope = onset_strength(
        band,
        sample_rate,
        config.frame_size,
        config.hop_size,
        config.n_mels,
    )?;
    let params = PeakPickParams::for_drums(
        sample_rate,
        config.hop_size,
        detector.delta,
        detector.min_separation,
    );

    Ok(pick_peaks(&envelope, &params)
        .into_iter()
        .map(|f| frames_to_time(f, sample_rate, config.hop_size))
        .collect())
}

/// Confidence of a hit at beat `t`, `None` if no onset lies within tolerance
fn beat_hit(
    onsets: &[f32],
    band: &[f32],
    t: f32,
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Option<f32> {
    let distance = onsets
        .iter()
        .map(|&o| (o - t).abs())
        .fold(f32::INFINITY, f32::min);
    if distance >= config.drum_tolerance {
        return None;
    }

    let energy = window_energy(band, t, sample_rate, config.drum_energy_half_window);
    let proximity = 1.0 - distance / config.drum_tolerance;
    Some((proximity * (energy * config.drum_energy_gain).min(1.0)).clamp(0.0, 1.0))
}

/// Onsets at which `band` holds at least `ratio` of `rival`'s energy
fn dominant_onsets(
    onsets: &[f32],
    band: &[f32],
    rival: &[f32],
    sample_rate: u32,
    half_window: usize,
    ratio: f32,
) -> Vec<f32> {
    onsets
        .iter()
        .copied()
        .filter(|&t| {
            let own = window_energy(band, t, sample_rate, half_window);
            let other = window_energy(rival, t, sample_rate, half_window);
            let keep = own > EPSILON && own >= ratio * other;
            if !keep {
                log::debug!(
                    "Dropping onset at {:.3}s: band energy {:.4} vs {:.4}",
                    t,
                    own,
                    other
                );
            }
            keep
        })
        .collect()
}

/// Mean absolute amplitude within `half_window` samples of `t` (0 past the end)
fn window_energy(band: &[f32], t: f32, sample_rate: u32, half_window: usize) -> f32 {
    let idx = (t.max(0.0) * sample_rate as f32) as usize;
    if idx >= band.len() {
        return 0.0;
    }
    let lo = idx.saturating_sub(half_window);
    let hi = (idx + half_window.max(1)).min(band.len());
    band[lo..hi].iter().map(|x| x.abs()).sum::<f32>() / (hi - lo) as f32
}

fn peak_abs(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, &x| m.max(x.abs()))
}
