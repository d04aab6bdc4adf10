//! Beat-synchronous chord recognition
//!
//! For every beat: take the chroma frame nearest to it, match it against the
//! template bank, look for a bass note around the beat and derive the
//! inversion. An event is emitted when the label changes, or when it repeats
//! with confidence at or above `chord_repeat_confidence`.

use super::bass::detect_bass_note;
use super::matcher::match_chord;
use crate::analysis::result::ChordEvent;
use crate::config::AnalysisConfig;
use crate::error::{StageError, StageResult};
use crate::features::chroma::ChromaVector;
use crate::features::spectrum::time_to_frame;

/// `event_type` of every emitted event
pub const CHORD_EVENT_TYPE: &str = "chord_candidate";

/// `source` tag of every emitted event
pub const CHORD_SOURCE: &str = "enhanced_bass";

/// Inversion implied by a bass note under a chord root
///
/// | (bass - root) mod 12 | inversion |
/// |---|---|
/// | 3, 4 | 1 (third in the bass) |
/// | 7 | 2 (fifth in the bass) |
/// | 10, 11 | 3 (seventh in the bass) |
/// | anything else | 0 |
///
/// Returns 0 when either note is unknown.
pub fn inversion(root: Option<u8>, bass: Option<u8>) -> u8 {
    let (Some(root), Some(bass)) = (root, bass) else {
        return 0;
    };
    match (bass as i32 - root as i32).rem_euclid(12) {
        3 | 4 => 1,
        7 => 2,
        10 | 11 => 3,
        _ => 0,
    }
}

/// Recognize chords at each beat
///
/// # Arguments
///
/// * `chroma` - Chroma frames on the STFT hop grid
/// * `beats` - Beat times in seconds, increasing
/// * `bass_source` - Signal searched for bass notes (the percussive component)
/// * `sample_rate` - Sample rate of `bass_source` and of the chroma grid
/// * `config` - Hop size, bass and repeat settings
///
/// # Returns
///
/// Time-ordered chord events, at most one per beat
///
/// # Errors
///
/// `StageError::EmptyIntermediate` if beats are present but there is no chroma
pub fn recognize_chords(
    chroma: &[ChromaVector],
    beats: &[f32],
    bass_source: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> StageResult<Vec<ChordEvent>> {
    if beats.is_empty() {
        return Ok(Vec::new());
    }
    if chroma.is_empty() {
        return Err(StageError::EmptyIntermediate(
            "no chroma frames for chord recognition".to_string(),
        ));
    }

    let mut events = Vec::new();
    let mut last_label: Option<String> = None;

    for &beat in beats {
        let frame = time_to_frame(beat, sample_rate, config.hop_size).min(chroma.len() - 1);
        let matched = match_chord(&chroma[frame]);
        let bass = detect_bass_note(bass_source, sample_rate, beat, config);
        let label = matched.label();

        if last_label.as_deref() == Some(label.as_str())
            && matched.confidence < config.chord_repeat_confidence
        {
            continue;
        }

        events.push(ChordEvent {
            timestamp: beat,
            event_type: CHORD_EVENT_TYPE.to_string(),
            chord: label.clone(),
            chord_quality: matched.quality(),
            chord_inversion: inversion(matched.root(), bass),
            bass_pitch_class: bass,
            confidence: matched.confidence,
            source: CHORD_SOURCE.to_string(),
        });
        last_label = Some(label);
    }

    log::debug!("Chord events: {} from {} beats", events.len(), beats.len());
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::ChordQuality;

    fn notes(pcs: &[usize], level: f32) -> ChromaVector {
        let mut c = [0.0f32; 12];
        for &pc in pcs {
            c[pc] = level;
        }
        c
    }

    #[test]
    fn test_inversion_mapping() {
        assert_eq!(inversion(Some(0), Some(4)), 1);
        assert_eq!(inversion(Some(9), Some(0)), 1);
        assert_eq!(inversion(Some(0), Some(7)), 2);
        assert_eq!(inversion(Some(7), Some(5)), 3);
        assert_eq!(inversion(Some(0), Some(11)), 3);
        assert_eq!(inversion(Some(0), Some(0)), 0);
        assert_eq!(inversion(Some(0), Some(2)), 0);
        assert_eq!(inversion(Some(0), None), 0);
        assert_eq!(inversion(None, Some(4)), 0);
    }

    #[test]
    fn test_events_on_label_changes() {
        let sr = 22050;
        let config = AnalysisConfig::default();
        let hop_s = config.hop_size as f32 / sr as f32;

        // 40 frames of C major followed by 40 of A minor
        let mut chroma = vec![notes(&[0, 4, 7], 1.0); 40];
        chroma.extend(vec![notes(&[9, 0, 4], 1.0); 40]);
        let beats: Vec<f32> = [5usize, 15, 25, 45, 55].iter().map(|&f| f as f32 * hop_s).collect();
        let silence = vec![0.0f32; 80 * config.hop_size];

        let events = recognize_chords(&chroma, &beats, &silence, sr, &config).unwrap();
        // Full triads match at confidence 1.0, so repeats are kept
        let labels: Vec<&str> = events.iter().map(|e| e.chord.as_str()).collect();
        assert_eq!(labels, vec!["C", "C", "C", "Am", "Am"]);
        assert!(events.iter().all(|e| e.event_type == CHORD_EVENT_TYPE));
        assert!(events.iter().all(|e| e.bass_pitch_class.is_none()));
        assert!(events.iter().all(|e| e.chord_inversion == 0));
        assert!(events.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_repeats_below_threshold_are_suppressed() {
        let sr = 22050;
        let config = AnalysisConfig {
            chord_repeat_confidence: 1.5,
            ..AnalysisConfig::default()
        };
        let hop_s = config.hop_size as f32 / sr as f32;

        let mut chroma = vec![notes(&[7, 11, 2, 5], 1.0); 20];
        chroma.extend(vec![notes(&[0, 4, 7], 1.0); 20]);
        let beats: Vec<f32> = (0..8).map(|i| (i * 5) as f32 * hop_s).collect();
        let silence = vec![0.0f32; 40 * config.hop_size];

        let events = recognize_chords(&chroma, &beats, &silence, sr, &config).unwrap();
        let labels: Vec<&str> = events.iter().map(|e| e.chord.as_str()).collect();
        assert_eq!(labels, vec!["G7", "C"]);
        assert_eq!(events[1].timestamp, beats[4]);
    }

    #[test]
    fn test_silent_chroma_yields_no_chord() {
        let sr = 22050;
        let config = AnalysisConfig::default();
        let chroma = vec![[0.0f32; 12]; 10];
        let silence = vec![0.0f32; 10 * config.hop_size];

        let events = recognize_chords(&chroma, &[0.0, 0.05, 0.1], &silence, sr, &config).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].chord, "N");
        assert_eq!(events[0].confidence, 0.0);
        assert_eq!(events[0].chord_quality, ChordQuality::Unknown);
    }

    #[test]
    fn test_empty_inputs() {
        let config = AnalysisConfig::default();
        assert!(recognize_chords(&[], &[], &[], 22050, &config).unwrap().is_empty());
        assert!(recognize_chords(&[], &[1.0], &[], 22050, &config).is_err());
    }
}
