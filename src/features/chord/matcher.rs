//! Frame-to-template chord matching

use super::templates::{ChordTemplate, CHORD_TEMPLATES};
use crate::analysis::result::ChordQuality;
use crate::features::chroma::normalization::{l2_norm, l2_normalize};
use crate::features::chroma::ChromaVector;
use crate::features::spectrum::EPSILON;

/// Label used when a frame carries no energy
pub const NO_CHORD: &str = "N";

/// Best template for one chroma frame
#[derive(Debug, Clone, PartialEq)]
pub struct ChordMatch {
    /// Matched template, `None` for "N"
    pub template: Option<&'static ChordTemplate>,
    /// Dot product of the unit-length frame with the template, clamped to [0, 1]
    pub confidence: f32,
}

impl ChordMatch {
    /// "N" at confidence 0
    pub fn no_chord() -> Self {
        Self {
            template: None,
            confidence: 0.0,
        }
    }

    /// Chord label, "N" for no chord
    pub fn label(&self) -> String {
        self.template
            .map_or_else(|| NO_CHORD.to_string(), ChordTemplate::label)
    }

    /// Root pitch class, if any
    pub fn root(&self) -> Option<u8> {
        self.template.map(|t| t.root)
    }

    /// Quality family, `Unknown` for "N"
    pub fn quality(&self) -> ChordQuality {
        self.template.map_or(ChordQuality::Unknown, |t| t.quality)
    }
}

/// Match a chroma frame against the template bank
///
/// The frame is scaled to unit length and dotted with every template; the
/// first template with the highest score wins.
pub fn match_chord(chroma: &ChromaVector) -> ChordMatch {
    if l2_norm(chroma) <= EPSILON {
        return ChordMatch::no_chord();
    }

    let mut unit = *chroma;
    l2_normalize(&mut unit);

    let mut best: Option<(&'static ChordTemplate, f32)> = None;
    for template in CHORD_TEMPLATES.iter() {
        let score: f32 = template
            .weights
            .iter()
            .zip(unit.iter())
            .map(|(w, x)| w * x)
            .sum();
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((template, score));
        }
    }

    match best {
        Some((template, score)) => ChordMatch {
            template: Some(template),
            confidence: score.clamp(0.0, 1.0),
        },
        None => ChordMatch::no_chord(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes(pcs: &[usize]) -> ChromaVector {
        let mut c = [0.0f32; 12];
        for &pc in pcs {
            c[pc] = 1.0;
        }
        c
    }

    #[test]
    fn test_triads() {
        assert_eq!(match_chord(&notes(&[0, 4, 7])).label(), "C");
        assert_eq!(match_chord(&notes(&[9, 0, 4])).label(), "Am");
        assert_eq!(match_chord(&notes(&[2, 7, 9])).label(), "Dsus4");
    }

    #[test]
    fn test_sevenths() {
        let g7 = match_chord(&notes(&[7, 11, 2, 5]));
        assert_eq!(g7.label(), "G7");
        assert_eq!(g7.quality(), ChordQuality::Dominant7);
        assert_eq!(g7.root(), Some(7));

        assert_eq!(match_chord(&notes(&[5, 9, 0, 4])).label(), "Fmaj7");
        assert_eq!(match_chord(&notes(&[2, 5, 9, 0])).label(), "Dm7");
    }

    #[test]
    fn test_zero_energy_is_no_chord() {
        let m = match_chord(&[0.0; 12]);
        assert_eq!(m.label(), "N");
        assert_eq!(m.confidence, 0.0);
        assert_eq!(m.quality(), ChordQuality::Unknown);
        assert_eq!(m.root(), None);
    }

    #[test]
    fn test_confidence_in_range() {
        let m = match_chord(&notes(&[0, 4, 7, 11]));
        assert!((0.0..=1.0).contains(&m.confidence));
        // A full triad scores above 1 before clamping
        assert_eq!(match_chord(&notes(&[0, 4, 7])).confidence, 1.0);
    }
}
