//! Static chord template bank
//!
//! 72 weighted pitch-class templates: 12 roots × six quality families. Weights
//! favour the root, then the strong chord tones; the seventh degree carries a
//! light weight in triads and a heavy one in seventh chords so that it
//! separates the two.
//!
//! | Quality | Degrees (semitones: weight) |
//! |---|---|
//! | major | 0: 1.0, 4: 0.9, 7: 0.85, 11: 0.25 |
//! | minor | 0: 1.0, 3: 0.9, 7: 0.85, 10: 0.2 |
//! | dominant 7th | 0: 1.0, 4: 0.85, 7: 0.8, 10: 0.75 |
//! | major 7th | 0: 1.0, 4: 0.85, 7: 0.8, 11: 0.7 |
//! | minor 7th | 0: 1.0, 3: 0.85, 7: 0.8, 10: 0.75 |
//! | sus4 | 0: 1.0, 5: 0.9, 7: 0.85 |
//!
//! The bank is built at compile time and never changes.

use crate::analysis::result::{pitch_class_name, ChordQuality};

/// Number of templates in the bank
pub const N_TEMPLATES: usize = 72;

/// One reference chord
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChordTemplate {
    /// Root pitch class (0 = C)
    pub root: u8,
    /// Quality family
    pub quality: ChordQuality,
    /// Weight per pitch class
    pub weights: [f32; 12],
}

impl ChordTemplate {
    /// Label such as "C", "F#m", "G7", "Fmaj7", "Dm7", "Esus4"
    pub fn label(&self) -> String {
        format!("{}{}", pitch_class_name(self.root as usize), self.quality.suffix())
    }
}

const SHAPES: [(ChordQuality, &[(usize, f32)]); 6] = [
    (ChordQuality::Major, &[(0, 1.0), (4, 0.9), (7, 0.85), (11, 0.25)]),
    (ChordQuality::Minor, &[(0, 1.0), (3, 0.9), (7, 0.85), (10, 0.2)]),
    (ChordQuality::Dominant7, &[(0, 1.0), (4, 0.85), (7, 0.8), (10, 0.75)]),
    (ChordQuality::Major7, &[(0, 1.0), (4, 0.85), (7, 0.8), (11, 0.7)]),
    (ChordQuality::Minor7, &[(0, 1.0), (3, 0.85), (7, 0.8), (10, 0.75)]),
    (ChordQuality::Suspended, &[(0, 1.0), (5, 0.9), (7, 0.85)]),
];

const fn build_templates() -> [ChordTemplate; N_TEMPLATES] {
    let mut bank = [ChordTemplate {
        root: 0,
        quality: ChordQuality::Unknown,
        weights: [0.0; 12],
    }; N_TEMPLATES];

    let mut family = 0;
    while family < SHAPES.len() {
        let (quality, degrees) = SHAPES[family];
        let mut root = 0;
        while root < 12 {
            let mut weights = [0.0f32; 12];
            let mut d = 0;
            while d < degrees.len() {
                let (interval, weight) = degrees[d];
                weights[(root + interval) % 12] = weight;
                d += 1;
            }
            bank[family * 12 + root] = ChordTemplate {
                root: root as u8,
                quality,
                weights,
            };
            root += 1;
        }
        family += 1;
    }
    bank
}

/// Templates ordered by family (major, minor, dom7, maj7, min7, sus4), then root
pub static CHORD_TEMPLATES: [ChordTemplate; N_TEMPLATES] = build_templates();
