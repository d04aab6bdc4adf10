//! Krumhansl-Kessler key templates
//!
//! Defines tonal profiles for 24 keys (12 major + 12 minor). Each profile is
//! normalized to sum to 1 and rotated so index 0 is always C.

/// Probe-tone ratings for C major (Krumhansl & Kessler, 1982)
const MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Probe-tone ratings for C minor
const MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Key templates for all 24 keys
#[derive(Debug, Clone)]
pub struct KeyTemplates {
    /// Major key templates (12 keys: C, C#, D, ..., B)
    pub major: [[f32; 12]; 12],

    /// Minor key templates (12 keys: C, C#, D, ..., B)
    pub minor: [[f32; 12]; 12],
}

impl KeyTemplates {
    /// Create new key templates with Krumhansl-Kessler profiles
    pub fn new() -> Self {
        let major = normalize(MAJOR_PROFILE);
        let minor = normalize(MINOR_PROFILE);
        Self {
            major: std::array::from_fn(|root| rotate(&major, root)),
            minor: std::array::from_fn(|root| rotate(&minor, root)),
        }
    }

    /// Template for the major key on `root` (0 = C)
    pub fn get_major_template(&self, root: usize) -> &[f32; 12] {
        &self.major[root % 12]
    }

    /// Template for the minor key on `root` (0 = C)
    pub fn get_minor_template(&self, root: usize) -> &[f32; 12] {
        &self.minor[root % 12]
    }
}

impl Default for KeyTemplates {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(profile: [f32; 12]) -> [f32; 12] {
    let sum: f32 = profile.iter().sum();
    profile.map(|x| x / sum)
}

/// Shift a C-based profile so its tonic sits on `root`
fn rotate(profile: &[f32; 12], root: usize) -> [f32; 12] {
    std::array::from_fn(|pc| profile[(pc + 12 - root) % 12])
}
