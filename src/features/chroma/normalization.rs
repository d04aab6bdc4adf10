//! Chroma normalization strategies
//!
//! All functions leave a vector whose norm is at or below `EPSILON` untouched,
//! so silent frames stay all-zero instead of turning into NaN.

use super::ChromaVector;
use crate::features::spectrum::EPSILON;

/// Scale so the entries sum to 1 (in absolute value)
pub fn l1_normalize(chroma: &mut ChromaVector) {
    let sum: f32 = chroma.iter().map(|x| x.abs()).sum();
    scale(chroma, sum);
}

/// Scale to unit Euclidean length
pub fn l2_normalize(chroma: &mut ChromaVector) {
    let norm = l2_norm(chroma);
    scale(chroma, norm);
}

/// Scale so the largest entry is 1
pub fn max_normalize(chroma: &mut ChromaVector) {
    let max = chroma.iter().map(|x| x.abs()).fold(0.0f32, f32::max);
    scale(chroma, max);
}

/// Euclidean length
pub fn l2_norm(chroma: &ChromaVector) -> f32 {
    chroma.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Zero every entry below `threshold`
pub fn threshold(chroma: &mut ChromaVector, threshold: f32) {
    for x in chroma.iter_mut() {
        if *x < threshold {
            *x = 0.0;
        }
    }
}

fn scale(chroma: &mut ChromaVector, norm: f32) {
    if norm > EPSILON {
        for x in chroma.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l1() {
        let mut c = [0.0f32; 12];
        c[0] = 3.0;
        c[4] = 1.0;
        l1_normalize(&mut c);
        assert!((c[0] - 0.75).abs() < 1e-6);
        assert!((c.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2() {
        let mut c = [0.0f32; 12];
        c[0] = 3.0;
        c[1] = 4.0;
        l2_normalize(&mut c);
        assert!((c[0] - 0.6).abs() < 1e-6);
        assert!((l2_norm(&c) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_max_and_threshold() {
        let mut c = [0.5f32; 12];
        c[9] = 2.0;
        max_normalize(&mut c);
        assert_eq!(c[9], 1.0);
        threshold(&mut c, 0.3);
        assert_eq!(c[9], 1.0);
        assert_eq!(c[0], 0.0);
    }

    #[test]
    fn test_zero_vector_untouched() {
        let mut c = [0.0f32; 12];
        l1_normalize(&mut c);
        l2_normalize(&mut c);
        max_normalize(&mut c);
        assert!(c.iter().all(|&x| x == 0.0));
    }
}
