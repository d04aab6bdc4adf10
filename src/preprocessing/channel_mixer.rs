//! Channel mixing utilities (multi-channel to mono conversion)

/// Downmix interleaved multi-channel samples to mono by averaging channels
///
/// # Arguments
///
/// * `samples` - Interleaved samples (`L R L R ...` for stereo)
/// * `channels` - Number of interleaved channels
///
/// # Returns
///
/// Mono samples, one per frame. A trailing partial frame is averaged over the
/// channels it contains.
pub fn downmix_interleaved(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Convert stereo to mono: (L + R) / 2
///
/// The output is as long as the shorter channel.
pub fn stereo_to_mono(left: &[f32], right: &[f32]) -> Vec<f32> {
    if left.len() != right.len() {
        log::warn!(
            "Channel length mismatch ({} vs {}), truncating to the shorter channel",
            left.len(),
            right.len()
        );
    }
    left.iter()
        .zip(right.iter())
        .map(|(&l, &r)| (l + r) * 0.5)
        .collect()
}
