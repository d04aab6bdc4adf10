//! Audio decoding using Symphonia
//!
//! Decodes any container/codec Symphonia supports, downmixes to mono and
//! resamples to the analysis rate with rubato.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::signal::Signal;
use crate::error::{AnalysisError, CONVERSION_HINT};
use crate::preprocessing::channel_mixer::downmix_interleaved;

/// Decode audio file to mono PCM samples
///
/// # Arguments
///
/// * `path` - Path to audio file
///
/// # Returns
///
/// Tuple of (mono samples, native sample rate)
///
/// # Errors
///
/// - `AnalysisError::Io` if the file cannot be opened
/// - `AnalysisError::UnsupportedFormat` if no demuxer/codec recognises it
/// - `AnalysisError::DecodingError` if it contains no decodable audio
pub fn decode_audio(path: &Path) -> Result<(Vec<f32>, u32), AnalysisError> {
    log::debug!("Decoding audio file: {}", path.display());

    let file = File::open(path)
        .map_err(|e| AnalysisError::Io(format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| match e {
            SymphoniaError::Unsupported(what) => AnalysisError::UnsupportedFormat(what.to_string()),
            other => decoding_error(other.to_string()),
        })?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decoding_error("No supported audio tracks found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| decoding_error("Unknown sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| match e {
            SymphoniaError::Unsupported(what) => AnalysisError::UnsupportedFormat(what.to_string()),
            other => decoding_error(other.to_string()),
        })?;

    let mut all_samples: Vec<f32> = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(decoding_error(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(_)) => {
                skipped_packets += 1;
                continue;
            }
            Err(e) => return Err(decoding_error(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        all_samples.extend(downmix_interleaved(sample_buf.samples(), channels));
    }

    if skipped_packets > 0 {
        log::warn!("Skipped {} undecodable packets", skipped_packets);
    }

    if all_samples.is_empty() {
        return Err(decoding_error("File contains no audio samples".to_string()));
    }

    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.1}s",
        all_samples.len(),
        sample_rate,
        all_samples.len() as f32 / sample_rate as f32
    );

    Ok((all_samples, sample_rate))
}

/// Decode a file and resample it to `target_sample_rate`
pub fn load_signal(path: &Path, target_sample_rate: u32) -> Result<Signal, AnalysisError> {
    let (samples, sample_rate) = decode_audio(path)?;

    let samples = if sample_rate != target_sample_rate {
        resample(&samples, sample_rate, target_sample_rate)?
    } else {
        samples
    };

    Signal::new(samples, target_sample_rate)
}

/// Resample mono f32 audio with a windowed-sinc resampler
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AnalysisError> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
        WindowFunction,
    };

    if samples.is_empty() || from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    log::debug!("Resampling {} samples: {} Hz -> {} Hz", samples.len(), from_rate, to_rate);

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, samples.len(), 1)
        .map_err(|e| AnalysisError::ProcessingError(format!("Failed to create resampler: {}", e)))?;

    let input = vec![samples.to_vec()];
    let output = resampler
        .process(&input, None)
        .map_err(|e| AnalysisError::ProcessingError(format!("Resampling failed: {}", e)))?;

    let mut mono = output.into_iter().next().unwrap_or_default();
    let expected_len = (samples.len() as f64 * ratio).round() as usize;
    mono.resize(expected_len, 0.0);
    Ok(mono)
}

fn decoding_error(message: String) -> AnalysisError {
    AnalysisError::DecodingError {
        message,
        hint: Some(CONVERSION_HINT.to_string()),
    }
}
