//! Sender front-end: audio capture and feature extraction.
//!
//! Capture devices and MFCC extraction live outside this crate; they plug in
//! through [`AudioSource`] and [`FeatureExtractor`]. Only the pure
//! pre/post-processing steps are implemented here.

use log::debug;

use crate::error::Result;
use crate::matrix::Features;

/// Mono sample source (microphone, file, test fixture)
pub trait AudioSource {
    fn sample_rate(&self) -> u32;

    /// Record `duration_s` seconds of mono audio
    fn capture(&mut self, duration_s: f32) -> Result<Vec<f32>>;
}

/// Turns audio into a frame-major feature matrix (e.g. MFCC + deltas)
pub trait FeatureExtractor {
    fn extract(&self, audio: &[f32], sample_rate: u32) -> Result<Features>;
}

/// Keep the span from the first to the last sample whose magnitude exceeds
/// `threshold`. Audio with no such sample is returned unchanged.
pub fn trim_silence(audio: &[f32], threshold: f32) -> &[f32] {
    let first = audio.iter().position(|s| s.abs() > threshold);
    let last = audio.iter().rposition(|s| s.abs() > threshold);
    match (first, last) {
        (Some(first), Some(last)) => &audio[first..=last],
        _ => audio,
    }
}

/// Per-dimension zero mean / unit variance normalization
pub fn normalize_features(features: &Features) -> Features {
    let n = features.n_frames();
    let dim = features.dim();
    if n == 0 {
        return features.clone();
    }

    let mut mean = vec![0.0f64; dim];
    for row in features.rows() {
        for (m, &v) in mean.iter_mut().zip(row) {
            *m += v as f64;
        }
    }
    mean.iter_mut().for_each(|m| *m /= n as f64);

    let mut std = vec![0.0f64; dim];
    for row in features.rows() {
        for ((s, &m), &v) in std.iter_mut().zip(&mean).zip(row) {
            *s += (v as f64 - m).powi(2);
        }
    }
    std.iter_mut().for_each(|s| *s = (*s / n as f64).sqrt() + 1e-8);

    let mut col = 0;
    features.map(|&v| {
        let out = ((v as f64 - mean[col]) / std[col]) as f32;
        col = (col + 1) % dim;
        out
    })
}

/// Capture, trim silence, extract and normalize features
pub fn capture_features<S, E>(
    source: &mut S,
    extractor: &E,
    duration_s: f32,
    vad_threshold: Option<f32>,
) -> Result<Features>
where
    S: AudioSource + ?Sized,
    E: FeatureExtractor + ?Sized,
{
    let audio = source.capture(duration_s)?;
    let trimmed = match vad_threshold {
        Some(threshold) => trim_silence(&audio, threshold),
        None => &audio[..],
    };
    debug!(
        "captured {} samples, {} after trimming",
        audio.len(),
        trimmed.len()
    );
    let features = extractor.extract(trimmed, source.sample_rate())?;
    Ok(normalize_features(&features))
}
