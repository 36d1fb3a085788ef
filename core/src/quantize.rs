//! Lossy float <-> int8 feature conversion.
//!
//! Values round half to even before clamping to `[-128, 127]`, so anything
//! beyond `[-128 * scale, 127 * scale]` saturates.

use crate::error::{LinkError, Result};
use crate::matrix::{FeatureMatrix, Features, QuantizedFeatures};

pub fn quantize(features: &Features, scale: f32) -> QuantizedFeatures {
    features.map(|&v| (v / scale).round_ties_even().clamp(-128.0, 127.0) as i8)
}

pub fn dequantize(quantized: &QuantizedFeatures, scale: f32) -> Features {
    quantized.map(|&v| v as f32 * scale)
}

/// Convert externally supplied integer rows into a payload matrix
pub fn quantized_from_values(rows: Vec<Vec<i64>>) -> Result<QuantizedFeatures> {
    let matrix = FeatureMatrix::from_rows(rows)?;
    let values = matrix
        .as_slice()
        .iter()
        .map(|&value| i8::try_from(value).map_err(|_| LinkError::PayloadType { value }))
        .collect::<Result<Vec<i8>>>()?;
    FeatureMatrix::new(matrix.n_frames(), matrix.dim(), values)
}
