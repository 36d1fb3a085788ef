//! Read-only configuration records shared by the sender and the receiver.
//!
//! Every record deserializes with `#[serde(default)]`, so a config file only
//! needs to name the values it overrides.

use serde::Deserialize;

use crate::error::{LinkError, Result};
use crate::{
    DEFAULT_BAND, DEFAULT_EB_N0_DB, DEFAULT_MAGIC, DEFAULT_SCALE, PROTOCOL_VERSION,
    SCALE_Q_MULTIPLIER,
};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct QuantizationConfig {
    pub scale: f32,
    pub scale_q_multiplier: u32,
}

impl QuantizationConfig {
    /// Scale as carried in the header: `round(scale * multiplier)`
    pub fn scale_q(&self) -> Result<u16> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(LinkError::InvalidScale(format!(
                "scale must be positive and finite, got {}",
                self.scale
            )));
        }
        let scaled = (self.scale as f64 * self.scale_q_multiplier as f64).round();
        if scaled < 1.0 || scaled > u16::MAX as f64 {
            return Err(LinkError::InvalidScale(format!(
                "scale {} x {} does not fit 16 bits",
                self.scale, self.scale_q_multiplier
            )));
        }
        Ok(scaled as u16)
    }

    /// Recover the float scale from a received `scale_q`
    pub fn scale_from_q(&self, scale_q: u16) -> f32 {
        if self.scale_q_multiplier == 0 {
            return 0.0;
        }
        (scale_q as f64 / self.scale_q_multiplier as f64) as f32
    }
}

impl Default for QuantizationConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            scale_q_multiplier: SCALE_Q_MULTIPLIER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PacketConfig {
    pub magic: [u8; 2],
    pub version: u8,
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            magic: *DEFAULT_MAGIC,
            version: PROTOCOL_VERSION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub eb_n0_db: f64,
    /// Fixed RNG seed for reproducible runs; `None` draws from the thread RNG
    pub seed: Option<u64>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            eb_n0_db: DEFAULT_EB_N0_DB,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Sakoe-Chiba half-width; `None` leaves the alignment unconstrained
    pub band: Option<usize>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            band: Some(DEFAULT_BAND),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub quantization: QuantizationConfig,
    pub packet: PacketConfig,
    pub channel: ChannelConfig,
    pub matcher: MatcherConfig,
}
