use crate::config::{PacketConfig, QuantizationConfig};
use crate::error::{LinkError, Result};
use crate::framing::{PacketCodec, PacketHeader, MSG_TYPE_COMMAND};
use crate::matrix::{Features, QuantizedFeatures};
use crate::quantize::quantize;

/// Sender side: float features -> quantized payload -> packet bytes
pub struct Encoder {
    codec: PacketCodec,
    packet: PacketConfig,
    quantization: QuantizationConfig,
}

impl Encoder {
    /// Fails if the configured scale cannot be carried in the header
    pub fn new(packet: PacketConfig, quantization: QuantizationConfig) -> Result<Self> {
        quantization.scale_q()?;
        Ok(Self {
            codec: PacketCodec::new(&packet),
            packet,
            quantization,
        })
    }

    /// Quantize and packetize one utterance
    pub fn encode(&self, features: &Features, seq: u16, cmd_id: u8) -> Result<Vec<u8>> {
        let quantized = quantize(features, self.quantization.scale);
        self.encode_quantized(&quantized, seq, cmd_id)
    }

    /// Packetize features that are already in payload form
    pub fn encode_quantized(
        &self,
        quantized: &QuantizedFeatures,
        seq: u16,
        cmd_id: u8,
    ) -> Result<Vec<u8>> {
        let header = self.header_for(quantized, seq, cmd_id)?;
        self.codec.encode(&header, quantized)
    }

    fn header_for(
        &self,
        payload: &QuantizedFeatures,
        seq: u16,
        cmd_id: u8,
    ) -> Result<PacketHeader> {
        let too_large = || LinkError::PayloadTooLarge {
            n_frames: payload.n_frames(),
            dim: payload.dim(),
        };
        Ok(PacketHeader {
            version: self.packet.version,
            msg_type: MSG_TYPE_COMMAND,
            seq,
            cmd_id,
            n_frames: u16::try_from(payload.n_frames()).map_err(|_| too_large())?,
            dim: u8::try_from(payload.dim()).map_err(|_| too_large())?,
            scale_q: self.quantization.scale_q()?,
        })
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self {
            codec: PacketCodec::default(),
            packet: PacketConfig::default(),
            quantization: QuantizationConfig::default(),
        }
    }
}
