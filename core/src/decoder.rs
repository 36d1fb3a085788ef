use log::{info, warn};

use crate::config::{MatcherConfig, PacketConfig, QuantizationConfig};
use crate::error::Result;
use crate::framing::{PacketCodec, PacketHeader};
use crate::matcher::{recognize, Recognition, TemplateLibrary};
use crate::matrix::Features;
use crate::quantize::dequantize;

/// Result of a successfully validated packet
#[derive(Debug, Clone, PartialEq)]
pub struct Reception {
    pub header: PacketHeader,
    pub features: Features,
    pub recognition: Recognition,
}

/// Receiver side: packet bytes -> validated header + features -> command
pub struct Decoder {
    codec: PacketCodec,
    quantization: QuantizationConfig,
    matcher: MatcherConfig,
    templates: TemplateLibrary,
}

impl Decoder {
    pub fn new(
        packet: PacketConfig,
        quantization: QuantizationConfig,
        matcher: MatcherConfig,
        templates: TemplateLibrary,
    ) -> Self {
        Self {
            codec: PacketCodec::new(&packet),
            quantization,
            matcher,
            templates,
        }
    }

    /// Decoder with default configuration
    pub fn with_templates(templates: TemplateLibrary) -> Self {
        Self::new(
            PacketConfig::default(),
            QuantizationConfig::default(),
            MatcherConfig::default(),
            templates,
        )
    }

    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    /// Validate, dequantize and recognize one packet.
    ///
    /// Any validation failure is terminal for this packet; nothing is retried.
    pub fn decode(&self, data: &[u8]) -> Result<Reception> {
        let packet = self
            .codec
            .decode(data)
            .inspect_err(|e| warn!("dropping packet: {}", e))?;
        let scale = self.quantization.scale_from_q(packet.header.scale_q);
        let features = dequantize(&packet.payload, scale);
        let recognition = recognize(&features, &self.templates, self.matcher.band);

        info!(
            "seq={} cmd={} dist={:.2}",
            packet.header.seq, recognition.command, recognition.distance
        );
        Ok(Reception {
            header: packet.header,
            features,
            recognition,
        })
    }
}
