//! Narrowband voice-command link
//!
//! Quantized acoustic features are framed into a CRC-protected packet, sent
//! through a simulated BPSK/AWGN channel, validated on receipt and matched
//! against enrolled command templates with banded DTW.

pub mod error;
pub mod config;
pub mod matrix;
pub mod channel;
pub mod framing;
pub mod quantize;
pub mod matcher;
pub mod frontend;
pub mod encoder;
pub mod decoder;

pub use channel::{simulate_channel, transmit_with_rng};
pub use config::{ChannelConfig, LinkConfig, MatcherConfig, PacketConfig, QuantizationConfig};
pub use decoder::{Decoder, Reception};
pub use encoder::Encoder;
pub use error::{LinkError, Result};
pub use framing::{decode_packet, encode_packet, crc16, Packet, PacketCodec, PacketHeader};
pub use matcher::{dtw_distance, recognize, Recognition, TemplateLibrary};
pub use matrix::{FeatureMatrix, Features, QuantizedFeatures};
pub use quantize::{dequantize, quantize};

// Packet layout
pub const HEADER_SIZE: usize = 12; // magic(2) version(1) msg_type(1) seq(2) cmd_id(1) n_frames(2) dim(1) scale_q(2)
pub const CRC_SIZE: usize = 2;
pub const MIN_PACKET_SIZE: usize = HEADER_SIZE + CRC_SIZE;
pub const DEFAULT_MAGIC: &[u8; 2] = b"VT";
pub const PROTOCOL_VERSION: u8 = 1;

// Quantization
pub const DEFAULT_SCALE: f32 = 0.1;
pub const SCALE_Q_MULTIPLIER: u32 = 1000;

// Channel / recognition
pub const DEFAULT_EB_N0_DB: f64 = 10.0;
pub const DEFAULT_BAND: usize = 40;
pub const UNKNOWN_COMMAND: &str = "unknown";
