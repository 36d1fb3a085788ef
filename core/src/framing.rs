use log::debug;

use crate::config::PacketConfig;
use crate::error::{LinkError, Result};
use crate::matrix::QuantizedFeatures;
use crate::{CRC_SIZE, HEADER_SIZE, MIN_PACKET_SIZE};

/// Message type for a recognized-command feature packet
pub const MSG_TYPE_COMMAND: u8 = 0;

/// CRC-16-CCITT (init 0xFFFF, poly 0x1021, no reflection, no final XOR)
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u32 = 0xFFFF;
    for &byte in data {
        crc ^= (byte as u32) << 8;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x10000 != 0 {
                crc ^= 0x1021;
            }
            crc &= 0xFFFF;
        }
    }
    crc as u16
}

/// Header fields following the 2-byte magic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub version: u8,
    pub msg_type: u8,
    pub seq: u16,
    pub cmd_id: u8,
    pub n_frames: u16,
    pub dim: u8,
    /// Quantization scale times the configured multiplier
    pub scale_q: u16,
}

impl PacketHeader {
    pub fn payload_size(&self) -> usize {
        self.n_frames as usize * self.dim as usize
    }

    fn write(&self, magic: [u8; 2], out: &mut Vec<u8>) {
        out.extend_from_slice(&magic);
        out.push(self.version);
        out.push(self.msg_type);
        out.extend_from_slice(&self.seq.to_be_bytes());
        out.push(self.cmd_id);
        out.extend_from_slice(&self.n_frames.to_be_bytes());
        out.push(self.dim);
        out.extend_from_slice(&self.scale_q.to_be_bytes());
    }

    /// Parse the fields after the magic. `data` must hold at least `HEADER_SIZE` bytes.
    fn read(data: &[u8]) -> Self {
        Self {
            version: data[2],
            msg_type: data[3],
            seq: u16::from_be_bytes([data[4], data[5]]),
            cmd_id: data[6],
            n_frames: u16::from_be_bytes([data[7], data[8]]),
            dim: data[9],
            scale_q: u16::from_be_bytes([data[10], data[11]]),
        }
    }
}

/// A validated packet
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: QuantizedFeatures,
    pub crc: u16,
}

pub struct PacketCodec {
    magic: [u8; 2],
}

impl PacketCodec {
    pub fn new(config: &PacketConfig) -> Self {
        Self {
            magic: config.magic,
        }
    }

    pub fn magic(&self) -> [u8; 2] {
        self.magic
    }

    /// Serialize header + payload and append the CRC-16 of both
    pub fn encode(&self, header: &PacketHeader, payload: &QuantizedFeatures) -> Result<Vec<u8>> {
        if payload.n_frames() != header.n_frames as usize || payload.dim() != header.dim as usize
        {
            return Err(LinkError::PayloadShape {
                n_frames: payload.n_frames(),
                dim: payload.dim(),
                header_frames: header.n_frames,
                header_dim: header.dim,
            });
        }

        let mut encoded = Vec::with_capacity(HEADER_SIZE + header.payload_size() + CRC_SIZE);
        header.write(self.magic, &mut encoded);
        encoded.extend(payload.as_slice().iter().map(|&v| v as u8));

        let crc = crc16(&encoded);
        encoded.extend_from_slice(&crc.to_be_bytes());

        debug!(
            "encoded packet seq={} {}x{} ({} bytes, crc {:#06x})",
            header.seq,
            header.n_frames,
            header.dim,
            encoded.len(),
            crc
        );
        Ok(encoded)
    }

    /// Validate and parse a packet.
    ///
    /// Checks run in a fixed order and the first failure is returned: size,
    /// magic, declared length, then CRC. A garbled header is therefore
    /// reported separately from a well-formed packet with a corrupted body.
    pub fn decode(&self, data: &[u8]) -> Result<Packet> {
        self.decode_inner(data).inspect_err(|e| debug!("rejected packet: {}", e))
    }

    fn decode_inner(&self, data: &[u8]) -> Result<Packet> {
        if data.len() < MIN_PACKET_SIZE {
            return Err(LinkError::PacketTooShort {
                len: data.len(),
                min: MIN_PACKET_SIZE,
            });
        }

        let found = [data[0], data[1]];
        if found != self.magic {
            return Err(LinkError::MagicMismatch {
                expected: self.magic,
                found,
            });
        }

        let header = PacketHeader::read(data);
        let payload_end = HEADER_SIZE + header.payload_size();
        if data.len() < payload_end + CRC_SIZE {
            return Err(LinkError::LengthMismatch {
                expected: payload_end + CRC_SIZE,
                actual: data.len(),
            });
        }

        let expected = u16::from_be_bytes([data[payload_end], data[payload_end + 1]]);
        let computed = crc16(&data[..payload_end]);
        if expected != computed {
            return Err(LinkError::CrcMismatch { expected, computed });
        }

        let values = data[HEADER_SIZE..payload_end]
            .iter()
            .map(|&b| b as i8)
            .collect();
        let payload =
            QuantizedFeatures::new(header.n_frames as usize, header.dim as usize, values)?;

        debug!(
            "decoded packet seq={} {}x{}",
            header.seq, header.n_frames, header.dim
        );
        Ok(Packet {
            header,
            payload,
            crc: computed,
        })
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new(&PacketConfig::default())
    }
}

/// Encode with the default magic
pub fn encode_packet(header: &PacketHeader, payload: &QuantizedFeatures) -> Result<Vec<u8>> {
    PacketCodec::default().encode(header, payload)
}

/// Decode with the default magic
pub fn decode_packet(data: &[u8]) -> Result<(PacketHeader, QuantizedFeatures)> {
    PacketCodec::default()
        .decode(data)
        .map(|packet| (packet.header, packet.payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> PacketHeader {
        PacketHeader {
            version: 1,
            msg_type: MSG_TYPE_COMMAND,
            seq: 1,
            cmd_id: 0,
            n_frames: 2,
            dim: 3,
            scale_q: 100,
        }
    }

    fn sample_payload() -> QuantizedFeatures {
        QuantizedFeatures::from_rows(vec![vec![1, -2, 3], vec![4, -5, 6]]).unwrap()
    }

    #[test]
    fn test_crc16_check_value() {
        // CRC-16/CCITT-FALSE check value
        assert_eq!(crc16(b"123456789"), 0x29B1);
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_crc16_detects_single_bit_flips() {
        let data = b"narrowband voice link".to_vec();
        let reference = crc16(&data);
        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut flipped = data.clone();
                flipped[byte] ^= 1 << bit;
                assert_ne!(crc16(&flipped), reference, "flip at {}:{}", byte, bit);
            }
        }
    }

    #[test]
    fn test_wire_layout() {
        let encoded = encode_packet(&sample_header(), &sample_payload()).unwrap();
        assert_eq!(encoded.len(), HEADER_SIZE + 6 + CRC_SIZE);
        assert_eq!(
            &encoded[..HEADER_SIZE],
            &[b'V', b'T', 1, 0, 0, 1, 0, 0, 2, 3, 0, 100]
        );
        assert_eq!(&encoded[HEADER_SIZE..HEADER_SIZE + 6], &[1, 0xFE, 3, 4, 0xFB, 6]);
        let crc = crc16(&encoded[..HEADER_SIZE + 6]);
        assert_eq!(&encoded[HEADER_SIZE + 6..], &crc.to_be_bytes());
    }

    #[test]
    fn test_packet_encode_decode() {
        let encoded = encode_packet(&sample_header(), &sample_payload()).unwrap();
        let (header, payload) = decode_packet(&encoded).unwrap();
        assert_eq!(header, sample_header());
        assert_eq!(payload, sample_payload());
    }

    #[test]
    fn test_payload_bit_flip_is_crc_mismatch() {
        let encoded = encode_packet(&sample_header(), &sample_payload()).unwrap();
        for offset in HEADER_SIZE..HEADER_SIZE + 6 {
            let mut corrupted = encoded.clone();
            corrupted[offset] ^= 0x10;
            match decode_packet(&corrupted) {
                Err(LinkError::CrcMismatch { .. }) => {}
                other => panic!("Expected CrcMismatch, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_trailer_corruption_is_crc_mismatch() {
        let mut encoded = encode_packet(&sample_header(), &sample_payload()).unwrap();
        let last = encoded.len() - 1;
        encoded[last] ^= 0x01;
        assert!(matches!(
            decode_packet(&encoded),
            Err(LinkError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_packet_too_short() {
        let encoded = encode_packet(&sample_header(), &sample_payload()).unwrap();
        for len in 0..MIN_PACKET_SIZE {
            assert_eq!(
                decode_packet(&encoded[..len]),
                Err(LinkError::PacketTooShort {
                    len,
                    min: MIN_PACKET_SIZE
                })
            );
        }
    }

    #[test]
    fn test_magic_mismatch_even_with_valid_crc() {
        let mut encoded = encode_packet(&sample_header(), &sample_payload()).unwrap();
        encoded[0] = b'X';
        let payload_end = encoded.len() - CRC_SIZE;
        let crc = crc16(&encoded[..payload_end]);
        encoded[payload_end..].copy_from_slice(&crc.to_be_bytes());

        assert_eq!(
            decode_packet(&encoded),
            Err(LinkError::MagicMismatch {
                expected: *b"VT",
                found: *b"XT"
            })
        );
    }

    #[test]
    fn test_declared_length_beyond_data() {
        let mut encoded = encode_packet(&sample_header(), &sample_payload()).unwrap();
        // Claim 200 frames
        encoded[7] = 0;
        encoded[8] = 200;
        assert_eq!(
            decode_packet(&encoded),
            Err(LinkError::LengthMismatch {
                expected: HEADER_SIZE + 600 + CRC_SIZE,
                actual: HEADER_SIZE + 6 + CRC_SIZE
            })
        );
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut encoded = encode_packet(&sample_header(), &sample_payload()).unwrap();
        encoded.extend_from_slice(&[0xAA, 0xBB]);
        let (header, payload) = decode_packet(&encoded).unwrap();
        assert_eq!(header, sample_header());
        assert_eq!(payload, sample_payload());
    }

    #[test]
    fn test_empty_payload() {
        let header = PacketHeader {
            n_frames: 0,
            dim: 13,
            ..sample_header()
        };
        let payload = QuantizedFeatures::new(0, 13, Vec::new()).unwrap();
        let encoded = encode_packet(&header, &payload).unwrap();
        assert_eq!(encoded.len(), MIN_PACKET_SIZE);
        let (decoded_header, decoded_payload) = decode_packet(&encoded).unwrap();
        assert_eq!(decoded_header, header);
        assert!(decoded_payload.is_empty());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let header = PacketHeader {
            n_frames: 3,
            ..sample_header()
        };
        assert!(matches!(
            encode_packet(&header, &sample_payload()),
            Err(LinkError::PayloadShape { .. })
        ));
    }

    #[test]
    fn test_custom_magic() {
        let codec = PacketCodec::new(&PacketConfig {
            magic: *b"QQ",
            version: 1,
        });
        let encoded = codec.encode(&sample_header(), &sample_payload()).unwrap();
        assert_eq!(&encoded[..2], b"QQ");
        assert!(codec.decode(&encoded).is_ok());
        assert!(matches!(
            decode_packet(&encoded),
            Err(LinkError::MagicMismatch { .. })
        ));
    }
}
