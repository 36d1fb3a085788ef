use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinkError {
    #[error("Bit length {0} is not a multiple of 8")]
    BitLength(usize),

    #[error("Payload value {value} does not fit a signed 8-bit integer")]
    PayloadType { value: i64 },

    #[error("Packet too short: {len} bytes, need at least {min}")]
    PacketTooShort { len: usize, min: usize },

    #[error("Invalid magic: expected {expected:02x?}, got {found:02x?}")]
    MagicMismatch { expected: [u8; 2], found: [u8; 2] },

    #[error("Packet length mismatch: header declares {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("CRC mismatch: packet carries {expected:#06x}, computed {computed:#06x}")]
    CrcMismatch { expected: u16, computed: u16 },

    #[error("Ragged feature matrix: row {row} has {len} values, expected {dim}")]
    RaggedMatrix { row: usize, len: usize, dim: usize },

    #[error("Feature matrix {n_frames}x{dim} needs {expected} values, got {actual}")]
    MatrixSize {
        n_frames: usize,
        dim: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Payload shape {n_frames}x{dim} does not match header {header_frames}x{header_dim}")]
    PayloadShape {
        n_frames: usize,
        dim: usize,
        header_frames: u16,
        header_dim: u8,
    },

    #[error("Feature matrix {n_frames}x{dim} does not fit the packet header")]
    PayloadTooLarge { n_frames: usize, dim: usize },

    #[error("Invalid quantization scale: {0}")]
    InvalidScale(String),

    #[error("Front-end error: {0}")]
    Frontend(String),
}

pub type Result<T> = std::result::Result<T, LinkError>;
