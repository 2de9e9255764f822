//! Error types for QRWASM operations.
//!
//! Every public operation in the workspace returns [`Result`]. The variants
//! fall into three kinds the codec surfaces to hosts: corrupt-stream errors
//! (self-inconsistent compressed data), unsupported-feature errors (valid
//! wasm the schema does not enumerate), and oversize errors (the compressed
//! payload exceeds the caller's ceiling).

use std::io;
use thiserror::Error;

/// The main error type for QRWASM operations.
#[derive(Debug, Error)]
pub enum QrWasmError {
    /// I/O error from underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Self-inconsistent data in a compressed or standard stream.
    #[error("Corrupt stream at bit {bit_position}: {message}")]
    CorruptStream {
        /// Bit offset where the inconsistency was first detected.
        bit_position: u64,
        /// Description of the inconsistency.
        message: String,
    },

    /// A read ran past the declared payload window.
    #[error("Unexpected end of stream at bit {bit_position}: needed {needed} more bits")]
    UnexpectedEnd {
        /// Bit offset of the failed read.
        bit_position: u64,
        /// Number of bits that were requested but not available.
        needed: u64,
    },

    /// Invalid Huffman code encountered during decoding.
    #[error("Invalid Huffman code at bit position {bit_position}")]
    InvalidHuffmanCode {
        /// Bit position where the undefined prefix was found.
        bit_position: u64,
    },

    /// The input uses a construct the compression schema does not enumerate.
    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature {
        /// The construct that cannot be represented.
        feature: String,
    },

    /// Compressed output exceeds the caller-supplied ceiling.
    #[error("Compressed payload is {size} bytes, exceeding the limit of {limit}")]
    OversizeInput {
        /// Size of the compressed payload.
        size: usize,
        /// Maximum the caller allows.
        limit: usize,
    },

    /// Invalid magic number in a standard wasm header.
    #[error("Invalid magic number: expected {expected:02x?}, found {found:02x?}")]
    InvalidMagic {
        /// Expected magic bytes.
        expected: Vec<u8>,
        /// Actual magic bytes found.
        found: Vec<u8>,
    },
}

/// Result type alias for QRWASM operations.
pub type Result<T> = std::result::Result<T, QrWasmError>;

impl QrWasmError {
    /// Create a corrupt stream error.
    pub fn corrupt(bit_position: u64, message: impl Into<String>) -> Self {
        Self::CorruptStream {
            bit_position,
            message: message.into(),
        }
    }

    /// Create an unexpected end of stream error.
    pub fn unexpected_end(bit_position: u64, needed: u64) -> Self {
        Self::UnexpectedEnd {
            bit_position,
            needed,
        }
    }

    /// Create an invalid Huffman code error.
    pub fn invalid_huffman(bit_position: u64) -> Self {
        Self::InvalidHuffmanCode { bit_position }
    }

    /// Create an unsupported feature error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            feature: feature.into(),
        }
    }

    /// Create an oversize error.
    pub fn oversize(size: usize, limit: usize) -> Self {
        Self::OversizeInput { size, limit }
    }

    /// Create an invalid magic error.
    pub fn invalid_magic(expected: impl Into<Vec<u8>>, found: impl Into<Vec<u8>>) -> Self {
        Self::InvalidMagic {
            expected: expected.into(),
            found: found.into(),
        }
    }
}
