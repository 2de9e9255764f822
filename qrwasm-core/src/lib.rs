//! # QRWASM Core
//!
//! Core components for the QRWASM codec.
//!
//! This crate provides the primitive layer the wasm schema codec is built
//! from:
//!
//! - [`bitstream`]: MSB-first bit-level I/O over in-memory buffers, with
//!   in-place bit moves for size-placeholder patching
//! - [`numeric`]: fixed-width, tagged, grouped-LEB and trimmed-float
//!   integer encodings
//! - [`huffman`]: frequency-driven prefix codes with a serializable header
//! - [`intlist`]: integer lists under an automatically chosen scheme
//! - [`debug`]: bit-string rendering for tests and tooling
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! QRWASM is a layered codec:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Tooling                                             │
//! │     qrwasm CLI (pack / unpack / exports / info)         │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Schema codec                                        │
//! │     wasm AST, standard binary I/O, two-pass bit packer  │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Primitives (this crate)                             │
//! │     BitWriter/BitReader, integers, Huffman, int lists   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use qrwasm_core::bitstream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_leb_unsigned(300, 7);
//! writer.write_tagged_signed(-42).unwrap();
//! let bytes = writer.finalize();
//!
//! let mut reader = BitReader::new(&bytes);
//! assert_eq!(reader.read_leb_unsigned(7).unwrap(), 300);
//! assert_eq!(reader.read_tagged_signed().unwrap(), -42);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod debug;
pub mod error;
pub mod huffman;
pub mod intlist;
pub mod numeric;

// Re-exports for convenience
pub use bitstream::{BitReader, BitWriter};
pub use error::{QrWasmError, Result};
pub use huffman::{Code, HuffmanTable, HuffmanTree};
pub use intlist::{IntegerListEncoding, ListPlan};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{BitReader, BitWriter};
    pub use crate::error::{QrWasmError, Result};
    pub use crate::huffman::{HuffmanTable, HuffmanTree};
    pub use crate::intlist::{IntegerListEncoding, ListPlan};
}
