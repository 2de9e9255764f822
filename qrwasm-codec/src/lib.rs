//! # QRWASM Codec
//!
//! Schema-driven WebAssembly compression for QR-sized payloads.
//!
//! A standard wasm binary is parsed into an in-memory module, every value in
//! it is re-encoded under the most compact representation its syntactic
//! category permits (per-category Huffman codes, grouped LEBs, fixed-width
//! fields, or nothing at all for constants the reader can restore), and the
//! result is a length-prefixed bit stream a QR code can carry. Decompression
//! reverses the mapping exactly: the decompressed bytes equal the original
//! binary.
//!
//! The public surface is three pure functions over byte vectors — see
//! [`compress_wasm`], [`decompress_wasm`], and [`scan_module_exports`] —
//! plus [`compress_wasm_bounded`] for callers that enforce a payload
//! ceiling. Everything else (QR imaging, rendering, execution) lives with
//! the host.
//!
//! ## Example
//!
//! ```
//! use qrwasm_codec::{compress_wasm, decompress_wasm};
//!
//! // () -> i32 function exporting the answer.
//! let wasm: &[u8] = &[
//!     0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00,
//!     0x01, 0x05, 0x01, 0x60, 0x00, 0x01, 0x7F,
//!     0x03, 0x02, 0x01, 0x00,
//!     0x07, 0x08, 0x01, 0x04, b'm', b'a', b'i', b'n', 0x00, 0x00,
//!     0x0A, 0x06, 0x01, 0x04, 0x00, 0x41, 0x2A, 0x0B,
//! ];
//! let packed = compress_wasm(wasm).unwrap();
//! assert_eq!(decompress_wasm(&packed).unwrap(), wasm);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod emit;
pub mod instr;
pub mod module;
pub mod opcodes;
pub mod parse;
pub mod schema;
pub mod text;
pub mod types;

mod pack;
mod unpack;

pub use qrwasm_core::error::{QrWasmError, Result};

use module::ExternalKind;

/// Compress a standard wasm binary into a length-prefixed bit stream.
///
/// The input must be canonical (minimal LEBs, ordered sections); inputs the
/// schema cannot express are refused with
/// [`QrWasmError::UnsupportedFeature`]. For every accepted input,
/// [`decompress_wasm`] restores the original bytes exactly.
pub fn compress_wasm(standard: &[u8]) -> Result<Vec<u8>> {
    let module = parse::parse_module(standard)?;
    pack::pack_module(&module)
}

/// Compress and enforce a caller-supplied payload ceiling in bytes.
///
/// A `max_len` of 0 disables the check. The QR version-40 byte ceiling the
/// host tooling uses is 2953.
pub fn compress_wasm_bounded(standard: &[u8], max_len: usize) -> Result<Vec<u8>> {
    let compressed = compress_wasm(standard)?;
    if max_len != 0 && compressed.len() > max_len {
        return Err(QrWasmError::oversize(compressed.len(), max_len));
    }
    Ok(compressed)
}

/// Decompress a stream produced by [`compress_wasm`] back into the standard
/// binary format.
pub fn decompress_wasm(compressed: &[u8]) -> Result<Vec<u8>> {
    let module = unpack::unpack_module(compressed)?;
    Ok(emit::emit_module(&module))
}

/// List the export names of a standard wasm binary.
///
/// Host tooling uses this to decide which exports to retain before handing
/// the module to the compressor; it is not part of the codec's round-trip
/// contract.
pub fn scan_module_exports(standard: &[u8]) -> Result<Vec<String>> {
    let module = parse::parse_module(standard)?;
    Ok(module
        .exports
        .iter()
        .map(|export| export.name.clone())
        .collect())
}

/// List only the function exports of a standard wasm binary.
pub fn scan_function_exports(standard: &[u8]) -> Result<Vec<String>> {
    let module = parse::parse_module(standard)?;
    Ok(module
        .exports
        .iter()
        .filter(|export| export.kind == ExternalKind::Func)
        .map(|export| export.name.clone())
        .collect())
}
