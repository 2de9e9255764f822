//! Implementations of the CLI subcommands.

use std::fs;
use std::path::{Path, PathBuf};

use qrwasm_codec::module::{ExternalKind, Module};
use qrwasm_codec::parse::parse_module;
use qrwasm_codec::{compress_wasm_bounded, decompress_wasm};
use qrwasm_core::error::Result;
use serde::Serialize;

use crate::utils::{format_ratio, format_size, with_extension};

/// Byte capacity of a version-40 QR code at the lowest error-correction
/// level; the default ceiling for packed payloads.
pub const QR_MAX_PAYLOAD_BYTES: usize = 2953;

/// `qrwasm pack`: compress a wasm binary into a QR-sized payload.
pub fn cmd_pack(
    input: &Path,
    output: Option<PathBuf>,
    limit: usize,
    verbose: bool,
) -> Result<()> {
    let standard = fs::read(input)?;
    let compressed = compress_wasm_bounded(&standard, limit)?;
    let output = output.unwrap_or_else(|| with_extension(input, "qrw"));
    fs::write(&output, &compressed)?;

    println!(
        "{} -> {} ({} -> {}, {})",
        input.display(),
        output.display(),
        format_size(standard.len() as u64),
        format_size(compressed.len() as u64),
        format_ratio(compressed.len() as u64, standard.len() as u64),
    );
    if verbose && limit != 0 {
        let headroom = limit - compressed.len();
        println!("  {} of QR headroom left", format_size(headroom as u64));
    }
    Ok(())
}

/// `qrwasm unpack`: restore the standard wasm binary.
pub fn cmd_unpack(input: &Path, output: Option<PathBuf>, verbose: bool) -> Result<()> {
    let compressed = fs::read(input)?;
    let standard = decompress_wasm(&compressed)?;
    let output = output.unwrap_or_else(|| with_extension(input, "wasm"));
    fs::write(&output, &standard)?;

    println!(
        "{} -> {} ({} -> {})",
        input.display(),
        output.display(),
        format_size(compressed.len() as u64),
        format_size(standard.len() as u64),
    );
    if verbose {
        let module = parse_module(&standard)?;
        println!(
            "  {} types, {} functions, {} exports",
            module.types.len(),
            module.func_count(),
            module.exports.len()
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct ExportRow {
    name: String,
    kind: &'static str,
    index: u32,
}

fn kind_label(kind: ExternalKind) -> &'static str {
    match kind {
        ExternalKind::Func => "func",
        ExternalKind::Table => "table",
        ExternalKind::Memory => "memory",
        ExternalKind::Global => "global",
    }
}

/// `qrwasm exports`: list export names, optionally as JSON.
pub fn cmd_exports(input: &Path, json: bool) -> Result<()> {
    let standard = fs::read(input)?;
    let module = parse_module(&standard)?;
    let rows: Vec<ExportRow> = module
        .exports
        .iter()
        .map(|export| ExportRow {
            name: export.name.clone(),
            kind: kind_label(export.kind),
            index: export.index,
        })
        .collect();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).expect("rows serialize")
        );
    } else {
        for row in &rows {
            println!("{:<8} {:>5}  {}", row.kind, row.index, row.name);
        }
    }
    Ok(())
}

/// `qrwasm dump`: print a wat-flavoured listing of a module.
pub fn cmd_dump(input: &Path) -> Result<()> {
    let standard = fs::read(input)?;
    let module = parse_module(&standard)?;
    print!("{}", qrwasm_codec::text::render_module(&module));
    Ok(())
}

/// `qrwasm info`: summarize a module and its projected packed size.
pub fn cmd_info(input: &Path) -> Result<()> {
    let standard = fs::read(input)?;
    let module = parse_module(&standard)?;

    println!("{}:", input.display());
    println!("  size:      {}", format_size(standard.len() as u64));
    print_counts(&module);

    match compress_wasm_bounded(&standard, 0) {
        Ok(compressed) => {
            let fits = compressed.len() <= QR_MAX_PAYLOAD_BYTES;
            println!(
                "  packed:    {} ({}) - {}",
                format_size(compressed.len() as u64),
                format_ratio(compressed.len() as u64, standard.len() as u64),
                if fits {
                    "fits in one QR code"
                } else {
                    "exceeds one QR code"
                }
            );
        }
        Err(err) => println!("  packed:    not packable ({err})"),
    }
    Ok(())
}

fn print_counts(module: &Module) {
    println!(
        "  types:     {:<6} imports:  {:<6} functions: {}",
        module.types.len(),
        module.imports.len(),
        module.functions.len()
    );
    println!(
        "  globals:   {:<6} exports:  {:<6} elements:  {}",
        module.globals.len(),
        module.exports.len(),
        module.elements.len()
    );
    let data_bytes: usize = module.data.iter().map(|segment| segment.bytes.len()).sum();
    println!(
        "  memories:  {:<6} data:     {:<6} data bytes: {}",
        module.memories.len(),
        module.data.len(),
        data_bytes
    );
    if let Some(features) = &module.target_features {
        println!("  features:  {}", features.join(", "));
    }
    if !module.customs.is_empty() {
        let names: Vec<&str> = module.customs.iter().map(|c| c.name.as_str()).collect();
        println!("  customs:   {}", names.join(", "));
    }
}
