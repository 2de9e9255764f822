//! Compress/decompress benchmarks over synthetic modules
//!
//! Measures the full pipeline (strict parse, two-pass pack, unpack, emit) on
//! module shapes typical of small drawing programs.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use qrwasm_codec::emit::emit_module;
use qrwasm_codec::instr::Instr;
use qrwasm_codec::module::{Export, ExternalKind, FuncBody, FuncType, Module};
use qrwasm_codec::types::ValType;
use qrwasm_codec::{compress_wasm, decompress_wasm};
use std::hint::black_box;

/// A loop-heavy module with `len` arithmetic instructions.
fn arithmetic_module(len: usize) -> Vec<u8> {
    let mut body = Vec::new();
    let mut seed = 0x5EEDu64;
    for _ in 0..len {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        body.push(Instr::LocalGet { local: 0 });
        body.push(Instr::I32Const {
            value: (seed >> 48) as i32 % 256,
        });
        body.push(Instr::Numeric {
            op: [0x6A, 0x6B, 0x6C, 0x71][(seed >> 32) as usize % 4],
        });
        body.push(Instr::LocalSet { local: 0 });
    }
    let module = Module {
        types: vec![FuncType::default()],
        functions: vec![0],
        exports: vec![Export {
            name: "draw".into(),
            kind: ExternalKind::Func,
            index: 0,
        }],
        code: vec![FuncBody {
            locals: vec![(1, ValType::I32)],
            body,
        }],
        ..Module::default()
    };
    emit_module(&module)
}

fn bench_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("roundtrip");

    for len in [100usize, 400, 1600] {
        let wasm = arithmetic_module(len);
        group.throughput(Throughput::Bytes(wasm.len() as u64));
        group.bench_with_input(BenchmarkId::new("compress", len), &wasm, |b, wasm| {
            b.iter(|| black_box(compress_wasm(black_box(wasm)).unwrap()))
        });

        let compressed = compress_wasm(&wasm).unwrap();
        group.bench_with_input(
            BenchmarkId::new("decompress", len),
            &compressed,
            |b, compressed| b.iter(|| black_box(decompress_wasm(black_box(compressed)).unwrap())),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_roundtrip);
criterion_main!(benches);
