//! Performance benchmarks for the primitive codec layer
//!
//! This benchmark suite evaluates:
//! - Bit-level write/read throughput
//! - Grouped LEB encoding across group widths
//! - Huffman table construction and symbol decoding
//! - Integer-list scheme selection on characteristic shapes

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use qrwasm_core::bitstream::{BitReader, BitWriter};
use qrwasm_core::huffman::{HuffmanTable, HuffmanTree};
use qrwasm_core::intlist;
use std::hint::black_box;

/// Generate test data shapes for benchmarking
mod test_data {
    /// Reproducible pseudo-random values via a linear congruential generator
    pub fn random(count: usize, limit: u64) -> Vec<i64> {
        let mut data = Vec::with_capacity(count);
        let mut seed: u64 = 0x123456789ABCDEF0;
        for _ in 0..count {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            data.push(((seed >> 32) % limit) as i64);
        }
        data
    }

    /// Monotonically increasing values with small gaps (index-like)
    pub fn ascending(count: usize) -> Vec<i64> {
        let mut data = Vec::with_capacity(count);
        let mut value = 0i64;
        let mut seed: u64 = 7;
        for _ in 0..count {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            value += ((seed >> 60) + 1) as i64;
            data.push(value);
        }
        data
    }

    /// Zipf-ish opcode histogram: a few hot symbols, a long cold tail
    pub fn opcode_histogram(count: usize) -> Vec<i64> {
        let mut data = Vec::with_capacity(count);
        let mut seed: u64 = 0xBEEF;
        for _ in 0..count {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            let roll = seed >> 56;
            data.push(match roll {
                0..=127 => 0x20, // local.get
                128..=191 => 0x41, // i32.const
                192..=223 => 0x6A, // i32.add
                _ => (roll % 0xC0) as i64,
            });
        }
        data
    }
}

fn bench_bitstream(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitstream");

    for bits in [1u8, 7, 13, 32] {
        group.throughput(Throughput::Elements(10_000));
        group.bench_with_input(BenchmarkId::new("write", bits), &bits, |b, &bits| {
            b.iter(|| {
                let mut writer = BitWriter::with_capacity(10_000 * bits as usize / 8 + 1);
                for i in 0..10_000u64 {
                    writer.write_bits_unsigned(black_box(i), bits);
                }
                black_box(writer.finalize())
            })
        });
    }

    let mut writer = BitWriter::new();
    for i in 0..10_000u64 {
        writer.write_bits_unsigned(i, 13);
    }
    let bytes = writer.finalize();
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("read_13", |b| {
        b.iter(|| {
            let mut reader = BitReader::new(&bytes);
            let mut sum = 0u64;
            for _ in 0..10_000 {
                sum = sum.wrapping_add(reader.read_bits_unsigned(13).unwrap());
            }
            black_box(sum)
        })
    });

    group.finish();
}

fn bench_leb(c: &mut Criterion) {
    let mut group = c.benchmark_group("leb");
    let values = test_data::random(10_000, 1 << 20);

    for group_width in [5u8, 7] {
        group.throughput(Throughput::Elements(values.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("roundtrip", group_width),
            &group_width,
            |b, &width| {
                b.iter(|| {
                    let mut writer = BitWriter::new();
                    for &v in &values {
                        writer.write_leb_unsigned(v as u64, width);
                    }
                    let bytes = writer.finalize();
                    let mut reader = BitReader::new(&bytes);
                    let mut sum = 0u64;
                    for _ in 0..values.len() {
                        sum = sum.wrapping_add(reader.read_leb_unsigned(width).unwrap());
                    }
                    black_box(sum)
                })
            },
        );
    }

    group.finish();
}

fn bench_huffman(c: &mut Criterion) {
    let mut group = c.benchmark_group("huffman");
    let observed = test_data::opcode_histogram(10_000);

    group.bench_function("build_table", |b| {
        b.iter(|| black_box(HuffmanTable::from_values(black_box(&observed)).unwrap()))
    });

    let table = HuffmanTable::from_values(&observed).unwrap();
    let mut writer = BitWriter::new();
    table.write_header(&mut writer).unwrap();
    for &v in &observed {
        table.encode_value(&mut writer, v).unwrap();
    }
    let bytes = writer.finalize();

    group.throughput(Throughput::Elements(observed.len() as u64));
    group.bench_function("decode_stream", |b| {
        b.iter(|| {
            let mut reader = BitReader::new(&bytes);
            let tree = HuffmanTree::read_header(&mut reader).unwrap();
            let mut sum = 0i64;
            for _ in 0..observed.len() {
                sum = sum.wrapping_add(tree.decode_value(&mut reader).unwrap());
            }
            black_box(sum)
        })
    });

    group.finish();
}

fn bench_intlist(c: &mut Criterion) {
    let mut group = c.benchmark_group("intlist");

    let shapes = [
        ("random", test_data::random(2_000, 1 << 16)),
        ("ascending", test_data::ascending(2_000)),
    ];

    for (name, data) in &shapes {
        group.throughput(Throughput::Elements(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("write", name), data, |b, data| {
            b.iter(|| {
                let mut writer = BitWriter::new();
                intlist::write_list(&mut writer, black_box(data)).unwrap();
                black_box(writer.finalize())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_bitstream,
    bench_leb,
    bench_huffman,
    bench_intlist
);
criterion_main!(benches);
