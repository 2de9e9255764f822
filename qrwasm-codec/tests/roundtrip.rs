//! End-to-end compress/decompress round-trips.

use qrwasm_codec::emit::emit_module;
use qrwasm_codec::instr::{Instr, MemArg};
use qrwasm_codec::module::*;
use qrwasm_codec::types::{BlockType, Limits, ValType};
use qrwasm_codec::{
    QrWasmError, compress_wasm, compress_wasm_bounded, decompress_wasm, scan_module_exports,
};

/// Minimal module exporting one function that returns the i32 constant 42.
const ANSWER_WASM: &[u8] = &[
    0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00, // header
    0x01, 0x05, 0x01, 0x60, 0x00, 0x01, 0x7F, // type: () -> i32
    0x03, 0x02, 0x01, 0x00, // function: uses type 0
    0x07, 0x08, 0x01, 0x04, b'm', b'a', b'i', b'n', 0x00, 0x00, // export "main"
    0x0A, 0x06, 0x01, 0x04, 0x00, 0x41, 0x2A, 0x0B, // code: i32.const 42
];

fn roundtrip(bytes: &[u8]) -> Vec<u8> {
    let compressed = compress_wasm(bytes).unwrap();
    let restored = decompress_wasm(&compressed).unwrap();
    assert_eq!(restored, bytes, "decompression must restore the input");
    compressed
}

fn roundtrip_module(module: &Module) -> Vec<u8> {
    roundtrip(&emit_module(module))
}

#[test]
fn answer_module_roundtrips_byte_exactly() {
    roundtrip(ANSWER_WASM);
}

#[test]
fn header_only_module_roundtrips() {
    roundtrip(&[0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]);
}

#[test]
fn memory_and_data_segment_roundtrip() {
    // One memory, one data segment with awkward bytes, and a body with
    // signed constant extremes.
    let module = Module {
        types: vec![FuncType::default()],
        functions: vec![0],
        memories: vec![Limits {
            min: 1,
            max: None,
            shared: false,
            memory64: false,
        }],
        code: vec![FuncBody {
            locals: vec![],
            body: vec![
                Instr::I32Const { value: -1 },
                Instr::I32Const { value: 2147483647 },
                Instr::Drop,
                Instr::Drop,
            ],
        }],
        data: vec![DataSegment {
            flags: 0,
            offset: Some(vec![Instr::I32Const { value: 0 }]),
            bytes: vec![0x00, 0xFF, 0x7F, 0x80, 0x01],
        }],
        ..Module::default()
    };
    roundtrip_module(&module);
}

#[test]
fn truncated_payload_is_corrupt() {
    let compressed = compress_wasm(ANSWER_WASM).unwrap();
    let truncated = &compressed[..compressed.len() - 1];
    match decompress_wasm(truncated) {
        Err(QrWasmError::CorruptStream { .. })
        | Err(QrWasmError::UnexpectedEnd { .. })
        | Err(QrWasmError::InvalidHuffmanCode { .. }) => {}
        other => panic!("expected a corrupt-stream error, got {other:?}"),
    }
}

#[test]
fn flipped_payload_bits_never_panic() {
    // Corruption anywhere in the stream must surface as an error value (or
    // decode to some other module), never a panic.
    let compressed = compress_wasm(ANSWER_WASM).unwrap();
    for i in 0..compressed.len() * 8 {
        let mut mutated = compressed.clone();
        mutated[i / 8] ^= 0x80 >> (i % 8);
        let _ = decompress_wasm(&mutated);
    }
}

#[test]
fn control_flow_and_calls_roundtrip() {
    let module = Module {
        types: vec![
            FuncType {
                params: vec![ValType::I32],
                results: vec![ValType::I32],
            },
            FuncType::default(),
        ],
        functions: vec![0, 1],
        exports: vec![Export {
            name: "run".into(),
            kind: ExternalKind::Func,
            index: 0,
        }],
        start: Some(1),
        code: vec![
            FuncBody {
                locals: vec![(1, ValType::I32), (2, ValType::F64)],
                body: vec![
                    Instr::Block {
                        ty: BlockType::Value(ValType::I32),
                        body: vec![
                            Instr::LocalGet { local: 0 },
                            Instr::If {
                                ty: BlockType::Empty,
                                then: vec![Instr::Br { label: 1 }],
                                els: Some(vec![Instr::Nop]),
                            },
                            Instr::Loop {
                                ty: BlockType::Empty,
                                body: vec![
                                    Instr::LocalGet { local: 1 },
                                    Instr::BrIf { label: 0 },
                                    Instr::BrTable {
                                        targets: vec![0, 1],
                                        default: 1,
                                    },
                                ],
                            },
                            Instr::I32Const { value: 7 },
                        ],
                    },
                    Instr::LocalGet { local: 0 },
                    Instr::LocalGet { local: 1 },
                    Instr::Select,
                ],
            },
            FuncBody {
                locals: vec![],
                body: vec![
                    Instr::Call { func: 0 },
                    Instr::Drop,
                    Instr::I32Const { value: 3 },
                    Instr::Numeric { op: 0x45 }, // i32.eqz
                    Instr::Drop,
                ],
            },
        ],
        ..Module::default()
    };
    roundtrip_module(&module);
}

#[test]
fn imports_globals_and_tables_roundtrip() {
    let module = Module {
        types: vec![FuncType {
            params: vec![ValType::I32, ValType::I32],
            results: vec![],
        }],
        imports: vec![
            Import {
                module: "mni".into(),
                field: "set_pixel".into(),
                desc: ImportDesc::Func(0),
            },
            Import {
                module: "env".into(),
                field: "memory".into(),
                desc: ImportDesc::Memory(Limits {
                    min: 1,
                    max: Some(4),
                    shared: false,
                    memory64: false,
                }),
            },
            Import {
                module: "env".into(),
                field: "origin".into(),
                desc: ImportDesc::Global(GlobalType {
                    content: ValType::I32,
                    mutable: false,
                }),
            },
        ],
        functions: vec![0],
        tables: vec![TableType {
            element: ValType::FuncRef,
            limits: Limits {
                min: 2,
                max: Some(2),
                shared: false,
                memory64: false,
            },
        }],
        globals: vec![
            Global {
                ty: GlobalType {
                    content: ValType::I32,
                    mutable: true,
                },
                init: vec![Instr::I32Const { value: 640 }],
            },
            Global {
                ty: GlobalType {
                    content: ValType::F64,
                    mutable: false,
                },
                init: vec![Instr::F64Const {
                    bits: (-0.0f64).to_bits(),
                }],
            },
        ],
        exports: vec![
            Export {
                name: "tbl".into(),
                kind: ExternalKind::Table,
                index: 0,
            },
            Export {
                name: "mem".into(),
                kind: ExternalKind::Memory,
                index: 0,
            },
            Export {
                name: "width".into(),
                kind: ExternalKind::Global,
                index: 1,
            },
        ],
        elements: vec![ElementSegment {
            flags: 0,
            table: 0,
            offset: Some(vec![Instr::I32Const { value: 0 }]),
            element: ValType::FuncRef,
            funcs: vec![1, 1],
            exprs: vec![],
        }],
        code: vec![FuncBody {
            locals: vec![],
            body: vec![
                Instr::GlobalGet { global: 1 },
                Instr::GlobalSet { global: 1 },
                Instr::I32Const { value: 5 },
                Instr::I32Const { value: 6 },
                Instr::Call { func: 0 },
            ],
        }],
        ..Module::default()
    };
    roundtrip_module(&module);
}

#[test]
fn float_bit_patterns_survive() {
    let patterns64 = [
        0.0f64.to_bits(),
        (-0.0f64).to_bits(),
        f64::INFINITY.to_bits(),
        f64::NEG_INFINITY.to_bits(),
        f64::NAN.to_bits(),
        1.5f64.to_bits(),
        (-12345.6789f64).to_bits(),
    ];
    let mut body = Vec::new();
    for bits in patterns64 {
        body.push(Instr::F64Const { bits });
        body.push(Instr::Drop);
    }
    for bits in [0.0f32.to_bits(), (-1.25f32).to_bits(), f32::NAN.to_bits()] {
        body.push(Instr::F32Const { bits });
        body.push(Instr::Drop);
    }
    let module = Module {
        types: vec![FuncType::default()],
        functions: vec![0],
        code: vec![FuncBody {
            locals: vec![],
            body,
        }],
        ..Module::default()
    };
    roundtrip_module(&module);
}

#[test]
fn bulk_memory_and_passive_segments_roundtrip() {
    let module = Module {
        types: vec![FuncType::default()],
        functions: vec![0],
        memories: vec![Limits {
            min: 1,
            max: Some(2),
            shared: false,
            memory64: false,
        }],
        data_count: Some(2),
        code: vec![FuncBody {
            locals: vec![],
            body: vec![
                Instr::I32Const { value: 0 },
                Instr::I32Const { value: 0 },
                Instr::I32Const { value: 4 },
                Instr::MemoryInit { data: 1 },
                Instr::DataDrop { data: 1 },
                Instr::I32Const { value: 0 },
                Instr::I32Const { value: 16 },
                Instr::I32Const { value: 8 },
                Instr::MemoryCopy,
                Instr::I32Const { value: 0 },
                Instr::I32Const { value: 0xAB },
                Instr::I32Const { value: 32 },
                Instr::MemoryFill,
                Instr::MemorySize,
                Instr::Drop,
                Instr::I32Const { value: 1 },
                Instr::MemoryGrow,
                Instr::Drop,
            ],
        }],
        data: vec![
            DataSegment {
                flags: 2,
                offset: Some(vec![Instr::I32Const { value: 0 }]),
                bytes: vec![1, 2, 3],
            },
            DataSegment {
                flags: 1,
                offset: None,
                bytes: vec![9, 8, 7, 6],
            },
        ],
        ..Module::default()
    };
    roundtrip_module(&module);
}

#[test]
fn reference_types_and_element_forms_roundtrip() {
    let module = Module {
        types: vec![FuncType::default()],
        functions: vec![0],
        tables: vec![
            TableType {
                element: ValType::FuncRef,
                limits: Limits {
                    min: 4,
                    max: None,
                    shared: false,
                    memory64: false,
                },
            },
            TableType {
                element: ValType::ExternRef,
                limits: Limits {
                    min: 0,
                    max: None,
                    shared: false,
                    memory64: false,
                },
            },
        ],
        elements: vec![
            ElementSegment {
                flags: 1,
                table: 0,
                offset: None,
                element: ValType::FuncRef,
                funcs: vec![0],
                exprs: vec![],
            },
            ElementSegment {
                flags: 2,
                table: 0,
                offset: Some(vec![Instr::I32Const { value: 1 }]),
                element: ValType::FuncRef,
                funcs: vec![0, 0],
                exprs: vec![],
            },
            ElementSegment {
                flags: 5,
                table: 0,
                offset: None,
                element: ValType::FuncRef,
                funcs: vec![],
                exprs: vec![
                    vec![Instr::RefFunc { func: 0 }],
                    vec![Instr::RefNull {
                        ty: ValType::FuncRef,
                    }],
                ],
            },
        ],
        code: vec![FuncBody {
            locals: vec![],
            body: vec![
                Instr::RefNull {
                    ty: ValType::ExternRef,
                },
                Instr::RefIsNull,
                Instr::Drop,
                Instr::I32Const { value: 0 },
                Instr::TableGet { table: 1 },
                Instr::Drop,
                Instr::I32Const { value: 2 },
                Instr::TableSize { table: 0 },
                Instr::TableInit { elem: 0, table: 0 },
                Instr::ElemDrop { elem: 0 },
            ],
        }],
        ..Module::default()
    };
    roundtrip_module(&module);
}

#[test]
fn simd_and_atomics_roundtrip() {
    let module = Module {
        types: vec![FuncType::default()],
        functions: vec![0],
        memories: vec![Limits {
            min: 1,
            max: Some(1),
            shared: true,
            memory64: false,
        }],
        code: vec![FuncBody {
            locals: vec![(1, ValType::V128)],
            body: vec![
                Instr::V128Const {
                    bytes: [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
                },
                Instr::V128Const {
                    bytes: [0xFF; 16],
                },
                Instr::I8x16Shuffle {
                    lanes: [0, 16, 1, 17, 2, 18, 3, 19, 4, 20, 5, 21, 6, 22, 7, 23],
                },
                Instr::SimdLane { op: 21, lane: 3 }, // i8x16.extract_lane_s
                Instr::Drop,
                Instr::I32Const { value: 0 },
                Instr::SimdMem {
                    op: 0, // v128.load
                    arg: MemArg { align: 4, offset: 8 },
                },
                Instr::Simd { op: 14 }, // i8x16.swizzle needs two operands; shape only
                Instr::Drop,
                Instr::AtomicFence { order: 0 },
                Instr::I32Const { value: 0 },
                Instr::AtomicMem {
                    op: 0x10, // i32.atomic.load
                    arg: MemArg { align: 2, offset: 0 },
                },
                Instr::Drop,
            ],
        }],
        ..Module::default()
    };
    roundtrip_module(&module);
}

#[test]
fn dylink_and_custom_sections_roundtrip() {
    let module = Module {
        dylink: Some(DylinkSection {
            memory_size: 65536,
            memory_alignment: 4,
            table_size: 8,
            table_alignment: 0,
            needed: vec!["libdraw.so".into()],
        }),
        types: vec![FuncType::default()],
        functions: vec![0],
        code: vec![FuncBody {
            locals: vec![],
            body: vec![Instr::Nop],
        }],
        target_features: Some(vec!["bulk-memory".into(), "simd128".into()]),
        customs: vec![CustomSection {
            name: "producers".into(),
            bytes: vec![0x01, 0x0C, b'p', b'r', b'o', b'c', b'e', b's', b's', b'e', b'd', b'-',
                b'b', b'y', 0x00],
        }],
        ..Module::default()
    };
    roundtrip_module(&module);
}

#[test]
fn typed_select_and_extended_numeric_roundtrip() {
    let module = Module {
        types: vec![FuncType {
            params: vec![],
            results: vec![ValType::F64],
        }],
        functions: vec![0],
        code: vec![FuncBody {
            locals: vec![],
            body: vec![
                Instr::F64Const {
                    bits: 2.5f64.to_bits(),
                },
                Instr::F64Const {
                    bits: 7.5f64.to_bits(),
                },
                Instr::I32Const { value: 1 },
                Instr::SelectT {
                    types: vec![ValType::F64],
                },
                Instr::TruncSat { op: 2 }, // i32.trunc_sat_f64_s
                Instr::Numeric { op: 0xC0 }, // i32.extend8_s
                Instr::Numeric { op: 0xB7 }, // f64.convert_i32_s
            ],
        }],
        ..Module::default()
    };
    roundtrip_module(&module);
}

#[test]
fn multi_value_block_types_roundtrip() {
    let module = Module {
        types: vec![
            FuncType {
                params: vec![],
                results: vec![ValType::I32, ValType::I32],
            },
            FuncType::default(),
        ],
        functions: vec![1],
        code: vec![FuncBody {
            locals: vec![],
            body: vec![
                Instr::Block {
                    ty: BlockType::Func(0),
                    body: vec![
                        Instr::I32Const { value: 1 },
                        Instr::I32Const { value: 2 },
                    ],
                },
                Instr::Drop,
                Instr::Drop,
            ],
        }],
        ..Module::default()
    };
    roundtrip_module(&module);
}

#[test]
fn compressed_is_smaller_for_repetitive_modules() {
    // A module long enough for the Huffman tables to pay for themselves.
    let mut body = Vec::new();
    for i in 0..400 {
        body.push(Instr::LocalGet { local: 0 });
        body.push(Instr::I32Const { value: i % 7 });
        body.push(Instr::Numeric { op: 0x6A }); // i32.add
        body.push(Instr::LocalSet { local: 0 });
    }
    let module = Module {
        types: vec![FuncType::default()],
        functions: vec![0],
        code: vec![FuncBody {
            locals: vec![(1, ValType::I32)],
            body,
        }],
        ..Module::default()
    };
    let standard = emit_module(&module);
    let compressed = roundtrip(&standard);
    assert!(
        compressed.len() < standard.len(),
        "{} compressed vs {} standard",
        compressed.len(),
        standard.len()
    );
}

#[test]
fn oversize_payload_is_reported() {
    match compress_wasm_bounded(ANSWER_WASM, 10) {
        Err(QrWasmError::OversizeInput { size, limit }) => {
            assert_eq!(limit, 10);
            assert!(size > 10);
        }
        other => panic!("expected an oversize error, got {other:?}"),
    }
    // 0 disables the ceiling.
    compress_wasm_bounded(ANSWER_WASM, 0).unwrap();
}

#[test]
fn export_scan_lists_names_in_order() {
    let exports = scan_module_exports(ANSWER_WASM).unwrap();
    assert_eq!(exports, vec!["main".to_string()]);
}
