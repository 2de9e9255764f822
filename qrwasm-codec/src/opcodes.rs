//! Binary-format constants: section ids, type codes, and opcodes.

/// Standard wasm magic bytes.
pub const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];
/// Standard wasm version field.
pub const VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Section ids.
#[allow(missing_docs)]
pub mod section {
    pub const CUSTOM: u8 = 0;
    pub const TYPE: u8 = 1;
    pub const IMPORT: u8 = 2;
    pub const FUNCTION: u8 = 3;
    pub const TABLE: u8 = 4;
    pub const MEMORY: u8 = 5;
    pub const GLOBAL: u8 = 6;
    pub const EXPORT: u8 = 7;
    pub const START: u8 = 8;
    pub const ELEMENT: u8 = 9;
    pub const CODE: u8 = 10;
    pub const DATA: u8 = 11;
    pub const DATA_COUNT: u8 = 12;
    pub const TAG: u8 = 13;
}

/// Signed type codes as they appear in the binary format.
#[allow(missing_docs)]
pub mod type_code {
    pub const I32: i64 = -0x01;
    pub const I64: i64 = -0x02;
    pub const F32: i64 = -0x03;
    pub const F64: i64 = -0x04;
    pub const V128: i64 = -0x05;
    pub const FUNCREF: i64 = -0x10;
    pub const EXTERNREF: i64 = -0x11;
    /// Function type constructor in the type section.
    pub const FUNC: i64 = -0x20;
    /// Empty block type.
    pub const EMPTY_BLOCK: i64 = -0x40;
}

/// Limits flag bits (shared between memories and tables).
#[allow(missing_docs)]
pub mod limits {
    pub const HAS_MAX: u8 = 1 << 0;
    pub const SHARED: u8 = 1 << 1;
    pub const MEMORY64: u8 = 1 << 2;
}

/// Single-byte opcodes.
#[allow(missing_docs)]
pub mod op {
    pub const UNREACHABLE: u8 = 0x00;
    pub const NOP: u8 = 0x01;
    pub const BLOCK: u8 = 0x02;
    pub const LOOP: u8 = 0x03;
    pub const IF: u8 = 0x04;
    pub const ELSE: u8 = 0x05;
    pub const END: u8 = 0x0B;
    pub const BR: u8 = 0x0C;
    pub const BR_IF: u8 = 0x0D;
    pub const BR_TABLE: u8 = 0x0E;
    pub const RETURN: u8 = 0x0F;
    pub const CALL: u8 = 0x10;
    pub const CALL_INDIRECT: u8 = 0x11;
    pub const DROP: u8 = 0x1A;
    pub const SELECT: u8 = 0x1B;
    pub const SELECT_T: u8 = 0x1C;
    pub const LOCAL_GET: u8 = 0x20;
    pub const LOCAL_SET: u8 = 0x21;
    pub const LOCAL_TEE: u8 = 0x22;
    pub const GLOBAL_GET: u8 = 0x23;
    pub const GLOBAL_SET: u8 = 0x24;
    pub const TABLE_GET: u8 = 0x25;
    pub const TABLE_SET: u8 = 0x26;
    /// First of the contiguous load opcodes (`i32.load`).
    pub const LOAD_FIRST: u8 = 0x28;
    /// Last of the contiguous load opcodes (`i64.load32_u`).
    pub const LOAD_LAST: u8 = 0x35;
    /// First of the contiguous store opcodes (`i32.store`).
    pub const STORE_FIRST: u8 = 0x36;
    /// Last of the contiguous store opcodes (`i64.store32`).
    pub const STORE_LAST: u8 = 0x3E;
    pub const MEMORY_SIZE: u8 = 0x3F;
    pub const MEMORY_GROW: u8 = 0x40;
    pub const I32_CONST: u8 = 0x41;
    pub const I64_CONST: u8 = 0x42;
    pub const F32_CONST: u8 = 0x43;
    pub const F64_CONST: u8 = 0x44;
    /// First immediate-free numeric opcode (`i32.eqz`).
    pub const NUMERIC_FIRST: u8 = 0x45;
    /// Last immediate-free numeric opcode (`i32.extend16_s` block end).
    pub const NUMERIC_LAST: u8 = 0xC4;
    pub const REF_NULL: u8 = 0xD0;
    pub const REF_IS_NULL: u8 = 0xD1;
    pub const REF_FUNC: u8 = 0xD2;
    pub const MISC_PREFIX: u8 = 0xFC;
    pub const SIMD_PREFIX: u8 = 0xFD;
    pub const ATOMIC_PREFIX: u8 = 0xFE;
}

/// Sub-opcodes behind the 0xFC misc prefix.
#[allow(missing_docs)]
pub mod misc {
    /// Saturating truncations occupy 0..=7.
    pub const TRUNC_SAT_LAST: u32 = 7;
    pub const MEMORY_INIT: u32 = 8;
    pub const DATA_DROP: u32 = 9;
    pub const MEMORY_COPY: u32 = 10;
    pub const MEMORY_FILL: u32 = 11;
    pub const TABLE_INIT: u32 = 12;
    pub const ELEM_DROP: u32 = 13;
    pub const TABLE_COPY: u32 = 14;
    pub const TABLE_GROW: u32 = 15;
    pub const TABLE_SIZE: u32 = 16;
    pub const TABLE_FILL: u32 = 17;
}

/// Sub-opcodes behind the 0xFD SIMD prefix that carry immediates.
#[allow(missing_docs)]
pub mod simd {
    /// `v128.load` .. `v128.load64_splat`.
    pub const LOAD_FIRST: u32 = 0;
    pub const LOAD_LAST: u32 = 10;
    pub const STORE: u32 = 11;
    pub const V128_CONST: u32 = 12;
    pub const I8X16_SHUFFLE: u32 = 13;
    /// `i8x16.extract_lane_s` .. `f64x2.replace_lane`.
    pub const LANE_FIRST: u32 = 21;
    pub const LANE_LAST: u32 = 34;
    /// `v128.load8_lane` .. `v128.store64_lane`.
    pub const MEM_LANE_FIRST: u32 = 84;
    pub const MEM_LANE_LAST: u32 = 91;
    pub const LOAD32_ZERO: u32 = 92;
    pub const LOAD64_ZERO: u32 = 93;
    /// Highest immediate-free SIMD sub-opcode.
    pub const PLAIN_LAST: u32 = 255;
}

/// Sub-opcodes behind the 0xFE atomic prefix.
#[allow(missing_docs)]
pub mod atomic {
    pub const NOTIFY: u32 = 0x00;
    pub const FENCE: u32 = 0x03;
    /// Highest memory-access atomic sub-opcode (`i64.atomic.rmw32.cmpxchg_u`).
    pub const MEM_LAST: u32 = 0x4E;
}
