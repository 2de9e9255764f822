//! The compression schema: every syntactic position in the supported wasm
//! grammar, and the policy each one is written under.
//!
//! The schema is a process-wide constant shared by the packer and the
//! unpacker; the two sides must agree on it bit for bit. Huffman-coded
//! categories each get their own table, serialized at the head of the stream
//! in [`HUFFMAN_KINDS`] order — changing that order is a format break.

/// How a category is represented in the compressed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Per-category Huffman code built from pass-1 observations.
    Huffman,
    /// Unsigned grouped LEB with [`WASM_LEB_GROUP`]-bit chunks.
    Leb,
    /// Exactly this many bits, unsigned.
    Fixed(u8),
    /// Not written; restored from a known constant on read.
    Elided,
    /// A single bit.
    Bool1,
    /// One raw byte.
    Raw8,
}

/// Every value position the codec distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    // Counts: small, used once or twice per module, plain LEB.
    /// Number of entries in the type section.
    TypeCount,
    /// Number of imports.
    ImportCount,
    /// Number of defined functions.
    FunctionCount,
    /// Number of defined tables.
    TableCount,
    /// Number of defined memories.
    MemoryCount,
    /// Number of defined globals.
    GlobalCount,
    /// Number of exports.
    ExportCount,
    /// Number of element segments.
    ElementSegmentCount,
    /// Number of data segments.
    DataSegmentCount,
    /// The data-count section's declared count.
    DataCount,
    /// Number of function bodies.
    CodeCount,
    /// Number of local declaration runs in a body.
    LocalRunCount,
    /// Length of one local declaration run.
    LocalRunLength,
    /// A local variable index.
    LocalIndex,
    /// Number of target features.
    FeatureCount,
    /// Number of needed dynamic libraries.
    NeededDynlibCount,
    /// One of the four dylink size/alignment fields.
    DylinkField,

    // Huffman-coded categories, one table per kind.
    /// A single-byte opcode (including the 0xFC/0xFD/0xFE prefixes).
    AstOp,
    /// A sub-opcode behind a prefix byte.
    AstOpExt,
    /// A signed type code: value types, block types, heap types, the
    /// function type constructor.
    TypeCode,
    /// A function index.
    FunctionIndex,
    /// A type index.
    TypeIndex,
    /// A table index.
    TableIndex,
    /// A global index.
    GlobalIndex,
    /// An element segment index.
    ElementSegmentIndex,
    /// A data segment index.
    DataSegmentIndex,
    /// A parameter count in a signature.
    ParamCount,
    /// A result count in a signature.
    ResultCount,
    /// A branch depth.
    BreakIndex,
    /// Number of `br_table` targets.
    SwitchTargetCount,
    /// Number of explicit `select` result types.
    SelectTypeCount,
    /// log2 alignment of a memory access.
    MemoryAccessAlignment,
    /// Constant offset of a memory access.
    MemoryAccessOffset,
    /// `i32.const` literal.
    ConstI32,
    /// `i64.const` literal.
    ConstI64,
    /// `f32.const` bit pattern.
    ConstF32,
    /// `f64.const` bit pattern (sign-complement mapped into `i64`).
    ConstF64,
    /// `atomic.fence` ordering byte.
    AtomicFenceOrder,
    /// Number of items in an element segment.
    ElementSegmentSize,
    /// Length of an inline buffer: names and byte payloads.
    InlineBufferSize,

    // Elided: restored from constants on read.
    /// The wasm magic bytes.
    Magic,
    /// The wasm version field.
    Version,
    /// A memory index (0 in the supported single-memory grammar).
    MemoryIndex,
    /// The funcref element-kind byte.
    ElemKindFuncRef,
    /// The reserved `memory.size` flag byte.
    MemorySizeFlag,
    /// The reserved `memory.grow` flag byte.
    MemoryGrowFlag,
    /// The `+` target-feature prefix.
    FeaturePrefix,

    // Single-bit and fixed-width fields.
    /// Global mutability.
    Mutability,
    /// Section kind tag.
    SectionKind,
    /// Memory/table limits and segment flag fields.
    SegmentFlags,
    /// Import/export kind tag.
    ExternalKind,
    /// A SIMD lane index.
    SimdLane,

    // Raw byte runs.
    /// A byte of a name or inline string.
    StringByte,
    /// A byte of a data segment payload.
    DataSegmentByte,
    /// A byte of an opaque custom section payload.
    UserSectionByte,
    /// A byte of a `v128.const` literal.
    V128Byte,
}

impl ValueKind {
    /// The policy this category is written under.
    pub fn policy(self) -> Policy {
        use ValueKind::*;
        match self {
            TypeCount | ImportCount | FunctionCount | TableCount | MemoryCount | GlobalCount
            | ExportCount | ElementSegmentCount | DataSegmentCount | DataCount | CodeCount
            | LocalRunCount | LocalRunLength | LocalIndex | FeatureCount | NeededDynlibCount
            | DylinkField => Policy::Leb,

            AstOp | AstOpExt | TypeCode | FunctionIndex | TypeIndex | TableIndex | GlobalIndex
            | ElementSegmentIndex | DataSegmentIndex | ParamCount | ResultCount | BreakIndex
            | SwitchTargetCount | SelectTypeCount | MemoryAccessAlignment | MemoryAccessOffset
            | ConstI32 | ConstI64 | ConstF32 | ConstF64 | AtomicFenceOrder
            | ElementSegmentSize | InlineBufferSize => Policy::Huffman,

            Magic | Version | MemoryIndex | ElemKindFuncRef | MemorySizeFlag | MemoryGrowFlag
            | FeaturePrefix => Policy::Elided,

            Mutability => Policy::Bool1,
            SectionKind => Policy::Fixed(SECTION_KIND_BITS),
            SegmentFlags => Policy::Fixed(SEGMENT_FLAG_BITS),
            ExternalKind => Policy::Fixed(EXTERNAL_KIND_BITS),
            SimdLane => Policy::Fixed(SIMD_LANE_BITS),

            StringByte | DataSegmentByte | UserSectionByte | V128Byte => Policy::Raw8,
        }
    }

    /// The constant an elided category is restored to.
    pub fn elided_constant(self) -> i64 {
        use ValueKind::*;
        match self {
            FeaturePrefix => b'+' as i64,
            Magic | Version | MemoryIndex | ElemKindFuncRef | MemorySizeFlag | MemoryGrowFlag => 0,
            _ => unreachable!("not an elided category"),
        }
    }
}

/// Huffman-coded categories in stream order. The packer serializes one table
/// header per entry, empty headers included, so the unpacker can pair them
/// up positionally.
pub const HUFFMAN_KINDS: [ValueKind; 23] = [
    ValueKind::AstOp,
    ValueKind::AstOpExt,
    ValueKind::TypeCode,
    ValueKind::FunctionIndex,
    ValueKind::TypeIndex,
    ValueKind::TableIndex,
    ValueKind::GlobalIndex,
    ValueKind::ElementSegmentIndex,
    ValueKind::DataSegmentIndex,
    ValueKind::ParamCount,
    ValueKind::ResultCount,
    ValueKind::BreakIndex,
    ValueKind::SwitchTargetCount,
    ValueKind::SelectTypeCount,
    ValueKind::MemoryAccessAlignment,
    ValueKind::MemoryAccessOffset,
    ValueKind::ConstI32,
    ValueKind::ConstI64,
    ValueKind::ConstF32,
    ValueKind::ConstF64,
    ValueKind::AtomicFenceOrder,
    ValueKind::ElementSegmentSize,
    ValueKind::InlineBufferSize,
];

/// LEB chunk width for schema-driven wasm values.
pub const WASM_LEB_GROUP: u8 = 5;
/// LEB chunk width for the payload-length prefix and size fields; 7-bit
/// chunks make 5 chunks (40 bits) the maximum for a 32-bit size, matching
/// the placeholder below — the two must change together.
pub const SIZE_LEB_GROUP: u8 = 7;
/// Reserved bits for a section or body size before it is shrunk in place.
pub const SECTION_SIZE_PLACEHOLDER_BITS: u8 = 40;

/// Bits in a section kind tag.
pub const SECTION_KIND_BITS: u8 = 4;
/// Bits in a limits/segment flag field.
pub const SEGMENT_FLAG_BITS: u8 = 3;
/// Bits in an import/export kind tag.
pub const EXTERNAL_KIND_BITS: u8 = 2;
/// Bits in a SIMD lane index.
pub const SIMD_LANE_BITS: u8 = 5;

/// Map an `f64` bit pattern into the `i64` alphabet.
///
/// Patterns with the sign bit clear map to themselves; patterns with it set
/// map to `-1 - low63`, a bijection whose only unreachable input is the
/// all-ones NaN pattern (which would land on `i64::MIN` and overflow the
/// magnitude encodings downstream).
pub fn f64_bits_to_alphabet(bits: u64) -> Option<i64> {
    if bits >> 63 == 0 {
        Some(bits as i64)
    } else {
        let low = bits & 0x7FFF_FFFF_FFFF_FFFF;
        if low == 0x7FFF_FFFF_FFFF_FFFF {
            None
        } else {
            Some(-1 - low as i64)
        }
    }
}

/// Inverse of [`f64_bits_to_alphabet`].
pub fn f64_alphabet_to_bits(value: i64) -> u64 {
    if value >= 0 {
        value as u64
    } else {
        ((-1 - value) as u64) | (1 << 63)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_huffman_kind_is_listed_once() {
        for (i, kind) in HUFFMAN_KINDS.iter().enumerate() {
            assert_eq!(kind.policy(), Policy::Huffman);
            assert!(!HUFFMAN_KINDS[..i].contains(kind));
        }
    }

    #[test]
    fn test_f64_alphabet_bijection() {
        for bits in [
            0u64,
            1,
            f64::to_bits(1.5),
            f64::to_bits(-0.0),
            f64::to_bits(-123.25),
            f64::to_bits(f64::INFINITY),
            f64::to_bits(f64::NEG_INFINITY),
            f64::to_bits(f64::NAN),
            u64::MAX - 1,
        ] {
            let mapped = f64_bits_to_alphabet(bits).unwrap();
            assert_ne!(mapped, i64::MIN);
            assert_eq!(f64_alphabet_to_bits(mapped), bits);
        }
        assert!(f64_bits_to_alphabet(u64::MAX).is_none());
    }

    #[test]
    fn test_placeholder_fits_size_leb() {
        // 32-bit sizes need at most ceil(32 / 7) = 5 chunks of 8 bits.
        let chunks = 32u32.div_ceil(SIZE_LEB_GROUP as u32);
        assert_eq!(
            chunks * (SIZE_LEB_GROUP as u32 + 1),
            SECTION_SIZE_PLACEHOLDER_BITS as u32
        );
    }
}
