//! The instruction set the codec understands.
//!
//! Instructions are modelled structurally: block-shaped instructions own
//! their bodies, so `end`/`else` markers exist only in the serialized forms.
//! Opcode families whose members differ only in opcode number (plain numeric
//! ops, most SIMD arithmetic, atomic memory accesses) are carried as a single
//! variant with the opcode stored, which keeps the enum at a size a
//! QR-targeted codec can traverse without a visitor framework.

use crate::types::{BlockType, ValType};

/// Alignment and offset immediate of a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemArg {
    /// log2 of the access alignment.
    pub align: u32,
    /// Constant address offset.
    pub offset: u64,
}

/// An expression is an instruction sequence; the terminating `end` is
/// implicit.
pub type Expr = Vec<Instr>;

/// A single instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// `unreachable`
    Unreachable,
    /// `nop`
    Nop,
    /// `block` with its body.
    Block {
        /// Result shape.
        ty: BlockType,
        /// Body instructions.
        body: Expr,
    },
    /// `loop` with its body.
    Loop {
        /// Result shape.
        ty: BlockType,
        /// Body instructions.
        body: Expr,
    },
    /// `if`, with an optional `else` arm.
    If {
        /// Result shape.
        ty: BlockType,
        /// Taken arm.
        then: Expr,
        /// Optional else arm; `None` means no `else` opcode was present.
        els: Option<Expr>,
    },
    /// `br`
    Br {
        /// Relative branch depth.
        label: u32,
    },
    /// `br_if`
    BrIf {
        /// Relative branch depth.
        label: u32,
    },
    /// `br_table`
    BrTable {
        /// Jump table of branch depths.
        targets: Vec<u32>,
        /// Depth taken when the operand is out of range.
        default: u32,
    },
    /// `return`
    Return,
    /// `call`
    Call {
        /// Callee function index.
        func: u32,
    },
    /// `call_indirect`
    CallIndirect {
        /// Expected signature.
        ty: u32,
        /// Table holding the targets.
        table: u32,
    },
    /// `drop`
    Drop,
    /// Untyped `select`.
    Select,
    /// Typed `select` (multi-value proposal).
    SelectT {
        /// Explicit result types.
        types: Vec<ValType>,
    },
    /// `local.get`
    LocalGet {
        /// Local index.
        local: u32,
    },
    /// `local.set`
    LocalSet {
        /// Local index.
        local: u32,
    },
    /// `local.tee`
    LocalTee {
        /// Local index.
        local: u32,
    },
    /// `global.get`
    GlobalGet {
        /// Global index.
        global: u32,
    },
    /// `global.set`
    GlobalSet {
        /// Global index.
        global: u32,
    },
    /// `table.get`
    TableGet {
        /// Table index.
        table: u32,
    },
    /// `table.set`
    TableSet {
        /// Table index.
        table: u32,
    },
    /// Any of the contiguous load opcodes (0x28..=0x35).
    Load {
        /// The exact opcode.
        op: u8,
        /// Access immediate.
        arg: MemArg,
    },
    /// Any of the contiguous store opcodes (0x36..=0x3E).
    Store {
        /// The exact opcode.
        op: u8,
        /// Access immediate.
        arg: MemArg,
    },
    /// `memory.size`
    MemorySize,
    /// `memory.grow`
    MemoryGrow,
    /// `i32.const`
    I32Const {
        /// Literal value.
        value: i32,
    },
    /// `i64.const`
    I64Const {
        /// Literal value.
        value: i64,
    },
    /// `f32.const`, stored as the IEEE bit pattern so NaNs survive.
    F32Const {
        /// IEEE 754 bits.
        bits: u32,
    },
    /// `f64.const`, stored as the IEEE bit pattern.
    F64Const {
        /// IEEE 754 bits.
        bits: u64,
    },
    /// Immediate-free numeric opcode (0x45..=0xC4).
    Numeric {
        /// The exact opcode.
        op: u8,
    },
    /// `ref.null`
    RefNull {
        /// Referenced type.
        ty: ValType,
    },
    /// `ref.is_null`
    RefIsNull,
    /// `ref.func`
    RefFunc {
        /// Function index.
        func: u32,
    },
    /// Saturating truncation (0xFC 0..=7).
    TruncSat {
        /// Sub-opcode.
        op: u32,
    },
    /// `memory.init`
    MemoryInit {
        /// Source data segment.
        data: u32,
    },
    /// `data.drop`
    DataDrop {
        /// Dropped data segment.
        data: u32,
    },
    /// `memory.copy`
    MemoryCopy,
    /// `memory.fill`
    MemoryFill,
    /// `table.init`
    TableInit {
        /// Source element segment.
        elem: u32,
        /// Destination table.
        table: u32,
    },
    /// `elem.drop`
    ElemDrop {
        /// Dropped element segment.
        elem: u32,
    },
    /// `table.copy`
    TableCopy {
        /// Destination table.
        dst: u32,
        /// Source table.
        src: u32,
    },
    /// `table.grow`
    TableGrow {
        /// Table index.
        table: u32,
    },
    /// `table.size`
    TableSize {
        /// Table index.
        table: u32,
    },
    /// `table.fill`
    TableFill {
        /// Table index.
        table: u32,
    },
    /// `v128.const`
    V128Const {
        /// The 16 literal bytes.
        bytes: [u8; 16],
    },
    /// `i8x16.shuffle`
    I8x16Shuffle {
        /// The 16 lane selectors (0..=31).
        lanes: [u8; 16],
    },
    /// SIMD load/store with a memarg (0xFD loads, store, load zero forms).
    SimdMem {
        /// Sub-opcode.
        op: u32,
        /// Access immediate.
        arg: MemArg,
    },
    /// SIMD lane load/store (memarg plus lane index).
    SimdMemLane {
        /// Sub-opcode.
        op: u32,
        /// Access immediate.
        arg: MemArg,
        /// Lane index.
        lane: u8,
    },
    /// SIMD extract/replace lane.
    SimdLane {
        /// Sub-opcode.
        op: u32,
        /// Lane index.
        lane: u8,
    },
    /// Immediate-free SIMD opcode.
    Simd {
        /// Sub-opcode.
        op: u32,
    },
    /// `atomic.fence`
    AtomicFence {
        /// Ordering byte (0 in the current wasm version).
        order: u8,
    },
    /// Atomic memory access (0xFE loads, stores, RMW, cmpxchg, wait,
    /// notify).
    AtomicMem {
        /// Sub-opcode.
        op: u32,
        /// Access immediate.
        arg: MemArg,
    },
}
