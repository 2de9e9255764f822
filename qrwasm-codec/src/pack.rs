//! [`Module`] → compressed bit stream.
//!
//! Packing is two passes over the same traversal. Pass 1 writes nothing and
//! records every value that falls in a Huffman-coded category; between the
//! passes a table is built per category and all table headers are emitted in
//! [`HUFFMAN_KINDS`] order. Pass 2 walks the module again and emits every
//! value under its schema policy.
//!
//! Section and function-body sizes are not known until their contents have
//! been written, so a 40-bit placeholder is reserved, the body emitted, and
//! the placeholder replaced by the actual size LEB with the body shifted
//! back over the gap via `move_bits`.
//!
//! The finished stream is prefixed with its own bit length so the reader can
//! bound every subsequent read.

use std::collections::BTreeMap;

use qrwasm_core::bitstream::BitWriter;
use qrwasm_core::error::{QrWasmError, Result};
use qrwasm_core::huffman::HuffmanTable;
use qrwasm_core::numeric::leb_bit_len_unsigned;

use crate::instr::{Expr, Instr, MemArg};
use crate::module::*;
use crate::opcodes::{atomic, misc, op, section, simd, type_code};
use crate::schema::{
    HUFFMAN_KINDS, Policy, SECTION_SIZE_PLACEHOLDER_BITS, SIZE_LEB_GROUP, ValueKind,
    WASM_LEB_GROUP, f64_bits_to_alphabet,
};
use crate::types::Limits;

/// Compress a module into a length-prefixed bit stream.
pub fn pack_module(module: &Module) -> Result<Vec<u8>> {
    let mut packer = Packer::new();
    packer.module(module)?;
    packer.seal()?;
    packer.module(module)?;
    packer.finish()
}

struct Packer {
    writer: BitWriter,
    /// Pass 1 records observations instead of writing.
    collecting: bool,
    seen: BTreeMap<ValueKind, Vec<i64>>,
    tables: BTreeMap<ValueKind, HuffmanTable>,
}

impl Packer {
    fn new() -> Self {
        Self {
            writer: BitWriter::new(),
            collecting: true,
            seen: BTreeMap::new(),
            tables: BTreeMap::new(),
        }
    }

    /// End pass 1: build one table per Huffman category and serialize all
    /// headers, empty ones included, in the fixed category order.
    fn seal(&mut self) -> Result<()> {
        debug_assert!(self.collecting);
        debug_assert_eq!(self.writer.cursor(), 0);
        self.collecting = false;
        for kind in HUFFMAN_KINDS {
            let table = match self.seen.get(&kind) {
                Some(values) if !values.is_empty() => HuffmanTable::from_values(values)?,
                _ => HuffmanTable::empty(),
            };
            table.write_header(&mut self.writer)?;
            self.tables.insert(kind, table);
        }
        Ok(())
    }

    /// Prefix the stream with its bit length and left-justify the tail.
    fn finish(mut self) -> Result<Vec<u8>> {
        let total = self.writer.cursor();
        let prefix = leb_bit_len_unsigned(total, SIZE_LEB_GROUP);
        let end = self.writer.move_bits(0, total, prefix);
        self.writer.set_cursor(0);
        self.writer.write_leb_unsigned(total, SIZE_LEB_GROUP);
        debug_assert_eq!(self.writer.cursor(), prefix);
        self.writer.set_cursor(end);
        Ok(self.writer.finalize())
    }

    /// Write (or observe) one schema value.
    fn value(&mut self, kind: ValueKind, value: i64) -> Result<()> {
        if self.collecting {
            if kind.policy() == Policy::Huffman {
                self.seen.entry(kind).or_default().push(value);
            }
            return Ok(());
        }
        match kind.policy() {
            Policy::Huffman => {
                let table = self.tables.get(&kind).expect("sealed before pass 2");
                table.encode_value(&mut self.writer, value)?;
            }
            Policy::Leb => {
                debug_assert!(value >= 0, "LEB categories are unsigned");
                self.writer.write_leb_unsigned(value as u64, WASM_LEB_GROUP);
            }
            Policy::Fixed(bits) => {
                debug_assert!(value >= 0 && (value as u64) < (1u64 << bits));
                self.writer.write_bits_unsigned(value as u64, bits);
            }
            Policy::Elided => {}
            Policy::Bool1 => self.writer.write_bit(value != 0),
            Policy::Raw8 => self.writer.write_bits_unsigned(value as u64 & 0xFF, 8),
        }
        Ok(())
    }

    fn bytes(&mut self, kind: ValueKind, data: &[u8]) -> Result<()> {
        for &b in data {
            self.value(kind, b as i64)?;
        }
        Ok(())
    }

    fn string(&mut self, s: &str) -> Result<()> {
        self.value(ValueKind::InlineBufferSize, s.len() as i64)?;
        self.bytes(ValueKind::StringByte, s.as_bytes())
    }

    /// Emit a section: kind tag, size placeholder, body, size patch.
    fn section<F>(&mut self, kind: u8, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.value(ValueKind::SectionKind, kind as i64)?;
        if self.collecting {
            return body(self);
        }
        let size_pos = self.writer.cursor();
        self.writer
            .write_bits_unsigned(0, SECTION_SIZE_PLACEHOLDER_BITS);
        body(self)?;
        self.patch_size(size_pos);
        Ok(())
    }

    /// Replace the placeholder at `size_pos` with the actual size LEB and
    /// close the gap.
    fn patch_size(&mut self, size_pos: u64) {
        let end = self.writer.cursor();
        let body_start = size_pos + SECTION_SIZE_PLACEHOLDER_BITS as u64;
        let body_bits = end - body_start;
        let leb_bits = leb_bit_len_unsigned(body_bits, SIZE_LEB_GROUP);
        debug_assert!(leb_bits <= SECTION_SIZE_PLACEHOLDER_BITS as u64);
        let new_end = self.writer.move_bits(body_start, end, size_pos + leb_bits);
        self.writer.set_cursor(size_pos);
        self.writer.write_leb_unsigned(body_bits, SIZE_LEB_GROUP);
        debug_assert_eq!(self.writer.cursor(), size_pos + leb_bits);
        self.writer.set_cursor(new_end);
    }

    fn limits(&mut self, limits: &Limits) -> Result<()> {
        self.value(ValueKind::SegmentFlags, limits.flags() as i64)?;
        if self.collecting {
            return Ok(());
        }
        self.writer.write_leb_unsigned(limits.min, WASM_LEB_GROUP);
        if let Some(max) = limits.max {
            self.writer.write_leb_unsigned(max, WASM_LEB_GROUP);
        }
        Ok(())
    }

    fn type_code(&mut self, code: i64) -> Result<()> {
        self.value(ValueKind::TypeCode, code)
    }

    fn mem_arg(&mut self, arg: &MemArg) -> Result<()> {
        self.value(ValueKind::MemoryAccessAlignment, arg.align as i64)?;
        if arg.offset > i64::MAX as u64 {
            return Err(QrWasmError::unsupported("memory offset above 2^63"));
        }
        self.value(ValueKind::MemoryAccessOffset, arg.offset as i64)
    }

    fn expr(&mut self, expr: &Expr) -> Result<()> {
        for instr in expr {
            self.instr(instr)?;
        }
        self.op(op::END)
    }

    fn op(&mut self, opcode: u8) -> Result<()> {
        self.value(ValueKind::AstOp, opcode as i64)
    }

    fn prefixed(&mut self, prefix: u8, sub: u32) -> Result<()> {
        self.op(prefix)?;
        self.value(ValueKind::AstOpExt, sub as i64)
    }

    fn instr(&mut self, instr: &Instr) -> Result<()> {
        match instr {
            Instr::Unreachable => self.op(op::UNREACHABLE)?,
            Instr::Nop => self.op(op::NOP)?,
            Instr::Block { ty, body } => {
                self.op(op::BLOCK)?;
                self.type_code(ty.code())?;
                self.expr(body)?;
            }
            Instr::Loop { ty, body } => {
                self.op(op::LOOP)?;
                self.type_code(ty.code())?;
                self.expr(body)?;
            }
            Instr::If { ty, then, els } => {
                self.op(op::IF)?;
                self.type_code(ty.code())?;
                for instr in then {
                    self.instr(instr)?;
                }
                if let Some(els) = els {
                    self.op(op::ELSE)?;
                    for instr in els {
                        self.instr(instr)?;
                    }
                }
                self.op(op::END)?;
            }
            Instr::Br { label } => {
                self.op(op::BR)?;
                self.value(ValueKind::BreakIndex, *label as i64)?;
            }
            Instr::BrIf { label } => {
                self.op(op::BR_IF)?;
                self.value(ValueKind::BreakIndex, *label as i64)?;
            }
            Instr::BrTable { targets, default } => {
                self.op(op::BR_TABLE)?;
                self.value(ValueKind::SwitchTargetCount, targets.len() as i64)?;
                for t in targets {
                    self.value(ValueKind::BreakIndex, *t as i64)?;
                }
                self.value(ValueKind::BreakIndex, *default as i64)?;
            }
            Instr::Return => self.op(op::RETURN)?,
            Instr::Call { func } => {
                self.op(op::CALL)?;
                self.value(ValueKind::FunctionIndex, *func as i64)?;
            }
            Instr::CallIndirect { ty, table } => {
                self.op(op::CALL_INDIRECT)?;
                self.value(ValueKind::TypeIndex, *ty as i64)?;
                self.value(ValueKind::TableIndex, *table as i64)?;
            }
            Instr::Drop => self.op(op::DROP)?,
            Instr::Select => self.op(op::SELECT)?,
            Instr::SelectT { types } => {
                self.op(op::SELECT_T)?;
                self.value(ValueKind::SelectTypeCount, types.len() as i64)?;
                for ty in types {
                    self.type_code(ty.code())?;
                }
            }
            Instr::LocalGet { local } => {
                self.op(op::LOCAL_GET)?;
                self.value(ValueKind::LocalIndex, *local as i64)?;
            }
            Instr::LocalSet { local } => {
                self.op(op::LOCAL_SET)?;
                self.value(ValueKind::LocalIndex, *local as i64)?;
            }
            Instr::LocalTee { local } => {
                self.op(op::LOCAL_TEE)?;
                self.value(ValueKind::LocalIndex, *local as i64)?;
            }
            Instr::GlobalGet { global } => {
                self.op(op::GLOBAL_GET)?;
                self.value(ValueKind::GlobalIndex, *global as i64)?;
            }
            Instr::GlobalSet { global } => {
                self.op(op::GLOBAL_SET)?;
                self.value(ValueKind::GlobalIndex, *global as i64)?;
            }
            Instr::TableGet { table } => {
                self.op(op::TABLE_GET)?;
                self.value(ValueKind::TableIndex, *table as i64)?;
            }
            Instr::TableSet { table } => {
                self.op(op::TABLE_SET)?;
                self.value(ValueKind::TableIndex, *table as i64)?;
            }
            Instr::Load { op: opcode, arg } => {
                self.op(*opcode)?;
                self.mem_arg(arg)?;
            }
            Instr::Store { op: opcode, arg } => {
                self.op(*opcode)?;
                self.mem_arg(arg)?;
            }
            Instr::MemorySize => {
                self.op(op::MEMORY_SIZE)?;
                self.value(ValueKind::MemorySizeFlag, 0)?;
            }
            Instr::MemoryGrow => {
                self.op(op::MEMORY_GROW)?;
                self.value(ValueKind::MemoryGrowFlag, 0)?;
            }
            Instr::I32Const { value } => {
                self.op(op::I32_CONST)?;
                self.value(ValueKind::ConstI32, *value as i64)?;
            }
            Instr::I64Const { value } => {
                if *value == i64::MIN {
                    return Err(QrWasmError::unsupported(
                        "i64.const with the minimum 64-bit value",
                    ));
                }
                self.op(op::I64_CONST)?;
                self.value(ValueKind::ConstI64, *value)?;
            }
            Instr::F32Const { bits } => {
                self.op(op::F32_CONST)?;
                self.value(ValueKind::ConstF32, *bits as i64)?;
            }
            Instr::F64Const { bits } => {
                let mapped = f64_bits_to_alphabet(*bits).ok_or_else(|| {
                    QrWasmError::unsupported("f64.const with the all-ones NaN pattern")
                })?;
                self.op(op::F64_CONST)?;
                self.value(ValueKind::ConstF64, mapped)?;
            }
            Instr::Numeric { op: opcode } => self.op(*opcode)?,
            Instr::RefNull { ty } => {
                self.op(op::REF_NULL)?;
                self.type_code(ty.code())?;
            }
            Instr::RefIsNull => self.op(op::REF_IS_NULL)?,
            Instr::RefFunc { func } => {
                self.op(op::REF_FUNC)?;
                self.value(ValueKind::FunctionIndex, *func as i64)?;
            }
            Instr::TruncSat { op: sub } => self.prefixed(op::MISC_PREFIX, *sub)?,
            Instr::MemoryInit { data } => {
                self.prefixed(op::MISC_PREFIX, misc::MEMORY_INIT)?;
                self.value(ValueKind::DataSegmentIndex, *data as i64)?;
                self.value(ValueKind::MemoryIndex, 0)?;
            }
            Instr::DataDrop { data } => {
                self.prefixed(op::MISC_PREFIX, misc::DATA_DROP)?;
                self.value(ValueKind::DataSegmentIndex, *data as i64)?;
            }
            Instr::MemoryCopy => {
                self.prefixed(op::MISC_PREFIX, misc::MEMORY_COPY)?;
                self.value(ValueKind::MemoryIndex, 0)?;
                self.value(ValueKind::MemoryIndex, 0)?;
            }
            Instr::MemoryFill => {
                self.prefixed(op::MISC_PREFIX, misc::MEMORY_FILL)?;
                self.value(ValueKind::MemoryIndex, 0)?;
            }
            Instr::TableInit { elem, table } => {
                self.prefixed(op::MISC_PREFIX, misc::TABLE_INIT)?;
                self.value(ValueKind::ElementSegmentIndex, *elem as i64)?;
                self.value(ValueKind::TableIndex, *table as i64)?;
            }
            Instr::ElemDrop { elem } => {
                self.prefixed(op::MISC_PREFIX, misc::ELEM_DROP)?;
                self.value(ValueKind::ElementSegmentIndex, *elem as i64)?;
            }
            Instr::TableCopy { dst, src } => {
                self.prefixed(op::MISC_PREFIX, misc::TABLE_COPY)?;
                self.value(ValueKind::TableIndex, *dst as i64)?;
                self.value(ValueKind::TableIndex, *src as i64)?;
            }
            Instr::TableGrow { table } => {
                self.prefixed(op::MISC_PREFIX, misc::TABLE_GROW)?;
                self.value(ValueKind::TableIndex, *table as i64)?;
            }
            Instr::TableSize { table } => {
                self.prefixed(op::MISC_PREFIX, misc::TABLE_SIZE)?;
                self.value(ValueKind::TableIndex, *table as i64)?;
            }
            Instr::TableFill { table } => {
                self.prefixed(op::MISC_PREFIX, misc::TABLE_FILL)?;
                self.value(ValueKind::TableIndex, *table as i64)?;
            }
            Instr::V128Const { bytes } => {
                self.prefixed(op::SIMD_PREFIX, simd::V128_CONST)?;
                self.bytes(ValueKind::V128Byte, bytes)?;
            }
            Instr::I8x16Shuffle { lanes } => {
                self.prefixed(op::SIMD_PREFIX, simd::I8X16_SHUFFLE)?;
                for lane in lanes {
                    self.value(ValueKind::SimdLane, *lane as i64)?;
                }
            }
            Instr::SimdMem { op: sub, arg } => {
                self.prefixed(op::SIMD_PREFIX, *sub)?;
                self.mem_arg(arg)?;
            }
            Instr::SimdMemLane { op: sub, arg, lane } => {
                self.prefixed(op::SIMD_PREFIX, *sub)?;
                self.mem_arg(arg)?;
                self.value(ValueKind::SimdLane, *lane as i64)?;
            }
            Instr::SimdLane { op: sub, lane } => {
                self.prefixed(op::SIMD_PREFIX, *sub)?;
                self.value(ValueKind::SimdLane, *lane as i64)?;
            }
            Instr::Simd { op: sub } => self.prefixed(op::SIMD_PREFIX, *sub)?,
            Instr::AtomicFence { order } => {
                self.prefixed(op::ATOMIC_PREFIX, atomic::FENCE)?;
                self.value(ValueKind::AtomicFenceOrder, *order as i64)?;
            }
            Instr::AtomicMem { op: sub, arg } => {
                self.prefixed(op::ATOMIC_PREFIX, *sub)?;
                self.mem_arg(arg)?;
            }
        }
        Ok(())
    }

    /// One full traversal of the module in canonical section order; runs
    /// identically in both passes.
    fn module(&mut self, m: &Module) -> Result<()> {
        self.value(ValueKind::Magic, 0)?;
        self.value(ValueKind::Version, 0)?;

        if let Some(dylink) = &m.dylink {
            self.section(section::CUSTOM, |s| {
                s.string("dylink")?;
                for field in [
                    dylink.memory_size,
                    dylink.memory_alignment,
                    dylink.table_size,
                    dylink.table_alignment,
                ] {
                    s.value(ValueKind::DylinkField, field as i64)?;
                }
                s.value(ValueKind::NeededDynlibCount, dylink.needed.len() as i64)?;
                for lib in &dylink.needed {
                    s.string(lib)?;
                }
                Ok(())
            })?;
        }

        if !m.types.is_empty() {
            self.section(section::TYPE, |s| {
                s.value(ValueKind::TypeCount, m.types.len() as i64)?;
                for ty in &m.types {
                    s.type_code(type_code::FUNC)?;
                    s.value(ValueKind::ParamCount, ty.params.len() as i64)?;
                    for p in &ty.params {
                        s.type_code(p.code())?;
                    }
                    s.value(ValueKind::ResultCount, ty.results.len() as i64)?;
                    for r in &ty.results {
                        s.type_code(r.code())?;
                    }
                }
                Ok(())
            })?;
        }

        if !m.imports.is_empty() {
            self.section(section::IMPORT, |s| {
                s.value(ValueKind::ImportCount, m.imports.len() as i64)?;
                for import in &m.imports {
                    s.string(&import.module)?;
                    s.string(&import.field)?;
                    match &import.desc {
                        ImportDesc::Func(ty) => {
                            s.value(ValueKind::ExternalKind, ExternalKind::Func as i64)?;
                            s.value(ValueKind::TypeIndex, *ty as i64)?;
                        }
                        ImportDesc::Table(table) => {
                            s.value(ValueKind::ExternalKind, ExternalKind::Table as i64)?;
                            s.type_code(table.element.code())?;
                            s.limits(&table.limits)?;
                        }
                        ImportDesc::Memory(limits) => {
                            s.value(ValueKind::ExternalKind, ExternalKind::Memory as i64)?;
                            s.limits(limits)?;
                        }
                        ImportDesc::Global(ty) => {
                            s.value(ValueKind::ExternalKind, ExternalKind::Global as i64)?;
                            s.type_code(ty.content.code())?;
                            s.value(ValueKind::Mutability, ty.mutable as i64)?;
                        }
                    }
                }
                Ok(())
            })?;
        }

        if !m.functions.is_empty() {
            self.section(section::FUNCTION, |s| {
                s.value(ValueKind::FunctionCount, m.functions.len() as i64)?;
                for ty in &m.functions {
                    s.value(ValueKind::TypeIndex, *ty as i64)?;
                }
                Ok(())
            })?;
        }

        if !m.tables.is_empty() {
            self.section(section::TABLE, |s| {
                s.value(ValueKind::TableCount, m.tables.len() as i64)?;
                for table in &m.tables {
                    s.type_code(table.element.code())?;
                    s.limits(&table.limits)?;
                }
                Ok(())
            })?;
        }

        if !m.memories.is_empty() {
            self.section(section::MEMORY, |s| {
                s.value(ValueKind::MemoryCount, m.memories.len() as i64)?;
                for limits in &m.memories {
                    s.limits(limits)?;
                }
                Ok(())
            })?;
        }

        if !m.globals.is_empty() {
            self.section(section::GLOBAL, |s| {
                s.value(ValueKind::GlobalCount, m.globals.len() as i64)?;
                for global in &m.globals {
                    s.type_code(global.ty.content.code())?;
                    s.value(ValueKind::Mutability, global.ty.mutable as i64)?;
                    s.expr(&global.init)?;
                }
                Ok(())
            })?;
        }

        if !m.exports.is_empty() {
            self.section(section::EXPORT, |s| {
                s.value(ValueKind::ExportCount, m.exports.len() as i64)?;
                for export in &m.exports {
                    s.string(&export.name)?;
                    s.value(ValueKind::ExternalKind, export.kind as i64)?;
                    match export.kind {
                        ExternalKind::Func => {
                            s.value(ValueKind::FunctionIndex, export.index as i64)?;
                        }
                        ExternalKind::Table => {
                            s.value(ValueKind::TableIndex, export.index as i64)?;
                        }
                        ExternalKind::Memory => {
                            s.value(ValueKind::MemoryIndex, export.index as i64)?;
                        }
                        ExternalKind::Global => {
                            s.value(ValueKind::GlobalIndex, export.index as i64)?;
                        }
                    }
                }
                Ok(())
            })?;
        }

        if let Some(start) = m.start {
            self.section(section::START, |s| {
                s.value(ValueKind::FunctionIndex, start as i64)
            })?;
        }

        if !m.elements.is_empty() {
            self.section(section::ELEMENT, |s| {
                s.value(ValueKind::ElementSegmentCount, m.elements.len() as i64)?;
                for segment in &m.elements {
                    s.value(ValueKind::SegmentFlags, segment.flags as i64)?;
                    if segment.has_table_index() {
                        s.value(ValueKind::TableIndex, segment.table as i64)?;
                    }
                    if let Some(offset) = &segment.offset {
                        s.expr(offset)?;
                    }
                    if segment.has_type_field() {
                        if segment.uses_exprs() {
                            s.type_code(segment.element.code())?;
                        } else {
                            s.value(ValueKind::ElemKindFuncRef, 0)?;
                        }
                    }
                    if segment.uses_exprs() {
                        s.value(ValueKind::ElementSegmentSize, segment.exprs.len() as i64)?;
                        for expr in &segment.exprs {
                            s.expr(expr)?;
                        }
                    } else {
                        s.value(ValueKind::ElementSegmentSize, segment.funcs.len() as i64)?;
                        for func in &segment.funcs {
                            s.value(ValueKind::FunctionIndex, *func as i64)?;
                        }
                    }
                }
                Ok(())
            })?;
        }

        if let Some(count) = m.data_count {
            self.section(section::DATA_COUNT, |s| {
                s.value(ValueKind::DataCount, count as i64)
            })?;
        }

        if !m.code.is_empty() {
            self.section(section::CODE, |s| {
                s.value(ValueKind::CodeCount, m.code.len() as i64)?;
                for body in &m.code {
                    s.func_body(body)?;
                }
                Ok(())
            })?;
        }

        if !m.data.is_empty() {
            self.section(section::DATA, |s| {
                s.value(ValueKind::DataSegmentCount, m.data.len() as i64)?;
                for segment in &m.data {
                    s.value(ValueKind::SegmentFlags, segment.flags as i64)?;
                    if segment.flags == 2 {
                        s.value(ValueKind::MemoryIndex, 0)?;
                    }
                    if let Some(offset) = &segment.offset {
                        s.expr(offset)?;
                    }
                    s.value(ValueKind::InlineBufferSize, segment.bytes.len() as i64)?;
                    s.bytes(ValueKind::DataSegmentByte, &segment.bytes)?;
                }
                Ok(())
            })?;
        }

        if let Some(features) = &m.target_features {
            self.section(section::CUSTOM, |s| {
                s.string("target_features")?;
                s.value(ValueKind::FeatureCount, features.len() as i64)?;
                for feature in features {
                    s.value(ValueKind::FeaturePrefix, b'+' as i64)?;
                    s.string(feature)?;
                }
                Ok(())
            })?;
        }

        for custom in &m.customs {
            self.section(section::CUSTOM, |s| {
                s.string(&custom.name)?;
                s.value(ValueKind::InlineBufferSize, custom.bytes.len() as i64)?;
                s.bytes(ValueKind::UserSectionByte, &custom.bytes)
            })?;
        }

        Ok(())
    }

    /// A function body: size placeholder, local runs, expression tree.
    fn func_body(&mut self, body: &FuncBody) -> Result<()> {
        if self.collecting {
            return self.func_body_fields(body);
        }
        let size_pos = self.writer.cursor();
        self.writer
            .write_bits_unsigned(0, SECTION_SIZE_PLACEHOLDER_BITS);
        self.func_body_fields(body)?;
        self.patch_size(size_pos);
        Ok(())
    }

    fn func_body_fields(&mut self, body: &FuncBody) -> Result<()> {
        self.value(ValueKind::LocalRunCount, body.locals.len() as i64)?;
        for (run, ty) in &body.locals {
            self.value(ValueKind::LocalRunLength, *run as i64)?;
            self.type_code(ty.code())?;
        }
        self.expr(&body.body)
    }
}
