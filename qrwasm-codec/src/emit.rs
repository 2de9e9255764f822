//! [`Module`] → standard wasm binary format.
//!
//! The inverse of [`crate::parse`]: minimal LEB encodings, canonical section
//! order, sections omitted when empty. Parsing a binary and emitting the
//! resulting module reproduces the input bytes exactly; that equivalence is
//! what the compressed format's round-trip guarantee bottoms out in.

use crate::instr::{Expr, Instr, MemArg};
use crate::module::*;
use crate::opcodes::{MAGIC, VERSION, atomic, misc, op, section, simd, type_code};
use crate::types::{BlockType, Limits, ValType};

/// Byte-oriented emitter with minimal-LEB helpers.
#[derive(Default)]
struct ByteEmitter {
    bytes: Vec<u8>,
}

impl ByteEmitter {
    fn byte(&mut self, b: u8) {
        self.bytes.push(b);
    }

    fn raw(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    fn uleb(&mut self, mut value: u64) {
        loop {
            let mut b = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                b |= 0x80;
            }
            self.bytes.push(b);
            if value == 0 {
                break;
            }
        }
    }

    fn sleb(&mut self, mut value: i64) {
        loop {
            let mut b = (value & 0x7F) as u8;
            value >>= 7;
            let done = (value == 0 && b & 0x40 == 0) || (value == -1 && b & 0x40 != 0);
            if !done {
                b |= 0x80;
            }
            self.bytes.push(b);
            if done {
                break;
            }
        }
    }

    fn name(&mut self, name: &str) {
        self.uleb(name.len() as u64);
        self.raw(name.as_bytes());
    }

    fn val_type(&mut self, ty: ValType) {
        self.sleb(ty.code());
    }

    fn block_type(&mut self, ty: BlockType) {
        match ty {
            BlockType::Empty => self.byte(0x40),
            BlockType::Value(v) => self.val_type(v),
            BlockType::Func(idx) => self.sleb(idx as i64),
        }
    }

    fn limits(&mut self, limits: &Limits) {
        self.byte(limits.flags());
        self.uleb(limits.min);
        if let Some(max) = limits.max {
            self.uleb(max);
        }
    }

    fn mem_arg(&mut self, arg: &MemArg) {
        self.uleb(arg.align as u64);
        self.uleb(arg.offset);
    }

    fn expr(&mut self, expr: &Expr) {
        for instr in expr {
            self.instr(instr);
        }
        self.byte(op::END);
    }

    fn instr(&mut self, instr: &Instr) {
        match instr {
            Instr::Unreachable => self.byte(op::UNREACHABLE),
            Instr::Nop => self.byte(op::NOP),
            Instr::Block { ty, body } => {
                self.byte(op::BLOCK);
                self.block_type(*ty);
                self.expr(body);
            }
            Instr::Loop { ty, body } => {
                self.byte(op::LOOP);
                self.block_type(*ty);
                self.expr(body);
            }
            Instr::If { ty, then, els } => {
                self.byte(op::IF);
                self.block_type(*ty);
                for instr in then {
                    self.instr(instr);
                }
                if let Some(els) = els {
                    self.byte(op::ELSE);
                    for instr in els {
                        self.instr(instr);
                    }
                }
                self.byte(op::END);
            }
            Instr::Br { label } => {
                self.byte(op::BR);
                self.uleb(*label as u64);
            }
            Instr::BrIf { label } => {
                self.byte(op::BR_IF);
                self.uleb(*label as u64);
            }
            Instr::BrTable { targets, default } => {
                self.byte(op::BR_TABLE);
                self.uleb(targets.len() as u64);
                for t in targets {
                    self.uleb(*t as u64);
                }
                self.uleb(*default as u64);
            }
            Instr::Return => self.byte(op::RETURN),
            Instr::Call { func } => {
                self.byte(op::CALL);
                self.uleb(*func as u64);
            }
            Instr::CallIndirect { ty, table } => {
                self.byte(op::CALL_INDIRECT);
                self.uleb(*ty as u64);
                self.uleb(*table as u64);
            }
            Instr::Drop => self.byte(op::DROP),
            Instr::Select => self.byte(op::SELECT),
            Instr::SelectT { types } => {
                self.byte(op::SELECT_T);
                self.uleb(types.len() as u64);
                for ty in types {
                    self.val_type(*ty);
                }
            }
            Instr::LocalGet { local } => {
                self.byte(op::LOCAL_GET);
                self.uleb(*local as u64);
            }
            Instr::LocalSet { local } => {
                self.byte(op::LOCAL_SET);
                self.uleb(*local as u64);
            }
            Instr::LocalTee { local } => {
                self.byte(op::LOCAL_TEE);
                self.uleb(*local as u64);
            }
            Instr::GlobalGet { global } => {
                self.byte(op::GLOBAL_GET);
                self.uleb(*global as u64);
            }
            Instr::GlobalSet { global } => {
                self.byte(op::GLOBAL_SET);
                self.uleb(*global as u64);
            }
            Instr::TableGet { table } => {
                self.byte(op::TABLE_GET);
                self.uleb(*table as u64);
            }
            Instr::TableSet { table } => {
                self.byte(op::TABLE_SET);
                self.uleb(*table as u64);
            }
            Instr::Load { op: opcode, arg } => {
                self.byte(*opcode);
                self.mem_arg(arg);
            }
            Instr::Store { op: opcode, arg } => {
                self.byte(*opcode);
                self.mem_arg(arg);
            }
            Instr::MemorySize => {
                self.byte(op::MEMORY_SIZE);
                self.byte(0x00);
            }
            Instr::MemoryGrow => {
                self.byte(op::MEMORY_GROW);
                self.byte(0x00);
            }
            Instr::I32Const { value } => {
                self.byte(op::I32_CONST);
                self.sleb(*value as i64);
            }
            Instr::I64Const { value } => {
                self.byte(op::I64_CONST);
                self.sleb(*value);
            }
            Instr::F32Const { bits } => {
                self.byte(op::F32_CONST);
                self.raw(&bits.to_le_bytes());
            }
            Instr::F64Const { bits } => {
                self.byte(op::F64_CONST);
                self.raw(&bits.to_le_bytes());
            }
            Instr::Numeric { op: opcode } => self.byte(*opcode),
            Instr::RefNull { ty } => {
                self.byte(op::REF_NULL);
                self.val_type(*ty);
            }
            Instr::RefIsNull => self.byte(op::REF_IS_NULL),
            Instr::RefFunc { func } => {
                self.byte(op::REF_FUNC);
                self.uleb(*func as u64);
            }
            Instr::TruncSat { op: sub } => self.prefixed(op::MISC_PREFIX, *sub),
            Instr::MemoryInit { data } => {
                self.prefixed(op::MISC_PREFIX, misc::MEMORY_INIT);
                self.uleb(*data as u64);
                self.byte(0x00);
            }
            Instr::DataDrop { data } => {
                self.prefixed(op::MISC_PREFIX, misc::DATA_DROP);
                self.uleb(*data as u64);
            }
            Instr::MemoryCopy => {
                self.prefixed(op::MISC_PREFIX, misc::MEMORY_COPY);
                self.byte(0x00);
                self.byte(0x00);
            }
            Instr::MemoryFill => {
                self.prefixed(op::MISC_PREFIX, misc::MEMORY_FILL);
                self.byte(0x00);
            }
            Instr::TableInit { elem, table } => {
                self.prefixed(op::MISC_PREFIX, misc::TABLE_INIT);
                self.uleb(*elem as u64);
                self.uleb(*table as u64);
            }
            Instr::ElemDrop { elem } => {
                self.prefixed(op::MISC_PREFIX, misc::ELEM_DROP);
                self.uleb(*elem as u64);
            }
            Instr::TableCopy { dst, src } => {
                self.prefixed(op::MISC_PREFIX, misc::TABLE_COPY);
                self.uleb(*dst as u64);
                self.uleb(*src as u64);
            }
            Instr::TableGrow { table } => {
                self.prefixed(op::MISC_PREFIX, misc::TABLE_GROW);
                self.uleb(*table as u64);
            }
            Instr::TableSize { table } => {
                self.prefixed(op::MISC_PREFIX, misc::TABLE_SIZE);
                self.uleb(*table as u64);
            }
            Instr::TableFill { table } => {
                self.prefixed(op::MISC_PREFIX, misc::TABLE_FILL);
                self.uleb(*table as u64);
            }
            Instr::V128Const { bytes } => {
                self.prefixed(op::SIMD_PREFIX, simd::V128_CONST);
                self.raw(bytes);
            }
            Instr::I8x16Shuffle { lanes } => {
                self.prefixed(op::SIMD_PREFIX, simd::I8X16_SHUFFLE);
                self.raw(lanes);
            }
            Instr::SimdMem { op: sub, arg } => {
                self.prefixed(op::SIMD_PREFIX, *sub);
                self.mem_arg(arg);
            }
            Instr::SimdMemLane { op: sub, arg, lane } => {
                self.prefixed(op::SIMD_PREFIX, *sub);
                self.mem_arg(arg);
                self.byte(*lane);
            }
            Instr::SimdLane { op: sub, lane } => {
                self.prefixed(op::SIMD_PREFIX, *sub);
                self.byte(*lane);
            }
            Instr::Simd { op: sub } => self.prefixed(op::SIMD_PREFIX, *sub),
            Instr::AtomicFence { order } => {
                self.prefixed(op::ATOMIC_PREFIX, atomic::FENCE);
                self.byte(*order);
            }
            Instr::AtomicMem { op: sub, arg } => {
                self.prefixed(op::ATOMIC_PREFIX, *sub);
                self.mem_arg(arg);
            }
        }
    }

    fn prefixed(&mut self, prefix: u8, sub: u32) {
        self.byte(prefix);
        self.uleb(sub as u64);
    }
}

/// Append a section: id byte, payload size, payload.
fn push_section(out: &mut Vec<u8>, id: u8, body: ByteEmitter) {
    out.push(id);
    let mut size = ByteEmitter::default();
    size.uleb(body.bytes.len() as u64);
    out.extend_from_slice(&size.bytes);
    out.extend_from_slice(&body.bytes);
}

/// Serialize a module to the standard binary format.
pub fn emit_module(module: &Module) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION);

    if let Some(dylink) = &module.dylink {
        let mut e = ByteEmitter::default();
        e.name("dylink");
        e.uleb(dylink.memory_size);
        e.uleb(dylink.memory_alignment);
        e.uleb(dylink.table_size);
        e.uleb(dylink.table_alignment);
        e.uleb(dylink.needed.len() as u64);
        for lib in &dylink.needed {
            e.name(lib);
        }
        push_section(&mut out, section::CUSTOM, e);
    }

    if !module.types.is_empty() {
        let mut e = ByteEmitter::default();
        e.uleb(module.types.len() as u64);
        for ty in &module.types {
            e.sleb(type_code::FUNC);
            e.uleb(ty.params.len() as u64);
            for p in &ty.params {
                e.val_type(*p);
            }
            e.uleb(ty.results.len() as u64);
            for r in &ty.results {
                e.val_type(*r);
            }
        }
        push_section(&mut out, section::TYPE, e);
    }

    if !module.imports.is_empty() {
        let mut e = ByteEmitter::default();
        e.uleb(module.imports.len() as u64);
        for import in &module.imports {
            e.name(&import.module);
            e.name(&import.field);
            match &import.desc {
                ImportDesc::Func(ty) => {
                    e.byte(0);
                    e.uleb(*ty as u64);
                }
                ImportDesc::Table(table) => {
                    e.byte(1);
                    e.val_type(table.element);
                    e.limits(&table.limits);
                }
                ImportDesc::Memory(limits) => {
                    e.byte(2);
                    e.limits(limits);
                }
                ImportDesc::Global(ty) => {
                    e.byte(3);
                    e.val_type(ty.content);
                    e.byte(ty.mutable as u8);
                }
            }
        }
        push_section(&mut out, section::IMPORT, e);
    }

    if !module.functions.is_empty() {
        let mut e = ByteEmitter::default();
        e.uleb(module.functions.len() as u64);
        for ty in &module.functions {
            e.uleb(*ty as u64);
        }
        push_section(&mut out, section::FUNCTION, e);
    }

    if !module.tables.is_empty() {
        let mut e = ByteEmitter::default();
        e.uleb(module.tables.len() as u64);
        for table in &module.tables {
            e.val_type(table.element);
            e.limits(&table.limits);
        }
        push_section(&mut out, section::TABLE, e);
    }

    if !module.memories.is_empty() {
        let mut e = ByteEmitter::default();
        e.uleb(module.memories.len() as u64);
        for limits in &module.memories {
            e.limits(limits);
        }
        push_section(&mut out, section::MEMORY, e);
    }

    if !module.globals.is_empty() {
        let mut e = ByteEmitter::default();
        e.uleb(module.globals.len() as u64);
        for global in &module.globals {
            e.val_type(global.ty.content);
            e.byte(global.ty.mutable as u8);
            e.expr(&global.init);
        }
        push_section(&mut out, section::GLOBAL, e);
    }

    if !module.exports.is_empty() {
        let mut e = ByteEmitter::default();
        e.uleb(module.exports.len() as u64);
        for export in &module.exports {
            e.name(&export.name);
            e.byte(export.kind as u8);
            e.uleb(export.index as u64);
        }
        push_section(&mut out, section::EXPORT, e);
    }

    if let Some(start) = module.start {
        let mut e = ByteEmitter::default();
        e.uleb(start as u64);
        push_section(&mut out, section::START, e);
    }

    if !module.elements.is_empty() {
        let mut e = ByteEmitter::default();
        e.uleb(module.elements.len() as u64);
        for segment in &module.elements {
            e.uleb(segment.flags as u64);
            if segment.has_table_index() {
                e.uleb(segment.table as u64);
            }
            if let Some(offset) = &segment.offset {
                e.expr(offset);
            }
            if segment.has_type_field() {
                if segment.uses_exprs() {
                    e.val_type(segment.element);
                } else {
                    e.byte(0x00);
                }
            }
            if segment.uses_exprs() {
                e.uleb(segment.exprs.len() as u64);
                for expr in &segment.exprs {
                    e.expr(expr);
                }
            } else {
                e.uleb(segment.funcs.len() as u64);
                for func in &segment.funcs {
                    e.uleb(*func as u64);
                }
            }
        }
        push_section(&mut out, section::ELEMENT, e);
    }

    if let Some(count) = module.data_count {
        let mut e = ByteEmitter::default();
        e.uleb(count as u64);
        push_section(&mut out, section::DATA_COUNT, e);
    }

    if !module.code.is_empty() {
        let mut e = ByteEmitter::default();
        e.uleb(module.code.len() as u64);
        for body in &module.code {
            let mut b = ByteEmitter::default();
            b.uleb(body.locals.len() as u64);
            for (run, ty) in &body.locals {
                b.uleb(*run as u64);
                b.val_type(*ty);
            }
            b.expr(&body.body);
            e.uleb(b.bytes.len() as u64);
            e.raw(&b.bytes);
        }
        push_section(&mut out, section::CODE, e);
    }

    if !module.data.is_empty() {
        let mut e = ByteEmitter::default();
        e.uleb(module.data.len() as u64);
        for segment in &module.data {
            e.uleb(segment.flags as u64);
            if segment.flags == 2 {
                e.uleb(0);
            }
            if let Some(offset) = &segment.offset {
                e.expr(offset);
            }
            e.uleb(segment.bytes.len() as u64);
            e.raw(&segment.bytes);
        }
        push_section(&mut out, section::DATA, e);
    }

    if let Some(features) = &module.target_features {
        let mut e = ByteEmitter::default();
        e.name("target_features");
        e.uleb(features.len() as u64);
        for feature in features {
            e.byte(b'+');
            e.name(feature);
        }
        push_section(&mut out, section::CUSTOM, e);
    }

    for custom in &module.customs {
        let mut e = ByteEmitter::default();
        e.name(&custom.name);
        e.raw(&custom.bytes);
        push_section(&mut out, section::CUSTOM, e);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_module;
    use crate::types::ValType;

    fn answer_module() -> Module {
        Module {
            types: vec![FuncType {
                params: vec![],
                results: vec![ValType::I32],
            }],
            functions: vec![0],
            exports: vec![Export {
                name: "main".into(),
                kind: ExternalKind::Func,
                index: 0,
            }],
            code: vec![FuncBody {
                locals: vec![],
                body: vec![Instr::I32Const { value: 42 }],
            }],
            ..Module::default()
        }
    }

    #[test]
    fn test_emit_minimal_module() {
        let bytes = emit_module(&answer_module());
        let expected: &[u8] = &[
            0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00, //
            0x01, 0x05, 0x01, 0x60, 0x00, 0x01, 0x7F, //
            0x03, 0x02, 0x01, 0x00, //
            0x07, 0x08, 0x01, 0x04, b'm', b'a', b'i', b'n', 0x00, 0x00, //
            0x0A, 0x06, 0x01, 0x04, 0x00, 0x41, 0x2A, 0x0B,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_parse_emit_identity() {
        let bytes = emit_module(&answer_module());
        let reparsed = parse_module(&bytes).unwrap();
        assert_eq!(emit_module(&reparsed), bytes);
    }

    #[test]
    fn test_sleb_minimality() {
        let cases: &[(i64, &[u8])] = &[
            (0, &[0x00]),
            (1, &[0x01]),
            (-1, &[0x7F]),
            (63, &[0x3F]),
            (64, &[0xC0, 0x00]),
            (-64, &[0x40]),
            (-65, &[0xBF, 0x7F]),
            (type_code::FUNC, &[0x60]),
        ];
        for (value, expected) in cases {
            let mut e = ByteEmitter::default();
            e.sleb(*value);
            assert_eq!(&e.bytes, expected, "sleb({value})");
        }
        let mut e = ByteEmitter::default();
        e.sleb(i64::MIN);
        assert_eq!(e.bytes.len(), 10);
        assert_eq!(e.bytes.last().map(|b| b & 0x80), Some(0));
    }

    #[test]
    fn test_expr_nesting() {
        let module = Module {
            types: vec![FuncType::default()],
            functions: vec![0],
            code: vec![FuncBody {
                locals: vec![(2, ValType::I64)],
                body: vec![Instr::Block {
                    ty: crate::types::BlockType::Empty,
                    body: vec![Instr::If {
                        ty: crate::types::BlockType::Empty,
                        then: vec![Instr::Nop],
                        els: Some(vec![Instr::Br { label: 1 }]),
                    }],
                }],
            }],
            ..Module::default()
        };
        let bytes = emit_module(&module);
        let reparsed = parse_module(&bytes).unwrap();
        assert_eq!(reparsed.code, module.code);
        assert_eq!(emit_module(&reparsed), bytes);
    }
}
