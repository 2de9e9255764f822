//! Compressed bit stream → [`Module`].
//!
//! The exact mirror of [`crate::pack`]: the payload window is read first and
//! every subsequent read is bounded by it, then one Huffman decode tree per
//! category is rebuilt from the headers, then sections are read in the same
//! canonical order the packer wrote them. Elided categories produce their
//! hard-coded constants without consuming any bits.
//!
//! All failures are corrupt-stream errors carrying the bit offset of first
//! detection; nothing is salvaged from a partially decoded module.

use std::collections::BTreeMap;

use qrwasm_core::bitstream::BitReader;
use qrwasm_core::error::{QrWasmError, Result};
use qrwasm_core::huffman::HuffmanTree;

use crate::instr::{Expr, Instr, MemArg};
use crate::module::*;
use crate::opcodes::{atomic, misc, op, section, simd, type_code};
use crate::parse::{section_rank, validate_module};
use crate::schema::{
    HUFFMAN_KINDS, Policy, SIZE_LEB_GROUP, ValueKind, WASM_LEB_GROUP, f64_alphabet_to_bits,
};
use crate::types::{BlockType, Limits, ValType};

/// Deepest block/loop/if nesting either reader accepts.
pub(crate) const MAX_NESTING_DEPTH: u32 = 1024;

/// Decode a length-prefixed compressed stream into a module.
pub fn unpack_module(bytes: &[u8]) -> Result<Module> {
    let mut reader = BitReader::new(bytes);
    let total = reader.read_leb_unsigned(SIZE_LEB_GROUP)?;
    let window_end = reader
        .bit_position()
        .checked_add(total)
        .ok_or_else(|| QrWasmError::corrupt(0, "payload length overflows"))?;
    reader.shrink_limit(window_end)?;

    let mut trees = BTreeMap::new();
    for kind in HUFFMAN_KINDS {
        trees.insert(kind, HuffmanTree::read_header(&mut reader)?);
    }

    let mut unpacker = Unpacker { reader, trees };
    let module = unpacker.module()?;
    validate_module(&module)?;
    Ok(module)
}

struct Unpacker<'a> {
    reader: BitReader<'a>,
    trees: BTreeMap<ValueKind, HuffmanTree>,
}

impl Unpacker<'_> {
    fn pos(&self) -> u64 {
        self.reader.bit_position()
    }

    fn corrupt(&self, message: impl Into<String>) -> QrWasmError {
        QrWasmError::corrupt(self.pos(), message)
    }

    /// Read one schema value under its policy.
    fn value(&mut self, kind: ValueKind) -> Result<i64> {
        match kind.policy() {
            Policy::Huffman => {
                let tree = self.trees.get(&kind).expect("one tree per category");
                tree.decode_value(&mut self.reader)
            }
            Policy::Leb => Ok(self.reader.read_leb_unsigned(WASM_LEB_GROUP)? as i64),
            Policy::Fixed(bits) => Ok(self.reader.read_bits_unsigned(bits)? as i64),
            Policy::Elided => Ok(kind.elided_constant()),
            Policy::Bool1 => Ok(self.reader.read_bit()? as i64),
            Policy::Raw8 => Ok(self.reader.read_bits_unsigned(8)? as i64),
        }
    }

    /// Read a value and require it to fit an unsigned 32-bit index.
    fn index(&mut self, kind: ValueKind) -> Result<u32> {
        let v = self.value(kind)?;
        u32::try_from(v).map_err(|_| self.corrupt(format!("{kind:?} value {v} out of range")))
    }

    fn count(&mut self, kind: ValueKind) -> Result<usize> {
        Ok(self.index(kind)? as usize)
    }

    fn bytes(&mut self, kind: ValueKind, len: usize) -> Result<Vec<u8>> {
        if (len as u64).saturating_mul(8) > self.reader.remaining() {
            return Err(self.corrupt(format!(
                "declared {len}-byte buffer exceeds the remaining payload"
            )));
        }
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.value(kind)? as u8);
        }
        Ok(out)
    }

    /// Clamp a declared count before it sizes an allocation; the per-item
    /// reads still enforce the payload window.
    fn capacity(count: usize) -> usize {
        count.min(1 << 16)
    }

    fn string(&mut self) -> Result<String> {
        let len = self.count(ValueKind::InlineBufferSize)?;
        let bytes = self.bytes(ValueKind::StringByte, len)?;
        String::from_utf8(bytes).map_err(|_| self.corrupt("string is not valid UTF-8"))
    }

    fn type_code(&mut self) -> Result<i64> {
        self.value(ValueKind::TypeCode)
    }

    fn val_type(&mut self) -> Result<ValType> {
        ValType::from_code(self.type_code()?)
    }

    fn ref_type(&mut self) -> Result<ValType> {
        let ty = self.val_type()?;
        if !ty.is_ref() {
            return Err(self.corrupt("expected a reference type"));
        }
        Ok(ty)
    }

    fn block_type(&mut self) -> Result<BlockType> {
        BlockType::from_code(self.type_code()?)
    }

    fn limits(&mut self) -> Result<Limits> {
        let flags = self.value(ValueKind::SegmentFlags)? as u8;
        let has_max = flags & crate::opcodes::limits::HAS_MAX != 0;
        let shared = flags & crate::opcodes::limits::SHARED != 0;
        if flags & crate::opcodes::limits::MEMORY64 != 0 {
            return Err(self.corrupt("64-bit limits flag in the stream"));
        }
        if shared && !has_max {
            return Err(self.corrupt("shared limits require a maximum"));
        }
        let min = self.reader.read_leb_unsigned(WASM_LEB_GROUP)?;
        let max = if has_max {
            Some(self.reader.read_leb_unsigned(WASM_LEB_GROUP)?)
        } else {
            None
        };
        Ok(Limits {
            min,
            max,
            shared,
            memory64: false,
        })
    }

    fn mem_arg(&mut self) -> Result<MemArg> {
        let align = self.index(ValueKind::MemoryAccessAlignment)?;
        let offset = self.value(ValueKind::MemoryAccessOffset)?;
        if offset < 0 {
            return Err(self.corrupt("negative memory offset"));
        }
        Ok(MemArg {
            align,
            offset: offset as u64,
        })
    }

    fn opcode(&mut self) -> Result<u8> {
        let v = self.value(ValueKind::AstOp)?;
        u8::try_from(v).map_err(|_| self.corrupt(format!("opcode value {v} out of range")))
    }

    fn sub_opcode(&mut self) -> Result<u32> {
        let v = self.value(ValueKind::AstOpExt)?;
        u32::try_from(v).map_err(|_| self.corrupt(format!("sub-opcode value {v} out of range")))
    }

    fn lane(&mut self) -> Result<u8> {
        Ok(self.value(ValueKind::SimdLane)? as u8)
    }

    fn expr(&mut self) -> Result<Expr> {
        Ok(self.instrs(false, 0)?.0)
    }

    fn instrs(&mut self, allow_else: bool, depth: u32) -> Result<(Expr, bool)> {
        if depth > MAX_NESTING_DEPTH {
            return Err(self.corrupt("expression nesting too deep"));
        }
        let mut out = Vec::new();
        loop {
            let opcode = self.opcode()?;
            let instr = match opcode {
                op::END => return Ok((out, false)),
                op::ELSE => {
                    if allow_else {
                        return Ok((out, true));
                    }
                    return Err(self.corrupt("else outside an if"));
                }
                op::UNREACHABLE => Instr::Unreachable,
                op::NOP => Instr::Nop,
                op::BLOCK => {
                    let ty = self.block_type()?;
                    let (body, _) = self.instrs(false, depth + 1)?;
                    Instr::Block { ty, body }
                }
                op::LOOP => {
                    let ty = self.block_type()?;
                    let (body, _) = self.instrs(false, depth + 1)?;
                    Instr::Loop { ty, body }
                }
                op::IF => {
                    let ty = self.block_type()?;
                    let (then, has_else) = self.instrs(true, depth + 1)?;
                    let els = if has_else {
                        Some(self.instrs(false, depth + 1)?.0)
                    } else {
                        None
                    };
                    Instr::If { ty, then, els }
                }
                op::BR => Instr::Br {
                    label: self.index(ValueKind::BreakIndex)?,
                },
                op::BR_IF => Instr::BrIf {
                    label: self.index(ValueKind::BreakIndex)?,
                },
                op::BR_TABLE => {
                    let count = self.count(ValueKind::SwitchTargetCount)?;
                    let mut targets = Vec::with_capacity(Self::capacity(count));
                    for _ in 0..count {
                        targets.push(self.index(ValueKind::BreakIndex)?);
                    }
                    let default = self.index(ValueKind::BreakIndex)?;
                    Instr::BrTable { targets, default }
                }
                op::RETURN => Instr::Return,
                op::CALL => Instr::Call {
                    func: self.index(ValueKind::FunctionIndex)?,
                },
                op::CALL_INDIRECT => {
                    let ty = self.index(ValueKind::TypeIndex)?;
                    let table = self.index(ValueKind::TableIndex)?;
                    Instr::CallIndirect { ty, table }
                }
                op::DROP => Instr::Drop,
                op::SELECT => Instr::Select,
                op::SELECT_T => {
                    let count = self.count(ValueKind::SelectTypeCount)?;
                    let mut types = Vec::with_capacity(Self::capacity(count));
                    for _ in 0..count {
                        types.push(self.val_type()?);
                    }
                    Instr::SelectT { types }
                }
                op::LOCAL_GET => Instr::LocalGet {
                    local: self.index(ValueKind::LocalIndex)?,
                },
                op::LOCAL_SET => Instr::LocalSet {
                    local: self.index(ValueKind::LocalIndex)?,
                },
                op::LOCAL_TEE => Instr::LocalTee {
                    local: self.index(ValueKind::LocalIndex)?,
                },
                op::GLOBAL_GET => Instr::GlobalGet {
                    global: self.index(ValueKind::GlobalIndex)?,
                },
                op::GLOBAL_SET => Instr::GlobalSet {
                    global: self.index(ValueKind::GlobalIndex)?,
                },
                op::TABLE_GET => Instr::TableGet {
                    table: self.index(ValueKind::TableIndex)?,
                },
                op::TABLE_SET => Instr::TableSet {
                    table: self.index(ValueKind::TableIndex)?,
                },
                op::LOAD_FIRST..=op::LOAD_LAST => Instr::Load {
                    op: opcode,
                    arg: self.mem_arg()?,
                },
                op::STORE_FIRST..=op::STORE_LAST => Instr::Store {
                    op: opcode,
                    arg: self.mem_arg()?,
                },
                op::MEMORY_SIZE => {
                    self.value(ValueKind::MemorySizeFlag)?;
                    Instr::MemorySize
                }
                op::MEMORY_GROW => {
                    self.value(ValueKind::MemoryGrowFlag)?;
                    Instr::MemoryGrow
                }
                op::I32_CONST => {
                    let v = self.value(ValueKind::ConstI32)?;
                    let value = i32::try_from(v)
                        .map_err(|_| self.corrupt("i32 constant out of range"))?;
                    Instr::I32Const { value }
                }
                op::I64_CONST => Instr::I64Const {
                    value: self.value(ValueKind::ConstI64)?,
                },
                op::F32_CONST => {
                    let v = self.value(ValueKind::ConstF32)?;
                    let bits = u32::try_from(v)
                        .map_err(|_| self.corrupt("f32 bit pattern out of range"))?;
                    Instr::F32Const { bits }
                }
                op::F64_CONST => Instr::F64Const {
                    bits: f64_alphabet_to_bits(self.value(ValueKind::ConstF64)?),
                },
                op::NUMERIC_FIRST..=op::NUMERIC_LAST => Instr::Numeric { op: opcode },
                op::REF_NULL => Instr::RefNull {
                    ty: self.ref_type()?,
                },
                op::REF_IS_NULL => Instr::RefIsNull,
                op::REF_FUNC => Instr::RefFunc {
                    func: self.index(ValueKind::FunctionIndex)?,
                },
                op::MISC_PREFIX => self.misc_instr()?,
                op::SIMD_PREFIX => self.simd_instr()?,
                op::ATOMIC_PREFIX => self.atomic_instr()?,
                _ => return Err(self.corrupt(format!("opcode {opcode:#04x}"))),
            };
            out.push(instr);
        }
    }

    fn misc_instr(&mut self) -> Result<Instr> {
        let sub = self.sub_opcode()?;
        Ok(match sub {
            0..=misc::TRUNC_SAT_LAST => Instr::TruncSat { op: sub },
            misc::MEMORY_INIT => {
                let data = self.index(ValueKind::DataSegmentIndex)?;
                self.value(ValueKind::MemoryIndex)?;
                Instr::MemoryInit { data }
            }
            misc::DATA_DROP => Instr::DataDrop {
                data: self.index(ValueKind::DataSegmentIndex)?,
            },
            misc::MEMORY_COPY => {
                self.value(ValueKind::MemoryIndex)?;
                self.value(ValueKind::MemoryIndex)?;
                Instr::MemoryCopy
            }
            misc::MEMORY_FILL => {
                self.value(ValueKind::MemoryIndex)?;
                Instr::MemoryFill
            }
            misc::TABLE_INIT => {
                let elem = self.index(ValueKind::ElementSegmentIndex)?;
                let table = self.index(ValueKind::TableIndex)?;
                Instr::TableInit { elem, table }
            }
            misc::ELEM_DROP => Instr::ElemDrop {
                elem: self.index(ValueKind::ElementSegmentIndex)?,
            },
            misc::TABLE_COPY => {
                let dst = self.index(ValueKind::TableIndex)?;
                let src = self.index(ValueKind::TableIndex)?;
                Instr::TableCopy { dst, src }
            }
            misc::TABLE_GROW => Instr::TableGrow {
                table: self.index(ValueKind::TableIndex)?,
            },
            misc::TABLE_SIZE => Instr::TableSize {
                table: self.index(ValueKind::TableIndex)?,
            },
            misc::TABLE_FILL => Instr::TableFill {
                table: self.index(ValueKind::TableIndex)?,
            },
            _ => return Err(self.corrupt(format!("misc opcode 0xFC {sub}"))),
        })
    }

    fn simd_instr(&mut self) -> Result<Instr> {
        let sub = self.sub_opcode()?;
        Ok(match sub {
            simd::LOAD_FIRST..=simd::LOAD_LAST
            | simd::STORE
            | simd::LOAD32_ZERO
            | simd::LOAD64_ZERO => Instr::SimdMem {
                op: sub,
                arg: self.mem_arg()?,
            },
            simd::V128_CONST => {
                let bytes = self.bytes(ValueKind::V128Byte, 16)?;
                Instr::V128Const {
                    bytes: bytes.try_into().expect("16 bytes"),
                }
            }
            simd::I8X16_SHUFFLE => {
                let mut lanes = [0u8; 16];
                for lane in &mut lanes {
                    *lane = self.lane()?;
                }
                Instr::I8x16Shuffle { lanes }
            }
            simd::LANE_FIRST..=simd::LANE_LAST => {
                let lane = self.lane()?;
                Instr::SimdLane { op: sub, lane }
            }
            simd::MEM_LANE_FIRST..=simd::MEM_LANE_LAST => {
                let arg = self.mem_arg()?;
                let lane = self.lane()?;
                Instr::SimdMemLane { op: sub, arg, lane }
            }
            _ if sub <= simd::PLAIN_LAST => Instr::Simd { op: sub },
            _ => return Err(self.corrupt(format!("SIMD opcode 0xFD {sub}"))),
        })
    }

    fn atomic_instr(&mut self) -> Result<Instr> {
        let sub = self.sub_opcode()?;
        Ok(match sub {
            atomic::FENCE => {
                let order = self.value(ValueKind::AtomicFenceOrder)?;
                let order = u8::try_from(order)
                    .map_err(|_| self.corrupt("fence order out of range"))?;
                Instr::AtomicFence { order }
            }
            atomic::NOTIFY..=atomic::MEM_LAST => Instr::AtomicMem {
                op: sub,
                arg: self.mem_arg()?,
            },
            _ => return Err(self.corrupt(format!("atomic opcode 0xFE {sub}"))),
        })
    }

    /// Read every section within the payload window.
    fn module(&mut self) -> Result<Module> {
        let mut m = Module::default();
        self.value(ValueKind::Magic)?;
        self.value(ValueKind::Version)?;

        let mut last_rank = 0u8;
        let mut first_section = true;
        let mut customs_started = false;

        while self.reader.remaining() > 0 {
            let kind = self.value(ValueKind::SectionKind)? as u8;
            let size = self.reader.read_leb_unsigned(SIZE_LEB_GROUP)?;
            let body_start = self.pos();
            let body_end = body_start
                .checked_add(size)
                .filter(|&end| end <= self.reader.limit())
                .ok_or_else(|| self.corrupt("section size runs past the payload"))?;

            if kind == section::CUSTOM {
                self.custom_section(&mut m, first_section, &mut customs_started)?;
            } else {
                if customs_started {
                    return Err(self.corrupt("custom section between standard sections"));
                }
                if kind == section::TAG {
                    return Err(self.corrupt("tag section"));
                }
                let rank = section_rank(kind)
                    .ok_or_else(|| self.corrupt(format!("section kind {kind}")))?;
                if rank <= last_rank {
                    return Err(
                        self.corrupt(format!("section kind {kind} out of order or duplicated"))
                    );
                }
                last_rank = rank;
                self.standard_section(kind, &mut m)?;
            }

            if self.pos() != body_end {
                return Err(self.corrupt(format!(
                    "section kind {kind} declared {size} bits but used {}",
                    self.pos() - body_start
                )));
            }
            first_section = false;
        }
        Ok(m)
    }

    fn custom_section(
        &mut self,
        m: &mut Module,
        first_section: bool,
        customs_started: &mut bool,
    ) -> Result<()> {
        let name = self.string()?;
        match name.as_str() {
            "dylink" => {
                if !first_section {
                    return Err(self.corrupt("dylink section not at the front"));
                }
                let mut fields = [0u64; 4];
                for field in &mut fields {
                    *field = self.value(ValueKind::DylinkField)? as u64;
                }
                let count = self.count(ValueKind::NeededDynlibCount)?;
                let mut needed = Vec::with_capacity(Self::capacity(count));
                for _ in 0..count {
                    needed.push(self.string()?);
                }
                m.dylink = Some(DylinkSection {
                    memory_size: fields[0],
                    memory_alignment: fields[1],
                    table_size: fields[2],
                    table_alignment: fields[3],
                    needed,
                });
            }
            "target_features" => {
                if m.target_features.is_some() {
                    return Err(self.corrupt("duplicate target_features section"));
                }
                *customs_started = true;
                let count = self.count(ValueKind::FeatureCount)?;
                let mut features = Vec::with_capacity(Self::capacity(count));
                for _ in 0..count {
                    self.value(ValueKind::FeaturePrefix)?;
                    features.push(self.string()?);
                }
                m.target_features = Some(features);
            }
            _ => {
                *customs_started = true;
                let len = self.count(ValueKind::InlineBufferSize)?;
                let bytes = self.bytes(ValueKind::UserSectionByte, len)?;
                m.customs.push(CustomSection { name, bytes });
            }
        }
        Ok(())
    }

    fn standard_section(&mut self, kind: u8, m: &mut Module) -> Result<()> {
        match kind {
            section::TYPE => {
                let count = self.count(ValueKind::TypeCount)?;
                for _ in 0..count {
                    let form = self.type_code()?;
                    if form != type_code::FUNC {
                        return Err(self.corrupt(format!("type form {form:#x}")));
                    }
                    let param_count = self.count(ValueKind::ParamCount)?;
                    let mut params = Vec::with_capacity(Self::capacity(param_count));
                    for _ in 0..param_count {
                        params.push(self.val_type()?);
                    }
                    let result_count = self.count(ValueKind::ResultCount)?;
                    let mut results = Vec::with_capacity(Self::capacity(result_count));
                    for _ in 0..result_count {
                        results.push(self.val_type()?);
                    }
                    m.types.push(FuncType { params, results });
                }
            }
            section::IMPORT => {
                let count = self.count(ValueKind::ImportCount)?;
                for _ in 0..count {
                    let module_name = self.string()?;
                    let field = self.string()?;
                    let kind_tag = self.value(ValueKind::ExternalKind)? as u8;
                    let desc = match ExternalKind::from_byte(kind_tag) {
                        Some(ExternalKind::Func) => {
                            ImportDesc::Func(self.index(ValueKind::TypeIndex)?)
                        }
                        Some(ExternalKind::Table) => {
                            let element = self.ref_type()?;
                            let limits = self.limits()?;
                            ImportDesc::Table(TableType { element, limits })
                        }
                        Some(ExternalKind::Memory) => ImportDesc::Memory(self.limits()?),
                        Some(ExternalKind::Global) => {
                            let content = self.val_type()?;
                            let mutable = self.value(ValueKind::Mutability)? != 0;
                            ImportDesc::Global(GlobalType { content, mutable })
                        }
                        None => return Err(self.corrupt(format!("import kind {kind_tag}"))),
                    };
                    m.imports.push(Import {
                        module: module_name,
                        field,
                        desc,
                    });
                }
            }
            section::FUNCTION => {
                let count = self.count(ValueKind::FunctionCount)?;
                for _ in 0..count {
                    m.functions.push(self.index(ValueKind::TypeIndex)?);
                }
            }
            section::TABLE => {
                let count = self.count(ValueKind::TableCount)?;
                for _ in 0..count {
                    let element = self.ref_type()?;
                    let limits = self.limits()?;
                    m.tables.push(TableType { element, limits });
                }
            }
            section::MEMORY => {
                let count = self.count(ValueKind::MemoryCount)?;
                for _ in 0..count {
                    m.memories.push(self.limits()?);
                }
            }
            section::GLOBAL => {
                let count = self.count(ValueKind::GlobalCount)?;
                for _ in 0..count {
                    let content = self.val_type()?;
                    let mutable = self.value(ValueKind::Mutability)? != 0;
                    let init = self.expr()?;
                    m.globals.push(Global {
                        ty: GlobalType { content, mutable },
                        init,
                    });
                }
            }
            section::EXPORT => {
                let count = self.count(ValueKind::ExportCount)?;
                for _ in 0..count {
                    let name = self.string()?;
                    let kind_tag = self.value(ValueKind::ExternalKind)? as u8;
                    let kind = ExternalKind::from_byte(kind_tag)
                        .ok_or_else(|| self.corrupt(format!("export kind {kind_tag}")))?;
                    let index = match kind {
                        ExternalKind::Func => self.index(ValueKind::FunctionIndex)?,
                        ExternalKind::Table => self.index(ValueKind::TableIndex)?,
                        ExternalKind::Memory => self.index(ValueKind::MemoryIndex)?,
                        ExternalKind::Global => self.index(ValueKind::GlobalIndex)?,
                    };
                    m.exports.push(Export { name, kind, index });
                }
            }
            section::START => {
                m.start = Some(self.index(ValueKind::FunctionIndex)?);
            }
            section::ELEMENT => {
                let count = self.count(ValueKind::ElementSegmentCount)?;
                for _ in 0..count {
                    m.elements.push(self.element_segment()?);
                }
            }
            section::DATA_COUNT => {
                m.data_count = Some(self.index(ValueKind::DataCount)?);
            }
            section::CODE => {
                let count = self.count(ValueKind::CodeCount)?;
                for _ in 0..count {
                    m.code.push(self.func_body()?);
                }
            }
            section::DATA => {
                let count = self.count(ValueKind::DataSegmentCount)?;
                for _ in 0..count {
                    let flags = self.value(ValueKind::SegmentFlags)? as u8;
                    if flags > 2 {
                        return Err(self.corrupt(format!("data segment flags {flags}")));
                    }
                    if flags == 2 {
                        self.value(ValueKind::MemoryIndex)?;
                    }
                    let offset = if flags == 1 { None } else { Some(self.expr()?) };
                    let len = self.count(ValueKind::InlineBufferSize)?;
                    let bytes = self.bytes(ValueKind::DataSegmentByte, len)?;
                    m.data.push(DataSegment {
                        flags,
                        offset,
                        bytes,
                    });
                }
            }
            _ => return Err(self.corrupt(format!("section kind {kind}"))),
        }
        Ok(())
    }

    fn element_segment(&mut self) -> Result<ElementSegment> {
        let flags = self.value(ValueKind::SegmentFlags)? as u8;
        let mut segment = ElementSegment {
            flags,
            table: 0,
            offset: None,
            element: ValType::FuncRef,
            funcs: Vec::new(),
            exprs: Vec::new(),
        };
        if segment.has_table_index() {
            segment.table = self.index(ValueKind::TableIndex)?;
        }
        if segment.is_active() {
            segment.offset = Some(self.expr()?);
        }
        if segment.has_type_field() {
            if segment.uses_exprs() {
                segment.element = self.ref_type()?;
            } else {
                self.value(ValueKind::ElemKindFuncRef)?;
            }
        }
        let count = self.count(ValueKind::ElementSegmentSize)?;
        if segment.uses_exprs() {
            for _ in 0..count {
                segment.exprs.push(self.expr()?);
            }
        } else {
            for _ in 0..count {
                segment.funcs.push(self.index(ValueKind::FunctionIndex)?);
            }
        }
        Ok(segment)
    }

    fn func_body(&mut self) -> Result<FuncBody> {
        let size = self.reader.read_leb_unsigned(SIZE_LEB_GROUP)?;
        let body_start = self.pos();
        let body_end = body_start
            .checked_add(size)
            .filter(|&end| end <= self.reader.limit())
            .ok_or_else(|| self.corrupt("function body size runs past the payload"))?;

        let run_count = self.count(ValueKind::LocalRunCount)?;
        let mut locals = Vec::with_capacity(Self::capacity(run_count));
        for _ in 0..run_count {
            let run = self.index(ValueKind::LocalRunLength)?;
            let ty = self.val_type()?;
            locals.push((run, ty));
        }
        let body = self.expr()?;

        if self.pos() != body_end {
            return Err(self.corrupt("function body size mismatch"));
        }
        Ok(FuncBody { locals, body })
    }
}

