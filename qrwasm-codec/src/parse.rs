//! Standard wasm binary format → [`Module`].
//!
//! The parser is deliberately strict: anything the canonical serializer in
//! [`crate::emit`] would not reproduce byte-for-byte is refused up front
//! (non-minimal LEB encodings, out-of-order or duplicate sections, interior
//! custom sections, trailing bytes). Acceptance here is what makes the
//! compress/decompress round-trip guarantee hold.
//!
//! Constructs outside the supported schema — tags, GC, exception handling,
//! multi-memory — are refused with unsupported-feature errors rather than
//! parsed into something the compressed format could not express.

use qrwasm_core::error::{QrWasmError, Result};

use crate::instr::{Expr, Instr, MemArg};
use crate::module::*;
use crate::opcodes::{MAGIC, VERSION, atomic, limits as limit_flags, misc, op, section, simd};
use crate::types::{BlockType, Limits, ValType};

/// Section ordering ranks; a section may only follow strictly lower ranks.
/// Shared with the compressed-stream reader, which enforces the same order.
pub(crate) fn section_rank(id: u8) -> Option<u8> {
    match id {
        section::TYPE => Some(1),
        section::IMPORT => Some(2),
        section::FUNCTION => Some(3),
        section::TABLE => Some(4),
        section::MEMORY => Some(5),
        section::GLOBAL => Some(6),
        section::EXPORT => Some(7),
        section::START => Some(8),
        section::ELEMENT => Some(9),
        section::DATA_COUNT => Some(10),
        section::CODE => Some(11),
        section::DATA => Some(12),
        _ => None,
    }
}

/// Cursor over a standard-format byte buffer.
struct ByteParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteParser<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn bit_pos(&self) -> u64 {
        self.pos as u64 * 8
    }

    fn byte(&mut self) -> Result<u8> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| QrWasmError::unexpected_end(self.bit_pos(), 8))?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.pos + count > self.bytes.len() {
            return Err(QrWasmError::unexpected_end(
                self.bit_pos(),
                ((self.pos + count - self.bytes.len()) * 8) as u64,
            ));
        }
        let slice = &self.bytes[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    /// Unsigned LEB128, at most `max_bits` of payload, minimal encoding only.
    fn uleb(&mut self, max_bits: u32) -> Result<u64> {
        let mut out = 0u64;
        let mut shift = 0u32;
        let mut count = 0u32;
        loop {
            let b = self.byte()?;
            let payload = (b & 0x7F) as u64;
            if shift >= max_bits || (payload >> (max_bits - shift).min(7)) != 0 {
                return Err(QrWasmError::corrupt(
                    self.bit_pos(),
                    format!("LEB value exceeds {max_bits} bits"),
                ));
            }
            out |= payload << shift;
            shift += 7;
            count += 1;
            if b & 0x80 == 0 {
                if count > 1 && payload == 0 {
                    return Err(QrWasmError::unsupported("non-canonical LEB encoding"));
                }
                return Ok(out);
            }
        }
    }

    fn u32_leb(&mut self) -> Result<u32> {
        Ok(self.uleb(32)? as u32)
    }

    fn u64_leb(&mut self) -> Result<u64> {
        self.uleb(64)
    }

    /// Signed LEB128, at most `max_bits` including the sign, minimal only.
    fn sleb(&mut self, max_bits: u32) -> Result<i64> {
        let mut out = 0i64;
        let mut shift = 0u32;
        let mut count = 0u32;
        loop {
            let b = self.byte()?;
            let payload = (b & 0x7F) as i64;
            out |= payload << shift;
            shift += 7;
            count += 1;
            if b & 0x80 == 0 {
                // Sign-extend from the final group.
                if shift < 64 && (b & 0x40) != 0 {
                    out |= -1i64 << shift;
                }
                // Range check against max_bits.
                if max_bits < 64 {
                    let min = -(1i64 << (max_bits - 1));
                    let max = (1i64 << (max_bits - 1)) - 1;
                    if out < min || out > max {
                        return Err(QrWasmError::corrupt(
                            self.bit_pos(),
                            format!("signed LEB value exceeds {max_bits} bits"),
                        ));
                    }
                }
                // Minimality: re-deriving the length must match.
                if count != minimal_sleb_len(out) {
                    return Err(QrWasmError::unsupported(
                        "non-canonical signed LEB encoding",
                    ));
                }
                return Ok(out);
            }
            if count * 7 >= 70 {
                return Err(QrWasmError::corrupt(self.bit_pos(), "unterminated LEB"));
            }
        }
    }

    fn s32_leb(&mut self) -> Result<i32> {
        Ok(self.sleb(32)? as i32)
    }

    fn s33_leb(&mut self) -> Result<i64> {
        self.sleb(33)
    }

    fn s64_leb(&mut self) -> Result<i64> {
        self.sleb(64)
    }

    fn name(&mut self) -> Result<String> {
        let len = self.u32_leb()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            QrWasmError::corrupt(self.bit_pos(), "name is not valid UTF-8")
        })
    }

    fn val_type(&mut self) -> Result<ValType> {
        let b = self.byte()?;
        if b & 0x80 != 0 {
            return Err(QrWasmError::corrupt(self.bit_pos(), "malformed value type"));
        }
        let code = if b & 0x40 != 0 {
            (b & 0x7F) as i64 - 0x80
        } else {
            (b & 0x7F) as i64
        };
        ValType::from_code(code)
    }

    fn ref_type(&mut self) -> Result<ValType> {
        let ty = self.val_type()?;
        if !ty.is_ref() {
            return Err(QrWasmError::corrupt(
                self.bit_pos(),
                "expected a reference type",
            ));
        }
        Ok(ty)
    }

    fn block_type(&mut self) -> Result<BlockType> {
        let peek = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| QrWasmError::unexpected_end(self.bit_pos(), 8))?;
        match peek {
            0x40 => {
                self.pos += 1;
                Ok(BlockType::Empty)
            }
            0x6F | 0x70 | 0x7B..=0x7F => {
                self.pos += 1;
                let code = (peek & 0x7F) as i64 - 0x80;
                Ok(BlockType::Value(ValType::from_code(code)?))
            }
            _ => BlockType::from_code(self.s33_leb()?),
        }
    }

    fn limits(&mut self) -> Result<Limits> {
        let flags = self.byte()?;
        if flags > 7 {
            return Err(QrWasmError::unsupported(format!(
                "limits flags {flags:#x}"
            )));
        }
        let has_max = flags & limit_flags::HAS_MAX != 0;
        let shared = flags & limit_flags::SHARED != 0;
        if flags & limit_flags::MEMORY64 != 0 {
            return Err(QrWasmError::unsupported("64-bit limits"));
        }
        if shared && !has_max {
            return Err(QrWasmError::corrupt(
                self.bit_pos(),
                "shared limits require a maximum",
            ));
        }
        let min = self.uleb(32)?;
        let max = if has_max { Some(self.uleb(32)?) } else { None };
        Ok(Limits {
            min,
            max,
            shared,
            memory64: false,
        })
    }

    fn mem_arg(&mut self) -> Result<MemArg> {
        let align = self.u32_leb()?;
        let offset = self.u64_leb()?;
        Ok(MemArg { align, offset })
    }

    fn lane(&mut self) -> Result<u8> {
        let lane = self.byte()?;
        if lane >= 32 {
            return Err(QrWasmError::corrupt(self.bit_pos(), "lane index over 31"));
        }
        Ok(lane)
    }

    /// Parse instructions until an `end` (or, when `allow_else`, an `else`)
    /// terminator; the terminator is consumed. Returns whether `else` ended
    /// the sequence.
    fn instrs(&mut self, allow_else: bool, depth: u32) -> Result<(Expr, bool)> {
        if depth > crate::unpack::MAX_NESTING_DEPTH {
            return Err(QrWasmError::corrupt(
                self.bit_pos(),
                "expression nesting too deep",
            ));
        }
        let mut out = Vec::new();
        loop {
            let opcode = self.byte()?;
            let instr = match opcode {
                op::END => return Ok((out, false)),
                op::ELSE => {
                    if allow_else {
                        return Ok((out, true));
                    }
                    return Err(QrWasmError::corrupt(
                        self.bit_pos(),
                        "else outside an if",
                    ));
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
                    label: self.u32_leb()?,
                },
                op::BR_IF => Instr::BrIf {
                    label: self.u32_leb()?,
                },
                op::BR_TABLE => {
                    let count = self.u32_leb()?;
                    let mut targets = Vec::with_capacity((count as usize).min(1 << 16));
                    for _ in 0..count {
                        targets.push(self.u32_leb()?);
                    }
                    let default = self.u32_leb()?;
                    Instr::BrTable { targets, default }
                }
                op::RETURN => Instr::Return,
                op::CALL => Instr::Call {
                    func: self.u32_leb()?,
                },
                op::CALL_INDIRECT => {
                    let ty = self.u32_leb()?;
                    let table = self.u32_leb()?;
                    Instr::CallIndirect { ty, table }
                }
                op::DROP => Instr::Drop,
                op::SELECT => Instr::Select,
                op::SELECT_T => {
                    let count = self.u32_leb()?;
                    let mut types = Vec::with_capacity((count as usize).min(1 << 16));
                    for _ in 0..count {
                        types.push(self.val_type()?);
                    }
                    Instr::SelectT { types }
                }
                op::LOCAL_GET => Instr::LocalGet {
                    local: self.u32_leb()?,
                },
                op::LOCAL_SET => Instr::LocalSet {
                    local: self.u32_leb()?,
                },
                op::LOCAL_TEE => Instr::LocalTee {
                    local: self.u32_leb()?,
                },
                op::GLOBAL_GET => Instr::GlobalGet {
                    global: self.u32_leb()?,
                },
                op::GLOBAL_SET => Instr::GlobalSet {
                    global: self.u32_leb()?,
                },
                op::TABLE_GET => Instr::TableGet {
                    table: self.u32_leb()?,
                },
                op::TABLE_SET => Instr::TableSet {
                    table: self.u32_leb()?,
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
                    self.reserved_zero("memory.size")?;
                    Instr::MemorySize
                }
                op::MEMORY_GROW => {
                    self.reserved_zero("memory.grow")?;
                    Instr::MemoryGrow
                }
                op::I32_CONST => Instr::I32Const {
                    value: self.s32_leb()?,
                },
                op::I64_CONST => Instr::I64Const {
                    value: self.s64_leb()?,
                },
                op::F32_CONST => {
                    let bytes = self.take(4)?;
                    Instr::F32Const {
                        bits: u32::from_le_bytes(bytes.try_into().expect("4 bytes")),
                    }
                }
                op::F64_CONST => {
                    let bytes = self.take(8)?;
                    Instr::F64Const {
                        bits: u64::from_le_bytes(bytes.try_into().expect("8 bytes")),
                    }
                }
                op::NUMERIC_FIRST..=op::NUMERIC_LAST => Instr::Numeric { op: opcode },
                op::REF_NULL => Instr::RefNull {
                    ty: self.ref_type()?,
                },
                op::REF_IS_NULL => Instr::RefIsNull,
                op::REF_FUNC => Instr::RefFunc {
                    func: self.u32_leb()?,
                },
                op::MISC_PREFIX => self.misc_instr()?,
                op::SIMD_PREFIX => self.simd_instr()?,
                op::ATOMIC_PREFIX => self.atomic_instr()?,
                _ => {
                    return Err(QrWasmError::unsupported(format!(
                        "opcode {opcode:#04x}"
                    )));
                }
            };
            out.push(instr);
        }
    }

    fn reserved_zero(&mut self, what: &str) -> Result<()> {
        let b = self.byte()?;
        if b != 0 {
            return Err(QrWasmError::unsupported(format!(
                "{what} with non-zero memory index"
            )));
        }
        Ok(())
    }

    fn misc_instr(&mut self) -> Result<Instr> {
        let sub = self.u32_leb()?;
        Ok(match sub {
            0..=misc::TRUNC_SAT_LAST => Instr::TruncSat { op: sub },
            misc::MEMORY_INIT => {
                let data = self.u32_leb()?;
                self.reserved_zero("memory.init")?;
                Instr::MemoryInit { data }
            }
            misc::DATA_DROP => Instr::DataDrop {
                data: self.u32_leb()?,
            },
            misc::MEMORY_COPY => {
                self.reserved_zero("memory.copy")?;
                self.reserved_zero("memory.copy")?;
                Instr::MemoryCopy
            }
            misc::MEMORY_FILL => {
                self.reserved_zero("memory.fill")?;
                Instr::MemoryFill
            }
            misc::TABLE_INIT => {
                let elem = self.u32_leb()?;
                let table = self.u32_leb()?;
                Instr::TableInit { elem, table }
            }
            misc::ELEM_DROP => Instr::ElemDrop {
                elem: self.u32_leb()?,
            },
            misc::TABLE_COPY => {
                let dst = self.u32_leb()?;
                let src = self.u32_leb()?;
                Instr::TableCopy { dst, src }
            }
            misc::TABLE_GROW => Instr::TableGrow {
                table: self.u32_leb()?,
            },
            misc::TABLE_SIZE => Instr::TableSize {
                table: self.u32_leb()?,
            },
            misc::TABLE_FILL => Instr::TableFill {
                table: self.u32_leb()?,
            },
            _ => {
                return Err(QrWasmError::unsupported(format!(
                    "misc opcode 0xFC {sub}"
                )));
            }
        })
    }

    fn simd_instr(&mut self) -> Result<Instr> {
        let sub = self.u32_leb()?;
        Ok(match sub {
            simd::LOAD_FIRST..=simd::LOAD_LAST
            | simd::STORE
            | simd::LOAD32_ZERO
            | simd::LOAD64_ZERO => Instr::SimdMem {
                op: sub,
                arg: self.mem_arg()?,
            },
            simd::V128_CONST => {
                let bytes = self.take(16)?;
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
            _ => {
                return Err(QrWasmError::unsupported(format!(
                    "SIMD opcode 0xFD {sub}"
                )));
            }
        })
    }

    fn atomic_instr(&mut self) -> Result<Instr> {
        let sub = self.u32_leb()?;
        Ok(match sub {
            atomic::FENCE => Instr::AtomicFence { order: self.byte()? },
            atomic::NOTIFY..=atomic::MEM_LAST => Instr::AtomicMem {
                op: sub,
                arg: self.mem_arg()?,
            },
            _ => {
                return Err(QrWasmError::unsupported(format!(
                    "atomic opcode 0xFE {sub}"
                )));
            }
        })
    }

    fn expr(&mut self) -> Result<Expr> {
        Ok(self.instrs(false, 0)?.0)
    }
}

/// Minimal signed-LEB byte length of `value`.
fn minimal_sleb_len(value: i64) -> u32 {
    let mut v = value;
    let mut len = 1u32;
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        let done = (v == 0 && byte & 0x40 == 0) || (v == -1 && byte & 0x40 != 0);
        if done {
            return len;
        }
        len += 1;
    }
}

/// Parse a standard wasm binary into a [`Module`].
pub fn parse_module(bytes: &[u8]) -> Result<Module> {
    let mut p = ByteParser::new(bytes);

    let magic = p.take(4)?;
    if magic != MAGIC {
        return Err(QrWasmError::invalid_magic(MAGIC.to_vec(), magic.to_vec()));
    }
    let version = p.take(4)?;
    if version != VERSION {
        return Err(QrWasmError::unsupported(format!(
            "wasm version {version:02x?}"
        )));
    }

    let mut module = Module::default();
    let mut last_rank = 0u8;
    let mut first_section = true;
    let mut customs_started = false;

    while p.pos < p.bytes.len() {
        let id = p.byte()?;
        let size = p.u32_leb()? as usize;
        if p.pos + size > p.bytes.len() {
            return Err(QrWasmError::corrupt(
                p.bit_pos(),
                "section size runs past the end of the file",
            ));
        }
        let end = p.pos + size;

        if id == section::CUSTOM {
            let name = p.name()?;
            match name.as_str() {
                "dylink" => {
                    if !first_section || module.dylink.is_some() {
                        return Err(QrWasmError::unsupported(
                            "dylink section not at the front of the module",
                        ));
                    }
                    module.dylink = Some(parse_dylink(&mut p)?);
                }
                "target_features" => {
                    if module.target_features.is_some() {
                        return Err(QrWasmError::corrupt(
                            p.bit_pos(),
                            "duplicate target_features section",
                        ));
                    }
                    customs_started = true;
                    module.target_features = Some(parse_target_features(&mut p)?);
                }
                _ => {
                    customs_started = true;
                    let remaining = end.checked_sub(p.pos).ok_or_else(|| {
                        QrWasmError::corrupt(p.bit_pos(), "custom section name overruns the section")
                    })?;
                    let payload = p.take(remaining)?;
                    module.customs.push(CustomSection {
                        name,
                        bytes: payload.to_vec(),
                    });
                }
            }
        } else {
            if id == section::TAG {
                return Err(QrWasmError::unsupported("tag section"));
            }
            let rank = section_rank(id).ok_or_else(|| {
                QrWasmError::corrupt(p.bit_pos(), format!("unknown section id {id}"))
            })?;
            if customs_started {
                return Err(QrWasmError::unsupported(
                    "custom section between standard sections",
                ));
            }
            if rank <= last_rank {
                return Err(QrWasmError::corrupt(
                    p.bit_pos(),
                    format!("section id {id} out of order or duplicated"),
                ));
            }
            last_rank = rank;
            parse_standard_section(&mut p, id, &mut module)?;
        }

        if p.pos != end {
            return Err(QrWasmError::corrupt(
                p.bit_pos(),
                format!("section id {id} declared {size} bytes but used a different amount"),
            ));
        }
        first_section = false;
    }

    validate_module(&module)?;
    Ok(module)
}

fn parse_standard_section(p: &mut ByteParser<'_>, id: u8, module: &mut Module) -> Result<()> {
    match id {
        section::TYPE => {
            let count = p.u32_leb()?;
            for _ in 0..count {
                let form = p.sleb(7)?;
                if form != crate::opcodes::type_code::FUNC {
                    return Err(QrWasmError::unsupported(format!(
                        "composite type form {form:#x}"
                    )));
                }
                let param_count = p.u32_leb()?;
                let mut params = Vec::with_capacity((param_count as usize).min(1 << 16));
                for _ in 0..param_count {
                    params.push(p.val_type()?);
                }
                let result_count = p.u32_leb()?;
                let mut results = Vec::with_capacity((result_count as usize).min(1 << 16));
                for _ in 0..result_count {
                    results.push(p.val_type()?);
                }
                module.types.push(FuncType { params, results });
            }
        }
        section::IMPORT => {
            let count = p.u32_leb()?;
            for _ in 0..count {
                let module_name = p.name()?;
                let field = p.name()?;
                let kind = p.byte()?;
                let desc = match kind {
                    0 => ImportDesc::Func(p.u32_leb()?),
                    1 => ImportDesc::Table(parse_table_type(p)?),
                    2 => ImportDesc::Memory(p.limits()?),
                    3 => ImportDesc::Global(parse_global_type(p)?),
                    4 => return Err(QrWasmError::unsupported("tag import")),
                    _ => {
                        return Err(QrWasmError::corrupt(
                            p.bit_pos(),
                            format!("import kind {kind}"),
                        ));
                    }
                };
                module.imports.push(Import {
                    module: module_name,
                    field,
                    desc,
                });
            }
        }
        section::FUNCTION => {
            let count = p.u32_leb()?;
            for _ in 0..count {
                module.functions.push(p.u32_leb()?);
            }
        }
        section::TABLE => {
            let count = p.u32_leb()?;
            for _ in 0..count {
                module.tables.push(parse_table_type(p)?);
            }
        }
        section::MEMORY => {
            let count = p.u32_leb()?;
            for _ in 0..count {
                module.memories.push(p.limits()?);
            }
        }
        section::GLOBAL => {
            let count = p.u32_leb()?;
            for _ in 0..count {
                let ty = parse_global_type(p)?;
                let init = p.expr()?;
                module.globals.push(Global { ty, init });
            }
        }
        section::EXPORT => {
            let count = p.u32_leb()?;
            for _ in 0..count {
                let name = p.name()?;
                let kind_byte = p.byte()?;
                if kind_byte == 4 {
                    return Err(QrWasmError::unsupported("tag export"));
                }
                let kind = ExternalKind::from_byte(kind_byte).ok_or_else(|| {
                    QrWasmError::corrupt(p.bit_pos(), format!("export kind {kind_byte}"))
                })?;
                let index = p.u32_leb()?;
                module.exports.push(Export { name, kind, index });
            }
        }
        section::START => {
            module.start = Some(p.u32_leb()?);
        }
        section::ELEMENT => {
            let count = p.u32_leb()?;
            for _ in 0..count {
                module.elements.push(parse_element(p)?);
            }
        }
        section::DATA_COUNT => {
            module.data_count = Some(p.u32_leb()?);
        }
        section::CODE => {
            let count = p.u32_leb()?;
            for _ in 0..count {
                let size = p.u32_leb()? as usize;
                let body_end = p.pos + size;
                let run_count = p.u32_leb()?;
                let mut locals = Vec::with_capacity((run_count as usize).min(1 << 16));
                for _ in 0..run_count {
                    let run = p.u32_leb()?;
                    let ty = p.val_type()?;
                    locals.push((run, ty));
                }
                let body = p.expr()?;
                if p.pos != body_end {
                    return Err(QrWasmError::corrupt(
                        p.bit_pos(),
                        "function body size mismatch",
                    ));
                }
                module.code.push(FuncBody { locals, body });
            }
        }
        section::DATA => {
            let count = p.u32_leb()?;
            for _ in 0..count {
                let flags = p.u32_leb()?;
                let segment = match flags {
                    0 => DataSegment {
                        flags: 0,
                        offset: Some(p.expr()?),
                        bytes: Vec::new(),
                    },
                    1 => DataSegment {
                        flags: 1,
                        offset: None,
                        bytes: Vec::new(),
                    },
                    2 => {
                        let mem = p.u32_leb()?;
                        if mem != 0 {
                            return Err(QrWasmError::unsupported(
                                "data segment targeting a non-zero memory",
                            ));
                        }
                        DataSegment {
                            flags: 2,
                            offset: Some(p.expr()?),
                            bytes: Vec::new(),
                        }
                    }
                    _ => {
                        return Err(QrWasmError::corrupt(
                            p.bit_pos(),
                            format!("data segment flags {flags}"),
                        ));
                    }
                };
                let len = p.u32_leb()? as usize;
                let bytes = p.take(len)?.to_vec();
                module.data.push(DataSegment { bytes, ..segment });
            }
        }
        _ => unreachable!("ranked section ids are handled above"),
    }
    Ok(())
}

fn parse_table_type(p: &mut ByteParser<'_>) -> Result<TableType> {
    let element = p.ref_type()?;
    let limits = p.limits()?;
    if limits.shared {
        return Err(QrWasmError::unsupported("shared table limits"));
    }
    Ok(TableType { element, limits })
}

fn parse_global_type(p: &mut ByteParser<'_>) -> Result<GlobalType> {
    let content = p.val_type()?;
    let mutable = match p.byte()? {
        0 => false,
        1 => true,
        other => {
            return Err(QrWasmError::corrupt(
                p.bit_pos(),
                format!("global mutability {other}"),
            ));
        }
    };
    Ok(GlobalType { content, mutable })
}

fn parse_element(p: &mut ByteParser<'_>) -> Result<ElementSegment> {
    let flags = p.u32_leb()?;
    if flags > 7 {
        return Err(QrWasmError::unsupported(format!(
            "element segment flags {flags}"
        )));
    }
    let flags = flags as u8;
    let mut segment = ElementSegment {
        flags,
        table: 0,
        offset: None,
        element: ValType::FuncRef,
        funcs: Vec::new(),
        exprs: Vec::new(),
    };

    if segment.has_table_index() {
        segment.table = p.u32_leb()?;
    }
    if segment.is_active() {
        segment.offset = Some(p.expr()?);
    }
    if segment.has_type_field() {
        if segment.uses_exprs() {
            segment.element = p.ref_type()?;
        } else {
            // Element kind byte; only funcref (0) exists.
            let kind = p.byte()?;
            if kind != 0 {
                return Err(QrWasmError::unsupported(format!(
                    "element kind {kind}"
                )));
            }
        }
    }

    let count = p.u32_leb()?;
    if segment.uses_exprs() {
        for _ in 0..count {
            segment.exprs.push(p.expr()?);
        }
    } else {
        for _ in 0..count {
            segment.funcs.push(p.u32_leb()?);
        }
    }
    Ok(segment)
}

fn parse_dylink(p: &mut ByteParser<'_>) -> Result<DylinkSection> {
    let memory_size = p.u64_leb()?;
    let memory_alignment = p.u64_leb()?;
    let table_size = p.u64_leb()?;
    let table_alignment = p.u64_leb()?;
    let count = p.u32_leb()?;
    let mut needed = Vec::with_capacity((count as usize).min(1 << 16));
    for _ in 0..count {
        needed.push(p.name()?);
    }
    Ok(DylinkSection {
        memory_size,
        memory_alignment,
        table_size,
        table_alignment,
        needed,
    })
}

fn parse_target_features(p: &mut ByteParser<'_>) -> Result<Vec<String>> {
    let count = p.u32_leb()?;
    let mut features = Vec::with_capacity((count as usize).min(1 << 16));
    for _ in 0..count {
        let prefix = p.byte()?;
        if prefix != b'+' {
            return Err(QrWasmError::unsupported(format!(
                "target feature prefix {:?}",
                prefix as char
            )));
        }
        features.push(p.name()?);
    }
    Ok(features)
}

/// Structural checks shared by the strict parser and the compressed-stream
/// reader.
pub(crate) fn validate_module(module: &Module) -> Result<()> {
    if module.functions.len() != module.code.len() {
        return Err(QrWasmError::corrupt(
            0,
            format!(
                "{} function declarations but {} bodies",
                module.functions.len(),
                module.code.len()
            ),
        ));
    }
    for &ty in &module.functions {
        if ty as usize >= module.types.len() {
            return Err(QrWasmError::corrupt(
                0,
                format!("function type index {ty} out of range"),
            ));
        }
    }
    if let Some(count) = module.data_count {
        if count as usize != module.data.len() {
            return Err(QrWasmError::corrupt(
                0,
                format!(
                    "data count section says {count} but {} segments exist",
                    module.data.len()
                ),
            ));
        }
    }

    let imported_memories = module
        .imports
        .iter()
        .filter(|i| matches!(i.desc, ImportDesc::Memory(_)))
        .count();
    if imported_memories + module.memories.len() > 1 {
        return Err(QrWasmError::unsupported("more than one memory"));
    }

    let table_count = module
        .imports
        .iter()
        .filter(|i| matches!(i.desc, ImportDesc::Table(_)))
        .count()
        + module.tables.len();
    let global_count = module
        .imports
        .iter()
        .filter(|i| matches!(i.desc, ImportDesc::Global(_)))
        .count()
        + module.globals.len();
    let memory_count = imported_memories + module.memories.len();
    let func_count = module.func_count() as usize;

    let mut seen_names = std::collections::BTreeSet::new();
    for export in &module.exports {
        if !seen_names.insert(export.name.as_str()) {
            return Err(QrWasmError::corrupt(
                0,
                format!("duplicate export name {:?}", export.name),
            ));
        }
        let (space, label) = match export.kind {
            ExternalKind::Func => (func_count, "function"),
            ExternalKind::Table => (table_count, "table"),
            ExternalKind::Memory => (memory_count, "memory"),
            ExternalKind::Global => (global_count, "global"),
        };
        if export.index as usize >= space {
            return Err(QrWasmError::corrupt(
                0,
                format!("export {:?} references {label} {} out of range", export.name, export.index),
            ));
        }
    }

    if let Some(start) = module.start {
        if start as usize >= func_count {
            return Err(QrWasmError::corrupt(
                0,
                format!("start function {start} out of range"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal module exporting one function that returns the i32 constant
    /// 42.
    pub(crate) const ANSWER_WASM: &[u8] = &[
        0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00, // header
        0x01, 0x05, 0x01, 0x60, 0x00, 0x01, 0x7F, // type: () -> i32
        0x03, 0x02, 0x01, 0x00, // function: uses type 0
        0x07, 0x08, 0x01, 0x04, b'm', b'a', b'i', b'n', 0x00, 0x00, // export "main"
        0x0A, 0x06, 0x01, 0x04, 0x00, 0x41, 0x2A, 0x0B, // code: i32.const 42
    ];

    #[test]
    fn test_parse_minimal_module() {
        let module = parse_module(ANSWER_WASM).unwrap();
        assert_eq!(module.types.len(), 1);
        assert_eq!(module.types[0].results, vec![ValType::I32]);
        assert_eq!(module.functions, vec![0]);
        assert_eq!(module.exports.len(), 1);
        assert_eq!(module.exports[0].name, "main");
        assert_eq!(module.code[0].body, vec![Instr::I32Const { value: 42 }]);
    }

    #[test]
    fn test_bad_magic() {
        let bytes = [0x00, 0x61, 0x73, 0x00, 0x01, 0x00, 0x00, 0x00];
        assert!(matches!(
            parse_module(&bytes),
            Err(QrWasmError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn test_out_of_order_sections() {
        let bytes = [
            0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00, //
            0x03, 0x02, 0x01, 0x00, // function section first
            0x01, 0x04, 0x01, 0x60, 0x00, 0x00, // then type section
        ];
        assert!(matches!(
            parse_module(&bytes),
            Err(QrWasmError::CorruptStream { .. })
        ));
    }

    #[test]
    fn test_section_size_mismatch() {
        let bytes = [
            0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00, //
            0x01, 0x05, 0x01, 0x60, 0x00, 0x00, 0x00, // one byte too many declared
        ];
        assert!(parse_module(&bytes).is_err());
    }

    #[test]
    fn test_non_canonical_leb_refused() {
        // Type count 1 written as the two-byte 0x81 0x00.
        let bytes = [
            0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00, //
            0x01, 0x06, 0x81, 0x00, 0x60, 0x00, 0x00,
        ];
        assert!(matches!(
            parse_module(&bytes),
            Err(QrWasmError::UnsupportedFeature { .. })
        ));
    }

    #[test]
    fn test_duplicate_export_names() {
        let bytes = [
            0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00, //
            0x01, 0x05, 0x01, 0x60, 0x00, 0x01, 0x7F, //
            0x03, 0x02, 0x01, 0x00, //
            0x07, 0x09, 0x02, 0x01, b'f', 0x00, 0x00, 0x01, b'f', 0x00, 0x00, //
            0x0A, 0x06, 0x01, 0x04, 0x00, 0x41, 0x2A, 0x0B,
        ];
        assert!(matches!(
            parse_module(&bytes),
            Err(QrWasmError::CorruptStream { .. })
        ));
    }

    #[test]
    fn test_memory64_limits_unsupported() {
        let bytes = [
            0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00, //
            0x05, 0x03, 0x01, 0x04, 0x01, // memory section, limits flags 0x04
        ];
        assert!(matches!(
            parse_module(&bytes),
            Err(QrWasmError::UnsupportedFeature { .. })
        ));
    }

    #[test]
    fn test_tag_section_unsupported() {
        let bytes = [
            0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00, //
            0x0D, 0x01, 0x00, // empty tag section
        ];
        assert!(matches!(
            parse_module(&bytes),
            Err(QrWasmError::UnsupportedFeature { .. })
        ));
    }

    #[test]
    fn test_minimal_sleb_len() {
        assert_eq!(minimal_sleb_len(0), 1);
        assert_eq!(minimal_sleb_len(-1), 1);
        assert_eq!(minimal_sleb_len(63), 1);
        assert_eq!(minimal_sleb_len(64), 2);
        assert_eq!(minimal_sleb_len(-64), 1);
        assert_eq!(minimal_sleb_len(-65), 2);
        assert_eq!(minimal_sleb_len(i64::MAX), 10);
        assert_eq!(minimal_sleb_len(i64::MIN), 10);
    }
}
