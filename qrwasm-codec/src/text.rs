//! Textual listing of a module.
//!
//! Renders an approximation of the text format — close enough to diff two
//! modules or to sanity-check what a decoded payload contains, not a
//! conforming `.wat` emitter.

use crate::instr::Instr;
use crate::module::*;
use crate::types::{BlockType, Limits, ValType};

/// Mnemonic for a value type.
pub fn val_type_name(ty: ValType) -> &'static str {
    match ty {
        ValType::I32 => "i32",
        ValType::I64 => "i64",
        ValType::F32 => "f32",
        ValType::F64 => "f64",
        ValType::V128 => "v128",
        ValType::FuncRef => "funcref",
        ValType::ExternRef => "externref",
    }
}

/// Mnemonic for an immediate-free numeric opcode (0x45..=0xC4).
pub fn numeric_name(op: u8) -> &'static str {
    match op {
        0x45 => "i32.eqz",
        0x46 => "i32.eq",
        0x47 => "i32.ne",
        0x48 => "i32.lt_s",
        0x49 => "i32.lt_u",
        0x4A => "i32.gt_s",
        0x4B => "i32.gt_u",
        0x4C => "i32.le_s",
        0x4D => "i32.le_u",
        0x4E => "i32.ge_s",
        0x4F => "i32.ge_u",
        0x50 => "i64.eqz",
        0x51 => "i64.eq",
        0x52 => "i64.ne",
        0x53 => "i64.lt_s",
        0x54 => "i64.lt_u",
        0x55 => "i64.gt_s",
        0x56 => "i64.gt_u",
        0x57 => "i64.le_s",
        0x58 => "i64.le_u",
        0x59 => "i64.ge_s",
        0x5A => "i64.ge_u",
        0x5B => "f32.eq",
        0x5C => "f32.ne",
        0x5D => "f32.lt",
        0x5E => "f32.gt",
        0x5F => "f32.le",
        0x60 => "f32.ge",
        0x61 => "f64.eq",
        0x62 => "f64.ne",
        0x63 => "f64.lt",
        0x64 => "f64.gt",
        0x65 => "f64.le",
        0x66 => "f64.ge",
        0x67 => "i32.clz",
        0x68 => "i32.ctz",
        0x69 => "i32.popcnt",
        0x6A => "i32.add",
        0x6B => "i32.sub",
        0x6C => "i32.mul",
        0x6D => "i32.div_s",
        0x6E => "i32.div_u",
        0x6F => "i32.rem_s",
        0x70 => "i32.rem_u",
        0x71 => "i32.and",
        0x72 => "i32.or",
        0x73 => "i32.xor",
        0x74 => "i32.shl",
        0x75 => "i32.shr_s",
        0x76 => "i32.shr_u",
        0x77 => "i32.rotl",
        0x78 => "i32.rotr",
        0x79 => "i64.clz",
        0x7A => "i64.ctz",
        0x7B => "i64.popcnt",
        0x7C => "i64.add",
        0x7D => "i64.sub",
        0x7E => "i64.mul",
        0x7F => "i64.div_s",
        0x80 => "i64.div_u",
        0x81 => "i64.rem_s",
        0x82 => "i64.rem_u",
        0x83 => "i64.and",
        0x84 => "i64.or",
        0x85 => "i64.xor",
        0x86 => "i64.shl",
        0x87 => "i64.shr_s",
        0x88 => "i64.shr_u",
        0x89 => "i64.rotl",
        0x8A => "i64.rotr",
        0x8B => "f32.abs",
        0x8C => "f32.neg",
        0x8D => "f32.ceil",
        0x8E => "f32.floor",
        0x8F => "f32.trunc",
        0x90 => "f32.nearest",
        0x91 => "f32.sqrt",
        0x92 => "f32.add",
        0x93 => "f32.sub",
        0x94 => "f32.mul",
        0x95 => "f32.div",
        0x96 => "f32.min",
        0x97 => "f32.max",
        0x98 => "f32.copysign",
        0x99 => "f64.abs",
        0x9A => "f64.neg",
        0x9B => "f64.ceil",
        0x9C => "f64.floor",
        0x9D => "f64.trunc",
        0x9E => "f64.nearest",
        0x9F => "f64.sqrt",
        0xA0 => "f64.add",
        0xA1 => "f64.sub",
        0xA2 => "f64.mul",
        0xA3 => "f64.div",
        0xA4 => "f64.min",
        0xA5 => "f64.max",
        0xA6 => "f64.copysign",
        0xA7 => "i32.wrap_i64",
        0xA8 => "i32.trunc_f32_s",
        0xA9 => "i32.trunc_f32_u",
        0xAA => "i32.trunc_f64_s",
        0xAB => "i32.trunc_f64_u",
        0xAC => "i64.extend_i32_s",
        0xAD => "i64.extend_i32_u",
        0xAE => "i64.trunc_f32_s",
        0xAF => "i64.trunc_f32_u",
        0xB0 => "i64.trunc_f64_s",
        0xB1 => "i64.trunc_f64_u",
        0xB2 => "f32.convert_i32_s",
        0xB3 => "f32.convert_i32_u",
        0xB4 => "f32.convert_i64_s",
        0xB5 => "f32.convert_i64_u",
        0xB6 => "f32.demote_f64",
        0xB7 => "f64.convert_i32_s",
        0xB8 => "f64.convert_i32_u",
        0xB9 => "f64.convert_i64_s",
        0xBA => "f64.convert_i64_u",
        0xBB => "f64.promote_f32",
        0xBC => "i32.reinterpret_f32",
        0xBD => "i64.reinterpret_f64",
        0xBE => "f32.reinterpret_i32",
        0xBF => "f64.reinterpret_i64",
        0xC0 => "i32.extend8_s",
        0xC1 => "i32.extend16_s",
        0xC2 => "i64.extend8_s",
        0xC3 => "i64.extend16_s",
        0xC4 => "i64.extend32_s",
        _ => "numeric.unknown",
    }
}

fn load_name(op: u8) -> &'static str {
    match op {
        0x28 => "i32.load",
        0x29 => "i64.load",
        0x2A => "f32.load",
        0x2B => "f64.load",
        0x2C => "i32.load8_s",
        0x2D => "i32.load8_u",
        0x2E => "i32.load16_s",
        0x2F => "i32.load16_u",
        0x30 => "i64.load8_s",
        0x31 => "i64.load8_u",
        0x32 => "i64.load16_s",
        0x33 => "i64.load16_u",
        0x34 => "i64.load32_s",
        0x35 => "i64.load32_u",
        _ => "load.unknown",
    }
}

fn store_name(op: u8) -> &'static str {
    match op {
        0x36 => "i32.store",
        0x37 => "i64.store",
        0x38 => "f32.store",
        0x39 => "f64.store",
        0x3A => "i32.store8",
        0x3B => "i32.store16",
        0x3C => "i64.store8",
        0x3D => "i64.store16",
        0x3E => "i64.store32",
        _ => "store.unknown",
    }
}

fn trunc_sat_name(op: u32) -> &'static str {
    match op {
        0 => "i32.trunc_sat_f32_s",
        1 => "i32.trunc_sat_f32_u",
        2 => "i32.trunc_sat_f64_s",
        3 => "i32.trunc_sat_f64_u",
        4 => "i64.trunc_sat_f32_s",
        5 => "i64.trunc_sat_f32_u",
        6 => "i64.trunc_sat_f64_s",
        7 => "i64.trunc_sat_f64_u",
        _ => "trunc_sat.unknown",
    }
}

fn block_type_suffix(ty: BlockType) -> String {
    match ty {
        BlockType::Empty => String::new(),
        BlockType::Value(v) => format!(" (result {})", val_type_name(v)),
        BlockType::Func(idx) => format!(" (type {idx})"),
    }
}

fn mem_arg_suffix(align: u32, offset: u64) -> String {
    let mut out = String::new();
    if offset != 0 {
        out.push_str(&format!(" offset={offset}"));
    }
    out.push_str(&format!(" align={}", 1u64 << align));
    out
}

fn push_instr(out: &mut String, instr: &Instr, indent: usize) {
    let pad = "  ".repeat(indent);
    match instr {
        Instr::Block { ty, body } => {
            out.push_str(&format!("{pad}block{}\n", block_type_suffix(*ty)));
            for i in body {
                push_instr(out, i, indent + 1);
            }
            out.push_str(&format!("{pad}end\n"));
        }
        Instr::Loop { ty, body } => {
            out.push_str(&format!("{pad}loop{}\n", block_type_suffix(*ty)));
            for i in body {
                push_instr(out, i, indent + 1);
            }
            out.push_str(&format!("{pad}end\n"));
        }
        Instr::If { ty, then, els } => {
            out.push_str(&format!("{pad}if{}\n", block_type_suffix(*ty)));
            for i in then {
                push_instr(out, i, indent + 1);
            }
            if let Some(els) = els {
                out.push_str(&format!("{pad}else\n"));
                for i in els {
                    push_instr(out, i, indent + 1);
                }
            }
            out.push_str(&format!("{pad}end\n"));
        }
        other => {
            out.push_str(&pad);
            out.push_str(&plain_instr(other));
            out.push('\n');
        }
    }
}

fn plain_instr(instr: &Instr) -> String {
    match instr {
        Instr::Unreachable => "unreachable".into(),
        Instr::Nop => "nop".into(),
        Instr::Br { label } => format!("br {label}"),
        Instr::BrIf { label } => format!("br_if {label}"),
        Instr::BrTable { targets, default } => {
            let mut parts: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
            parts.push(default.to_string());
            format!("br_table {}", parts.join(" "))
        }
        Instr::Return => "return".into(),
        Instr::Call { func } => format!("call {func}"),
        Instr::CallIndirect { ty, table } => format!("call_indirect {table} (type {ty})"),
        Instr::Drop => "drop".into(),
        Instr::Select => "select".into(),
        Instr::SelectT { types } => {
            let names: Vec<&str> = types.iter().map(|t| val_type_name(*t)).collect();
            format!("select (result {})", names.join(" "))
        }
        Instr::LocalGet { local } => format!("local.get {local}"),
        Instr::LocalSet { local } => format!("local.set {local}"),
        Instr::LocalTee { local } => format!("local.tee {local}"),
        Instr::GlobalGet { global } => format!("global.get {global}"),
        Instr::GlobalSet { global } => format!("global.set {global}"),
        Instr::TableGet { table } => format!("table.get {table}"),
        Instr::TableSet { table } => format!("table.set {table}"),
        Instr::Load { op, arg } => {
            format!("{}{}", load_name(*op), mem_arg_suffix(arg.align, arg.offset))
        }
        Instr::Store { op, arg } => {
            format!("{}{}", store_name(*op), mem_arg_suffix(arg.align, arg.offset))
        }
        Instr::MemorySize => "memory.size".into(),
        Instr::MemoryGrow => "memory.grow".into(),
        Instr::I32Const { value } => format!("i32.const {value}"),
        Instr::I64Const { value } => format!("i64.const {value}"),
        Instr::F32Const { bits } => format!("f32.const {}", f32::from_bits(*bits)),
        Instr::F64Const { bits } => format!("f64.const {}", f64::from_bits(*bits)),
        Instr::Numeric { op } => numeric_name(*op).into(),
        Instr::RefNull { ty } => format!("ref.null {}", val_type_name(*ty)),
        Instr::RefIsNull => "ref.is_null".into(),
        Instr::RefFunc { func } => format!("ref.func {func}"),
        Instr::TruncSat { op } => trunc_sat_name(*op).into(),
        Instr::MemoryInit { data } => format!("memory.init {data}"),
        Instr::DataDrop { data } => format!("data.drop {data}"),
        Instr::MemoryCopy => "memory.copy".into(),
        Instr::MemoryFill => "memory.fill".into(),
        Instr::TableInit { elem, table } => format!("table.init {elem} {table}"),
        Instr::ElemDrop { elem } => format!("elem.drop {elem}"),
        Instr::TableCopy { dst, src } => format!("table.copy {dst} {src}"),
        Instr::TableGrow { table } => format!("table.grow {table}"),
        Instr::TableSize { table } => format!("table.size {table}"),
        Instr::TableFill { table } => format!("table.fill {table}"),
        Instr::V128Const { bytes } => {
            let hex: Vec<String> = bytes.iter().map(|b| format!("{b:#04x}")).collect();
            format!("v128.const {}", hex.join(" "))
        }
        Instr::I8x16Shuffle { lanes } => {
            let parts: Vec<String> = lanes.iter().map(|l| l.to_string()).collect();
            format!("i8x16.shuffle {}", parts.join(" "))
        }
        Instr::SimdMem { op, arg } => {
            format!("simd.mem[{op}]{}", mem_arg_suffix(arg.align, arg.offset))
        }
        Instr::SimdMemLane { op, arg, lane } => format!(
            "simd.mem_lane[{op}]{} {lane}",
            mem_arg_suffix(arg.align, arg.offset)
        ),
        Instr::SimdLane { op, lane } => format!("simd.lane[{op}] {lane}"),
        Instr::Simd { op } => format!("simd[{op}]"),
        Instr::AtomicFence { order } => format!("atomic.fence {order}"),
        Instr::AtomicMem { op, arg } => {
            format!("atomic.mem[{op}]{}", mem_arg_suffix(arg.align, arg.offset))
        }
        Instr::Block { .. } | Instr::Loop { .. } | Instr::If { .. } => {
            unreachable!("structured instructions are rendered by push_instr")
        }
    }
}

fn limits_text(limits: &Limits) -> String {
    let mut out = limits.min.to_string();
    if let Some(max) = limits.max {
        out.push_str(&format!(" {max}"));
    }
    if limits.shared {
        out.push_str(" shared");
    }
    out
}

fn signature_text(ty: &FuncType) -> String {
    let mut out = String::from("(func");
    if !ty.params.is_empty() {
        let names: Vec<&str> = ty.params.iter().map(|t| val_type_name(*t)).collect();
        out.push_str(&format!(" (param {})", names.join(" ")));
    }
    if !ty.results.is_empty() {
        let names: Vec<&str> = ty.results.iter().map(|t| val_type_name(*t)).collect();
        out.push_str(&format!(" (result {})", names.join(" ")));
    }
    out.push(')');
    out
}

/// Render a module as an indented, wat-flavoured listing.
pub fn render_module(module: &Module) -> String {
    let mut out = String::from("(module\n");

    for (i, ty) in module.types.iter().enumerate() {
        out.push_str(&format!("  (type (;{i};) {})\n", signature_text(ty)));
    }
    for import in &module.imports {
        let desc = match &import.desc {
            ImportDesc::Func(ty) => format!("(func (type {ty}))"),
            ImportDesc::Table(table) => format!(
                "(table {} {})",
                limits_text(&table.limits),
                val_type_name(table.element)
            ),
            ImportDesc::Memory(limits) => format!("(memory {})", limits_text(limits)),
            ImportDesc::Global(ty) => {
                if ty.mutable {
                    format!("(global (mut {}))", val_type_name(ty.content))
                } else {
                    format!("(global {})", val_type_name(ty.content))
                }
            }
        };
        out.push_str(&format!(
            "  (import {:?} {:?} {desc})\n",
            import.module, import.field
        ));
    }
    for table in &module.tables {
        out.push_str(&format!(
            "  (table {} {})\n",
            limits_text(&table.limits),
            val_type_name(table.element)
        ));
    }
    for limits in &module.memories {
        out.push_str(&format!("  (memory {})\n", limits_text(limits)));
    }
    for (i, global) in module.globals.iter().enumerate() {
        let ty = if global.ty.mutable {
            format!("(mut {})", val_type_name(global.ty.content))
        } else {
            val_type_name(global.ty.content).to_string()
        };
        out.push_str(&format!("  (global (;{i};) {ty}\n"));
        for instr in &global.init {
            push_instr(&mut out, instr, 2);
        }
        out.push_str("  )\n");
    }

    let imported = module.imported_func_count();
    for (i, body) in module.code.iter().enumerate() {
        let index = imported + i as u32;
        out.push_str(&format!(
            "  (func (;{index};) (type {})\n",
            module.functions[i]
        ));
        for (run, ty) in &body.locals {
            out.push_str(&format!("    (local {} x {})\n", run, val_type_name(*ty)));
        }
        for instr in &body.body {
            push_instr(&mut out, instr, 2);
        }
        out.push_str("  )\n");
    }

    for export in &module.exports {
        let kind = match export.kind {
            ExternalKind::Func => "func",
            ExternalKind::Table => "table",
            ExternalKind::Memory => "memory",
            ExternalKind::Global => "global",
        };
        out.push_str(&format!(
            "  (export {:?} ({kind} {}))\n",
            export.name, export.index
        ));
    }
    if let Some(start) = module.start {
        out.push_str(&format!("  (start {start})\n"));
    }
    for (i, segment) in module.data.iter().enumerate() {
        out.push_str(&format!(
            "  (data (;{i};) {} bytes{})\n",
            segment.bytes.len(),
            if segment.offset.is_some() {
                ""
            } else {
                " passive"
            }
        ));
    }

    out.push_str(")\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::MemArg;

    #[test]
    fn test_numeric_names_cover_the_range() {
        for op in 0x45..=0xC4u8 {
            assert_ne!(numeric_name(op), "numeric.unknown", "opcode {op:#x}");
        }
    }

    #[test]
    fn test_render_small_function() {
        let module = Module {
            types: vec![FuncType {
                params: vec![ValType::I32],
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
                body: vec![
                    Instr::LocalGet { local: 0 },
                    Instr::I32Const { value: 42 },
                    Instr::Numeric { op: 0x6A },
                ],
            }],
            ..Module::default()
        };
        let text = render_module(&module);
        assert!(text.contains("(param i32)"));
        assert!(text.contains("local.get 0"));
        assert!(text.contains("i32.const 42"));
        assert!(text.contains("i32.add"));
        assert!(text.contains("(export \"main\" (func 0))"));
    }

    #[test]
    fn test_render_nested_control_flow() {
        let module = Module {
            types: vec![FuncType::default()],
            functions: vec![0],
            code: vec![FuncBody {
                locals: vec![],
                body: vec![Instr::Block {
                    ty: BlockType::Empty,
                    body: vec![Instr::If {
                        ty: BlockType::Empty,
                        then: vec![Instr::Nop],
                        els: Some(vec![Instr::Br { label: 1 }]),
                    }],
                }],
            }],
            ..Module::default()
        };
        let text = render_module(&module);
        assert!(text.contains("block\n"));
        assert!(text.contains("else\n"));
        assert!(text.contains("br 1"));
    }

    #[test]
    fn test_mem_arg_rendering() {
        let text = plain_instr(&Instr::Load {
            op: 0x28,
            arg: MemArg { align: 2, offset: 8 },
        });
        assert_eq!(text, "i32.load offset=8 align=4");
    }
}
