//! In-memory model of a wasm module.
//!
//! The model stores exactly what the binary format stores — indexes rather
//! than names, parsed flag bytes rather than normalized modes — so that
//! serializing a parsed module reproduces the input bytes.

use crate::instr::Expr;
use crate::types::{Limits, ValType};

/// A function signature.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FuncType {
    /// Parameter types.
    pub params: Vec<ValType>,
    /// Result types.
    pub results: Vec<ValType>,
}

/// What an import provides.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportDesc {
    /// A function with the given signature index.
    Func(u32),
    /// A table.
    Table(TableType),
    /// A memory.
    Memory(Limits),
    /// A global.
    Global(GlobalType),
}

/// One import entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    /// Module namespace.
    pub module: String,
    /// Field name within the namespace.
    pub field: String,
    /// What is imported.
    pub desc: ImportDesc,
}

/// A table's element type and bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    /// Element type; must be a reference type.
    pub element: ValType,
    /// Size bounds.
    pub limits: Limits,
}

/// A global's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    /// Content type.
    pub content: ValType,
    /// Whether the global is mutable.
    pub mutable: bool,
}

/// A defined global with its initializer.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    /// Type and mutability.
    pub ty: GlobalType,
    /// Constant initializer expression.
    pub init: Expr,
}

/// The kind tag of an import or export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalKind {
    /// A function.
    Func = 0,
    /// A table.
    Table = 1,
    /// A memory.
    Memory = 2,
    /// A global.
    Global = 3,
}

impl ExternalKind {
    /// Decode the kind byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(ExternalKind::Func),
            1 => Some(ExternalKind::Table),
            2 => Some(ExternalKind::Memory),
            3 => Some(ExternalKind::Global),
            _ => None,
        }
    }
}

/// One export entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// Exported name; unique within the module.
    pub name: String,
    /// Kind of the exported item.
    pub kind: ExternalKind,
    /// Index within that kind's space.
    pub index: u32,
}

/// An element segment, preserving the flag form it was parsed with.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSegment {
    /// The 3-bit flag field (0..=7) selecting the segment form.
    pub flags: u8,
    /// Destination table for the explicit-table forms (2 and 6).
    pub table: u32,
    /// Offset expression for the active forms (0, 2, 4, 6).
    pub offset: Option<Expr>,
    /// Element type; funcref for the index forms, explicit for forms 5..=7.
    pub element: ValType,
    /// Function indexes for the index forms (0..=3).
    pub funcs: Vec<u32>,
    /// Initializer expressions for the expression forms (4..=7).
    pub exprs: Vec<Expr>,
}

impl ElementSegment {
    /// Whether this form stores expressions rather than function indexes.
    pub fn uses_exprs(&self) -> bool {
        self.flags & 0b100 != 0
    }

    /// Whether this form is active (has an offset).
    pub fn is_active(&self) -> bool {
        self.flags & 0b001 == 0
    }

    /// Whether this form carries an explicit table index.
    pub fn has_table_index(&self) -> bool {
        self.flags == 2 || self.flags == 6
    }

    /// Whether this form carries an element/ref type field.
    pub fn has_type_field(&self) -> bool {
        self.flags != 0 && self.flags != 4
    }
}

/// A data segment, preserving the flag form it was parsed with.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSegment {
    /// The flag field: 0 active, 1 passive, 2 active with explicit memory 0.
    pub flags: u8,
    /// Offset expression for the active forms.
    pub offset: Option<Expr>,
    /// Raw payload bytes.
    pub bytes: Vec<u8>,
}

/// One function body: locals plus the expression tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FuncBody {
    /// Local declarations as (run length, type) pairs, as stored.
    pub locals: Vec<(u32, ValType)>,
    /// Body instructions; the trailing `end` is implicit.
    pub body: Expr,
}

/// Parsed `dylink` custom section.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DylinkSection {
    /// Memory the dynamic library needs, in bytes.
    pub memory_size: u64,
    /// Required memory alignment, log2.
    pub memory_alignment: u64,
    /// Table elements the dynamic library needs.
    pub table_size: u64,
    /// Required table alignment, log2.
    pub table_alignment: u64,
    /// Names of needed dynamic libraries.
    pub needed: Vec<String>,
}

/// An opaque custom section, re-emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomSection {
    /// Section name.
    pub name: String,
    /// Raw payload after the name.
    pub bytes: Vec<u8>,
}

/// A complete module.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    /// Parsed `dylink` section; always serialized first when present.
    pub dylink: Option<DylinkSection>,
    /// Function signatures.
    pub types: Vec<FuncType>,
    /// Imports.
    pub imports: Vec<Import>,
    /// Type index of each defined function.
    pub functions: Vec<u32>,
    /// Defined tables.
    pub tables: Vec<TableType>,
    /// Defined memories (at most one).
    pub memories: Vec<Limits>,
    /// Defined globals.
    pub globals: Vec<Global>,
    /// Exports.
    pub exports: Vec<Export>,
    /// Start function index.
    pub start: Option<u32>,
    /// Element segments.
    pub elements: Vec<ElementSegment>,
    /// Declared data segment count, when the section was present.
    pub data_count: Option<u32>,
    /// Function bodies, parallel to `functions`.
    pub code: Vec<FuncBody>,
    /// Data segments.
    pub data: Vec<DataSegment>,
    /// Parsed `target_features` names (each carried the `+` prefix).
    pub target_features: Option<Vec<String>>,
    /// Remaining custom sections, in order of appearance after the data
    /// section.
    pub customs: Vec<CustomSection>,
}

impl Module {
    /// Number of imported functions (they precede defined ones in the index
    /// space).
    pub fn imported_func_count(&self) -> u32 {
        self.imports
            .iter()
            .filter(|i| matches!(i.desc, ImportDesc::Func(_)))
            .count() as u32
    }

    /// Total function count across imports and definitions.
    pub fn func_count(&self) -> u32 {
        self.imported_func_count() + self.functions.len() as u32
    }
}
