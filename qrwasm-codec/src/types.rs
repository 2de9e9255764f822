//! Value types, limits, and block types.

use qrwasm_core::error::{QrWasmError, Result};

use crate::opcodes::type_code;

/// A wasm value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValType {
    /// 32-bit integer.
    I32,
    /// 64-bit integer.
    I64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// 128-bit vector.
    V128,
    /// Function reference.
    FuncRef,
    /// External reference.
    ExternRef,
}

impl ValType {
    /// The signed code this type uses in the binary format.
    pub fn code(self) -> i64 {
        match self {
            ValType::I32 => type_code::I32,
            ValType::I64 => type_code::I64,
            ValType::F32 => type_code::F32,
            ValType::F64 => type_code::F64,
            ValType::V128 => type_code::V128,
            ValType::FuncRef => type_code::FUNCREF,
            ValType::ExternRef => type_code::EXTERNREF,
        }
    }

    /// Decode a signed type code.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            type_code::I32 => Ok(ValType::I32),
            type_code::I64 => Ok(ValType::I64),
            type_code::F32 => Ok(ValType::F32),
            type_code::F64 => Ok(ValType::F64),
            type_code::V128 => Ok(ValType::V128),
            type_code::FUNCREF => Ok(ValType::FuncRef),
            type_code::EXTERNREF => Ok(ValType::ExternRef),
            _ => Err(QrWasmError::unsupported(format!(
                "value type code {code:#x}"
            ))),
        }
    }

    /// Whether this is one of the reference types.
    pub fn is_ref(self) -> bool {
        matches!(self, ValType::FuncRef | ValType::ExternRef)
    }
}

/// The result shape of a block, loop, or if.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// No result.
    Empty,
    /// A single result value.
    Value(ValType),
    /// A function type by index (multi-value blocks).
    Func(u32),
}

impl BlockType {
    /// The signed code this block type uses in the binary format.
    pub fn code(self) -> i64 {
        match self {
            BlockType::Empty => type_code::EMPTY_BLOCK,
            BlockType::Value(v) => v.code(),
            BlockType::Func(idx) => idx as i64,
        }
    }

    /// Decode a signed block type code.
    pub fn from_code(code: i64) -> Result<Self> {
        if code >= 0 {
            if code > u32::MAX as i64 {
                return Err(QrWasmError::unsupported(format!(
                    "block type index {code} out of range"
                )));
            }
            Ok(BlockType::Func(code as u32))
        } else if code == type_code::EMPTY_BLOCK {
            Ok(BlockType::Empty)
        } else {
            Ok(BlockType::Value(ValType::from_code(code)?))
        }
    }
}

/// Size bounds of a memory or table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Minimum size, in pages or elements.
    pub min: u64,
    /// Optional maximum size.
    pub max: Option<u64>,
    /// Shared memory (threads).
    pub shared: bool,
    /// 64-bit address space. The flag bit exists in the binary format but
    /// the codec refuses it; parsed limits always carry `false` here.
    pub memory64: bool,
}

impl Limits {
    /// The flag bits the binary format stores ahead of the bounds.
    pub fn flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.max.is_some() {
            flags |= crate::opcodes::limits::HAS_MAX;
        }
        if self.shared {
            flags |= crate::opcodes::limits::SHARED;
        }
        if self.memory64 {
            flags |= crate::opcodes::limits::MEMORY64;
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_code_roundtrip() {
        for ty in [
            ValType::I32,
            ValType::I64,
            ValType::F32,
            ValType::F64,
            ValType::V128,
            ValType::FuncRef,
            ValType::ExternRef,
        ] {
            assert_eq!(ValType::from_code(ty.code()).unwrap(), ty);
        }
        assert!(ValType::from_code(-0x21).is_err());
    }

    #[test]
    fn test_block_type_roundtrip() {
        for bt in [
            BlockType::Empty,
            BlockType::Value(ValType::F64),
            BlockType::Func(3),
        ] {
            assert_eq!(BlockType::from_code(bt.code()).unwrap(), bt);
        }
    }

    #[test]
    fn test_limits_flags() {
        let plain = Limits {
            min: 1,
            max: None,
            shared: false,
            memory64: false,
        };
        assert_eq!(plain.flags(), 0);
        let bounded = Limits {
            min: 1,
            max: Some(4),
            shared: true,
            memory64: false,
        };
        assert_eq!(bounded.flags(), 3);
    }
}
