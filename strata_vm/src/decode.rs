//! Instruction decoding.
//!
//! Each instruction object is decoded once: an inline cache reads its `op`
//! string, the string is matched against the opcode table, and the result is
//! memoized by the instruction's object identity. Entries are never evicted;
//! the cache keeps a handle to each keyed instruction so an identity can
//! never be recycled while cached.

use crate::opcode::Opcode;
use rustc_hash::FxHashMap;
use strata_core::{ICache, Obj, ObjId, RunError, RunResult};
use tracing::trace;

/// Decoder with an opcode memo cache.
pub struct Decoder {
    /// Inline cache for the `op` field of instruction objects.
    op_ic: ICache,
    /// Opcode memo keyed by instruction identity. The stored handle pins
    /// the instruction's allocation for the cache's lifetime.
    cache: FxHashMap<ObjId, (Opcode, Obj)>,
}

impl Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            op_ic: ICache::new("op"),
            cache: FxHashMap::default(),
        }
    }

    /// Number of memoized instructions.
    #[must_use]
    pub fn cached_instrs(&self) -> usize {
        self.cache.len()
    }

    /// Decode an instruction object into its opcode.
    pub fn decode(&mut self, instr: &Obj) -> RunResult<Opcode> {
        if let Some((op, _)) = self.cache.get(&instr.id()) {
            return Ok(*op);
        }

        let op_str = self.op_ic.get_str(instr)?;
        let op = match op_str.as_utf8() {
            Some(s) => parse_op(s)?,
            None => return Err(RunError::unknown_op(op_str.to_string_lossy())),
        };
        trace!(op = %op, "decoded instruction");

        self.cache.insert(instr.id(), (op, instr.clone()));
        Ok(op)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Map an `op` string to its opcode.
///
/// Stub opcodes are internal to the code-heap compiler and have no surface
/// spelling here.
pub fn parse_op(op: &str) -> RunResult<Opcode> {
    Ok(match op {
        // Local variable access
        "get_local" => Opcode::GetLocal,
        "set_local" => Opcode::SetLocal,

        // Stack manipulation
        "push" => Opcode::Push,
        "pop" => Opcode::Pop,
        "dup" => Opcode::Dup,
        "swap" => Opcode::Swap,

        // 64-bit integer operations
        "add_i64" => Opcode::AddI64,
        "sub_i64" => Opcode::SubI64,
        "mul_i64" => Opcode::MulI64,
        "lt_i64" => Opcode::LtI64,
        "le_i64" => Opcode::LeI64,
        "gt_i64" => Opcode::GtI64,
        "ge_i64" => Opcode::GeI64,
        "eq_i64" => Opcode::EqI64,

        // String operations
        "str_len" => Opcode::StrLen,
        "get_char" => Opcode::GetChar,
        "get_char_code" => Opcode::GetCharCode,
        "str_cat" => Opcode::StrCat,
        "eq_str" => Opcode::EqStr,

        // Object operations
        "new_object" => Opcode::NewObject,
        "has_field" => Opcode::HasField,
        "set_field" => Opcode::SetField,
        "get_field" => Opcode::GetField,
        "eq_obj" => Opcode::EqObj,

        // Array operations
        "new_array" => Opcode::NewArray,
        "array_len" => Opcode::ArrayLen,
        "array_push" => Opcode::ArrayPush,
        "get_elem" => Opcode::GetElem,
        "set_elem" => Opcode::SetElem,

        // Miscellaneous
        "eq_bool" => Opcode::EqBool,
        "has_tag" => Opcode::HasTag,
        "get_tag" => Opcode::GetTag,

        // Branch instructions
        "jump" => Opcode::Jump,
        "if_true" => Opcode::IfTrue,
        "call" => Opcode::Call,
        "ret" => Opcode::Ret,

        // VM interface
        "import" => Opcode::Import,
        "abort" => Opcode::Abort,

        _ => return Err(RunError::unknown_op(op)),
    })
}
