//! The run error channel.
//!
//! Every failure the execution core can hit is reported as a [`RunError`]
//! and unwinds the current top-level call. The only non-propagating exit is
//! the `abort` instruction, which terminates the process directly.

use thiserror::Error;

/// Result type used throughout the VM.
pub type RunResult<T> = Result<T, RunError>;

fn src_pos_prefix(src_pos: &Option<String>) -> String {
    match src_pos {
        Some(pos) => format!("{} - ", pos),
        None => String::new(),
    }
}

/// A runtime failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// An object lacks a required field.
    #[error("missing field \"{0}\"")]
    MissingField(String),

    /// An instruction's `op` string is not in the opcode enumeration.
    #[error("unknown op in decode \"{0}\"")]
    UnknownOp(String),

    /// Pop on an empty stack, or too few operands for an instruction.
    #[error("op cannot pop value, stack empty")]
    StackUnderflow,

    /// A popped value had the wrong tag for the operation.
    #[error("op expects {expected} value, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// String or array index past the end.
    #[error("index {index} out of bounds (length {length})")]
    IndexOob { index: i64, length: usize },

    /// `set_field` with a name that is not a valid identifier.
    #[error("invalid identifier \"{0}\"")]
    InvalidIdent(String),

    /// Call-site argument count does not match the callee's parameter count.
    #[error(
        "{}incorrect argument count in call, received {}, expected {}",
        src_pos_prefix(.src_pos),
        .got,
        .want
    )]
    ArityMismatch {
        got: usize,
        want: usize,
        /// Formatted source position of the call site, when the call
        /// instruction carries one.
        src_pos: Option<String>,
    },

    /// Callee is neither an object function nor a host function.
    #[error("invalid callee at call site (got {0})")]
    InvalidCallee(&'static str),

    /// A branch instruction that is not the last instruction of its block.
    #[error(
        "only the last instruction in a block can be a branch \
         (instr_idx={instr_idx}, num_instrs={num_instrs})"
    )]
    BranchNotLast {
        instr_idx: usize,
        num_instrs: usize,
    },

    /// Branch to a basic block with no instructions.
    #[error("target basic block is empty")]
    EmptyTarget,

    /// The block compiler met an opcode it cannot emit yet.
    #[error("unhandled opcode in basic block \"{0}\"")]
    UnhandledOp(String),

    /// The word stack is exhausted.
    #[error("stack overflow")]
    StackOverflow,

    /// The code heap is exhausted.
    #[error("code heap exhausted")]
    CodeHeapFull,

    /// The loader could not produce the requested package.
    #[error("import of package \"{name}\" failed: {reason}")]
    ImportFailed { name: String, reason: String },
}

impl RunError {
    #[must_use]
    pub fn missing_field(name: impl Into<String>) -> Self {
        Self::MissingField(name.into())
    }

    #[must_use]
    pub fn unknown_op(op: impl Into<String>) -> Self {
        Self::UnknownOp(op.into())
    }

    #[must_use]
    pub fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch { expected, found }
    }

    #[must_use]
    pub fn index_oob(index: i64, length: usize) -> Self {
        Self::IndexOob { index, length }
    }

    #[must_use]
    pub fn invalid_ident(name: impl Into<String>) -> Self {
        Self::InvalidIdent(name.into())
    }

    #[must_use]
    pub fn invalid_callee(found: &'static str) -> Self {
        Self::InvalidCallee(found)
    }

    #[must_use]
    pub fn unhandled_op(op: impl Into<String>) -> Self {
        Self::UnhandledOp(op.into())
    }

    #[must_use]
    pub fn import_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ImportFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
