//! Opcode enumeration.
//!
//! Instruction objects select their operation through an `op` string; the
//! decoder maps that string to one of these opcodes. The `u16` discriminant
//! doubles as the opcode word of the linear bytecode stream the block
//! compiler emits.
//!
//! The opcode of a stub branch is the branch opcode plus one; the stub slots
//! are reserved here so the numbering holds once stub patching lands.

use std::fmt;

/// Operations of the execution core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    // Local variable access
    GetLocal = 0,
    SetLocal,

    // Stack manipulation
    Push,
    Pop,
    Dup,
    Swap,

    // 64-bit integer operations
    AddI64,
    SubI64,
    MulI64,
    LtI64,
    LeI64,
    GtI64,
    GeI64,
    EqI64,

    // String operations
    StrLen,
    GetChar,
    GetCharCode,
    StrCat,
    EqStr,

    // Object operations
    NewObject,
    HasField,
    SetField,
    GetField,
    EqObj,

    // Miscellaneous
    EqBool,
    HasTag,
    GetTag,

    // Array operations
    NewArray,
    ArrayLen,
    ArrayPush,
    GetElem,
    SetElem,

    // Branch instructions
    Jump,
    JumpStub,
    IfTrue,
    IfTrueStub,
    Call,
    Ret,

    // VM interface
    Import,
    Abort,
}

impl Opcode {
    /// The canonical `op` string for this opcode.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Opcode::GetLocal => "get_local",
            Opcode::SetLocal => "set_local",
            Opcode::Push => "push",
            Opcode::Pop => "pop",
            Opcode::Dup => "dup",
            Opcode::Swap => "swap",
            Opcode::AddI64 => "add_i64",
            Opcode::SubI64 => "sub_i64",
            Opcode::MulI64 => "mul_i64",
            Opcode::LtI64 => "lt_i64",
            Opcode::LeI64 => "le_i64",
            Opcode::GtI64 => "gt_i64",
            Opcode::GeI64 => "ge_i64",
            Opcode::EqI64 => "eq_i64",
            Opcode::StrLen => "str_len",
            Opcode::GetChar => "get_char",
            Opcode::GetCharCode => "get_char_code",
            Opcode::StrCat => "str_cat",
            Opcode::EqStr => "eq_str",
            Opcode::NewObject => "new_object",
            Opcode::HasField => "has_field",
            Opcode::SetField => "set_field",
            Opcode::GetField => "get_field",
            Opcode::EqObj => "eq_obj",
            Opcode::EqBool => "eq_bool",
            Opcode::HasTag => "has_tag",
            Opcode::GetTag => "get_tag",
            Opcode::NewArray => "new_array",
            Opcode::ArrayLen => "array_len",
            Opcode::ArrayPush => "array_push",
            Opcode::GetElem => "get_elem",
            Opcode::SetElem => "set_elem",
            Opcode::Jump => "jump",
            Opcode::JumpStub => "jump_stub",
            Opcode::IfTrue => "if_true",
            Opcode::IfTrueStub => "if_true_stub",
            Opcode::Call => "call",
            Opcode::Ret => "ret",
            Opcode::Import => "import",
            Opcode::Abort => "abort",
        }
    }

    /// The opcode word written to the code heap.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Decode an opcode word read back from the code heap.
    #[must_use]
    pub const fn from_u16(word: u16) -> Option<Opcode> {
        Some(match word {
            0 => Opcode::GetLocal,
            1 => Opcode::SetLocal,
            2 => Opcode::Push,
            3 => Opcode::Pop,
            4 => Opcode::Dup,
            5 => Opcode::Swap,
            6 => Opcode::AddI64,
            7 => Opcode::SubI64,
            8 => Opcode::MulI64,
            9 => Opcode::LtI64,
            10 => Opcode::LeI64,
            11 => Opcode::GtI64,
            12 => Opcode::GeI64,
            13 => Opcode::EqI64,
            14 => Opcode::StrLen,
            15 => Opcode::GetChar,
            16 => Opcode::GetCharCode,
            17 => Opcode::StrCat,
            18 => Opcode::EqStr,
            19 => Opcode::NewObject,
            20 => Opcode::HasField,
            21 => Opcode::SetField,
            22 => Opcode::GetField,
            23 => Opcode::EqObj,
            24 => Opcode::EqBool,
            25 => Opcode::HasTag,
            26 => Opcode::GetTag,
            27 => Opcode::NewArray,
            28 => Opcode::ArrayLen,
            29 => Opcode::ArrayPush,
            30 => Opcode::GetElem,
            31 => Opcode::SetElem,
            32 => Opcode::Jump,
            33 => Opcode::JumpStub,
            34 => Opcode::IfTrue,
            35 => Opcode::IfTrueStub,
            36 => Opcode::Call,
            37 => Opcode::Ret,
            38 => Opcode::Import,
            39 => Opcode::Abort,
            _ => return None,
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
