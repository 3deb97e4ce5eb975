//! Helpers for building program object graphs in tests.
//!
//! The image parser is an external collaborator, so tests assemble
//! packages, functions, blocks and instructions directly.

use strata_core::{Arr, Obj, Str, Value};

/// Chainable field assignment for building instruction objects.
pub trait ObjExt: Sized {
    fn with(self, name: &str, val: Value) -> Self;
}

impl ObjExt for Obj {
    fn with(self, name: &str, val: Value) -> Self {
        self.set_field(&Str::from(name), val);
        self
    }
}

/// An instruction object with the given `op` string.
pub fn instr(op: &str) -> Obj {
    Obj::new().with("op", Value::from(op))
}

/// A named basic block holding the given instructions.
pub fn block(name: &str, instrs: &[Obj]) -> Obj {
    Obj::new()
        .with("name", Value::from(name))
        .with("instrs", Value::Array(instrs_arr(instrs)))
}

/// Replace a block's instructions (for wiring up loops).
pub fn set_instrs(block: &Obj, instrs: &[Obj]) {
    block.set_field(&Str::from("instrs"), Value::Array(instrs_arr(instrs)));
}

fn instrs_arr(instrs: &[Obj]) -> Arr {
    Arr::from_vec(instrs.iter().cloned().map(Value::Object).collect())
}

/// A function object with the given signature and entry block.
pub fn function(num_params: i64, num_locals: i64, entry: &Obj) -> Obj {
    let fun = Obj::new();
    fill_function(&fun, num_params, num_locals, entry);
    fun
}

/// Populate a pre-allocated function object (for self-referential
/// functions, which must exist before their blocks can mention them).
pub fn fill_function(fun: &Obj, num_params: i64, num_locals: i64, entry: &Obj) {
    fun.set_field(&Str::from("num_params"), Value::Int64(num_params));
    fun.set_field(&Str::from("num_locals"), Value::Int64(num_locals));
    fun.set_field(&Str::from("entry"), Value::Object(entry.clone()));
}

/// A package object exporting the given values.
pub fn package(exports: &[(&str, Value)]) -> Obj {
    let pkg = Obj::new();
    for (name, val) in exports {
        pkg.set_field(&Str::from(*name), val.clone());
    }
    pkg
}

/// A `src_pos` object.
pub fn src_pos(src_name: &str, line_no: i64, col_no: i64) -> Value {
    Value::Object(
        Obj::new()
            .with("src_name", Value::from(src_name))
            .with("line_no", Value::Int64(line_no))
            .with("col_no", Value::Int64(col_no)),
    )
}
