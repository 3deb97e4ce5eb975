//! Tree-walking interpreter.
//!
//! Executes structured instruction objects against a per-activation value
//! stack and locals vector. An [`Interp`] owns every process-wide resource:
//! the opcode memo cache, the per-site inline caches, the canonical
//! one-character string cache, the cycle counter and the loader seam.
//!
//! Function calls recurse on the host stack; the explicit-frame alternative
//! lives in the code-heap engine of `strata_jit`.

use crate::decode::Decoder;
use crate::loader::Loader;
use crate::opcode::Opcode;
use smallvec::{smallvec, SmallVec};
use std::rc::Rc;
use strata_core::{
    is_valid_ident, Arr, CharCache, HostFn, ICache, Obj, RunError, RunResult, SrcPos, Str, Tag,
    Value,
};
use tracing::debug;

/// Argument vector, inline for the common small arities.
type ValueVec = SmallVec<[Value; 4]>;

/// State of one in-flight function call.
struct Activation {
    /// Temporary value stack.
    stack: Vec<Value>,
    /// Local variable slots, `UNDEF` until written.
    locals: Vec<Value>,
    /// Instruction array of the current basic block.
    instrs: Arr,
    /// Number of instructions in the current block.
    num_instrs: usize,
    /// Index of the next instruction to execute.
    instr_idx: usize,
}

impl Activation {
    fn new(num_locals: usize) -> Self {
        Self {
            stack: Vec::new(),
            locals: vec![Value::UNDEF; num_locals],
            instrs: Arr::new(),
            num_instrs: 0,
            instr_idx: 0,
        }
    }

    /// Read the instruction object at the cursor.
    fn fetch(&self) -> RunResult<Obj> {
        let val = self
            .instrs
            .get(self.instr_idx)
            .ok_or(RunError::index_oob(self.instr_idx as i64, self.num_instrs))?;
        match val {
            Value::Object(o) => Ok(o),
            other => Err(RunError::type_mismatch("object", other.tag().name())),
        }
    }

    #[inline]
    fn push(&mut self, val: Value) {
        self.stack.push(val);
    }

    #[inline]
    fn push_bool(&mut self, b: bool) {
        self.stack.push(Value::from_bool(b));
    }

    fn pop(&mut self) -> RunResult<Value> {
        self.stack.pop().ok_or(RunError::StackUnderflow)
    }

    fn pop_bool(&mut self) -> RunResult<bool> {
        match self.pop()? {
            Value::Bool(b) => Ok(b),
            other => Err(RunError::type_mismatch("bool", other.tag().name())),
        }
    }

    fn pop_int64(&mut self) -> RunResult<i64> {
        match self.pop()? {
            Value::Int64(i) => Ok(i),
            other => Err(RunError::type_mismatch("int64", other.tag().name())),
        }
    }

    fn pop_str(&mut self) -> RunResult<Str> {
        match self.pop()? {
            Value::Str(s) => Ok(s),
            other => Err(RunError::type_mismatch("string", other.tag().name())),
        }
    }

    fn pop_arr(&mut self) -> RunResult<Arr> {
        match self.pop()? {
            Value::Array(a) => Ok(a),
            other => Err(RunError::type_mismatch("array", other.tag().name())),
        }
    }

    fn pop_obj(&mut self) -> RunResult<Obj> {
        match self.pop()? {
            Value::Object(o) => Ok(o),
            other => Err(RunError::type_mismatch("object", other.tag().name())),
        }
    }
}

/// The interpreter.
pub struct Interp {
    decoder: Decoder,
    chars: CharCache,
    /// Total count of instructions executed.
    cycle_count: u64,
    loader: Option<Box<dyn Loader>>,

    // Per-site inline caches, one per field access site of the dispatch
    // loop and the call protocol.
    fun_num_params_ic: ICache,
    fun_num_locals_ic: ICache,
    entry_ic: ICache,
    instrs_ic: ICache,
    get_local_idx_ic: ICache,
    set_local_idx_ic: ICache,
    dup_idx_ic: ICache,
    push_val_ic: ICache,
    tag_ic: ICache,
    jump_to_ic: ICache,
    then_ic: ICache,
    else_ic: ICache,
    ret_to_ic: ICache,
    num_args_ic: ICache,
    callee_num_params_ic: ICache,
}

impl Interp {
    /// Create an interpreter with no loader; `import` will fail.
    #[must_use]
    pub fn new() -> Self {
        Self {
            decoder: Decoder::new(),
            chars: CharCache::new(),
            cycle_count: 0,
            loader: None,
            fun_num_params_ic: ICache::new("num_params"),
            fun_num_locals_ic: ICache::new("num_locals"),
            entry_ic: ICache::new("entry"),
            instrs_ic: ICache::new("instrs"),
            get_local_idx_ic: ICache::new("idx"),
            set_local_idx_ic: ICache::new("idx"),
            dup_idx_ic: ICache::new("idx"),
            push_val_ic: ICache::new("val"),
            tag_ic: ICache::new("tag"),
            jump_to_ic: ICache::new("to"),
            then_ic: ICache::new("then"),
            else_ic: ICache::new("else"),
            ret_to_ic: ICache::new("ret_to"),
            num_args_ic: ICache::new("num_args"),
            callee_num_params_ic: ICache::new("num_params"),
        }
    }

    /// Create an interpreter backed by a package loader.
    #[must_use]
    pub fn with_loader(loader: Box<dyn Loader>) -> Self {
        let mut interp = Self::new();
        interp.loader = Some(loader);
        interp
    }

    /// Total instructions executed so far.
    #[must_use]
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Replace the cursor's block with `target`.
    ///
    /// Only legal when the cursor sits at the end of the current block: a
    /// branch may only be the last instruction.
    fn branch_to(&self, act: &mut Activation, target: &Obj) -> RunResult<()> {
        if act.instr_idx != act.num_instrs {
            return Err(RunError::BranchNotLast {
                instr_idx: act.instr_idx,
                num_instrs: act.num_instrs,
            });
        }

        let instrs = self.instrs_ic.get_arr(target)?;
        let num_instrs = instrs.len();
        if num_instrs == 0 {
            return Err(RunError::EmptyTarget);
        }

        act.instrs = instrs;
        act.num_instrs = num_instrs;
        act.instr_idx = 0;
        Ok(())
    }

    /// Invoke an object function with an argument vector.
    pub fn call(&mut self, fun: &Obj, args: &[Value]) -> RunResult<Value> {
        let num_params = self.fun_num_params_ic.get_int64(fun)?;
        let num_locals = self.fun_num_locals_ic.get_int64(fun)?;
        let num_params =
            usize::try_from(num_params).map_err(|_| RunError::index_oob(num_params, 0))?;
        let num_locals =
            usize::try_from(num_locals).map_err(|_| RunError::index_oob(num_locals, 0))?;

        if args.len() > num_params {
            return Err(RunError::ArityMismatch {
                got: args.len(),
                want: num_params,
                src_pos: None,
            });
        }
        // Parameters occupy the leading local slots.
        if num_params > num_locals {
            return Err(RunError::index_oob(num_params as i64, num_locals));
        }

        let mut act = Activation::new(num_locals);
        for (i, arg) in args.iter().enumerate() {
            act.locals[i] = arg.clone();
        }

        let entry = self.entry_ic.get_obj(fun)?;
        self.branch_to(&mut act, &entry)?;

        loop {
            let instr = act.fetch()?;
            self.cycle_count += 1;
            act.instr_idx += 1;

            match self.decoder.decode(&instr)? {
                // Read a local variable and push it on the stack
                Opcode::GetLocal => {
                    let idx = self.get_local_idx_ic.get_int64(&instr)?;
                    let val = usize::try_from(idx)
                        .ok()
                        .and_then(|i| act.locals.get(i).cloned())
                        .ok_or(RunError::index_oob(idx, act.locals.len()))?;
                    act.push(val);
                }

                // Set a local variable
                Opcode::SetLocal => {
                    let idx = self.set_local_idx_ic.get_int64(&instr)?;
                    let val = act.pop()?;
                    let slot = usize::try_from(idx)
                        .ok()
                        .filter(|i| *i < act.locals.len())
                        .ok_or(RunError::index_oob(idx, act.locals.len()))?;
                    act.locals[slot] = val;
                }

                Opcode::Push => {
                    let val = self.push_val_ic.get_field(&instr)?;
                    act.push(val);
                }

                Opcode::Pop => {
                    act.pop()?;
                }

                // Duplicate the element `idx` positions below the stack top
                Opcode::Dup => {
                    let idx = self.dup_idx_ic.get_int64(&instr)?;
                    let depth = usize::try_from(idx)
                        .ok()
                        .filter(|d| *d < act.stack.len())
                        .ok_or(RunError::StackUnderflow)?;
                    let val = act.stack[act.stack.len() - 1 - depth].clone();
                    act.push(val);
                }

                // Swap the topmost two stack elements
                Opcode::Swap => {
                    let v0 = act.pop()?;
                    let v1 = act.pop()?;
                    act.push(v0);
                    act.push(v1);
                }

                //
                // 64-bit integer operations
                //
                Opcode::AddI64 => {
                    let arg1 = act.pop_int64()?;
                    let arg0 = act.pop_int64()?;
                    act.push(Value::Int64(arg0.wrapping_add(arg1)));
                }

                Opcode::SubI64 => {
                    let arg1 = act.pop_int64()?;
                    let arg0 = act.pop_int64()?;
                    act.push(Value::Int64(arg0.wrapping_sub(arg1)));
                }

                Opcode::MulI64 => {
                    let arg1 = act.pop_int64()?;
                    let arg0 = act.pop_int64()?;
                    act.push(Value::Int64(arg0.wrapping_mul(arg1)));
                }

                Opcode::LtI64 => {
                    let arg1 = act.pop_int64()?;
                    let arg0 = act.pop_int64()?;
                    act.push_bool(arg0 < arg1);
                }

                Opcode::LeI64 => {
                    let arg1 = act.pop_int64()?;
                    let arg0 = act.pop_int64()?;
                    act.push_bool(arg0 <= arg1);
                }

                Opcode::GtI64 => {
                    let arg1 = act.pop_int64()?;
                    let arg0 = act.pop_int64()?;
                    act.push_bool(arg0 > arg1);
                }

                Opcode::GeI64 => {
                    let arg1 = act.pop_int64()?;
                    let arg0 = act.pop_int64()?;
                    act.push_bool(arg0 >= arg1);
                }

                Opcode::EqI64 => {
                    let arg1 = act.pop_int64()?;
                    let arg0 = act.pop_int64()?;
                    act.push_bool(arg0 == arg1);
                }

                //
                // String operations
                //
                Opcode::StrLen => {
                    let s = act.pop_str()?;
                    act.push(Value::Int64(s.len() as i64));
                }

                Opcode::GetChar => {
                    let idx = act.pop_int64()?;
                    let s = act.pop_str()?;
                    let byte = usize::try_from(idx)
                        .ok()
                        .and_then(|i| s.byte_at(i))
                        .ok_or(RunError::index_oob(idx, s.len()))?;
                    act.push(Value::Str(self.chars.get(byte)));
                }

                Opcode::GetCharCode => {
                    let idx = act.pop_int64()?;
                    let s = act.pop_str()?;
                    let byte = usize::try_from(idx)
                        .ok()
                        .and_then(|i| s.byte_at(i))
                        .ok_or(RunError::index_oob(idx, s.len()))?;
                    act.push(Value::Int64(i64::from(byte)));
                }

                // The first-pushed operand becomes the prefix
                Opcode::StrCat => {
                    let a = act.pop_str()?;
                    let b = act.pop_str()?;
                    act.push(Value::Str(Str::concat(&b, &a)));
                }

                Opcode::EqStr => {
                    let arg1 = act.pop_str()?;
                    let arg0 = act.pop_str()?;
                    act.push_bool(arg0 == arg1);
                }

                //
                // Object operations
                //
                Opcode::NewObject => {
                    let capacity = act.pop_int64()?;
                    let obj = Obj::with_capacity(capacity.max(0) as usize);
                    act.push(Value::Object(obj));
                }

                Opcode::HasField => {
                    let field_name = act.pop_str()?;
                    let obj = act.pop_obj()?;
                    act.push_bool(obj.has_field(field_name.as_bytes()));
                }

                Opcode::SetField => {
                    let val = act.pop()?;
                    let field_name = act.pop_str()?;
                    let obj = act.pop_obj()?;
                    if !is_valid_ident(field_name.as_bytes()) {
                        return Err(RunError::invalid_ident(field_name.to_string_lossy()));
                    }
                    obj.set_field(&field_name, val);
                }

                // The running program is responsible for testing that
                // fields exist before attempting to read them.
                Opcode::GetField => {
                    let field_name = act.pop_str()?;
                    let obj = act.pop_obj()?;
                    let (val, _) = obj
                        .lookup(field_name.as_bytes(), 0)
                        .ok_or_else(|| RunError::missing_field(field_name.to_string_lossy()))?;
                    act.push(val);
                }

                Opcode::EqObj => {
                    let arg1 = act.pop()?;
                    let arg0 = act.pop()?;
                    act.push_bool(arg0 == arg1);
                }

                //
                // Array operations
                //
                Opcode::NewArray => {
                    let len = act.pop_int64()?;
                    let len = usize::try_from(len).map_err(|_| RunError::index_oob(len, 0))?;
                    act.push(Value::Array(Arr::with_len(len)));
                }

                Opcode::ArrayLen => {
                    let arr = act.pop_arr()?;
                    act.push(Value::Int64(arr.len() as i64));
                }

                Opcode::ArrayPush => {
                    let val = act.pop()?;
                    let arr = act.pop_arr()?;
                    arr.push(val);
                }

                Opcode::SetElem => {
                    let val = act.pop()?;
                    let idx = act.pop_int64()?;
                    let arr = act.pop_arr()?;
                    usize::try_from(idx)
                        .ok()
                        .and_then(|i| arr.set(i, val.clone()))
                        .ok_or(RunError::index_oob(idx, arr.len()))?;
                }

                Opcode::GetElem => {
                    let idx = act.pop_int64()?;
                    let arr = act.pop_arr()?;
                    let val = usize::try_from(idx)
                        .ok()
                        .and_then(|i| arr.get(i))
                        .ok_or(RunError::index_oob(idx, arr.len()))?;
                    act.push(val);
                }

                Opcode::EqBool => {
                    let arg1 = act.pop_bool()?;
                    let arg0 = act.pop_bool()?;
                    act.push_bool(arg0 == arg1);
                }

                // Test if a value has a given tag
                Opcode::HasTag => {
                    let tag = act.pop()?.tag();
                    let tag_str = self.tag_ic.get_str(&instr)?;
                    let matches = match tag {
                        Tag::Undef
                        | Tag::Bool
                        | Tag::Int64
                        | Tag::String
                        | Tag::Array
                        | Tag::Object => tag_str == *tag.name(),
                        other => {
                            return Err(RunError::type_mismatch("tagged value", other.name()))
                        }
                    };
                    act.push_bool(matches);
                }

                Opcode::GetTag => {
                    let tag = act.pop()?.tag();
                    act.push(Value::Str(Str::from(tag.name())));
                }

                Opcode::Jump => {
                    let target = self.jump_to_ic.get_obj(&instr)?;
                    self.branch_to(&mut act, &target)?;
                }

                Opcode::IfTrue => {
                    let then_bb = self.then_ic.get_obj(&instr)?;
                    let else_bb = self.else_ic.get_obj(&instr)?;
                    let arg0 = act.pop()?;
                    let target = if arg0 == Value::TRUE { then_bb } else { else_bb };
                    self.branch_to(&mut act, &target)?;
                }

                // Regular function call
                Opcode::Call => {
                    let ret_to = self.ret_to_ic.get_obj(&instr)?;
                    let num_args = self.num_args_ic.get_int64(&instr)?;
                    let num_args =
                        usize::try_from(num_args).map_err(|_| RunError::index_oob(num_args, 0))?;

                    let callee_val = act.pop()?;

                    if act.stack.len() < num_args {
                        return Err(RunError::StackUnderflow);
                    }

                    // First-pushed operand is argument 0
                    let mut args: ValueVec = smallvec![Value::UNDEF; num_args];
                    for i in (0..num_args).rev() {
                        args[i] = act.pop()?;
                    }

                    enum Callee {
                        Fun(Obj),
                        Host(Rc<HostFn>),
                    }

                    let callee = match callee_val {
                        Value::Object(o) => Callee::Fun(o),
                        Value::HostFn(h) => Callee::Host(h),
                        other => return Err(RunError::invalid_callee(other.tag().name())),
                    };

                    let num_params = match &callee {
                        Callee::Fun(f) => {
                            let n = self.callee_num_params_ic.get_int64(f)?;
                            usize::try_from(n).map_err(|_| RunError::index_oob(n, 0))?
                        }
                        Callee::Host(h) => h.num_params(),
                    };

                    if num_args != num_params {
                        let src_pos = instr
                            .get_field("src_pos")
                            .and_then(|v| SrcPos::from_value(&v))
                            .map(|p| p.to_string());
                        return Err(RunError::ArityMismatch {
                            got: num_args,
                            want: num_params,
                            src_pos,
                        });
                    }

                    let ret_val = match callee {
                        Callee::Fun(f) => self.call(&f, &args)?,
                        Callee::Host(h) => h.invoke(&args)?,
                    };

                    act.push(ret_val);
                    self.branch_to(&mut act, &ret_to)?;
                }

                Opcode::Ret => {
                    if act.instr_idx != act.num_instrs {
                        return Err(RunError::BranchNotLast {
                            instr_idx: act.instr_idx,
                            num_instrs: act.num_instrs,
                        });
                    }
                    return act.pop();
                }

                Opcode::Import => {
                    let pkg_name = act.pop_str()?;
                    let name = pkg_name.to_string_lossy().into_owned();
                    debug!(package = %name, "importing package");
                    let loader = self
                        .loader
                        .as_mut()
                        .ok_or_else(|| RunError::import_failed(name.clone(), "no loader installed"))?;
                    let pkg = loader.import(&name)?;
                    act.push(pkg);
                }

                Opcode::Abort => {
                    let msg = act.pop_str()?;
                    if let Some(pos_val) = instr.get_field("src_pos") {
                        if let Some(pos) = SrcPos::from_value(&pos_val) {
                            print!("{} - ", pos);
                        }
                    }
                    if msg.is_empty() {
                        println!("aborting execution due to error");
                    } else {
                        println!("aborting execution due to error: {}", msg);
                    }
                    std::process::exit(-1);
                }

                // Stub branches only exist inside compiled code
                op @ (Opcode::JumpStub | Opcode::IfTrueStub) => {
                    return Err(RunError::unhandled_op(op.name()));
                }
            }
        }
    }

    /// Call a function exported by a package.
    pub fn call_export_fn(&mut self, pkg: &Obj, fn_name: &str, args: &[Value]) -> RunResult<Value> {
        let fn_val = pkg
            .get_field(fn_name)
            .ok_or_else(|| RunError::missing_field(fn_name))?;
        let fun = match fn_val {
            Value::Object(o) => o,
            other => return Err(RunError::type_mismatch("object", other.tag().name())),
        };
        self.call(&fun, args)
    }

    /// Load an image through the loader and invoke its exported `main`
    /// with no arguments.
    pub fn run_image(&mut self, path: &str) -> RunResult<Value> {
        debug!(image = %path, "loading image");
        let loader = self
            .loader
            .as_mut()
            .ok_or_else(|| RunError::import_failed(path, "no loader installed"))?;
        let pkg_val = loader.parse_file(path)?;
        let pkg = match pkg_val {
            Value::Object(o) => o,
            other => return Err(RunError::type_mismatch("object", other.tag().name())),
        };
        self.call_export_fn(&pkg, "main", &[])
    }
}

impl Default for Interp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_pop_empty() {
        let mut act = Activation::new(0);
        assert_eq!(act.pop().unwrap_err(), RunError::StackUnderflow);
    }

    #[test]
    fn test_activation_push_bool_canonical() {
        let mut act = Activation::new(0);
        act.push_bool(true);
        act.push_bool(false);
        assert_eq!(act.pop().unwrap(), Value::FALSE);
        assert_eq!(act.pop().unwrap(), Value::TRUE);
    }

    #[test]
    fn test_activation_typed_pops() {
        let mut act = Activation::new(0);
        act.push(Value::Int64(1));
        assert!(matches!(
            act.pop_str().unwrap_err(),
            RunError::TypeMismatch { expected: "string", found: "int64" }
        ));
    }

    #[test]
    fn test_locals_start_undef() {
        let act = Activation::new(3);
        assert!(act.locals.iter().all(|v| v.is_undef()));
    }
}
