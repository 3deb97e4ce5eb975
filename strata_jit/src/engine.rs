//! Block compiler and linear-dispatch execution engine.
//!
//! The [`Engine`] lowers basic blocks into the code heap one version at a
//! time and executes the resulting instruction stream against the word
//! stack. Today the compiler handles `push` and `ret`, enough to run a
//! constant-returning function end to end, and refuses everything else
//! with `UnhandledOp`; the surrounding structure (version table, frame
//! layout, sentinel return address) is the scaffolding later specialization
//! builds on.
//!
//! Top-level frame layout, from the stack bottom down:
//!
//! ```text
//! bottom-1   caller function placeholder  Int64(0)
//! bottom-2   return address               RetAddr(null)   <- bp
//! bottom-3   local 0
//! ...        local i at bp - 1 - i
//! ```

use crate::code_heap::CodeHeap;
use crate::stack::WordStack;
use crate::version::{CodeFragment, VersionId, VersionTable};
use strata_core::{ICache, Obj, RunError, RunResult, Value, NULL_RETADDR};
use strata_vm::Opcode;
use tracing::debug;

/// The second-stage execution engine.
pub struct Engine {
    heap: CodeHeap,
    stack: WordStack,
    versions: VersionTable,

    // Per-site inline caches.
    instrs_ic: ICache,
    op_ic: ICache,
    val_ic: ICache,
    fun_num_params_ic: ICache,
    fun_num_locals_ic: ICache,
    entry_ic: ICache,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: CodeHeap::new(),
            stack: WordStack::new(),
            versions: VersionTable::new(),
            instrs_ic: ICache::new("instrs"),
            op_ic: ICache::new("op"),
            val_ic: ICache::new("val"),
            fun_num_params_ic: ICache::new("num_params"),
            fun_num_locals_ic: ICache::new("num_locals"),
            entry_ic: ICache::new("entry"),
        }
    }

    /// The version table (for inspecting version lists).
    #[must_use]
    pub fn versions(&self) -> &VersionTable {
        &self.versions
    }

    /// The code heap (for inspecting emitted code).
    #[must_use]
    pub fn heap(&self) -> &CodeHeap {
        &self.heap
    }

    /// Live word count on the stack.
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.stack.depth()
    }

    /// Get or create the version of a block.
    pub fn get_block_version(&mut self, block: &Obj) -> VersionId {
        self.versions.get_block_version(block)
    }

    /// Compile a block version into the code heap.
    ///
    /// Returns the existing fragment when the version is already compiled.
    pub fn compile(&mut self, id: VersionId) -> RunResult<CodeFragment> {
        if let Some(frag) = self.versions.version(id).frag() {
            return Ok(frag);
        }

        let block = self.versions.version(id).block().clone();
        let instrs = self.instrs_ic.get_arr(&block)?;

        let start = self.heap.alloc_pos();

        for i in 0..instrs.len() {
            let instr_val = instrs
                .get(i)
                .ok_or(RunError::index_oob(i as i64, instrs.len()))?;
            let instr = match instr_val {
                Value::Object(o) => o,
                other => return Err(RunError::type_mismatch("object", other.tag().name())),
            };

            let op = self.op_ic.get_str(&instr)?;
            match op.as_utf8() {
                Some("push") => {
                    let val = self.val_ic.get_field(&instr)?;
                    self.heap.write_opcode(Opcode::Push)?;
                    self.heap.write_lit(val)?;
                }
                Some("ret") => {
                    self.heap.write_opcode(Opcode::Ret)?;
                }
                _ => return Err(RunError::unhandled_op(op.to_string_lossy())),
            }
        }

        let end = self.heap.alloc_pos();
        let frag = CodeFragment { start, end };
        debug!(
            block = %block.get_field("name").map_or_else(String::new, |n| format!("{n}")),
            start,
            end,
            "compiled block version"
        );
        self.versions.version_mut(id).set_frag(frag);
        Ok(frag)
    }

    /// Stack index of local `i` in the frame based at `bp`.
    #[inline]
    fn local_slot(bp: usize, i: usize) -> usize {
        bp - 1 - i
    }

    /// Begin the execution of a function (top-level call).
    pub fn call_fun(&mut self, fun: &Obj, args: &[Value]) -> RunResult<Value> {
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

        debug_assert!(self.stack.is_empty());

        match self.enter_frame(fun, args, num_locals) {
            Ok(ret_val) => {
                // Pop the local variables, return address and calling
                // function.
                self.stack.dealloc(num_locals + 2);
                debug_assert!(self.stack.is_empty());
                Ok(ret_val)
            }
            Err(err) => {
                self.stack.reset();
                Err(err)
            }
        }
    }

    /// Build the top-level frame, compile the entry version and execute it.
    fn enter_frame(&mut self, fun: &Obj, args: &[Value], num_locals: usize) -> RunResult<Value> {
        // Caller function and return address are placeholders: this is a
        // top-level call, and the null sentinel is the stop condition.
        self.stack.push(Value::Int64(0))?;
        self.stack.push(Value::RetAddr(NULL_RETADDR))?;

        let base = self.stack.sp();
        self.stack.set_bp(base);

        self.stack.alloc(num_locals)?;
        for (i, arg) in args.iter().enumerate() {
            self.stack.set(Self::local_slot(base, i), arg.clone())?;
        }

        let entry = self.entry_ic.get_obj(fun)?;
        let entry_ver = self.versions.get_block_version(&entry);
        let frag = self.compile(entry_ver)?;
        debug_assert!(frag.len() > 0);

        self.exec(frag.start)
    }

    /// Execute compiled code beginning at `start`.
    fn exec(&mut self, start: usize) -> RunResult<Value> {
        let mut ip = start;

        loop {
            let word = self.heap.read_u16(ip)?;
            ip += 2;
            let op = Opcode::from_u16(word)
                .ok_or_else(|| RunError::unknown_op(format!("{word:#06x}")))?;

            match op {
                Opcode::Push => {
                    let lit_idx = self.heap.read_u64(ip)?;
                    ip += 8;
                    let val = self.heap.lit(lit_idx)?;
                    self.stack.push(val)?;
                }

                Opcode::Ret => {
                    let ret_val = self.stack.pop()?;
                    match self.stack.get(self.stack.bp())? {
                        Value::RetAddr(addr) if addr == NULL_RETADDR => return Ok(ret_val),
                        // Deeper frames cannot exist until call emission
                        // lands; refuse rather than resume blindly.
                        Value::RetAddr(_) => {
                            return Err(RunError::unhandled_op("ret to non-null return address"))
                        }
                        other => {
                            return Err(RunError::type_mismatch("retaddr", other.tag().name()))
                        }
                    }
                }

                other => return Err(RunError::unhandled_op(other.name())),
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
        self.call_fun(&fun, args)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
