//! The code heap.
//!
//! A fixed-size byte buffer into which block versions are compiled as a
//! packed record stream: an opcode word (`u16`, host-endian) optionally
//! followed by fixed-width operand words. The write pointer only moves
//! forward; compiled code is never reclaimed.
//!
//! Operand words are `u64`. A `push` record's word indexes the heap's
//! literal pool: values carry reference-counted handles, so the pool owns
//! the literal and the stream stays fixed-width and byte-addressable.

use strata_core::{RunError, RunResult, Value};
use strata_vm::Opcode;

/// Initial code heap size in bytes.
pub const CODE_HEAP_INIT_SIZE: usize = 1 << 20;

/// Flat array of bytes into which code gets compiled.
pub struct CodeHeap {
    buf: Vec<u8>,
    /// Current allocation offset.
    alloc: usize,
    /// Literal operands referenced by the instruction stream.
    lits: Vec<Value>,
}

impl CodeHeap {
    /// A code heap of the standard initial size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_size(CODE_HEAP_INIT_SIZE)
    }

    /// A code heap of an explicit size (tests use small ones).
    #[must_use]
    pub fn with_size(size: usize) -> Self {
        Self {
            buf: vec![0; size],
            alloc: 0,
            lits: Vec::new(),
        }
    }

    /// One past the last writable offset.
    #[inline]
    #[must_use]
    pub fn limit(&self) -> usize {
        self.buf.len()
    }

    /// Current write offset.
    #[inline]
    #[must_use]
    pub fn alloc_pos(&self) -> usize {
        self.alloc
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> RunResult<()> {
        let end = self.alloc.checked_add(bytes.len()).ok_or(RunError::CodeHeapFull)?;
        if end > self.buf.len() {
            return Err(RunError::CodeHeapFull);
        }
        self.buf[self.alloc..end].copy_from_slice(bytes);
        self.alloc = end;
        Ok(())
    }

    /// Append an opcode word.
    pub fn write_opcode(&mut self, op: Opcode) -> RunResult<()> {
        self.write_u16(op.as_u16())
    }

    /// Append a `u16` word.
    pub fn write_u16(&mut self, val: u16) -> RunResult<()> {
        self.write_bytes(&val.to_ne_bytes())
    }

    /// Append a `u64` operand word.
    pub fn write_u64(&mut self, val: u64) -> RunResult<()> {
        self.write_bytes(&val.to_ne_bytes())
    }

    /// Append a literal operand: the value goes to the literal pool, its
    /// pool index goes inline as one operand word.
    pub fn write_lit(&mut self, val: Value) -> RunResult<()> {
        let idx = self.lits.len() as u64;
        self.write_u64(idx)?;
        self.lits.push(val);
        Ok(())
    }

    fn read_bytes(&self, pos: usize, len: usize) -> RunResult<&[u8]> {
        let end = pos.checked_add(len).filter(|end| *end <= self.alloc);
        match end {
            Some(end) => Ok(&self.buf[pos..end]),
            None => Err(RunError::index_oob(pos as i64, self.alloc)),
        }
    }

    /// Read the `u16` word at `pos`. Only compiled bytes are readable.
    pub fn read_u16(&self, pos: usize) -> RunResult<u16> {
        let bytes = self.read_bytes(pos, 2)?;
        Ok(u16::from_ne_bytes([bytes[0], bytes[1]]))
    }

    /// Read the `u64` word at `pos`.
    pub fn read_u64(&self, pos: usize) -> RunResult<u64> {
        let bytes = self.read_bytes(pos, 8)?;
        let mut word = [0u8; 8];
        word.copy_from_slice(bytes);
        Ok(u64::from_ne_bytes(word))
    }

    /// Resolve a literal pool index read back from the stream.
    pub fn lit(&self, idx: u64) -> RunResult<Value> {
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.lits.get(i).cloned())
            .ok_or_else(|| RunError::index_oob(idx as i64, self.lits.len()))
    }
}

impl Default for CodeHeap {
    fn default() -> Self {
        Self::new()
    }
}
