//! Block-versioning code generator harness for the Strata VM.
//!
//! The second-stage engine trades the tree walk of `strata_vm` for a linear
//! bytecode stream: basic blocks are lowered one *version* at a time into a
//! process-wide [`CodeHeap`] and executed against a downward-growing
//! [`WordStack`] with an explicit frame layout. The pieces:
//!
//! - [`CodeHeap`]: fixed 1 MiB byte buffer, monotonic write pointer,
//!   `⟨opcode u16⟩ ⟨operand u64⟩…` records
//! - [`WordStack`]: 65 536 value words, `sp`/`bp`, overflow-checked
//! - [`VersionTable`]: block identity → list of [`BlockVersion`]s (one per
//!   block today; the list is the specialization extension point)
//! - [`Engine`]: compiles block versions, runs the dispatch loop, and sets
//!   up top-level calls with the sentinel return address
//!
//! Only `push` and `ret` compile so far; every other opcode is refused with
//! `UnhandledOp` at compile time.

pub mod code_heap;
pub mod engine;
pub mod stack;
pub mod version;

pub use code_heap::{CodeHeap, CODE_HEAP_INIT_SIZE};
pub use engine::Engine;
pub use stack::{WordStack, STACK_INIT_SIZE};
pub use version::{BlockVersion, CodeFragment, VersionId, VersionTable};
