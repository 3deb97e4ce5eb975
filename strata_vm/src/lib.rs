//! Tree-walking execution tier for the Strata VM.
//!
//! Programs are graphs of plain objects: a package exports functions, a
//! function names its entry basic block, a block carries an array of
//! instruction objects, and every instruction selects its operation through
//! an `op` string. This crate executes that representation directly:
//!
//! - [`Decoder`]: maps instruction objects to [`Opcode`]s, memoized by
//!   object identity, with an inline cache on the `op` field
//! - [`Interp`]: the dispatch loop, activation state and call protocol
//! - [`Loader`]: the seam through which images and packages arrive
//!
//! The second-stage engine that lowers blocks into a linear bytecode stream
//! lives in `strata_jit`; both tiers share the value system of
//! `strata_core`.

pub mod decode;
pub mod interp;
pub mod loader;
pub mod opcode;

pub use decode::{parse_op, Decoder};
pub use interp::Interp;
pub use loader::Loader;
pub use opcode::Opcode;
