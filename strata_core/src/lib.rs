//! Core value representation and shared infrastructure for the Strata VM.
//!
//! This crate defines everything the execution tiers agree on:
//!
//! - [`Value`]: the tagged scalar flowing through the interpreter and the
//!   code-heap engine (`Undef`, `Bool`, `Int64`, `Str`, `Array`, `Object`,
//!   `HostFn`, plus the engine-internal `RetAddr`)
//! - [`Obj`]: slot-indexed objects whose field lookups report the slot they
//!   hit, which is what makes inline caching possible
//! - [`Arr`] / [`Str`]: arrays and immutable byte strings
//! - [`ICache`]: the per-call-site inline cache for repeated field lookups
//! - [`CharCache`]: canonical single-byte strings, populated lazily
//! - [`RunError`]: the single error channel every run failure is reported on
//!
//! The crate is deliberately single-threaded: handles are `Rc`-based and the
//! containers use `RefCell` interior mutability. Execution is strictly
//! sequential, so there is nothing to synchronize.

pub mod array;
pub mod error;
pub mod hostfn;
pub mod icache;
pub mod ident;
pub mod object;
pub mod pos;
pub mod string;
pub mod value;

pub use array::Arr;
pub use error::{RunError, RunResult};
pub use hostfn::{HostFn, HostFnEntry};
pub use icache::ICache;
pub use ident::is_valid_ident;
pub use object::{Obj, ObjId};
pub use pos::SrcPos;
pub use string::{CharCache, Str};
pub use value::{Tag, Value, NULL_RETADDR};
