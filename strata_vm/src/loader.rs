//! The loader seam.
//!
//! Parsing on-disk images and resolving package names are external
//! collaborators of the execution core. Embedders implement [`Loader`] and
//! hand it to the interpreter; the `import` instruction and the image test
//! harness go through it.

use strata_core::{RunResult, Value};

/// Produces package objects from images and package names.
pub trait Loader {
    /// Materialize the package object stored in an image file.
    fn parse_file(&mut self, path: &str) -> RunResult<Value>;

    /// Resolve a package by name.
    fn import(&mut self, name: &str) -> RunResult<Value>;
}
