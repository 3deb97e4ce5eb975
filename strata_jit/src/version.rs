//! Block versions.
//!
//! Each basic block the compiler touches gets a [`BlockVersion`] owning a
//! `[start, end)` fragment of the code heap. The table keeps a *list* of
//! versions per block even though only one is produced today: the list is
//! the extension point where entry-state-specialized versions will be
//! stored, and [`VersionTable::get_block_version`] is where the
//! context-comparison hook will sit.

use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};
use strata_core::{Obj, ObjId};

/// A `[start, end)` byte range of the code heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeFragment {
    pub start: usize,
    pub end: usize,
}

impl CodeFragment {
    /// Length of the fragment in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A compiled (or not-yet-compiled) specialization of a basic block.
pub struct BlockVersion {
    /// Associated block.
    block: Obj,
    /// Code range, set once the version is compiled.
    frag: Option<CodeFragment>,
}

impl BlockVersion {
    #[must_use]
    pub fn block(&self) -> &Obj {
        &self.block
    }

    #[must_use]
    pub fn frag(&self) -> Option<CodeFragment> {
        self.frag
    }

    pub(crate) fn set_frag(&mut self, frag: CodeFragment) {
        debug_assert!(self.frag.is_none());
        self.frag = Some(frag);
    }
}

/// Handle to a version stored in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionId(usize);

type VersionList = SmallVec<[VersionId; 1]>;

/// Map of block objects to lists of versions.
pub struct VersionTable {
    versions: Vec<BlockVersion>,
    /// Version list per block identity. The `BlockVersion` holds the block
    /// handle, pinning the identity key for the table's lifetime.
    map: FxHashMap<ObjId, VersionList>,
}

impl VersionTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            versions: Vec::new(),
            map: FxHashMap::default(),
        }
    }

    /// Get the version of a block, creating a fresh stub on first lookup.
    pub fn get_block_version(&mut self, block: &Obj) -> VersionId {
        if let Some(list) = self.map.get(&block.id()) {
            debug_assert_eq!(list.len(), 1);
            return list[0];
        }

        let id = VersionId(self.versions.len());
        self.versions.push(BlockVersion {
            block: block.clone(),
            frag: None,
        });
        self.map.insert(block.id(), smallvec![id]);
        id
    }

    #[must_use]
    pub fn version(&self, id: VersionId) -> &BlockVersion {
        &self.versions[id.0]
    }

    pub(crate) fn version_mut(&mut self, id: VersionId) -> &mut BlockVersion {
        &mut self.versions[id.0]
    }

    /// Number of versions recorded for a block.
    #[must_use]
    pub fn num_versions(&self, block: &Obj) -> usize {
        self.map.get(&block.id()).map_or(0, |list| list.len())
    }
}

impl Default for VersionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_lookup_creates_single_version() {
        let mut table = VersionTable::new();
        let block = Obj::new();
        assert_eq!(table.num_versions(&block), 0);

        let id = table.get_block_version(&block);
        assert_eq!(table.num_versions(&block), 1);
        assert!(table.version(id).frag().is_none());
        assert!(Obj::ptr_eq(table.version(id).block(), &block));
    }

    #[test]
    fn test_repeat_lookup_returns_existing_version() {
        let mut table = VersionTable::new();
        let block = Obj::new();
        let a = table.get_block_version(&block);
        let b = table.get_block_version(&block);
        assert_eq!(a, b);
        assert_eq!(table.num_versions(&block), 1);
    }

    #[test]
    fn test_distinct_blocks_get_distinct_versions() {
        let mut table = VersionTable::new();
        let a = table.get_block_version(&Obj::new());
        let b = table.get_block_version(&Obj::new());
        assert_ne!(a, b);
    }

    #[test]
    fn test_fragment_length() {
        let frag = CodeFragment { start: 4, end: 16 };
        assert_eq!(frag.len(), 12);
        assert!(!frag.is_empty());
        assert!(CodeFragment { start: 4, end: 4 }.is_empty());
    }
}
