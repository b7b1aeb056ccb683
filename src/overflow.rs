//! The overflow store: a growable, append-only arena of tile-id arrays
//! (spec §3 "Overflow store").
//!
//! Map slots that outgrow the inline 5x5 window reference an entry here by
//! index instead of by pointer, the same arena-plus-index discipline the
//! spec calls out in §9 ("Arena + index in place of cyclic ownership").

use crate::error::Error;
use crate::tile::TileCoord;

/// Bounded by the 24-bit payload field: at most `2^24` entries.
pub const MAX_ENTRIES: usize = 1 << 24;

#[derive(Default)]
pub struct OverflowStore {
    entries: Vec<Vec<u32>>,
}

impl OverflowStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a new, deduplicated, sorted tile set; returns its index.
    pub fn insert(&mut self, mut tiles: Vec<u32>) -> Result<u32, Error> {
        if self.entries.len() >= MAX_ENTRIES {
            return Err(Error::OverflowStoreSaturated);
        }
        tiles.sort_unstable();
        tiles.dedup();
        let idx = self.entries.len() as u32;
        self.entries.push(tiles);
        Ok(idx)
    }

    #[must_use]
    pub fn get(&self, idx: u32) -> &[u32] {
        &self.entries[idx as usize]
    }

    /// Set-union `tiles` into the entry at `idx` in place (spec §4.2 step 1:
    /// "already in extended mode, union into the overflow entry").
    pub fn union_into(&mut self, idx: u32, tiles: impl IntoIterator<Item = u32>) {
        let entry = &mut self.entries[idx as usize];
        entry.extend(tiles);
        entry.sort_unstable();
        entry.dedup();
    }

    #[must_use]
    pub fn get_coords(&self, idx: u32) -> Vec<TileCoord> {
        self.get(idx).iter().copied().map(TileCoord::decode).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_dedupes_and_sorts() {
        let mut store = OverflowStore::new();
        let idx = store.insert(vec![5, 1, 5, 3]).unwrap();
        assert_eq!(store.get(idx), &[1, 3, 5]);
    }

    #[test]
    fn union_into_is_idempotent() {
        let mut store = OverflowStore::new();
        let idx = store.insert(vec![1, 2]).unwrap();
        store.union_into(idx, [2, 3]);
        store.union_into(idx, [2, 3]);
        assert_eq!(store.get(idx), &[1, 2, 3]);
    }

    #[test]
    fn index_never_reused_within_a_run() {
        let mut store = OverflowStore::new();
        let a = store.insert(vec![1]).unwrap();
        let b = store.insert(vec![2]).unwrap();
        assert_ne!(a, b);
    }
}
