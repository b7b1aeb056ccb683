//! ID -> tile-set maps (spec §3 "Variant backends", §4.2).
//!
//! Every map slot is a 64-bit [`PackedValue`]; both backends share the same
//! merge discipline in [`TileMap::update`]. The hard engineering here is
//! keeping that merge allocation-free in the common case: only a slot that
//! outgrows its inline 5x5 window ever touches the [`OverflowStore`].

use crate::error::Error;
use crate::overflow::OverflowStore;
use crate::packedvalue::{Neighbours, PackedValue, Payload};
use crate::tile::TileCoord;

/// Shared contract of all ID -> tile-set backends (spec §4.2).
pub trait TileMap {
    /// Insert a new base value. Undefined (implementations may panic or
    /// silently overwrite) if `key` is already present — callers are
    /// expected to call this at most once per key, during pass 1.
    fn put(&mut self, key: u64, base: TileCoord, neighbours: Neighbours) -> Result<(), Error>;

    /// The raw packed value for `key`, or `0` if absent.
    fn get_raw(&self, key: u64) -> u64;

    /// Set-union `tiles` into the slot for `key` (spec §4.2 merge steps
    /// 1-4). `tiles` are full expansions (base + neighbours), not yet
    /// reduced to dx/dy offsets.
    fn update(&mut self, key: u64, tiles: &[PackedValue]) -> Result<(), Error>;

    /// Convenience form of [`update`](Self::update) for already-encoded
    /// tile ids with no neighbour bits (spec §4.2 `updateInt`).
    fn update_int(&mut self, key: u64, tile_ids: &[u32]) -> Result<(), Error> {
        let values: Vec<PackedValue> = tile_ids
            .iter()
            .map(|&id| PackedValue::base(TileCoord::decode(id), Neighbours::none()))
            .collect();
        self.update(key, &values)
    }

    /// The element's full expanded tile set, or `None` if `key` is absent.
    fn get_all_tiles(&self, key: u64) -> Option<Vec<TileCoord>>;

    /// All occupied keys, in unspecified order.
    fn keys(&self) -> Vec<u64>;

    /// Number of occupied slots.
    fn load(&self) -> usize;

    /// Fraction of `update` calls across this map's lifetime that forced
    /// an inline-to-extended transition. Advisory only.
    fn miss_hit_ratio(&self) -> f64;

    /// The backend's current slot capacity.
    fn capacity(&self) -> usize;
}

/// Applies the spec §4.2 merge discipline to one slot, given the already
/// decoded current value. Shared by both backends so the bit-twiddling is
/// written and tested exactly once.
fn merge_into_slot(
    current: PackedValue,
    incoming: &[PackedValue],
    overflow: &mut OverflowStore,
) -> Result<(PackedValue, bool), Error> {
    // Step 1: already extended -> union straight into the overflow entry.
    if let Payload::Extended(idx) = current.payload {
        let ids: Vec<u32> = incoming
            .iter()
            .flat_map(|v| v.neighbours.expand(v.base))
            .map(TileCoord::encode)
            .collect();
        overflow.union_into(idx, ids);
        return Ok((current, false));
    }

    // Step 2: expand everything (current inline set + incoming) to a set of
    // coordinates and see if it still fits the 5x5 window.
    let mut union: Vec<TileCoord> = current.inline_tiles();
    for v in incoming {
        union.extend(v.neighbours.expand(v.base));
    }
    union.sort_unstable_by_key(TileCoord::encode);
    union.dedup();

    let already_covered = current.neighbours.expand(current.base);
    let mut candidate = current;
    let mut fits = true;
    for &tile in &union {
        if tile == current.base || already_covered.contains(&tile) {
            continue;
        }
        if !candidate.try_set_inline(tile) {
            fits = false;
            break;
        }
    }

    if fits {
        return Ok((candidate, false));
    }

    // Step 4: transition to extended mode.
    let ids: Vec<u32> = union.into_iter().map(TileCoord::encode).collect();
    let idx = overflow.insert(ids)?;
    let extended = PackedValue {
        base: current.base,
        neighbours: current.neighbours,
        payload: Payload::Extended(idx),
    };
    Ok((extended, true))
}

/// Open-addressed hash map backend (spec §3 "Open-addressed hash map").
///
/// Parallel key/value arrays, linear probing, no tombstones (keys are
/// never removed). The sign bit of a key word marks that its bucket has
/// participated in an overflow (probing) chain, letting lookups for keys
/// that never collided skip the chain walk entirely.
pub struct HashTileMap {
    keys: Vec<u64>,
    values: Vec<u64>,
    len: usize,
    max_capacity: usize,
    overflow: OverflowStore,
    update_calls: u64,
    extend_events: u64,
}

const EMPTY_KEY: u64 = u64::MAX;
const PROBED_BIT: u64 = 1 << 63;

impl HashTileMap {
    /// `initial_capacity` is rounded up to a power of two; `max_capacity`
    /// bounds how far the table may grow before returning
    /// [`Error::CapacityExhausted`].
    #[must_use]
    pub fn new(initial_capacity: usize, max_capacity: usize) -> Self {
        let capacity = initial_capacity.next_power_of_two().max(16);
        Self {
            keys: vec![EMPTY_KEY; capacity],
            values: vec![0; capacity],
            len: 0,
            max_capacity: max_capacity.next_power_of_two().max(capacity),
            overflow: OverflowStore::new(),
            update_calls: 0,
            extend_events: 0,
        }
    }

    fn mask(&self) -> u64 {
        (self.keys.len() - 1) as u64
    }

    fn slot_key(&self, key: u64) -> u64 {
        key & !PROBED_BIT
    }

    fn find_slot(&self, key: u64) -> Option<usize> {
        let mut idx = (key.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 16) & self.mask();
        let mut at_home = true;
        loop {
            let idx_usize = idx as usize;
            let stored = self.keys[idx_usize];
            if stored == EMPTY_KEY {
                return None;
            }
            if self.slot_key(stored) == key {
                return Some(idx_usize);
            }
            // The home slot's own PROBED_BIT records whether any insertion
            // ever had to walk past it; if not, no chain reaches further
            // and `key` (absent here) can't be stored anywhere else.
            if at_home && stored & PROBED_BIT == 0 {
                return None;
            }
            at_home = false;
            idx = (idx + 1) & self.mask();
        }
    }

    fn insert_slot(keys: &mut [u64], values: &mut [u64], mask: u64, key: u64, value: u64) {
        let mut idx = (key.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 16) & mask;
        let mut probed = false;
        loop {
            let idx_usize = idx as usize;
            if keys[idx_usize] == EMPTY_KEY {
                keys[idx_usize] = if probed { key | PROBED_BIT } else { key };
                values[idx_usize] = value;
                return;
            }
            probed = true;
            keys[idx_usize] |= PROBED_BIT;
            idx = (idx + 1) & mask;
        }
    }

    fn grow(&mut self) -> Result<(), Error> {
        let new_capacity = self.keys.len() * 2;
        if new_capacity > self.max_capacity {
            return Err(Error::CapacityExhausted);
        }
        let mut new_keys = vec![EMPTY_KEY; new_capacity];
        let mut new_values = vec![0u64; new_capacity];
        let new_mask = (new_capacity - 1) as u64;
        for (k, v) in self.keys.iter().zip(self.values.iter()) {
            if *k != EMPTY_KEY {
                let bare = k & !PROBED_BIT;
                Self::insert_slot(&mut new_keys, &mut new_values, new_mask, bare, *v);
            }
        }
        self.keys = new_keys;
        self.values = new_values;
        Ok(())
    }

    fn ensure_capacity_for_insert(&mut self) -> Result<(), Error> {
        // Keep load factor under 0.75, same ceiling the teacher's directory
        // lookup assumes implicitly via binary search over a dense array.
        if (self.len + 1) * 4 > self.keys.len() * 3 {
            self.grow()?;
        }
        Ok(())
    }
}

impl TileMap for HashTileMap {
    fn put(&mut self, key: u64, base: TileCoord, neighbours: Neighbours) -> Result<(), Error> {
        self.ensure_capacity_for_insert()?;
        let value = PackedValue::base(base, neighbours).to_bits();
        let mask = self.mask();
        Self::insert_slot(&mut self.keys, &mut self.values, mask, key, value);
        self.len += 1;
        Ok(())
    }

    fn get_raw(&self, key: u64) -> u64 {
        self.find_slot(key).map_or(0, |idx| self.values[idx])
    }

    fn update(&mut self, key: u64, tiles: &[PackedValue]) -> Result<(), Error> {
        self.update_calls += 1;
        let Some(idx) = self.find_slot(key) else {
            return Ok(());
        };
        let current = PackedValue::from_bits(self.values[idx])
            .expect("occupied slot always decodes (invariant 1)");
        let (merged, extended) = merge_into_slot(current, tiles, &mut self.overflow)?;
        if extended {
            self.extend_events += 1;
        }
        self.values[idx] = merged.to_bits();
        Ok(())
    }

    fn get_all_tiles(&self, key: u64) -> Option<Vec<TileCoord>> {
        let idx = self.find_slot(key)?;
        let value = PackedValue::from_bits(self.values[idx])?;
        Some(match value.payload {
            Payload::Inline(_) => value.inline_tiles(),
            Payload::Extended(overflow_idx) => self.overflow.get_coords(overflow_idx),
        })
    }

    fn keys(&self) -> Vec<u64> {
        self.keys
            .iter()
            .filter(|&&k| k != EMPTY_KEY)
            .map(|&k| k & !PROBED_BIT)
            .collect()
    }

    fn load(&self) -> usize {
        self.len
    }

    fn miss_hit_ratio(&self) -> f64 {
        if self.update_calls == 0 {
            0.0
        } else {
            self.extend_events as f64 / self.update_calls as f64
        }
    }

    fn capacity(&self) -> usize {
        self.keys.len()
    }
}

/// Direct-indexed array backend (spec §3 "Direct-indexed array map").
///
/// Chosen when the maximum id is known in advance. Backed by shards of a
/// fixed size rather than one flat allocation, since a single contiguous
/// array spanning the full OSM id space exceeds typical platform limits
/// (spec §5 "Memory").
pub struct ArrayTileMap {
    shards: Vec<Option<Box<[u64]>>>,
    shard_bits: u32,
    max_id: u64,
    overflow: OverflowStore,
    len: usize,
    update_calls: u64,
    extend_events: u64,
}

impl ArrayTileMap {
    const DEFAULT_SHARD_BITS: u32 = 20; // 1M slots (8 MiB) per shard.

    #[must_use]
    pub fn new(max_id: u64) -> Self {
        Self::with_shard_bits(max_id, Self::DEFAULT_SHARD_BITS)
    }

    #[must_use]
    pub fn with_shard_bits(max_id: u64, shard_bits: u32) -> Self {
        let shard_size = 1usize << shard_bits;
        let num_shards = (max_id as usize / shard_size) + 1;
        Self {
            shards: (0..num_shards).map(|_| None).collect(),
            shard_bits,
            max_id,
            overflow: OverflowStore::new(),
            len: 0,
            update_calls: 0,
            extend_events: 0,
        }
    }

    fn locate(&self, key: u64) -> (usize, usize) {
        let shard_size = 1usize << self.shard_bits;
        ((key as usize) / shard_size, (key as usize) % shard_size)
    }

    fn check_id(&self, key: u64) -> Result<(), Error> {
        if key > self.max_id {
            Err(Error::IdOutOfRange { id: key, max: self.max_id })
        } else {
            Ok(())
        }
    }
}

impl TileMap for ArrayTileMap {
    fn put(&mut self, key: u64, base: TileCoord, neighbours: Neighbours) -> Result<(), Error> {
        self.check_id(key)?;
        let (shard, offset) = self.locate(key);
        let shard_size = 1usize << self.shard_bits;
        let slab = self.shards[shard].get_or_insert_with(|| vec![0u64; shard_size].into_boxed_slice());
        if slab[offset] == 0 {
            self.len += 1;
        }
        slab[offset] = PackedValue::base(base, neighbours).to_bits();
        Ok(())
    }

    fn get_raw(&self, key: u64) -> u64 {
        if key > self.max_id {
            return 0;
        }
        let (shard, offset) = self.locate(key);
        self.shards
            .get(shard)
            .and_then(|s| s.as_ref())
            .map_or(0, |slab| slab[offset])
    }

    fn update(&mut self, key: u64, tiles: &[PackedValue]) -> Result<(), Error> {
        self.check_id(key)?;
        self.update_calls += 1;
        let (shard, offset) = self.locate(key);
        let Some(slab) = self.shards.get_mut(shard).and_then(|s| s.as_mut()) else {
            return Ok(());
        };
        let Some(current) = PackedValue::from_bits(slab[offset]) else {
            return Ok(());
        };
        let (merged, extended) = merge_into_slot(current, tiles, &mut self.overflow)?;
        if extended {
            self.extend_events += 1;
        }
        slab[offset] = merged.to_bits();
        Ok(())
    }

    fn get_all_tiles(&self, key: u64) -> Option<Vec<TileCoord>> {
        if key > self.max_id {
            return None;
        }
        let (shard, offset) = self.locate(key);
        let slab = self.shards.get(shard)?.as_ref()?;
        let value = PackedValue::from_bits(slab[offset])?;
        Some(match value.payload {
            Payload::Inline(_) => value.inline_tiles(),
            Payload::Extended(idx) => self.overflow.get_coords(idx),
        })
    }

    fn keys(&self) -> Vec<u64> {
        let shard_size = 1u64 << self.shard_bits;
        let mut out = Vec::with_capacity(self.len);
        for (shard_idx, shard) in self.shards.iter().enumerate() {
            let Some(slab) = shard else { continue };
            for (offset, &v) in slab.iter().enumerate() {
                if v != 0 {
                    out.push(shard_idx as u64 * shard_size + offset as u64);
                }
            }
        }
        out
    }

    fn load(&self) -> usize {
        self.len
    }

    fn miss_hit_ratio(&self) -> f64 {
        if self.update_calls == 0 {
            0.0
        } else {
            self.extend_events as f64 / self.update_calls as f64
        }
    }

    fn capacity(&self) -> usize {
        (self.max_id + 1) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_value(coord: TileCoord) -> PackedValue {
        PackedValue::base(coord, Neighbours::none())
    }

    #[test]
    fn put_then_get_roundtrips_base_tile() {
        let mut map = HashTileMap::new(16, 1024);
        map.put(42, TileCoord::new(3, 4), Neighbours::none()).unwrap();
        assert_eq!(
            map.get_all_tiles(42).unwrap(),
            Neighbours::none().expand(TileCoord::new(3, 4))
        );
    }

    #[test]
    fn absent_key_returns_none_and_zero() {
        let map = HashTileMap::new(16, 1024);
        assert_eq!(map.get_raw(7), 0);
        assert!(map.get_all_tiles(7).is_none());
    }

    #[test]
    fn update_stays_inline_within_5x5_window() {
        let mut map = HashTileMap::new(16, 1024);
        map.put(1, TileCoord::new(10, 10), Neighbours::none()).unwrap();
        map.update(1, &[full_value(TileCoord::new(11, 11))]).unwrap();
        let tiles = map.get_all_tiles(1).unwrap();
        assert!(tiles.contains(&TileCoord::new(10, 10)));
        assert!(tiles.contains(&TileCoord::new(11, 11)));
        assert_eq!(map.miss_hit_ratio(), 0.0);
    }

    #[test]
    fn update_with_a_tile_the_neighbour_flag_already_covers_is_not_duplicated() {
        // A node placed with an east neighbour flag already reports
        // base+east from get_all_tiles; folding that same tile back in via
        // `update` (as pass 1 does for every way-node) must not also set an
        // inline bit for it, or get_all_tiles would return it twice (spec
        // §3 invariant 2/3: the tile set is a set, not a multiset).
        let mut map = HashTileMap::new(16, 1024);
        let base = TileCoord::new(10, 10);
        let east = TileCoord::new(11, 10);
        map.put(1, base, Neighbours { east: true, south: false }).unwrap();
        map.update(1, &[full_value(east)]).unwrap();

        let tiles = map.get_all_tiles(1).unwrap();
        assert_eq!(tiles.iter().filter(|&&t| t == east).count(), 1);
        assert_eq!(tiles.iter().filter(|&&t| t == base).count(), 1);
    }

    #[test]
    fn update_transitions_to_extended_beyond_window() {
        let mut map = HashTileMap::new(16, 1024);
        map.put(1, TileCoord::new(10, 10), Neighbours::none()).unwrap();
        map.update(1, &[full_value(TileCoord::new(100, 100))]).unwrap();
        let tiles = map.get_all_tiles(1).unwrap();
        assert!(tiles.contains(&TileCoord::new(10, 10)));
        assert!(tiles.contains(&TileCoord::new(100, 100)));
        assert_eq!(map.miss_hit_ratio(), 1.0);
    }

    #[test]
    fn update_is_commutative_and_idempotent() {
        let mut a = HashTileMap::new(16, 1024);
        a.put(1, TileCoord::new(0, 0), Neighbours::none()).unwrap();
        a.update(1, &[full_value(TileCoord::new(1, 1))]).unwrap();
        a.update(1, &[full_value(TileCoord::new(2, 2))]).unwrap();

        let mut b = HashTileMap::new(16, 1024);
        b.put(1, TileCoord::new(0, 0), Neighbours::none()).unwrap();
        b.update(1, &[full_value(TileCoord::new(2, 2))]).unwrap();
        b.update(1, &[full_value(TileCoord::new(1, 1))]).unwrap();
        b.update(1, &[full_value(TileCoord::new(1, 1))]).unwrap();

        let mut tiles_a = a.get_all_tiles(1).unwrap();
        let mut tiles_b = b.get_all_tiles(1).unwrap();
        tiles_a.sort();
        tiles_b.sort();
        assert_eq!(tiles_a, tiles_b);
    }

    #[test]
    fn find_slot_short_circuits_on_an_uncollided_home_bucket() {
        // Regression for the PROBED_BIT short-circuit documented on
        // HashTileMap: a key whose home slot never took part in a probe
        // chain must still report "absent" correctly, not just "correct
        // after walking the whole chain".
        let mut map = HashTileMap::new(16, 1024);
        map.put(1, TileCoord::new(1, 1), Neighbours::none()).unwrap();
        assert!(map.get_all_tiles(1).is_some());
        assert!(map.get_all_tiles(999_999).is_none());
    }

    #[test]
    fn grow_preserves_existing_entries() {
        let mut map = HashTileMap::new(4, 4096);
        for id in 0..200u64 {
            map.put(id, TileCoord::new(id as u32, id as u32), Neighbours::none())
                .unwrap();
        }
        for id in 0..200u64 {
            assert!(map.get_all_tiles(id).is_some());
        }
        assert!(map.capacity() >= 200);
    }

    #[test]
    fn growth_beyond_max_capacity_is_an_error() {
        let mut map = HashTileMap::new(4, 8);
        for id in 0..6u64 {
            let _ = map.put(id, TileCoord::new(0, 0), Neighbours::none());
        }
        let result = map.put(100, TileCoord::new(0, 0), Neighbours::none());
        assert!(matches!(result, Err(Error::CapacityExhausted)));
    }

    #[test]
    fn array_map_rejects_ids_over_max() {
        let mut map = ArrayTileMap::new(10);
        assert!(map.put(10, TileCoord::new(0, 0), Neighbours::none()).is_ok());
        let err = map.put(11, TileCoord::new(0, 0), Neighbours::none());
        assert!(matches!(err, Err(Error::IdOutOfRange { id: 11, max: 10 })));
    }

    #[test]
    fn array_map_put_get_roundtrip() {
        let mut map = ArrayTileMap::with_shard_bits(1000, 6);
        map.put(500, TileCoord::new(7, 8), Neighbours::none()).unwrap();
        assert_eq!(
            map.get_all_tiles(500).unwrap(),
            Neighbours::none().expand(TileCoord::new(7, 8))
        );
        assert_eq!(map.load(), 1);
    }

    #[test]
    fn array_map_extends_to_overflow_same_as_hash_map() {
        let mut map = ArrayTileMap::with_shard_bits(1000, 6);
        map.put(1, TileCoord::new(1, 1), Neighbours::none()).unwrap();
        map.update(1, &[full_value(TileCoord::new(500, 500))]).unwrap();
        let tiles = map.get_all_tiles(1).unwrap();
        assert!(tiles.contains(&TileCoord::new(500, 500)));
    }
}
