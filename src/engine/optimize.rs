//! The optimisation pass: coalesces sparse high-zoom tiles into lower-
//! zoom parents (spec §4.7).
//!
//! Triggered by `Config::node_limit > 0`. Produces an [`OptimisePlan`]
//! the write pass consults to decide, for each element's tile id, which
//! zoom level (and which remapped tile) it now belongs to.

use std::collections::HashMap;

use crate::modifiedset::ModifiedSet;
use crate::tile::TileCoord;

use super::Engine;

/// The result of the optimisation pass: a remap table from base-zoom
/// tile id to its assigned (possibly lower) zoom, plus a sparse set of
/// tiles to write per zoom level.
#[derive(Debug, Clone)]
pub struct OptimisePlan {
    base_zoom: u8,
    zoom_map: HashMap<u32, u8>,
    zoom_sets: HashMap<u8, ModifiedSet>,
}

impl OptimisePlan {
    /// The zoom levels this plan actually produces output for, in
    /// descending order (base zoom first).
    #[must_use]
    pub fn zoom_levels(&self) -> Vec<u8> {
        let mut zooms: Vec<u8> = self.zoom_sets.keys().copied().collect();
        zooms.sort_unstable_by(|a, b| b.cmp(a));
        zooms
    }

    #[must_use]
    pub fn tiles_at(&self, zoom: u8) -> Option<&ModifiedSet> {
        self.zoom_sets.get(&zoom)
    }

    /// Maps a base-zoom tile id to `(remapped tile, assigned zoom)`
    /// (spec `mapToNewTile`).
    #[must_use]
    pub fn remap(&self, tile_id: u32) -> (TileCoord, u8) {
        let coord = TileCoord::decode(tile_id);
        let zoom = self.zoom_map.get(&tile_id).copied().unwrap_or(self.base_zoom);
        let shift = self.base_zoom - zoom;
        (TileCoord::new(coord.x >> shift, coord.y >> shift), zoom)
    }
}

pub(super) fn run(engine: &mut Engine) -> OptimisePlan {
    let base_zoom = engine.config.zoom;
    let node_limit = engine.config.node_limit;
    let max_z = 4u8.min(base_zoom);

    let mut counts: HashMap<u32, u64> = HashMap::new();
    for key in engine.nmap.keys() {
        if let Some(tiles) = engine.nmap.get_all_tiles(key) {
            for tile in tiles {
                *counts.entry(tile.encode()).or_insert(0) += 1;
            }
        }
    }

    let mut sorted_tiles: Vec<u32> = counts.keys().copied().collect();
    sorted_tiles.sort_unstable();

    let mut zoom_map: HashMap<u32, u8> = HashMap::new();

    for &tile_id in &sorted_tiles {
        if zoom_map.contains_key(&tile_id) {
            continue;
        }
        if counts[&tile_id] >= node_limit {
            continue;
        }

        let coord = TileCoord::decode(tile_id);
        let mut remembered: Option<(Vec<u32>, u8)> = None;

        for z in 1..=max_z {
            let parent_x = coord.x >> z;
            let parent_y = coord.y >> z;
            let span = 1u32 << z;
            let mut q = Vec::with_capacity((span * span) as usize);
            for dx in 0..span {
                for dy in 0..span {
                    q.push(TileCoord::new(parent_x * span + dx, parent_y * span + dy).encode());
                }
            }
            let total: u64 = q.iter().map(|id| counts.get(id).copied().unwrap_or(0)).sum();

            if total < 4 * node_limit {
                if total > node_limit || z == max_z {
                    for &q_id in &q {
                        if counts.get(&q_id).copied().unwrap_or(0) > 0 {
                            zoom_map.insert(q_id, base_zoom - z);
                        }
                    }
                    break;
                }
                remembered = Some((q, z));
            } else {
                if let Some((prev_q, prev_z)) = remembered.take() {
                    for &q_id in &prev_q {
                        if counts.get(&q_id).copied().unwrap_or(0) > 0 {
                            zoom_map.insert(q_id, base_zoom - prev_z + 1);
                        }
                    }
                }
                break;
            }
        }
    }

    let mut zoom_sets: HashMap<u8, ModifiedSet> = HashMap::new();
    let base_ids: Vec<u32> = engine.modified.iter_ascending().collect();
    for id in base_ids {
        match zoom_map.get(&id) {
            Some(&zoom) => {
                engine.modified.clear(id);
                let coord = TileCoord::decode(id);
                let shift = base_zoom - zoom;
                let parent = TileCoord::new(coord.x >> shift, coord.y >> shift);
                zoom_sets.entry(zoom).or_default().mark(parent.encode());
            }
            None => {
                zoom_sets.entry(base_zoom).or_default().mark(id);
            }
        }
    }

    OptimisePlan { base_zoom, zoom_map, zoom_sets }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::packedvalue::Neighbours;
    use crate::tilemap::TileMap;

    fn engine_with_nodes(zoom: u8, node_limit: u64, tiles: &[(u32, TileCoord)]) -> Engine {
        let config = Config { zoom, node_limit, ..Config::default() };
        let mut engine = Engine::new(config);
        for &(id, coord) in tiles {
            engine.nmap.put(id, coord, Neighbours::none()).unwrap();
            engine.modified.mark(coord.encode());
        }
        engine
    }

    #[test]
    fn sparse_tiles_coalesce_into_a_shared_parent() {
        let mut engine = engine_with_nodes(
            10,
            100,
            &[(1, TileCoord::new(0, 0)), (2, TileCoord::new(1, 0)), (3, TileCoord::new(0, 1))],
        );
        let plan = run(&mut engine);
        assert!(plan.zoom_levels().iter().any(|&z| z < 10));
    }

    #[test]
    fn dense_tiles_stay_at_base_zoom() {
        let mut tiles = Vec::new();
        for i in 0..200u64 {
            tiles.push((i, TileCoord::new(5, 5)));
        }
        let mut engine = engine_with_nodes(10, 50, &tiles);
        let plan = run(&mut engine);
        assert_eq!(plan.zoom_levels(), vec![10]);
    }
}
