//! Pass 3: the write-out driver (spec §4.8, §4.9).
//!
//! For each zoom level in the (possibly optimised) output plan, opens a
//! batch of up to `maxfiles` encoders, re-streams the input once per
//! batch, and fans each element out to whichever open encoders its tile
//! set intersects.

use std::collections::HashMap;

use log::info;

use crate::element::{Bound as BoundElement, Element, ElementSource};
use crate::error::SplitResult;
use crate::sink::{RunSummary, Sink, TileEncoder};
use crate::tile::{tile_bounds, LatLonBounds, TileCoord};
use crate::tilemap::TileMap;

use super::{Engine, OptimisePlan};

/// Counters surfaced after a run completes (spec §7: diagnostics are
/// advisory and never affect control flow).
#[derive(Debug, Clone, Default)]
pub struct WriteStats {
    pub tiles_written: u64,
    pub elements_written: u64,
}

pub(super) fn run<S: ElementSource, K: Sink>(
    engine: &mut Engine,
    source: &S,
    plan: Option<&OptimisePlan>,
    sink: &mut K,
) -> SplitResult<WriteStats> {
    let base_zoom = engine.config.zoom;
    let border = engine.config.border;
    let max_files = engine.config.max_files;
    let mut stats = WriteStats::default();
    let mut bounds_union: Option<LatLonBounds> = None;

    let zoom_levels: Vec<u8> = match plan {
        Some(p) => p.zoom_levels(),
        None => vec![base_zoom],
    };

    for &zoom in &zoom_levels {
        let tile_ids: Vec<u32> = match plan {
            Some(p) => p
                .tiles_at(zoom)
                .map(|s| s.iter_ascending().collect())
                .unwrap_or_default(),
            None => engine.modified.iter_ascending().collect(),
        };

        let mut cursor = 0usize;
        while cursor < tile_ids.len() {
            let end = (cursor + max_files).min(tile_ids.len());
            let batch_ids = &tile_ids[cursor..end];

            let mut open: HashMap<u32, K::Encoder> = HashMap::new();
            for &id in batch_ids {
                let coord = TileCoord::decode(id);
                let bound_box = tile_bounds(coord, zoom, border);
                bounds_union = Some(match bounds_union {
                    Some(b) => b.union(bound_box),
                    None => bound_box,
                });
                let mut encoder = sink.encoder_for(coord, zoom)?;
                encoder.open(coord, zoom, to_bound(bound_box))?;
                open.insert(id, encoder);
                stats.tiles_written += 1;
            }

            for element in source.elements() {
                let element = element?;
                for tile_id in element_tile_ids(engine, &element) {
                    let (remapped, remapped_zoom) = match plan {
                        Some(p) => p.remap(tile_id),
                        None => (TileCoord::decode(tile_id), base_zoom),
                    };
                    if remapped_zoom != zoom {
                        continue;
                    }
                    if let Some(encoder) = open.get_mut(&remapped.encode()) {
                        encoder.push(&element)?;
                        stats.elements_written += 1;
                    }
                }
            }

            for (_, mut encoder) in open {
                encoder.close()?;
            }
            cursor = end;
        }
    }

    let summary = RunSummary {
        min_zoom: zoom_levels.iter().copied().min().unwrap_or(base_zoom),
        max_zoom: zoom_levels.iter().copied().max().unwrap_or(base_zoom),
        bounds: bounds_union.unwrap_or_else(LatLonBounds::world),
        latest_date: engine.stats.latest_date,
    };
    sink.finish(&summary)?;

    info!(
        "write pass: {} tile(s), {} element write(s)",
        stats.tiles_written, stats.elements_written
    );
    Ok(stats)
}

fn to_bound(b: LatLonBounds) -> BoundElement {
    BoundElement {
        min_lon: b.min_lon,
        min_lat: b.min_lat,
        max_lon: b.max_lon,
        max_lat: b.max_lat,
    }
}

/// The full tile set an already-assigned element belongs to, looked up
/// by id in whichever map matches its kind; absent means "skip" (spec
/// §4.8 step 2).
fn element_tile_ids(engine: &Engine, element: &Element<'_>) -> Vec<u32> {
    let tiles = match element {
        Element::Bound(_) => return Vec::new(),
        Element::Node(n) => engine.nmap.get_all_tiles(n.id),
        Element::Way(w) => engine.wmap.get_all_tiles(w.id),
        Element::Relation(r) => engine.rmap.get_all_tiles(r.id),
    };
    tiles.map(|t| t.iter().map(|c| c.encode()).collect()).unwrap_or_default()
}
