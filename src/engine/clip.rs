//! The clip pass: narrows the modified-tile set to a polygon (spec §4.6).
//!
//! No element data is touched; only the output mask shrinks.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::SplitResult;
use crate::polygon::PolygonSpec;
use crate::tile::{tile_bounds, TileCoord};

use super::Engine;

pub(super) fn run(engine: &mut Engine, polygon_path: &Path) -> SplitResult<()> {
    let file = File::open(polygon_path)?;
    let spec = PolygonSpec::parse(BufReader::new(file))?;

    let tile_ids: Vec<u32> = engine.modified.iter_ascending().collect();
    for id in tile_ids {
        let coord = TileCoord::decode(id);
        let bounds = tile_bounds(coord, engine.config.zoom, 0.0);
        let corners = [
            (bounds.min_lon, bounds.min_lat),
            (bounds.max_lon, bounds.min_lat),
            (bounds.max_lon, bounds.max_lat),
            (bounds.min_lon, bounds.max_lat),
        ];
        if !spec.keeps(&corners) {
            engine.modified.clear(id);
        }
    }
    Ok(())
}
