//! Pass 2: member completion (spec §4.5).
//!
//! Only runs when pass 1 registered at least one relation-member way.
//! Streams the input a second time and, for each such way, folds its
//! (already-complete) tile list down into every one of its nodes — the
//! step that's impossible in pass 1 without holding every way's node
//! list in memory.

use crate::element::{Element, ElementSource};
use crate::error::SplitResult;
use crate::tilemap::TileMap;

use super::Engine;

pub(super) fn run<S: ElementSource>(engine: &mut Engine, source: &S) -> SplitResult<()> {
    for element in source.elements() {
        if let Element::Way(way) = element? {
            if !engine.relation_member_ways.contains(&way.id) {
                continue;
            }
            let Some(tiles) = engine.wmap.get_all_tiles(way.id) else {
                continue;
            };
            let ids: Vec<u32> = tiles.iter().map(|t| t.encode()).collect();
            for &node_id in &way.node_ids {
                engine.nmap.update_int(node_id, &ids)?;
            }
        }
    }
    Ok(())
}
