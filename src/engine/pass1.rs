//! Pass 1: element -> tile assignment (spec §4.4).
//!
//! Processes nodes, then ways, then relations, in the order the decoder
//! hands them over. Relations whose relation-member is not yet resolved
//! are parked and retried after the main sweep (spec "Forward-reference
//! resolution").

use std::collections::HashMap;

use log::warn;

use crate::element::{Element, ElementSource, MemberType, Node, Relation, Way};
use crate::error::{Error, SplitResult};
use crate::holefill::{fill_holes, HOLE_FILL_THRESHOLD};
use crate::packedvalue::{Neighbours, PackedValue};
use crate::tile::{locate_with_border, TileCoord};
use crate::tilemap::TileMap;

use super::Engine;

pub(super) fn run<S: ElementSource>(engine: &mut Engine, source: &S) -> SplitResult<()> {
    let mut pending: HashMap<u64, PendingRelation> = HashMap::new();
    for element in source.elements() {
        match element? {
            Element::Bound(_) => {}
            Element::Node(node) => ingest_node(engine, &node)?,
            Element::Way(way) => ingest_way(engine, &way)?,
            Element::Relation(rel) => ingest_relation(engine, &rel, &mut pending)?,
        }
    }
    resolve_forward_references(engine, pending)
}

fn ingest_node(engine: &mut Engine, node: &Node<'_>) -> SplitResult<()> {
    if engine.config.metadata && node.metadata.is_none() {
        return Err(Error::MissingMetadata);
    }

    let (base, neighbours) =
        locate_with_border(node.lon, node.lat, engine.config.zoom, engine.config.border);

    if let Some(meta) = node.metadata {
        if meta.timestamp > engine.appointment_date {
            for tile in neighbours.expand(base) {
                engine.modified.mark(tile.encode());
            }
        }
        if meta.timestamp > engine.stats.latest_date {
            engine.stats.latest_date = meta.timestamp;
        }
    }

    engine.nmap.put(node.id, base, neighbours)?;
    engine.stats.nodes_seen += 1;
    Ok(())
}

fn ingest_way(engine: &mut Engine, way: &Way<'_>) -> SplitResult<()> {
    if engine.config.metadata && way.metadata.is_none() {
        return Err(Error::MissingMetadata);
    }
    engine.stats.ways_seen += 1;

    let mut resolved = Vec::with_capacity(way.node_ids.len());
    for &node_id in &way.node_ids {
        match engine.nmap.get_all_tiles(node_id) {
            Some(tiles) => resolved.push(tiles),
            None => {
                warn!("way {} references missing node {node_id}; skipping", way.id);
                engine.stats.ways_skipped_missing_node += 1;
                return Ok(());
            }
        }
    }

    let Some(&first_node_id) = way.node_ids.first() else {
        return Ok(());
    };

    let mut union: Vec<TileCoord> = resolved.into_iter().flatten().collect();
    union.sort_unstable_by_key(TileCoord::encode);
    union.dedup();

    if let Some(meta) = way.metadata {
        if meta.timestamp > engine.stats.latest_date {
            engine.stats.latest_date = meta.timestamp;
        }
        if meta.timestamp > engine.appointment_date {
            for &tile in &union {
                engine.modified.mark(tile.encode());
            }
        }
    }

    if union.len() >= HOLE_FILL_THRESHOLD {
        let holes = fill_holes(&union);
        for &tile in &holes {
            engine.modified.mark(tile.encode());
        }
        union.extend(holes);
        union.sort_unstable_by_key(TileCoord::encode);
        union.dedup();
    }

    let first_raw = engine.nmap.get_raw(first_node_id);
    let base_value =
        PackedValue::from_bits(first_raw).expect("first way-node resolved above, slot is non-empty");
    engine.wmap.put(way.id, base_value.base, Neighbours::none())?;

    let ids: Vec<u32> = union.iter().map(|t| t.encode()).collect();
    engine.wmap.update_int(way.id, &ids)?;
    for &node_id in &way.node_ids {
        engine.nmap.update_int(node_id, &ids)?;
    }
    Ok(())
}

#[derive(Clone, Copy)]
struct MemberRef {
    member_type: MemberType,
    id: u64,
}

/// A relation whose processing stalled on an unresolved relation member;
/// owned so it outlives the borrow of the decoder's current element
/// (spec §9: arena-plus-index in place of cyclic borrowed ownership).
struct PendingRelation {
    id: u64,
    members: Vec<MemberRef>,
    is_multipolygon: bool,
    modified: bool,
}

fn ingest_relation(
    engine: &mut Engine,
    rel: &Relation<'_>,
    pending: &mut HashMap<u64, PendingRelation>,
) -> SplitResult<()> {
    if engine.config.metadata && rel.metadata.is_none() {
        return Err(Error::MissingMetadata);
    }
    engine.stats.relations_seen += 1;
    if let Some(meta) = rel.metadata {
        if meta.timestamp > engine.stats.latest_date {
            engine.stats.latest_date = meta.timestamp;
        }
    }
    let modified = rel.metadata.is_some_and(|m| m.timestamp > engine.appointment_date);
    let members: Vec<MemberRef> = rel
        .members
        .iter()
        .map(|m| MemberRef { member_type: m.member_type, id: m.id })
        .collect();
    process_relation(engine, rel.id, &members, rel.is_multipolygon(), modified, pending)
}

fn process_relation(
    engine: &mut Engine,
    rel_id: u64,
    members: &[MemberRef],
    is_multipolygon: bool,
    modified: bool,
    pending: &mut HashMap<u64, PendingRelation>,
) -> SplitResult<()> {
    let mut tiles: Vec<TileCoord> = Vec::new();
    let mut needs_retry = false;
    let mut warned = false;

    for member in members {
        match member.member_type {
            MemberType::Node => match engine.nmap.get_all_tiles(member.id) {
                Some(t) => tiles.extend(t),
                None if !warned => {
                    warn!("relation {rel_id} references missing node {}", member.id);
                    warned = true;
                }
                None => {}
            },
            MemberType::Way => match engine.wmap.get_all_tiles(member.id) {
                Some(t) => tiles.extend(t),
                None if !warned => {
                    warn!("relation {rel_id} references missing way {}", member.id);
                    warned = true;
                }
                None => {}
            },
            MemberType::Relation => match engine.rmap.get_all_tiles(member.id) {
                Some(t) => tiles.extend(t),
                None => needs_retry = true,
            },
        }
    }

    if needs_retry {
        pending.insert(
            rel_id,
            PendingRelation { id: rel_id, members: members.to_vec(), is_multipolygon, modified },
        );
        return Ok(());
    }

    if tiles.is_empty() {
        warn!("relation {rel_id} resolved to an empty tile set; skipping");
        engine.stats.relations_skipped_empty += 1;
        return Ok(());
    }

    if modified {
        for &tile in &tiles {
            engine.modified.mark(tile.encode());
        }
    }

    let base = tiles[0];
    tiles.sort_unstable_by_key(TileCoord::encode);
    tiles.dedup();

    if tiles.len() >= HOLE_FILL_THRESHOLD {
        let holes = fill_holes(&tiles);
        for &tile in &holes {
            engine.modified.mark(tile.encode());
        }
        tiles.extend(holes);
        tiles.sort_unstable_by_key(TileCoord::encode);
        tiles.dedup();
    }

    engine.rmap.put(rel_id, base, Neighbours::none())?;
    let ids: Vec<u32> = tiles.iter().map(|t| t.encode()).collect();
    engine.rmap.update_int(rel_id, &ids)?;

    if engine.complete_eligible(is_multipolygon) {
        for member in members {
            match member.member_type {
                MemberType::Node => engine.nmap.update_int(member.id, &ids)?,
                MemberType::Way => {
                    engine.wmap.update_int(member.id, &ids)?;
                    engine.relation_member_ways.insert(member.id);
                }
                MemberType::Relation => engine.rmap.update_int(member.id, &ids)?,
            }
        }
    }

    Ok(())
}

fn resolve_forward_references(
    engine: &mut Engine,
    mut pending: HashMap<u64, PendingRelation>,
) -> SplitResult<()> {
    loop {
        if pending.is_empty() {
            return Ok(());
        }
        let prev_len = pending.len();
        let mut next_pending = HashMap::new();
        for rel in pending.into_values() {
            process_relation(engine, rel.id, &rel.members, rel.is_multipolygon, rel.modified, &mut next_pending)?;
        }
        if next_pending.len() >= prev_len {
            if !next_pending.is_empty() {
                engine.stats.unresolved_relation_refs = next_pending.len() as u64;
                warn!(
                    "{} relation(s) have unresolved forward references after retrying",
                    next_pending.len()
                );
            }
            return Ok(());
        }
        pending = next_pending;
    }
}
