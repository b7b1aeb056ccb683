//! Orchestration of the three ingestion passes plus the optional clip and
//! optimise passes (spec §4).

mod clip;
mod optimize;
mod pass1;
mod pass2;
mod write;

use std::collections::HashSet;

use log::info;

use crate::config::{CompleteMode, Config};
use crate::element::ElementSource;
use crate::error::SplitResult;
use crate::modifiedset::ModifiedSet;
use crate::sink::Sink;
use crate::tilemap::{ArrayTileMap, HashTileMap, TileMap};

pub use optimize::OptimisePlan;
pub use write::WriteStats;

/// Running totals and diagnostics gathered across a run, surfaced to the
/// CLI's `--timing`/`--verbose` output and to the MBTiles metadata writer.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub latest_date: i64,
    pub nodes_seen: u64,
    pub ways_seen: u64,
    pub ways_skipped_missing_node: u64,
    pub relations_seen: u64,
    pub relations_skipped_empty: u64,
    pub unresolved_relation_refs: u64,
}

fn make_map(size_hint: usize, max_id: Option<u64>) -> Box<dyn TileMap> {
    match max_id {
        Some(max) => Box::new(ArrayTileMap::new(max)),
        None => Box::new(HashTileMap::new(size_hint.max(16), size_hint.max(16) * 64)),
    }
}

/// Holds the three ID->tile maps, the modified-tile set, and the
/// bookkeeping pass 1/2 need to share (the relation-member-way set, the
/// forward-reference worklist).
pub struct Engine {
    pub(crate) config: Config,
    pub(crate) nmap: Box<dyn TileMap>,
    pub(crate) wmap: Box<dyn TileMap>,
    pub(crate) rmap: Box<dyn TileMap>,
    pub(crate) modified: ModifiedSet,
    pub(crate) relation_member_ways: HashSet<u64>,
    pub(crate) stats: Stats,
    pub(crate) appointment_date: i64,
}

impl Engine {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let nmap = make_map(config.sizes.nodes, config.max_ids.nodes);
        let wmap = make_map(config.sizes.ways, config.max_ids.ways);
        let rmap = make_map(config.sizes.relations, config.max_ids.relations);
        Self {
            config,
            nmap,
            wmap,
            rmap,
            modified: ModifiedSet::new(),
            relation_member_ways: HashSet::new(),
            stats: Stats::default(),
            appointment_date: 0,
        }
    }

    /// Sets the incremental-run cutoff loaded from the date file (spec §6
    /// "Date file"); elements with a later timestamp are "modified".
    /// Defaults to `0` (epoch) when no date file is configured.
    pub fn set_appointment_date(&mut self, date: i64) {
        self.appointment_date = date;
    }

    /// Runs pass 1, the conditional pass 2, the optional clip and
    /// optimise passes, and finally the pass-3 write-out against `sink`.
    pub fn run<S: ElementSource, K: Sink>(&mut self, source: &S, sink: &mut K) -> SplitResult<WriteStats> {
        info!("pass 1: element -> tile assignment");
        pass1::run(self, source)?;

        if !self.relation_member_ways.is_empty() {
            info!(
                "pass 2: completing {} relation member way(s)",
                self.relation_member_ways.len()
            );
            pass2::run(self, source)?;
        }

        if let Some(polygon) = self.config.polygon.clone() {
            info!("clip pass: {}", polygon.display());
            clip::run(self, &polygon)?;
        }

        let plan = if self.config.node_limit > 0 {
            info!("optimise pass: nodeLimit = {}", self.config.node_limit);
            Some(optimize::run(self))
        } else {
            None
        };

        write::run(self, source, plan.as_ref(), sink)
    }

    #[must_use]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub(crate) fn complete_eligible(&self, is_multipolygon: bool) -> bool {
        match self.config.complete {
            CompleteMode::All => true,
            CompleteMode::AreasOnly => is_multipolygon,
            CompleteMode::None => false,
        }
    }
}
