//! The encoder fan-out contract (spec §4.9) and its two concrete sinks.

#[cfg(feature = "mbtiles")]
mod mbtiles;
mod pbf_files;

#[cfg(feature = "mbtiles")]
pub use mbtiles::MbtilesSink;
pub use pbf_files::{ElementEncodeFn, PbfFileSink};

use crate::element::{Bound, Element};
use crate::error::SplitResult;
use crate::tile::TileCoord;

/// One per-tile output stream. The write pass guarantees that within a
/// single tile's encoder: elements appear exactly once, in the input's
/// order (nodes, then ways, then relations), and a [`Bound`] element
/// prefaces the stream (spec §4.9).
pub trait TileEncoder {
    /// Called once, before any [`push`](Self::push), with the tile's
    /// lat/lon box including border.
    fn open(&mut self, tile: TileCoord, zoom: u8, bound: Bound) -> SplitResult<()>;

    fn push(&mut self, element: &Element<'_>) -> SplitResult<()>;

    /// Flush and release any resources the encoder holds (e.g. a file
    /// handle or SQLite row buffer). Called exactly once per tile.
    fn close(&mut self) -> SplitResult<()>;
}

/// A sink owns the lifecycle of a run's [`TileEncoder`]s: creating one
/// per tile, and finalising whatever aggregate state (an MBTiles
/// metadata row, for instance) accumulates across all of them.
pub trait Sink {
    type Encoder: TileEncoder;

    fn encoder_for(&mut self, tile: TileCoord, zoom: u8) -> SplitResult<Self::Encoder>;

    /// Called after every tile has been opened, written, and closed.
    fn finish(&mut self, summary: &RunSummary) -> SplitResult<()>;
}

/// Aggregate facts the sink needs to write once, at the end of a run
/// (MBTiles metadata; spec §6 "Output — MBTiles").
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub bounds: crate::tile::LatLonBounds,
    pub latest_date: i64,
}
