//! Per-tile PBF file output (spec §6 "Output — individual tiles").
//!
//! Path layout and file lifecycle live here; the actual OSM-PBF byte
//! encoding is an external collaborator's job (spec §1), injected as a
//! plain function pointer so this crate never depends on a concrete wire
//! format.

use std::fs::{self, File};
use std::io::Write as _;
use std::path::PathBuf;

use crate::element::{Bound, Element};
use crate::error::SplitResult;
use crate::tile::TileCoord;

use super::{RunSummary, Sink, TileEncoder};

/// Serialises one element (or the leading [`Bound`]) to its PBF byte
/// encoding. Supplied by the caller, typically backed by a real PBF
/// writer crate.
pub type ElementEncodeFn = fn(&Element<'_>) -> SplitResult<Vec<u8>>;

pub struct PbfFileSink {
    base_pattern: String,
    encode: ElementEncodeFn,
}

impl PbfFileSink {
    #[must_use]
    pub fn new(base_pattern: impl Into<String>, encode: ElementEncodeFn) -> Self {
        Self { base_pattern: base_pattern.into(), encode }
    }

    fn path_for(&self, tile: TileCoord, zoom: u8) -> PathBuf {
        let has_placeholder =
            self.base_pattern.contains("%z") || self.base_pattern.contains("%x") || self.base_pattern.contains("%y");
        if has_placeholder {
            PathBuf::from(
                self.base_pattern
                    .replace("%z", &zoom.to_string())
                    .replace("%x", &tile.x.to_string())
                    .replace("%y", &tile.y.to_string()),
            )
        } else {
            PathBuf::from(&self.base_pattern)
                .join(zoom.to_string())
                .join(format!("{}_{}.osm.pbf", tile.x, tile.y))
        }
    }
}

impl Sink for PbfFileSink {
    type Encoder = PbfFileEncoder;

    fn encoder_for(&mut self, tile: TileCoord, zoom: u8) -> SplitResult<Self::Encoder> {
        let path = self.path_for(tile, zoom);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(PbfFileEncoder { file: File::create(path)?, encode: self.encode })
    }

    fn finish(&mut self, _summary: &RunSummary) -> SplitResult<()> {
        Ok(())
    }
}

pub struct PbfFileEncoder {
    file: File,
    encode: ElementEncodeFn,
}

impl TileEncoder for PbfFileEncoder {
    fn open(&mut self, _tile: TileCoord, _zoom: u8, bound: Bound) -> SplitResult<()> {
        let bytes = (self.encode)(&Element::Bound(bound))?;
        self.file.write_all(&bytes)?;
        Ok(())
    }

    fn push(&mut self, element: &Element<'_>) -> SplitResult<()> {
        let bytes = (self.encode)(element)?;
        self.file.write_all(&bytes)?;
        Ok(())
    }

    fn close(&mut self) -> SplitResult<()> {
        self.file.flush()?;
        Ok(())
    }
}
