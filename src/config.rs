//! Run configuration, assembled from CLI arguments (spec §6 "CLI
//! surface") the way `tilesplit-cli` builds one via `Args::to_config()`.

use std::path::PathBuf;

use crate::error::Error;

/// Per-map initial capacity hints (`--size n,w,r`).
#[derive(Debug, Clone, Copy, Default)]
pub struct MapSizes {
    pub nodes: usize,
    pub ways: usize,
    pub relations: usize,
}

/// Per-map maximum id, selecting the array-backed map when set
/// (`--max-ids n,w,r`).
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxIds {
    pub nodes: Option<u64>,
    pub ways: Option<u64>,
    pub relations: Option<u64>,
}

/// Which element categories get full tile-set completion (spec §4.4
/// "complete"/"complete-areas").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompleteMode {
    #[default]
    None,
    AreasOnly,
    All,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub output: String,
    pub zoom: u8,
    pub border: f64,
    pub polygon: Option<PathBuf>,
    pub date_file: Option<PathBuf>,
    pub metadata: bool,
    pub complete: CompleteMode,
    pub mbtiles: bool,
    pub max_files: usize,
    pub sizes: MapSizes,
    pub max_ids: MaxIds,
    /// `nodeLimit` for the optimise pass; `0` disables it (spec §4.7).
    pub node_limit: u64,
    pub verbose: bool,
    pub timing: bool,
}

impl Config {
    const DEFAULT_ZOOM: u8 = 13;
    const DEFAULT_MAX_FILES: usize = 32;
    const DEFAULT_MAP_SIZE: usize = 1 << 20;

    /// Validates cross-field constraints the individual flag parsers
    /// can't check on their own (spec §7 "invalid argument... fatal
    /// before any work").
    pub fn validate(&self) -> Result<(), Error> {
        if self.zoom > crate::tile::MAX_ZOOM {
            return Err(Error::InvalidArgument(format!(
                "zoom {} exceeds the supported maximum of {}",
                self.zoom,
                crate::tile::MAX_ZOOM
            )));
        }
        if !(0.0..=1.0).contains(&self.border) {
            return Err(Error::InvalidArgument(format!(
                "border {} is outside the valid range 0.0..=1.0",
                self.border
            )));
        }
        if self.max_files == 0 {
            return Err(Error::InvalidArgument("maxfiles must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: String::new(),
            zoom: Self::DEFAULT_ZOOM,
            border: 0.0,
            polygon: None,
            date_file: None,
            metadata: false,
            complete: CompleteMode::None,
            mbtiles: false,
            max_files: Self::DEFAULT_MAX_FILES,
            sizes: MapSizes {
                nodes: Self::DEFAULT_MAP_SIZE,
                ways: Self::DEFAULT_MAP_SIZE,
                relations: Self::DEFAULT_MAP_SIZE / 4,
            },
            max_ids: MaxIds::default(),
            node_limit: 0,
            verbose: false,
            timing: false,
        }
    }
}
