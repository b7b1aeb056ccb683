//! The CLI surface (spec §6 "CLI surface"), mirrored onto [`tilesplit::Config`].

use std::path::PathBuf;

use clap::Parser;
use tilesplit::{CompleteMode, Config, MapSizes, MaxIds};

#[derive(Parser, Debug)]
#[command(name = "tilesplit", about = "Split a planet-scale OSM dump into per-tile subsets", long_about = None)]
pub struct Args {
    /// Path to the input OSM PBF dump.
    #[arg(long)]
    pub input: PathBuf,

    /// Output tile filename pattern (`%z`/`%x`/`%y`, or a directory prefix)
    /// or, with `--mbtiles`, the path of the MBTiles database to write.
    #[arg(long)]
    pub output: String,

    /// Base zoom level, 0..=16.
    #[arg(long, default_value_t = 13)]
    pub zoom: u8,

    /// Tile enlargement border, as a fraction of tile width/height, 0.0..=1.0.
    #[arg(long, default_value_t = 0.0)]
    pub border: f64,

    /// Path to a clipping polygon (`.poly`) file.
    #[arg(long)]
    pub polygon: Option<PathBuf>,

    /// Path to the date file used for incremental runs.
    #[arg(long)]
    pub date: Option<PathBuf>,

    /// Keep element version/timestamp in the output.
    #[arg(long)]
    pub metadata: bool,

    /// Full tile completion for every relation.
    #[arg(long)]
    pub complete: bool,

    /// Full tile completion for `type=multipolygon` relations only.
    #[arg(long = "complete-areas")]
    pub complete_areas: bool,

    /// Write a single MBTiles database instead of one PBF file per tile.
    #[arg(long)]
    pub mbtiles: bool,

    /// Maximum number of simultaneously open tile encoders.
    #[arg(long, default_value_t = 32)]
    pub maxfiles: usize,

    /// Initial map capacities `nodes,ways,relations`.
    #[arg(long)]
    pub size: Option<String>,

    /// Maximum ids `nodes,ways,relations`; when set, selects the
    /// array-backed map for that element kind.
    #[arg(long = "max-ids")]
    pub max_ids: Option<String>,

    /// Node-count threshold that triggers the sparse-tile coalescing pass.
    #[arg(long, default_value_t = 0)]
    pub optimize: u64,

    #[arg(long)]
    pub verbose: bool,

    #[arg(long)]
    pub timing: bool,
}

fn parse_triple(spec: &str, flag: &str) -> Result<(u64, u64, u64), String> {
    let parts: Vec<&str> = spec.split(',').collect();
    let [n, w, r] = parts.as_slice() else {
        return Err(format!("--{flag} expects `n,w,r`, got `{spec}`"));
    };
    let parse = |s: &str| s.trim().parse::<u64>().map_err(|_| format!("--{flag}: `{s}` is not a number"));
    Ok((parse(n)?, parse(w)?, parse(r)?))
}

impl Args {
    /// Builds a [`Config`] from the parsed arguments. Cross-field
    /// constraints (zoom range, border range, ...) are checked separately
    /// by [`Config::validate`].
    pub fn to_config(&self) -> Result<Config, String> {
        let sizes = match &self.size {
            Some(spec) => {
                let (nodes, ways, relations) = parse_triple(spec, "size")?;
                MapSizes {
                    nodes: nodes as usize,
                    ways: ways as usize,
                    relations: relations as usize,
                }
            }
            None => Config::default().sizes,
        };

        let max_ids = match &self.max_ids {
            Some(spec) => {
                let (nodes, ways, relations) = parse_triple(spec, "max-ids")?;
                MaxIds {
                    nodes: Some(nodes),
                    ways: Some(ways),
                    relations: Some(relations),
                }
            }
            None => MaxIds::default(),
        };

        let complete = if self.complete {
            CompleteMode::All
        } else if self.complete_areas {
            CompleteMode::AreasOnly
        } else {
            CompleteMode::None
        };

        Ok(Config {
            input: self.input.clone(),
            output: self.output.clone(),
            zoom: self.zoom,
            border: self.border,
            polygon: self.polygon.clone(),
            date_file: self.date.clone(),
            metadata: self.metadata,
            complete,
            mbtiles: self.mbtiles,
            max_files: self.maxfiles,
            sizes,
            max_ids,
            node_limit: self.optimize,
            verbose: self.verbose,
            timing: self.timing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_size_triple() {
        assert_eq!(parse_triple("10,20,30", "size").unwrap(), (10, 20, 30));
    }

    #[test]
    fn rejects_a_malformed_triple() {
        assert!(parse_triple("10,20", "size").is_err());
        assert!(parse_triple("a,b,c", "size").is_err());
    }
}
