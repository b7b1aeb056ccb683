//! Planet-scale element-to-tile assignment: bit-packed ID->tile maps,
//! hole-fill, the three ingestion passes, and the optional clip/optimise
//! passes described in the project's design notes.

pub mod config;
pub mod datefile;
pub mod element;
pub mod engine;
pub mod error;
pub mod holefill;
pub mod modifiedset;
pub mod overflow;
pub mod packedvalue;
pub mod polygon;
pub mod sink;
pub mod tile;
pub mod tilemap;

pub use config::{CompleteMode, Config, MapSizes, MaxIds};
pub use engine::{Engine, OptimisePlan, Stats, WriteStats};
pub use error::{Error, SplitResult};
