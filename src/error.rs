use thiserror::Error;

/// Errors the core engine can raise.
///
/// Reference gaps (a way missing a node, a relation missing a member) and
/// unresolved forward references are deliberately *not* variants here: the
/// spec treats them as non-fatal, logged at most once per containing
/// element and never surfaced as a `Result::Err`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("malformed input data: {0}")]
    DataFormat(String),

    #[error("element metadata (version/timestamp) was requested but is missing from the input")]
    MissingMetadata,

    #[error("tile map capacity exhausted")]
    CapacityExhausted,

    #[error("overflow store index range exhausted")]
    OverflowStoreSaturated,

    #[error("id {id} exceeds the configured maximum of {max}")]
    IdOutOfRange { id: u64, max: u64 },

    #[error("zoom level {0} is out of the supported range 0..=16")]
    InvalidZoom(u8),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "mbtiles")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Result alias used throughout the crate.
pub type SplitResult<T> = Result<T, Error>;
