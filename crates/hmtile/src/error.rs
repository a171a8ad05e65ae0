//! Error types for the tile pyramid crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building, loading or querying tiles.
#[derive(Debug, Error)]
pub enum TileError {
    /// Source raster is missing or cannot be decoded.
    #[error("Failed to load source raster {path}: {reason}")]
    Load {
        /// Path of the raster.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// Output directory could not be created.
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Index document could not be parsed or serialized.
    #[error("Index document error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("Configuration error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Tile file header does not match its payload.
    #[error("Corrupt tile {path}: {reason}")]
    CorruptTile {
        /// Tile file path.
        path: PathBuf,
        /// What did not match.
        reason: String,
    },

    /// Tile key is not present in the index.
    #[error("No tile lod={lod} x={tx} y={ty} in index")]
    NotFound {
        /// Level of detail.
        lod: u8,
        /// Tile column.
        tx: u32,
        /// Tile row.
        ty: u32,
    },

    /// Index document is structurally inconsistent.
    #[error("Invalid tile index: {0}")]
    InvalidIndex(String),

    /// Coordinate lies outside the source raster.
    #[error("Coordinate ({x}, {z}) is outside the {width}x{height} raster")]
    OutOfBounds {
        /// Raster-space x.
        x: f64,
        /// Raster-space z.
        z: f64,
        /// Raster width in pixels.
        width: u32,
        /// Raster height in pixels.
        height: u32,
    },

    /// Requested region contains no samples.
    #[error("Region contains no samples at lod {lod}")]
    EmptyRegion {
        /// Requested level of detail.
        lod: u8,
    },

    /// A shared in-flight load failed on another thread.
    #[error("Failed to load tile lod={lod} x={tx} y={ty}: {reason}")]
    LoadFailed {
        /// Level of detail.
        lod: u8,
        /// Tile column.
        tx: u32,
        /// Tile row.
        ty: u32,
        /// Reason reported by the loading thread.
        reason: String,
    },

    /// Neither tiles nor a fallback raster can answer the query.
    #[error("Elevation data unavailable: {0}")]
    Unavailable(String),

    /// Configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Cache lock was poisoned (a thread panicked while holding the lock).
    #[error("Tile cache lock was poisoned")]
    CacheLockPoisoned,
}

impl TileError {
    /// Whether the error means "this tile is not usable, try another source".
    ///
    /// Provider fallback keys off this; configuration and bounds errors are
    /// not recoverable by switching tiles.
    pub fn is_tile_fault(&self) -> bool {
        matches!(
            self,
            TileError::NotFound { .. }
                | TileError::CorruptTile { .. }
                | TileError::LoadFailed { .. }
                | TileError::Io(_)
        )
    }

    /// Short label used for fallback metrics.
    pub(crate) fn fallback_reason(&self) -> &'static str {
        match self {
            TileError::NotFound { .. } => "not_found",
            TileError::CorruptTile { .. } => "corrupt",
            TileError::LoadFailed { .. } => "load_failed",
            TileError::Io(_) => "io",
            _ => "other",
        }
    }
}
