//! # hmtile
//!
//! Multi-resolution tile pyramid for very large heightmap rasters.
//!
//! A single elevation raster is cut into small binary tiles at several levels
//! of detail, described by a JSON index, and served at runtime through a
//! bounded LRU cache to point and region queries.
//!
//! ## Overview
//!
//! ### Offline build
//!
//! [`build_pyramid`] reads the raster once, estimates its value range, and
//! writes:
//! - `lod<N>/tile_<tx>_<ty>.bin` for every LOD `N` (bilinear downsampling)
//! - `tile_index.json`, the canonical index
//! - optionally `tile_<tx>_<ty>.bin` flat tiles and a legacy `tileset.json`
//!
//! Tiles are a 4-byte header (width, height as little-endian u16) followed by
//! row-major little-endian u16 samples normalized to the estimated range.
//!
//! ### Runtime queries
//!
//! [`ElevationProvider`] maps world coordinates to tiles, samples them
//! bilinearly and converts to meters through the index calibration. When no
//! tiles are available it samples the raster directly with the same math.
//!
//! ## Examples
//!
//! ```no_run
//! use hmtile::{build_pyramid, BuildConfig, ElevationProvider, ProviderConfig, WorldRect};
//!
//! let report = build_pyramid(&BuildConfig::new("heightmap.png", "tiles"))?;
//! println!("Wrote {} tiles", report.total_tiles());
//!
//! let provider = ElevationProvider::open(&ProviderConfig::with_tiles("tiles"))?;
//! let meters = provider.get_elevation(1024.0, 2048.0)?;
//! println!("Elevation: {:.1} m", meters);
//!
//! let grid = provider.extract_region_lod(WorldRect::new(0.0, 0.0, 4096.0, 4096.0), 8.0)?;
//! println!("{}x{} samples at lod {}", grid.width, grid.height, grid.lod);
//! # Ok::<(), hmtile::TileError>(())
//! ```

mod builder;
mod cache;
mod calibration;
mod config;
mod error;
mod index;
mod provider;
mod pyramid;
mod raster;
mod store;
mod tile;
mod world;

pub use builder::{build_from_raster, build_pyramid, resample_tile, BuildReport};
pub use cache::{CacheStats, LodCache, PreloadStats, DEFAULT_CACHE_CAPACITY};
pub use calibration::{Calibration, DEFAULT_HIGH_ANCHOR_METERS, DEFAULT_LOW_ANCHOR_METERS};
pub use config::{
    BuildConfig, PreloadConfig, ProviderConfig, DEFAULT_LOD_LEVELS, DEFAULT_RANGE_SAMPLES,
    DEFAULT_TILE_SIZE,
};
pub use error::TileError;
pub use index::{
    FlatTileRecord, IndexDocument, LegacyDocument, LodTileRecord, TileIndex, TileIndexEntry,
    INDEX_FILE_NAME, INDEX_VERSION, LEGACY_FILE_NAME,
};
pub use provider::{lod_for_zoom, ElevationProvider, ProviderMode, RegionGrid};
pub use pyramid::{local_position, sample_position, PyramidLayout, SourceRegion, DEFAULT_MIN_TILE_EDGE};
pub use raster::SourceRaster;
pub use store::{TileLoader, TileStore};
pub use tile::{Tile, TileKey, TILE_HEADER_LEN};
pub use world::{WorldFrame, WorldRect};

/// Result type for tile pyramid operations.
pub type Result<T> = std::result::Result<T, TileError>;
