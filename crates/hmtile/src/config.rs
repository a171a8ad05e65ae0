//! Builder and provider configuration, loadable from YAML.

use crate::calibration::{DEFAULT_HIGH_ANCHOR_METERS, DEFAULT_LOW_ANCHOR_METERS};
use crate::pyramid::{PyramidLayout, DEFAULT_MIN_TILE_EDGE};
use crate::world::WorldFrame;
use crate::{Result, TileError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default LOD 0 tile edge.
pub const DEFAULT_TILE_SIZE: u32 = 512;
/// Default number of LOD levels.
pub const DEFAULT_LOD_LEVELS: u8 = 4;
/// Default per-axis sample budget for range estimation.
pub const DEFAULT_RANGE_SAMPLES: u32 = 2048;

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}

fn default_lod_levels() -> u8 {
    DEFAULT_LOD_LEVELS
}

fn default_low_anchor() -> f64 {
    DEFAULT_LOW_ANCHOR_METERS
}

fn default_high_anchor() -> f64 {
    DEFAULT_HIGH_ANCHOR_METERS
}

fn default_range_samples() -> u32 {
    DEFAULT_RANGE_SAMPLES
}

fn default_min_tile_edge() -> u32 {
    DEFAULT_MIN_TILE_EDGE
}

fn default_cache_capacity() -> usize {
    crate::cache::DEFAULT_CACHE_CAPACITY
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&text)?)
}

fn check_anchors(low: f64, high: f64) -> Result<()> {
    if !(high > low) {
        return Err(TileError::InvalidConfig(format!(
            "high anchor ({}) must be above low anchor ({})",
            high, low
        )));
    }
    Ok(())
}

/// Settings for an offline pyramid build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Source heightmap image.
    pub source: PathBuf,
    /// Directory receiving tiles and index documents.
    pub output_dir: PathBuf,
    /// LOD 0 tile edge in source pixels.
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Number of LOD levels to generate.
    #[serde(default = "default_lod_levels")]
    pub lod_levels: u8,
    /// Also write flat LOD 0 tiles and `tileset.json`.
    #[serde(default)]
    pub emit_legacy: bool,
    /// Meters at normalized value 0.
    #[serde(default = "default_low_anchor")]
    pub low_anchor_meters: f64,
    /// Meters at normalized value 1.
    #[serde(default = "default_high_anchor")]
    pub high_anchor_meters: f64,
    /// Per-axis sample budget when estimating the value range.
    #[serde(default = "default_range_samples")]
    pub range_samples: u32,
    /// Floor for coarse tile edges.
    #[serde(default = "default_min_tile_edge")]
    pub min_tile_edge: u32,
}

impl BuildConfig {
    /// Configuration with default settings.
    pub fn new(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_dir: output_dir.into(),
            tile_size: DEFAULT_TILE_SIZE,
            lod_levels: DEFAULT_LOD_LEVELS,
            emit_legacy: false,
            low_anchor_meters: DEFAULT_LOW_ANCHOR_METERS,
            high_anchor_meters: DEFAULT_HIGH_ANCHOR_METERS,
            range_samples: DEFAULT_RANGE_SAMPLES,
            min_tile_edge: DEFAULT_MIN_TILE_EDGE,
        }
    }

    /// Load from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_yaml(path.as_ref())
    }

    /// Reject settings that cannot produce a readable pyramid.
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(TileError::InvalidConfig("tile_size must be positive".into()));
        }
        if self.tile_size > u16::MAX as u32 {
            return Err(TileError::InvalidConfig(format!(
                "tile_size {} exceeds the tile header limit of {}",
                self.tile_size,
                u16::MAX
            )));
        }
        if self.lod_levels == 0 {
            return Err(TileError::InvalidConfig("lod_levels must be at least 1".into()));
        }
        if PyramidLayout::coarsest_span(self.tile_size, self.lod_levels).is_none() {
            return Err(TileError::InvalidConfig(format!(
                "{} LOD levels overflow the tile span for tile_size {}",
                self.lod_levels, self.tile_size
            )));
        }
        if self.min_tile_edge == 0 {
            return Err(TileError::InvalidConfig("min_tile_edge must be positive".into()));
        }
        if self.range_samples == 0 {
            return Err(TileError::InvalidConfig("range_samples must be positive".into()));
        }
        check_anchors(self.low_anchor_meters, self.high_anchor_meters)
    }

    /// Pyramid geometry these settings produce over a raster.
    pub fn layout(&self, source_width: u32, source_height: u32) -> PyramidLayout {
        PyramidLayout {
            source_width,
            source_height,
            tile_size: self.tile_size,
            lod_levels: self.lod_levels,
            min_tile_edge: self.min_tile_edge,
        }
    }
}

/// Cache warm-up run once when a provider is opened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreloadConfig {
    /// World x of the neighborhood center.
    pub x: f64,
    /// World z of the neighborhood center.
    pub z: f64,
    /// Half-width of the neighborhood in world units.
    pub radius: f64,
    /// LOD to warm.
    #[serde(default)]
    pub lod: u8,
}

/// Settings for opening an [`ElevationProvider`](crate::ElevationProvider).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Directory holding `tile_index.json` or `tileset.json`.
    #[serde(default)]
    pub tiles_dir: Option<PathBuf>,
    /// Raster sampled directly when no tiles are usable.
    #[serde(default)]
    pub raster: Option<PathBuf>,
    /// Maximum resident tiles.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// World-to-raster mapping.
    #[serde(default)]
    pub world: WorldFrame,
    /// Raw mode: meters at normalized value 0.
    #[serde(default = "default_low_anchor")]
    pub low_anchor_meters: f64,
    /// Raw mode: meters at normalized value 1.
    #[serde(default = "default_high_anchor")]
    pub high_anchor_meters: f64,
    /// Raw mode: per-axis sample budget for range estimation.
    #[serde(default = "default_range_samples")]
    pub range_samples: u32,
    /// Raw mode: tile edge used for zoom and region spacing.
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Raw mode: LOD levels used for zoom selection.
    #[serde(default = "default_lod_levels")]
    pub lod_levels: u8,
    /// Raw mode: floor for coarse tile edges.
    #[serde(default = "default_min_tile_edge")]
    pub min_tile_edge: u32,
    /// Optional warm-up neighborhood.
    #[serde(default)]
    pub preload: Option<PreloadConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            tiles_dir: None,
            raster: None,
            cache_capacity: default_cache_capacity(),
            world: WorldFrame::default(),
            low_anchor_meters: DEFAULT_LOW_ANCHOR_METERS,
            high_anchor_meters: DEFAULT_HIGH_ANCHOR_METERS,
            range_samples: DEFAULT_RANGE_SAMPLES,
            tile_size: DEFAULT_TILE_SIZE,
            lod_levels: DEFAULT_LOD_LEVELS,
            min_tile_edge: DEFAULT_MIN_TILE_EDGE,
            preload: None,
        }
    }
}

impl ProviderConfig {
    /// Serve from a tile directory.
    pub fn with_tiles(dir: impl Into<PathBuf>) -> Self {
        Self {
            tiles_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Serve from a raw raster.
    pub fn with_raster(path: impl Into<PathBuf>) -> Self {
        Self {
            raster: Some(path.into()),
            ..Self::default()
        }
    }

    /// Load from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_yaml(path.as_ref())
    }

    /// Reject settings no provider can honor.
    pub fn validate(&self) -> Result<()> {
        if !(self.world.units_per_pixel > 0.0) || !self.world.units_per_pixel.is_finite() {
            return Err(TileError::InvalidConfig(format!(
                "units_per_pixel must be positive, got {}",
                self.world.units_per_pixel
            )));
        }
        if self.tile_size == 0 || self.lod_levels == 0 || self.min_tile_edge == 0 {
            return Err(TileError::InvalidConfig(
                "tile_size, lod_levels and min_tile_edge must be positive".into(),
            ));
        }
        if PyramidLayout::coarsest_span(self.tile_size, self.lod_levels).is_none() {
            return Err(TileError::InvalidConfig("lod_levels overflow the tile span".into()));
        }
        check_anchors(self.low_anchor_meters, self.high_anchor_meters)
    }

    /// Geometry used for region spacing and zoom selection in raw mode.
    pub fn raw_layout(&self, source_width: u32, source_height: u32) -> PyramidLayout {
        PyramidLayout {
            source_width,
            source_height,
            tile_size: self.tile_size,
            lod_levels: self.lod_levels,
            min_tile_edge: self.min_tile_edge,
        }
    }
}
