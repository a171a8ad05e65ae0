//! Tile index documents and the immutable in-memory index.
//!
//! Two documents live next to the tiles:
//! - `tile_index.json`: canonical, one entry per (LOD, tile key).
//! - `tileset.json`: optional legacy subset describing only the flat
//!   native-resolution tiles.
//!
//! [`TileIndex`] is built once from a document and never mutated; the store,
//! cache and provider share it through an `Arc`.

use crate::pyramid::{PyramidLayout, SourceRegion, DEFAULT_MIN_TILE_EDGE};
use crate::{Calibration, Result, Tile, TileError, TileKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the canonical index document.
pub const INDEX_FILE_NAME: &str = "tile_index.json";

/// File name of the legacy tileset document.
pub const LEGACY_FILE_NAME: &str = "tileset.json";

/// Current index document version.
pub const INDEX_VERSION: u32 = 2;

/// Legacy flat tile entry (`tiles[key]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatTileRecord {
    /// File path relative to the index document.
    pub file: String,
    /// Samples per row.
    pub width: u32,
    /// Rows.
    pub height: u32,
    /// Left source column.
    pub src_x: u32,
    /// Top source row.
    pub src_y: u32,
}

/// LOD tile entry (`lod_tiles[lod][key]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LodTileRecord {
    /// File path relative to the index document.
    pub file: String,
    /// Samples per row.
    pub width: u32,
    /// Rows.
    pub height: u32,
    /// Left source column.
    pub src_x: u32,
    /// Top source row.
    pub src_y: u32,
    /// Source columns resampled into this tile.
    pub src_w: u32,
    /// Source rows resampled into this tile.
    pub src_h: u32,
    /// Level of detail.
    pub lod: u8,
}

/// The canonical `tile_index.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    /// Document format version.
    pub version: u32,
    /// Source raster width in pixels.
    pub source_width: u32,
    /// Source raster height in pixels.
    pub source_height: u32,
    /// LOD 0 tile edge.
    pub tile_size: u32,
    /// LOD 0 tile columns.
    pub tiles_x: u32,
    /// LOD 0 tile rows.
    pub tiles_y: u32,
    /// Estimated raw minimum.
    pub min_value: f64,
    /// Estimated raw maximum.
    pub max_value: f64,
    /// Meters at the raw minimum.
    pub low_anchor_meters: f64,
    /// Meters at the raw maximum.
    pub high_anchor_meters: f64,
    /// Number of LOD levels.
    pub lod_levels: u8,
    /// Floor applied to coarse tile edges.
    #[serde(default = "default_min_tile_edge")]
    pub min_tile_edge: u32,
    /// Flat native-resolution tiles, present when legacy output was requested.
    #[serde(default)]
    pub tiles: BTreeMap<String, FlatTileRecord>,
    /// Tiles per LOD, keyed by the LOD number as a string.
    pub lod_tiles: BTreeMap<String, BTreeMap<String, LodTileRecord>>,
}

fn default_min_tile_edge() -> u32 {
    DEFAULT_MIN_TILE_EDGE
}

/// The legacy `tileset.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyDocument {
    /// Document format version.
    pub version: u32,
    /// Source raster width in pixels.
    pub source_width: u32,
    /// Source raster height in pixels.
    pub source_height: u32,
    /// Tile edge.
    pub tile_size: u32,
    /// Tile columns.
    pub tiles_x: u32,
    /// Tile rows.
    pub tiles_y: u32,
    /// Estimated raw minimum.
    pub min_value: f64,
    /// Estimated raw maximum.
    pub max_value: f64,
    /// Meters at the raw minimum.
    #[serde(rename = "mariana_depth")]
    pub low_anchor_meters: f64,
    /// Meters at the raw maximum.
    #[serde(rename = "everest_height")]
    pub high_anchor_meters: f64,
    /// Flat tiles by key.
    pub tiles: BTreeMap<String, FlatTileRecord>,
}

impl IndexDocument {
    /// Calibration recorded in the document.
    pub fn calibration(&self) -> Calibration {
        Calibration::new(
            self.min_value,
            self.max_value,
            self.low_anchor_meters,
            self.high_anchor_meters,
        )
    }

    /// Reduced legacy-compatible view of this document.
    pub fn to_legacy(&self) -> LegacyDocument {
        LegacyDocument {
            version: 1,
            source_width: self.source_width,
            source_height: self.source_height,
            tile_size: self.tile_size,
            tiles_x: self.tiles_x,
            tiles_y: self.tiles_y,
            min_value: self.min_value,
            max_value: self.max_value,
            low_anchor_meters: self.low_anchor_meters,
            high_anchor_meters: self.high_anchor_meters,
            tiles: self.tiles.clone(),
        }
    }

    /// Write the document as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl LegacyDocument {
    /// Write the document as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Location and geometry of one tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileIndexEntry {
    /// Absolute (root-joined) path of the tile file.
    pub path: PathBuf,
    /// Samples per row.
    pub width: u16,
    /// Rows.
    pub height: u16,
    /// Source region the tile was resampled from.
    pub src: SourceRegion,
    /// Level of detail.
    pub lod: u8,
}

/// Immutable lookup from (LOD, tile key) to tile files.
#[derive(Debug, Clone)]
pub struct TileIndex {
    root: PathBuf,
    layout: PyramidLayout,
    calibration: Calibration,
    entries: HashMap<TileKey, TileIndexEntry>,
}

impl TileIndex {
    /// Load the index for a pyramid directory.
    ///
    /// Prefers `tile_index.json`; falls back to a single-LOD index built
    /// from `tileset.json` when only the legacy document exists.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let canonical = dir.join(INDEX_FILE_NAME);
        if canonical.exists() {
            let doc: IndexDocument = serde_json::from_str(&fs::read_to_string(&canonical)?)?;
            return Self::from_document(&doc, dir);
        }

        let legacy = dir.join(LEGACY_FILE_NAME);
        if legacy.exists() {
            info!("No {} in {}, reading legacy {}", INDEX_FILE_NAME, dir.display(), LEGACY_FILE_NAME);
            let doc: LegacyDocument = serde_json::from_str(&fs::read_to_string(&legacy)?)?;
            return Self::from_legacy(&doc, dir);
        }

        Err(TileError::InvalidIndex(format!(
            "neither {} nor {} found in {}",
            INDEX_FILE_NAME,
            LEGACY_FILE_NAME,
            dir.display()
        )))
    }

    /// Build an index from a parsed canonical document.
    pub fn from_document(doc: &IndexDocument, root: &Path) -> Result<Self> {
        let layout = PyramidLayout {
            source_width: doc.source_width,
            source_height: doc.source_height,
            tile_size: doc.tile_size,
            lod_levels: doc.lod_levels,
            min_tile_edge: doc.min_tile_edge,
        };
        check_layout(&layout)?;

        let mut entries = HashMap::new();
        for (lod_str, tiles) in &doc.lod_tiles {
            let lod: u8 = lod_str
                .parse()
                .map_err(|_| TileError::InvalidIndex(format!("bad lod key {:?}", lod_str)))?;
            if lod >= doc.lod_levels {
                return Err(TileError::InvalidIndex(format!(
                    "lod {} listed but document declares {} levels",
                    lod, doc.lod_levels
                )));
            }

            for (grid_key, record) in tiles {
                let key = TileKey::parse_grid_key(lod, grid_key)
                    .ok_or_else(|| TileError::InvalidIndex(format!("bad tile key {:?}", grid_key)))?;
                if record.lod != lod {
                    return Err(TileError::InvalidIndex(format!(
                        "tile {} records lod {} under lod {}",
                        grid_key, record.lod, lod
                    )));
                }
                let entry = TileIndexEntry {
                    path: root.join(&record.file),
                    width: dimension(record.width, grid_key)?,
                    height: dimension(record.height, grid_key)?,
                    src: SourceRegion {
                        x: record.src_x,
                        y: record.src_y,
                        w: record.src_w,
                        h: record.src_h,
                    },
                    lod,
                };
                entries.insert(key, entry);
            }
        }

        debug!("Loaded tile index with {} entries over {} LODs", entries.len(), doc.lod_levels);

        Ok(Self {
            root: root.to_path_buf(),
            layout,
            calibration: doc.calibration(),
            entries,
        })
    }

    /// Build a single-LOD index from a legacy document.
    ///
    /// Flat tiles are native resolution, so their source region equals their
    /// own dimensions.
    pub fn from_legacy(doc: &LegacyDocument, root: &Path) -> Result<Self> {
        let layout = PyramidLayout {
            source_width: doc.source_width,
            source_height: doc.source_height,
            tile_size: doc.tile_size,
            lod_levels: 1,
            min_tile_edge: DEFAULT_MIN_TILE_EDGE,
        };
        check_layout(&layout)?;

        let mut entries = HashMap::new();
        for (grid_key, record) in &doc.tiles {
            let key = TileKey::parse_grid_key(0, grid_key)
                .ok_or_else(|| TileError::InvalidIndex(format!("bad tile key {:?}", grid_key)))?;
            entries.insert(
                key,
                TileIndexEntry {
                    path: root.join(&record.file),
                    width: dimension(record.width, grid_key)?,
                    height: dimension(record.height, grid_key)?,
                    src: SourceRegion {
                        x: record.src_x,
                        y: record.src_y,
                        w: record.width,
                        h: record.height,
                    },
                    lod: 0,
                },
            );
        }

        Ok(Self {
            root: root.to_path_buf(),
            layout,
            calibration: Calibration::new(
                doc.min_value,
                doc.max_value,
                doc.low_anchor_meters,
                doc.high_anchor_meters,
            ),
            entries,
        })
    }

    /// Directory the tile paths are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Pyramid geometry.
    pub fn layout(&self) -> &PyramidLayout {
        &self.layout
    }

    /// Normalization and meter anchors.
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Number of LOD levels.
    pub fn lod_levels(&self) -> u8 {
        self.layout.lod_levels
    }

    /// Look up a tile.
    pub fn entry(&self, key: &TileKey) -> Option<&TileIndexEntry> {
        self.entries.get(key)
    }

    /// Whether a tile is listed.
    pub fn contains(&self, key: &TileKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Total number of tiles across all LODs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index lists no tiles.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of tiles listed at one LOD.
    pub fn tile_count(&self, lod: u8) -> usize {
        self.entries.keys().filter(|k| k.lod == lod).count()
    }

    /// Tile grid dimensions at one LOD.
    pub fn effective_grid(&self, lod: u8) -> (u32, u32) {
        self.layout.effective_grid(lod)
    }

    /// Nominal source pixels per sample at one LOD.
    pub fn lod_spacing(&self, lod: u8) -> f64 {
        self.layout.spacing(lod)
    }

    /// Keys at one LOD in row-major order.
    pub fn keys(&self, lod: u8) -> Vec<TileKey> {
        let mut keys: Vec<TileKey> = self.entries.keys().filter(|k| k.lod == lod).copied().collect();
        keys.sort_by_key(|k| (k.ty, k.tx));
        keys
    }

    /// Check the index against its own geometry and the files on disk.
    ///
    /// Returns every problem found rather than stopping at the first.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for lod in 0..self.layout.lod_levels {
            let (gx, gy) = self.layout.effective_grid(lod);
            for ty in 0..gy {
                for tx in 0..gx {
                    let key = TileKey::new(lod, tx, ty);
                    match self.entries.get(&key) {
                        None => problems.push(format!("{}: missing from index", key)),
                        Some(entry) => self.validate_entry(key, entry, &mut problems),
                    }
                }
            }
        }

        for key in self.entries.keys() {
            let (gx, gy) = self.layout.effective_grid(key.lod);
            if key.tx >= gx || key.ty >= gy {
                problems.push(format!("{}: outside the {}x{} grid", key, gx, gy));
            }
        }

        problems
    }

    fn validate_entry(&self, key: TileKey, entry: &TileIndexEntry, problems: &mut Vec<String>) {
        let region = self.layout.source_region(key);
        if entry.src != region {
            problems.push(format!("{}: source region {:?}, expected {:?}", key, entry.src, region));
        }

        let (w, h) = self.layout.output_size(key.lod, region);
        if (entry.width, entry.height) != (w, h) {
            problems.push(format!(
                "{}: declared {}x{}, expected {}x{}",
                key, entry.width, entry.height, w, h
            ));
        }

        match fs::metadata(&entry.path) {
            Err(_) => problems.push(format!("{}: file {} missing", key, entry.path.display())),
            Ok(meta) => {
                let expected = Tile::encoded_len(entry.width, entry.height) as u64;
                if meta.len() != expected {
                    problems.push(format!(
                        "{}: file is {} bytes, expected {}",
                        key,
                        meta.len(),
                        expected
                    ));
                }
            }
        }
    }
}

fn check_layout(layout: &PyramidLayout) -> Result<()> {
    if layout.tile_size == 0 || layout.lod_levels == 0 {
        return Err(TileError::InvalidIndex(format!(
            "tile_size {} and lod_levels {} must be non-zero",
            layout.tile_size, layout.lod_levels
        )));
    }
    if PyramidLayout::coarsest_span(layout.tile_size, layout.lod_levels).is_none() {
        return Err(TileError::InvalidIndex(format!(
            "{} LOD levels overflow the tile span for tile_size {}",
            layout.lod_levels, layout.tile_size
        )));
    }
    if layout.source_width == 0 || layout.source_height == 0 {
        return Err(TileError::InvalidIndex("empty source raster".to_string()));
    }
    Ok(())
}

fn dimension(value: u32, key: &str) -> Result<u16> {
    u16::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| TileError::InvalidIndex(format!("tile {} has invalid dimension {}", key, value)))
}
