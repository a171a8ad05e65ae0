//! Offline pyramid generation.
//!
//! [`build_pyramid`] is a single batch job: it reads the source raster once,
//! estimates the value range, resamples every LOD in parallel and persists
//! the tiles and index documents. Any I/O failure aborts the run.
//!
//! Output is byte-identical regardless of thread count: tiles are generated
//! independently from read-only input, collected in row-major order, and
//! recorded in sorted maps.

use crate::config::BuildConfig;
use crate::index::{
    FlatTileRecord, IndexDocument, LodTileRecord, INDEX_FILE_NAME, INDEX_VERSION, LEGACY_FILE_NAME,
};
use crate::pyramid::{sample_position, PyramidLayout, SourceRegion};
use crate::{Calibration, Result, SourceRaster, Tile, TileError, TileKey};
use hmtile_metrics::{lod_label, metric_defs};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Summary of a completed build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Directory the pyramid was written to.
    pub output_dir: PathBuf,
    /// Geometry of the written pyramid.
    pub layout: PyramidLayout,
    /// Calibration recorded in the index.
    pub calibration: Calibration,
    /// Tiles written per LOD, LOD 0 first.
    pub tiles_per_lod: Vec<usize>,
    /// Legacy flat tiles written.
    pub legacy_tiles: usize,
    /// Bytes written across all tile files.
    pub total_bytes: u64,
    /// Wall time of the build.
    pub elapsed: Duration,
}

impl BuildReport {
    /// Tiles written across all LODs, excluding legacy copies.
    pub fn total_tiles(&self) -> usize {
        self.tiles_per_lod.iter().sum()
    }
}

/// One generated tile and where it landed on disk.
struct WrittenTile {
    key: TileKey,
    region: SourceRegion,
    width: u16,
    height: u16,
    bytes: usize,
}

/// Load the configured raster and build its pyramid.
pub fn build_pyramid(config: &BuildConfig) -> Result<BuildReport> {
    config.validate()?;
    info!("Loading source raster {}", config.source.display());
    let raster = SourceRaster::open(&config.source)?;
    build_from_raster(&raster, config)
}

/// Build a pyramid from an already decoded raster.
///
/// `config.source` is not read.
pub fn build_from_raster(raster: &SourceRaster, config: &BuildConfig) -> Result<BuildReport> {
    config.validate()?;
    let start = Instant::now();

    let (min, max) = raster.estimate_range(config.range_samples);
    let calibration = Calibration::new(
        min as f64,
        max as f64,
        config.low_anchor_meters,
        config.high_anchor_meters,
    );
    info!(
        "Source {}x{}, estimated range [{:.6}, {:.6}]",
        raster.width(),
        raster.height(),
        min,
        max
    );

    let layout = config.layout(raster.width(), raster.height());
    create_dir(&config.output_dir)?;

    let mut lod_tiles = BTreeMap::new();
    let mut flat_tiles = BTreeMap::new();
    let mut tiles_per_lod = Vec::with_capacity(config.lod_levels as usize);
    let mut total_bytes = 0u64;

    for lod in 0..layout.lod_levels {
        let lod_start = Instant::now();
        let lod_dir = config.output_dir.join(format!("lod{}", lod));
        create_dir(&lod_dir)?;

        let emit_flat = lod == 0 && config.emit_legacy;
        let (gx, gy) = layout.effective_grid(lod);
        let keys: Vec<TileKey> = (0..gy)
            .flat_map(|ty| (0..gx).map(move |tx| TileKey::new(lod, tx, ty)))
            .collect();

        info!(
            "Generating lod {}: {}x{} tiles, edge {} using {} threads",
            lod,
            gx,
            gy,
            layout.tile_edge(lod),
            rayon::current_num_threads()
        );

        let written: Vec<WrittenTile> = keys
            .par_iter()
            .map(|&key| {
                let region = layout.source_region(key);
                let tile = resample_tile(raster, &layout, &calibration, key.lod, region)?;
                let mut bytes = tile.write_file(config.output_dir.join(key.lod_file_name()))?;
                if emit_flat {
                    bytes += tile.write_file(config.output_dir.join(key.flat_file_name()))?;
                }
                Ok(WrittenTile {
                    key,
                    region,
                    width: tile.width(),
                    height: tile.height(),
                    bytes,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut records = BTreeMap::new();
        let mut lod_bytes = 0u64;
        for tile in &written {
            lod_bytes += tile.bytes as u64;
            records.insert(
                tile.key.grid_key(),
                LodTileRecord {
                    file: tile.key.lod_file_name(),
                    width: tile.width as u32,
                    height: tile.height as u32,
                    src_x: tile.region.x,
                    src_y: tile.region.y,
                    src_w: tile.region.w,
                    src_h: tile.region.h,
                    lod,
                },
            );
            if emit_flat {
                flat_tiles.insert(
                    tile.key.grid_key(),
                    FlatTileRecord {
                        file: tile.key.flat_file_name(),
                        width: tile.width as u32,
                        height: tile.height as u32,
                        src_x: tile.region.x,
                        src_y: tile.region.y,
                    },
                );
            }
        }
        lod_tiles.insert(lod.to_string(), records);

        metrics::counter!(metric_defs::BUILD_TILES_WRITTEN.name, &lod_label(lod))
            .increment(written.len() as u64);
        metrics::counter!(metric_defs::BUILD_TILE_BYTES.name).increment(lod_bytes);
        metrics::histogram!(metric_defs::BUILD_LOD_TIME.name, &lod_label(lod))
            .record(lod_start.elapsed().as_secs_f64() * 1000.0);

        debug!(
            "lod {} done: {} tiles, {} bytes in {:?}",
            lod,
            written.len(),
            lod_bytes,
            lod_start.elapsed()
        );
        tiles_per_lod.push(written.len());
        total_bytes += lod_bytes;
    }

    let doc = IndexDocument {
        version: INDEX_VERSION,
        source_width: layout.source_width,
        source_height: layout.source_height,
        tile_size: layout.tile_size,
        tiles_x: layout.tiles_x(),
        tiles_y: layout.tiles_y(),
        min_value: calibration.min_value,
        max_value: calibration.max_value,
        low_anchor_meters: calibration.low_anchor_meters,
        high_anchor_meters: calibration.high_anchor_meters,
        lod_levels: layout.lod_levels,
        min_tile_edge: layout.min_tile_edge,
        tiles: flat_tiles,
        lod_tiles,
    };
    doc.save(config.output_dir.join(INDEX_FILE_NAME))?;
    let legacy_tiles = doc.tiles.len();
    if config.emit_legacy {
        doc.to_legacy().save(config.output_dir.join(LEGACY_FILE_NAME))?;
    }

    let report = BuildReport {
        output_dir: config.output_dir.clone(),
        layout,
        calibration,
        tiles_per_lod,
        legacy_tiles,
        total_bytes,
        elapsed: start.elapsed(),
    };
    info!(
        "Wrote {} tiles ({} legacy) over {} LODs, {:.1} MB in {:.2}s",
        report.total_tiles(),
        report.legacy_tiles,
        layout.lod_levels,
        report.total_bytes as f64 / (1024.0 * 1024.0),
        report.elapsed.as_secs_f64()
    );
    Ok(report)
}

/// Resample one source region into a quantized tile.
///
/// Sample `i` sits at `src + i/(out-1) * (src_len-1)`, so the first and last
/// samples land exactly on the region's edge pixels.
pub fn resample_tile(
    raster: &SourceRaster,
    layout: &PyramidLayout,
    calibration: &Calibration,
    lod: u8,
    region: SourceRegion,
) -> Result<Tile> {
    let (width, height) = layout.output_size(lod, region);
    let xs: Vec<f64> = (0..width)
        .map(|i| sample_position(region.x, region.w, width, i))
        .collect();

    let mut samples = Vec::with_capacity(width as usize * height as usize);
    for j in 0..height {
        let y = sample_position(region.y, region.h, height, j);
        samples.extend(xs.iter().map(|&x| calibration.quantize(raster.sample_bilinear(x, y))));
    }
    Tile::new(width, height, samples)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| TileError::DirectoryCreate {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TileIndex;
    use tempfile::TempDir;

    fn gradient(width: u32, height: u32) -> SourceRaster {
        SourceRaster::from_fn(width, height, |x, y| (x + y) as f32 / (width + height - 2) as f32).unwrap()
    }

    fn config(dir: &Path, tile_size: u32, lod_levels: u8) -> BuildConfig {
        BuildConfig {
            tile_size,
            lod_levels,
            min_tile_edge: 4,
            ..BuildConfig::new("unused.png", dir)
        }
    }

    #[test]
    fn test_resample_lod0_copies_pixels() {
        let raster = gradient(10, 6);
        let layout = PyramidLayout {
            source_width: 10,
            source_height: 6,
            tile_size: 8,
            lod_levels: 1,
            min_tile_edge: 4,
        };
        let calibration = Calibration::with_default_anchors(0.0, 1.0);
        let region = layout.source_region(TileKey::new(0, 1, 0));
        assert_eq!(region, SourceRegion { x: 8, y: 0, w: 2, h: 6 });

        let tile = resample_tile(&raster, &layout, &calibration, 0, region).unwrap();
        assert_eq!((tile.width(), tile.height()), (2, 6));
        assert_eq!(tile.sample(1, 5), calibration.quantize(raster.value(9, 5) as f64));
    }

    #[test]
    fn test_build_writes_every_lod() {
        let dir = TempDir::new().unwrap();
        let report = build_from_raster(&gradient(40, 24), &config(dir.path(), 16, 3)).unwrap();

        assert_eq!(report.tiles_per_lod, vec![6, 2, 1]);
        assert_eq!(report.legacy_tiles, 0);
        assert!(dir.path().join("lod2/tile_0_0.bin").exists());
        assert!(dir.path().join(INDEX_FILE_NAME).exists());
        assert!(!dir.path().join(LEGACY_FILE_NAME).exists());

        let index = TileIndex::load(dir.path()).unwrap();
        assert_eq!(index.len(), 9);
        assert!(index.validate().is_empty(), "{:?}", index.validate());
    }

    #[test]
    fn test_build_emits_legacy_on_request() {
        let dir = TempDir::new().unwrap();
        let mut config = config(dir.path(), 16, 2);
        config.emit_legacy = true;
        let report = build_from_raster(&gradient(20, 20), &config).unwrap();

        assert_eq!(report.legacy_tiles, 4);
        let lod0 = fs::read(dir.path().join("lod0/tile_1_1.bin")).unwrap();
        let flat = fs::read(dir.path().join("tile_1_1.bin")).unwrap();
        assert_eq!(lod0, flat);
        let legacy = fs::read_to_string(dir.path().join(LEGACY_FILE_NAME)).unwrap();
        assert!(legacy.contains("mariana_depth"));
    }

    #[test]
    fn test_rebuild_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let raster = gradient(33, 17);
        let config = config(dir.path(), 8, 3);

        build_from_raster(&raster, &config).unwrap();
        let index_first = fs::read(dir.path().join(INDEX_FILE_NAME)).unwrap();
        let tile_first = fs::read(dir.path().join("lod1/tile_1_0.bin")).unwrap();

        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        pool.install(|| build_from_raster(&raster, &config)).unwrap();
        assert_eq!(fs::read(dir.path().join(INDEX_FILE_NAME)).unwrap(), index_first);
        assert_eq!(fs::read(dir.path().join("lod1/tile_1_0.bin")).unwrap(), tile_first);
    }

    #[test]
    fn test_unwritable_output_is_directory_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let result = build_from_raster(&gradient(8, 8), &config(&blocker.join("out"), 4, 1));
        assert!(matches!(result, Err(TileError::DirectoryCreate { .. })));
    }

    #[test]
    fn test_missing_source_is_load_error() {
        let dir = TempDir::new().unwrap();
        let config = BuildConfig::new(dir.path().join("missing.png"), dir.path().join("out"));
        assert!(matches!(build_pyramid(&config), Err(TileError::Load { .. })));
    }
}
