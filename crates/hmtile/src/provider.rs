//! Runtime elevation queries over a tile pyramid or a raw raster.
//!
//! The backing source is chosen once, when the provider is constructed:
//! tiles when an index is available, the original raster otherwise. Both
//! normalize through the same [`Calibration`], so switching modes changes
//! results by at most one 16-bit quantization step.

use crate::cache::{LodCache, PreloadStats};
use crate::config::ProviderConfig;
use crate::pyramid::{local_position, sample_position, PyramidLayout};
use crate::store::TileStore;
use crate::world::{WorldFrame, WorldRect};
use crate::{Calibration, Result, SourceRaster, TileError, TileIndex, TileKey};
use hmtile_metrics::metric_defs;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tolerance when deciding whether a sample lies inside a region.
const REGION_EPSILON: f64 = 1e-9;

/// Which backing source a provider answers from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    /// Decoded pyramid tiles through the LOD cache.
    Tiled,
    /// Direct sampling of the full-resolution raster.
    Raw,
}

/// Backing source, fixed for the provider's lifetime.
#[derive(Debug)]
enum ElevationSource {
    Tiled {
        index: Arc<TileIndex>,
        cache: Arc<LodCache>,
    },
    Raw {
        raster: Arc<SourceRaster>,
        calibration: Calibration,
        layout: PyramidLayout,
    },
}

/// A stitched grid of normalized samples covering a world rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionGrid {
    /// Samples per row.
    pub width: u32,
    /// Rows.
    pub height: u32,
    /// Row-major 16-bit samples.
    pub samples: Vec<u16>,
    /// LOD the samples were taken from.
    pub lod: u8,
    /// World rectangle spanned by the first and last samples.
    pub bounds: WorldRect,
    /// Calibration for converting samples to meters.
    pub calibration: Calibration,
}

impl RegionGrid {
    /// Sample at a grid position.
    pub fn sample(&self, x: u32, y: u32) -> u16 {
        self.samples[y as usize * self.width as usize + x as usize]
    }

    /// Elevation in meters at a grid position.
    pub fn elevation(&self, x: u32, y: u32) -> f64 {
        self.calibration.sample_to_meters(self.sample(x, y) as f64)
    }

    /// All samples converted to meters.
    pub fn to_meters(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|s| self.calibration.sample_to_meters(*s as f64) as f32)
            .collect()
    }

    /// Lowest and highest elevation in meters.
    pub fn meter_range(&self) -> (f64, f64) {
        let min = self.samples.iter().min().copied().unwrap_or(0);
        let max = self.samples.iter().max().copied().unwrap_or(0);
        (
            self.calibration.sample_to_meters(min as f64),
            self.calibration.sample_to_meters(max as f64),
        )
    }
}

/// Sample indices of one tile that fall inside a source-space interval.
#[derive(Debug, Clone, Copy)]
struct AxisSpan {
    tile: u32,
    first: u16,
    last: u16,
}

/// Point and region elevation queries for independent consumers.
///
/// Thread-safe: share it behind an `Arc` and query from any thread.
#[derive(Debug)]
pub struct ElevationProvider {
    source: ElevationSource,
    frame: WorldFrame,
}

impl ElevationProvider {
    /// Serve queries from a tile index with a private cache.
    pub fn tiled(index: Arc<TileIndex>, cache_capacity: usize, frame: WorldFrame) -> Self {
        let cache = Arc::new(LodCache::from_store(
            TileStore::new(Arc::clone(&index)),
            cache_capacity,
        ));
        Self::with_cache(index, cache, frame)
    }

    /// Serve queries from a tile index through an existing cache.
    pub fn with_cache(index: Arc<TileIndex>, cache: Arc<LodCache>, frame: WorldFrame) -> Self {
        Self {
            source: ElevationSource::Tiled { index, cache },
            frame,
        }
    }

    /// Serve queries by sampling the raster directly.
    ///
    /// `layout` only shapes region extraction and zoom selection so they
    /// match what a pyramid with the same settings would return.
    pub fn raw(
        raster: Arc<SourceRaster>,
        calibration: Calibration,
        layout: PyramidLayout,
        frame: WorldFrame,
    ) -> Self {
        Self {
            source: ElevationSource::Raw {
                raster,
                calibration,
                layout,
            },
            frame,
        }
    }

    /// Construct from configuration, preferring tiles over the raster.
    ///
    /// Returns [`TileError::Unavailable`] when neither source can be opened.
    pub fn open(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        let mut reasons = Vec::new();

        if let Some(dir) = &config.tiles_dir {
            match TileIndex::load(dir) {
                Ok(index) => {
                    info!(
                        "Serving elevation from {} tiles in {} ({} LODs)",
                        index.len(),
                        dir.display(),
                        index.lod_levels()
                    );
                    let provider = Self::tiled(Arc::new(index), config.cache_capacity, config.world);
                    provider.run_preload(config);
                    return Ok(provider);
                }
                Err(e) => {
                    warn!("Tile index in {} unusable: {}", dir.display(), e);
                    reasons.push(format!("tiles: {}", e));
                }
            }
        }

        if let Some(path) = &config.raster {
            match SourceRaster::open(path) {
                Ok(raster) => {
                    info!(
                        "Serving elevation from raw raster {} ({}x{})",
                        path.display(),
                        raster.width(),
                        raster.height()
                    );
                    let (min, max) = raster.estimate_range(config.range_samples);
                    let calibration = Calibration::new(
                        min as f64,
                        max as f64,
                        config.low_anchor_meters,
                        config.high_anchor_meters,
                    );
                    let layout = config.raw_layout(raster.width(), raster.height());
                    return Ok(Self::raw(Arc::new(raster), calibration, layout, config.world));
                }
                Err(e) => {
                    warn!("Fallback raster {} unusable: {}", path.display(), e);
                    reasons.push(format!("raster: {}", e));
                }
            }
        }

        if reasons.is_empty() {
            reasons.push("no tiles directory or raster configured".to_string());
        }
        Err(TileError::Unavailable(reasons.join("; ")))
    }

    fn run_preload(&self, config: &ProviderConfig) {
        if let Some(preload) = &config.preload {
            let stats = self.preload_around(preload.x, preload.z, preload.radius, preload.lod);
            info!(
                "Preloaded {} tiles at lod {} ({} missing, {} failed)",
                stats.loaded, preload.lod, stats.missing, stats.failed
            );
        }
    }

    /// Which backing source is in use.
    pub fn mode(&self) -> ProviderMode {
        match &self.source {
            ElevationSource::Tiled { .. } => ProviderMode::Tiled,
            ElevationSource::Raw { .. } => ProviderMode::Raw,
        }
    }

    /// World-to-raster mapping.
    pub fn frame(&self) -> &WorldFrame {
        &self.frame
    }

    /// Normalization and meter anchors.
    pub fn calibration(&self) -> &Calibration {
        match &self.source {
            ElevationSource::Tiled { index, .. } => index.calibration(),
            ElevationSource::Raw { calibration, .. } => calibration,
        }
    }

    /// Pyramid geometry used for addressing.
    pub fn layout(&self) -> &PyramidLayout {
        match &self.source {
            ElevationSource::Tiled { index, .. } => index.layout(),
            ElevationSource::Raw { layout, .. } => layout,
        }
    }

    /// Number of LOD levels.
    pub fn lod_levels(&self) -> u8 {
        self.layout().lod_levels
    }

    /// The tile cache, in tiled mode.
    pub fn cache(&self) -> Option<&Arc<LodCache>> {
        match &self.source {
            ElevationSource::Tiled { cache, .. } => Some(cache),
            ElevationSource::Raw { .. } => None,
        }
    }

    /// Elevation in meters at a world position.
    ///
    /// Tries LOD 0 first and falls back to coarser LODs when a tile is
    /// missing or unreadable.
    pub fn get_elevation(&self, world_x: f64, world_z: f64) -> Result<f64> {
        let (px, pz) = self.to_raster_checked(world_x, world_z)?;

        match &self.source {
            ElevationSource::Raw {
                raster,
                calibration,
                ..
            } => Ok(calibration.to_meters(raster.sample_normalized(px, pz, calibration))),
            ElevationSource::Tiled { index, .. } => {
                let layout = index.layout();
                let mut last_error = None;

                for lod in 0..layout.lod_levels {
                    let key = layout.tile_at(lod, px, pz);
                    match self.sample_tile(key, px, pz) {
                        Ok(meters) => return Ok(meters),
                        Err(e) if e.is_tile_fault() => {
                            match &e {
                                TileError::NotFound { .. } => debug!("Tile {} not indexed, trying coarser LOD", key),
                                _ => warn!("Tile {} unusable, trying coarser LOD: {}", key, e),
                            }
                            metrics::counter!(
                                metric_defs::PROVIDER_FALLBACKS.name,
                                &[("reason", e.fallback_reason())]
                            )
                            .increment(1);
                            last_error = Some(e);
                        }
                        Err(e) => return Err(e),
                    }
                }

                metrics::counter!(metric_defs::PROVIDER_UNAVAILABLE.name).increment(1);
                Err(TileError::Unavailable(match last_error {
                    Some(e) => format!("no LOD could answer ({}, {}): {}", world_x, world_z, e),
                    None => format!("no LOD could answer ({}, {})", world_x, world_z),
                }))
            }
        }
    }

    /// Elevation in meters, or `default` when the query fails.
    pub fn get_elevation_or(&self, world_x: f64, world_z: f64, default: f64) -> f64 {
        self.get_elevation(world_x, world_z).unwrap_or(default)
    }

    /// Elevation answered by one specific tile.
    ///
    /// The position is mapped through the tile's recorded source region and
    /// clamped to its lattice, so it may lie slightly outside the tile.
    pub fn elevation_from_tile(&self, key: TileKey, world_x: f64, world_z: f64) -> Result<f64> {
        let (px, pz) = self.frame.to_raster(world_x, world_z);
        self.sample_tile(key, px, pz)
    }

    fn sample_tile(&self, key: TileKey, px: f64, pz: f64) -> Result<f64> {
        let ElevationSource::Tiled { index, cache } = &self.source else {
            return Err(TileError::Unavailable("provider is not serving tiles".to_string()));
        };
        let entry = index.entry(&key).ok_or(TileError::NotFound {
            lod: key.lod,
            tx: key.tx,
            ty: key.ty,
        })?;
        let tile = cache.get_or_load(key)?;

        let lx = local_position(entry.src.x, entry.src.w, entry.width, px);
        let ly = local_position(entry.src.y, entry.src.h, entry.height, pz);
        Ok(index.calibration().sample_to_meters(tile.sample_bilinear(lx, ly)))
    }

    /// Sample elevations along a segment between two world points.
    ///
    /// Returns `(distance, elevation)` pairs with distance in world units
    /// from the start point.
    pub fn sample_line(
        &self,
        start: (f64, f64),
        end: (f64, f64),
        num_samples: usize,
    ) -> Vec<(f64, Result<f64>)> {
        let total = ((end.0 - start.0).powi(2) + (end.1 - start.1).powi(2)).sqrt();
        (0..num_samples)
            .map(|i| {
                let t = if num_samples > 1 {
                    i as f64 / (num_samples - 1) as f64
                } else {
                    0.0
                };
                let x = start.0 + t * (end.0 - start.0);
                let z = start.1 + t * (end.1 - start.1);
                (t * total, self.get_elevation(x, z))
            })
            .collect()
    }

    /// LOD for a zoom level given as source pixels per output pixel.
    ///
    /// Picks the coarsest LOD whose sample spacing does not exceed `zoom`.
    /// Spacing strictly grows with LOD, so the result is non-decreasing in
    /// zoom and steps one level at a time through a continuous sweep.
    pub fn get_lod_for_zoom(&self, zoom: f64) -> u8 {
        lod_for_zoom(self.layout(), zoom)
    }

    /// Stitched samples covering a world rectangle at one LOD.
    pub fn extract_region(&self, rect: WorldRect, desired_lod: u8) -> Result<RegionGrid> {
        let layout = *self.layout();
        let lod = desired_lod.min(layout.lod_levels.saturating_sub(1));
        if lod != desired_lod {
            debug!("Clamped region lod {} to {}", desired_lod, lod);
        }

        let (x0, z0) = self.frame.to_raster(rect.min_x, rect.min_z);
        let (x1, z1) = self.frame.to_raster(rect.max_x, rect.max_z);
        let max_x = (layout.source_width - 1) as f64;
        let max_z = (layout.source_height - 1) as f64;
        if !(x1 >= 0.0 && z1 >= 0.0 && x0 <= max_x && z0 <= max_z) {
            return Err(TileError::EmptyRegion { lod });
        }
        let (x0, x1) = (x0.max(0.0), x1.min(max_x));
        let (z0, z1) = (z0.max(0.0), z1.min(max_z));

        match &self.source {
            ElevationSource::Tiled { index, cache } => {
                let columns = self.axis_spans(index, lod, x0, x1, true)?;
                let rows = self.axis_spans(index, lod, z0, z1, false)?;
                let width: u32 = columns.iter().map(|s| (s.last - s.first + 1) as u32).sum();
                let height: u32 = rows.iter().map(|s| (s.last - s.first + 1) as u32).sum();
                if width == 0 || height == 0 {
                    return Err(TileError::EmptyRegion { lod });
                }

                let mut samples = vec![0u16; width as usize * height as usize];
                let mut out_y = 0usize;
                for row in &rows {
                    let mut out_x = 0usize;
                    for col in &columns {
                        let key = TileKey::new(lod, col.tile, row.tile);
                        let tile = cache.get_or_load(key)?;
                        if tile.width() <= col.last || tile.height() <= row.last {
                            return Err(TileError::CorruptTile {
                                path: index.entry(&key).map(|e| e.path.clone()).unwrap_or_default(),
                                reason: format!(
                                    "{}x{} tile does not match its row and column neighbours",
                                    tile.width(),
                                    tile.height()
                                ),
                            });
                        }
                        for (dy, ty) in (row.first..=row.last).enumerate() {
                            let dst = (out_y + dy) * width as usize + out_x;
                            for (dx, tx) in (col.first..=col.last).enumerate() {
                                samples[dst + dx] = tile.sample(tx, ty);
                            }
                        }
                        out_x += (col.last - col.first + 1) as usize;
                    }
                    out_y += (row.last - row.first + 1) as usize;
                }

                let first_x = self.span_position(index, lod, columns[0], true, false)?;
                let last_x = self.span_position(index, lod, columns[columns.len() - 1], true, true)?;
                let first_z = self.span_position(index, lod, rows[0], false, false)?;
                let last_z = self.span_position(index, lod, rows[rows.len() - 1], false, true)?;
                let (bx0, bz0) = self.frame.to_world(first_x, first_z);
                let (bx1, bz1) = self.frame.to_world(last_x, last_z);

                Ok(RegionGrid {
                    width,
                    height,
                    samples,
                    lod,
                    bounds: WorldRect::new(bx0, bz0, bx1, bz1),
                    calibration: *index.calibration(),
                })
            }
            ElevationSource::Raw {
                raster,
                calibration,
                layout,
            } => {
                let spacing = layout.spacing(lod);
                let xs = lattice(x0, x1, spacing, max_x);
                let zs = lattice(z0, z1, spacing, max_z);
                if xs.is_empty() || zs.is_empty() {
                    return Err(TileError::EmptyRegion { lod });
                }

                let mut samples = Vec::with_capacity(xs.len() * zs.len());
                for &z in &zs {
                    for &x in &xs {
                        samples.push(calibration.quantize(raster.sample_bilinear(x, z)));
                    }
                }

                let (bx0, bz0) = self.frame.to_world(xs[0], zs[0]);
                let (bx1, bz1) = self.frame.to_world(xs[xs.len() - 1], zs[zs.len() - 1]);
                Ok(RegionGrid {
                    width: xs.len() as u32,
                    height: zs.len() as u32,
                    samples,
                    lod,
                    bounds: WorldRect::new(bx0, bz0, bx1, bz1),
                    calibration: *calibration,
                })
            }
        }
    }

    /// Region extraction with the LOD chosen by [`Self::get_lod_for_zoom`].
    pub fn extract_region_lod(&self, rect: WorldRect, zoom: f64) -> Result<RegionGrid> {
        self.extract_region(rect, self.get_lod_for_zoom(zoom))
    }

    /// Warm the cache around a world position. No-op in raw mode.
    pub fn preload_around(&self, world_x: f64, world_z: f64, radius: f64, lod: u8) -> PreloadStats {
        match &self.source {
            ElevationSource::Tiled { cache, .. } => {
                let (px, pz) = self.frame.to_raster(world_x, world_z);
                let lod = lod.min(self.lod_levels().saturating_sub(1));
                cache.preload(px, pz, radius / self.frame.units_per_pixel, lod)
            }
            ElevationSource::Raw { .. } => PreloadStats::default(),
        }
    }

    fn to_raster_checked(&self, world_x: f64, world_z: f64) -> Result<(f64, f64)> {
        let (px, pz) = self.frame.to_raster(world_x, world_z);
        let layout = self.layout();
        let inside = px >= 0.0
            && pz >= 0.0
            && px < layout.source_width as f64
            && pz < layout.source_height as f64;
        if !inside {
            return Err(TileError::OutOfBounds {
                x: px,
                z: pz,
                width: layout.source_width,
                height: layout.source_height,
            });
        }
        Ok((px, pz))
    }

    /// Per-tile sample ranges along one axis covering `[lo, hi]` in raster space.
    fn axis_spans(
        &self,
        index: &TileIndex,
        lod: u8,
        lo: f64,
        hi: f64,
        horizontal: bool,
    ) -> Result<Vec<AxisSpan>> {
        let layout = index.layout();
        let (first, last) = if horizontal {
            (layout.tile_at(lod, lo, 0.0).tx, layout.tile_at(lod, hi, 0.0).tx)
        } else {
            (layout.tile_at(lod, 0.0, lo).ty, layout.tile_at(lod, 0.0, hi).ty)
        };

        let mut spans = Vec::new();
        for tile in first..=last {
            let key = if horizontal {
                TileKey::new(lod, tile, 0)
            } else {
                TileKey::new(lod, 0, tile)
            };
            let entry = index.entry(&key).ok_or(TileError::NotFound {
                lod,
                tx: key.tx,
                ty: key.ty,
            })?;
            let (src, src_len, out) = if horizontal {
                (entry.src.x, entry.src.w, entry.width)
            } else {
                (entry.src.y, entry.src.h, entry.height)
            };

            let lo_local = local_position(src, src_len, out, lo);
            let hi_local = local_position(src, src_len, out, hi);
            let max_index = (out - 1) as f64;
            let first_sample = (lo_local - REGION_EPSILON).ceil().max(0.0);
            let last_sample = (hi_local + REGION_EPSILON).floor().min(max_index);
            if first_sample <= last_sample {
                spans.push(AxisSpan {
                    tile,
                    first: first_sample as u16,
                    last: last_sample as u16,
                });
            }
        }

        if spans.is_empty() {
            return Err(TileError::EmptyRegion { lod });
        }
        Ok(spans)
    }

    fn span_position(
        &self,
        index: &TileIndex,
        lod: u8,
        span: AxisSpan,
        horizontal: bool,
        end: bool,
    ) -> Result<f64> {
        let key = if horizontal {
            TileKey::new(lod, span.tile, 0)
        } else {
            TileKey::new(lod, 0, span.tile)
        };
        let entry = index.entry(&key).ok_or(TileError::NotFound {
            lod,
            tx: key.tx,
            ty: key.ty,
        })?;
        let i = if end { span.last } else { span.first };
        Ok(if horizontal {
            sample_position(entry.src.x, entry.src.w, entry.width, i)
        } else {
            sample_position(entry.src.y, entry.src.h, entry.height, i)
        })
    }
}

/// Coarsest LOD whose sample spacing does not exceed `zoom`.
pub fn lod_for_zoom(layout: &PyramidLayout, zoom: f64) -> u8 {
    let mut lod = 0;
    for candidate in 1..layout.lod_levels {
        if layout.spacing(candidate) <= zoom {
            lod = candidate;
        } else {
            break;
        }
    }
    lod
}

/// Multiples of `spacing` inside `[lo, hi]`, clamped to `max`.
fn lattice(lo: f64, hi: f64, spacing: f64, max: f64) -> Vec<f64> {
    let first = ((lo - REGION_EPSILON) / spacing).ceil() as i64;
    let last = ((hi + REGION_EPSILON) / spacing).floor() as i64;
    (first.max(0)..=last)
        .map(|k| (k as f64 * spacing).min(max))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pyramid::DEFAULT_MIN_TILE_EDGE;
    use approx::assert_relative_eq;

    fn raw_provider(width: u32, height: u32) -> ElevationProvider {
        let raster = SourceRaster::from_fn(width, height, |x, _| x as f32 / (width - 1) as f32).unwrap();
        ElevationProvider::raw(
            Arc::new(raster),
            Calibration::new(0.0, 1.0, -10994.0, 8849.0),
            PyramidLayout {
                source_width: width,
                source_height: height,
                tile_size: 64,
                lod_levels: 3,
                min_tile_edge: DEFAULT_MIN_TILE_EDGE,
            },
            WorldFrame::default(),
        )
    }

    #[test]
    fn test_raw_elevation_uses_calibration() {
        let provider = raw_provider(101, 4);
        assert_eq!(provider.mode(), ProviderMode::Raw);
        assert_relative_eq!(provider.get_elevation(50.0, 1.0).unwrap(), -1072.5, epsilon = 1e-6);
        assert_relative_eq!(provider.get_elevation(0.0, 0.0).unwrap(), -10994.0, epsilon = 1e-6);
    }

    #[test]
    fn test_out_of_bounds() {
        let provider = raw_provider(16, 16);
        assert!(matches!(provider.get_elevation(-0.5, 2.0), Err(TileError::OutOfBounds { .. })));
        assert!(matches!(provider.get_elevation(2.0, 16.0), Err(TileError::OutOfBounds { .. })));
        assert!(matches!(provider.get_elevation(f64::NAN, 2.0), Err(TileError::OutOfBounds { .. })));
        assert_eq!(provider.get_elevation_or(99.0, 0.0, 7.0), 7.0);
    }

    #[test]
    fn test_lod_for_zoom_is_monotonic_and_stepwise() {
        let layout = PyramidLayout {
            source_width: 8192,
            source_height: 8192,
            tile_size: 512,
            lod_levels: 6,
            min_tile_edge: DEFAULT_MIN_TILE_EDGE,
        };
        let mut previous = lod_for_zoom(&layout, 0.01);
        assert_eq!(previous, 0);
        let mut zoom = 0.01;
        while zoom < 2000.0 {
            let lod = lod_for_zoom(&layout, zoom);
            assert!(lod >= previous, "lod went down at zoom {}", zoom);
            assert!(lod - previous <= 1, "skipped from {} to {} at zoom {}", previous, lod, zoom);
            assert_eq!(lod, lod_for_zoom(&layout, zoom));
            previous = lod;
            zoom *= 1.01;
        }
        assert_eq!(previous, 5);
        assert_eq!(lod_for_zoom(&layout, f64::NAN), 0);
        assert_eq!(lod_for_zoom(&layout, -3.0), 0);
    }

    #[test]
    fn test_raw_region_at_lod0_is_pixel_exact() {
        let provider = raw_provider(32, 8);
        let grid = provider.extract_region(WorldRect::new(2.0, 1.0, 5.0, 3.0), 0).unwrap();
        assert_eq!((grid.width, grid.height), (4, 3));
        assert_eq!(grid.bounds, WorldRect::new(2.0, 1.0, 5.0, 3.0));
        assert!(grid.sample(0, 0) < grid.sample(3, 0));
    }

    #[test]
    fn test_region_outside_raster_is_empty() {
        let provider = raw_provider(32, 8);
        assert!(matches!(
            provider.extract_region(WorldRect::new(40.0, 0.0, 50.0, 4.0), 0),
            Err(TileError::EmptyRegion { lod: 0 })
        ));
    }

    #[test]
    fn test_sample_line_distances() {
        let provider = raw_provider(101, 101);
        let samples = provider.sample_line((0.0, 0.0), (30.0, 40.0), 6);
        assert_eq!(samples.len(), 6);
        assert_relative_eq!(samples[5].0, 50.0);
        assert!(samples.iter().all(|(_, r)| r.is_ok()));
        assert!(provider.sample_line((0.0, 0.0), (1.0, 1.0), 0).is_empty());
    }

    #[test]
    fn test_raw_mode_has_no_tiles() {
        let provider = raw_provider(8, 8);
        assert!(provider.cache().is_none());
        assert!(provider.elevation_from_tile(TileKey::new(0, 0, 0), 1.0, 1.0).is_err());
        assert_eq!(provider.preload_around(4.0, 4.0, 4.0, 0), PreloadStats::default());
    }
}
