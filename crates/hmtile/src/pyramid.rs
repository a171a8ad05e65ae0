//! Pyramid geometry shared by the builder, the index and the provider.
//!
//! LOD `l` covers the same extent as LOD 0 with tiles spanning
//! `tile_size << l` source pixels, each resampled into at most
//! `max(tile_size >> l, min(min_tile_edge, tile_size))` samples per axis.

use crate::TileKey;

/// Default floor for the per-LOD tile edge.
pub const DEFAULT_MIN_TILE_EDGE: u32 = 32;

/// Region of the source raster a tile was resampled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRegion {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Columns covered.
    pub w: u32,
    /// Rows covered.
    pub h: u32,
}

/// Dimensions of a tile pyramid over a given source raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidLayout {
    /// Source raster width in pixels.
    pub source_width: u32,
    /// Source raster height in pixels.
    pub source_height: u32,
    /// LOD 0 tile edge in pixels.
    pub tile_size: u32,
    /// Number of LOD levels.
    pub lod_levels: u8,
    /// Lower bound for coarse tile edges.
    pub min_tile_edge: u32,
}

impl PyramidLayout {
    /// Span of the coarsest level, `tile_size << (lod_levels - 1)`.
    ///
    /// `None` when there are no levels or the span does not fit in u32; every
    /// per-LOD computation below assumes it does.
    pub fn coarsest_span(tile_size: u32, lod_levels: u8) -> Option<u32> {
        let shift = u32::from(lod_levels.checked_sub(1)?);
        let scale = 1u32.checked_shl(shift)?;
        tile_size.checked_mul(scale)
    }

    /// LOD 0 tile columns.
    pub fn tiles_x(&self) -> u32 {
        self.source_width.div_ceil(self.tile_size)
    }

    /// LOD 0 tile rows.
    pub fn tiles_y(&self) -> u32 {
        self.source_height.div_ceil(self.tile_size)
    }

    /// Source pixels spanned by one tile edge at `lod`.
    pub fn span(&self, lod: u8) -> u32 {
        self.tile_size << lod
    }

    /// Nominal output tile edge at `lod`.
    pub fn tile_edge(&self, lod: u8) -> u32 {
        let floor = self.min_tile_edge.min(self.tile_size);
        (self.tile_size >> lod).max(floor)
    }

    /// Tile grid at `lod`: `ceil(tiles / 2^lod)` per axis.
    pub fn effective_grid(&self, lod: u8) -> (u32, u32) {
        let scale = 1u32 << lod;
        (self.tiles_x().div_ceil(scale), self.tiles_y().div_ceil(scale))
    }

    /// Source region for a tile, clipped to the raster.
    pub fn source_region(&self, key: TileKey) -> SourceRegion {
        let span = self.span(key.lod);
        let x = key.tx * span;
        let y = key.ty * span;
        SourceRegion {
            x,
            y,
            w: span.min(self.source_width.saturating_sub(x)),
            h: span.min(self.source_height.saturating_sub(y)),
        }
    }

    /// Output tile dimensions for a (possibly clipped) source region.
    ///
    /// Border tiles shrink in proportion to the part of the span they cover.
    pub fn output_size(&self, lod: u8, region: SourceRegion) -> (u16, u16) {
        let edge = self.tile_edge(lod) as u64;
        let span = self.span(lod) as u64;
        let scaled = |len: u32| -> u16 {
            let out = (len as u64 * edge).div_ceil(span).clamp(1, edge);
            out as u16
        };
        (scaled(region.w), scaled(region.h))
    }

    /// Nominal source pixels per tile sample at `lod`.
    pub fn spacing(&self, lod: u8) -> f64 {
        self.span(lod) as f64 / self.tile_edge(lod) as f64
    }

    /// Tile containing a raster-space position at `lod`, clamped to the grid.
    pub fn tile_at(&self, lod: u8, px: f64, pz: f64) -> TileKey {
        let span = self.span(lod) as f64;
        let (gx, gy) = self.effective_grid(lod);
        let tx = (px / span).floor().clamp(0.0, (gx - 1) as f64) as u32;
        let ty = (pz / span).floor().clamp(0.0, (gy - 1) as f64) as u32;
        TileKey::new(lod, tx, ty)
    }

    /// Whether every level's tile edge fits in the u16 header fields.
    pub fn fits_tile_format(&self) -> bool {
        self.tile_edge(0) <= u16::MAX as u32
    }
}

/// Source-space position of tile sample `i` along one axis.
///
/// Samples are spread so the first and last land on the first and last
/// source pixel of the region.
pub fn sample_position(src: u32, src_len: u32, out: u16, i: u16) -> f64 {
    if out <= 1 || src_len <= 1 {
        return src as f64;
    }
    src as f64 + (i as f64 / (out - 1) as f64) * (src_len - 1) as f64
}

/// Inverse of [`sample_position`]: tile-local coordinate of a source position.
///
/// Not clamped; the tile sampler clamps to its lattice.
pub fn local_position(src: u32, src_len: u32, out: u16, pos: f64) -> f64 {
    if out <= 1 || src_len <= 1 {
        return 0.0;
    }
    (pos - src as f64) * (out - 1) as f64 / (src_len - 1) as f64
}
