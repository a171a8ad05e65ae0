//! Full-resolution source raster.
//!
//! The raster only lives for the duration of a build, or as the raw fallback
//! of a provider running without tiles. Decoding of the original image is
//! delegated to the `image` crate; every pixel is reduced to its luma and
//! normalized to `[0, 1]`.

use crate::{Calibration, Result, TileError};
use std::path::Path;

/// A width x height grid of normalized scalar elevation values.
#[derive(Debug, Clone)]
pub struct SourceRaster {
    width: u32,
    height: u32,
    /// Row-major, top to bottom.
    data: Vec<f32>,
}

impl SourceRaster {
    /// Decode a raster from an image file (PNG or TIFF).
    ///
    /// Color images are converted to 16-bit luma first.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TileError::Load {
                path: path.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }

        let image = image::open(path).map_err(|e| TileError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let luma = image.into_luma16();
        let (width, height) = luma.dimensions();
        let data = luma
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / u16::MAX as f32)
            .collect();

        Self::from_values(width, height, data)
    }

    /// Wrap an existing row-major buffer.
    pub fn from_values(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TileError::InvalidConfig(format!(
                "raster must be non-empty, got {}x{}",
                width, height
            )));
        }
        if data.len() != width as usize * height as usize {
            return Err(TileError::InvalidConfig(format!(
                "raster buffer holds {} values, expected {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a raster by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Result<Self> {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::from_values(width, height, data)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw value at an integer pixel, clamped to the raster edge.
    pub fn value(&self, x: u32, y: u32) -> f32 {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Bilinear sample at a fractional pixel position.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> f64 {
        bilinear(self.width, self.height, x, y, |px, py| self.value(px, py) as f64)
    }

    /// Bilinear blend of normalized values at a fractional pixel position.
    ///
    /// Each pixel is normalized and clamped before blending, matching a
    /// query against LOD 0 tiles whose samples sit on source pixels.
    pub fn sample_normalized(&self, x: f64, y: f64, calibration: &Calibration) -> f64 {
        bilinear(self.width, self.height, x, y, |px, py| {
            calibration.normalize_clamped(self.value(px, py) as f64)
        })
    }

    /// Estimate the raw value range by sparse sampling.
    ///
    /// The stride is chosen so roughly `target_samples` samples span the
    /// width; the same stride is used vertically. This is an approximation,
    /// not an exhaustive scan.
    pub fn estimate_range(&self, target_samples: u32) -> (f32, f32) {
        let stride = (self.width / target_samples.max(1)).max(1) as usize;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;

        for y in (0..self.height).step_by(stride) {
            for x in (0..self.width).step_by(stride) {
                let v = self.value(x, y);
                min = min.min(v);
                max = max.max(v);
            }
        }

        (min, max)
    }
}

/// Bilinear interpolation over a `width x height` lattice.
///
/// Positions are clamped to the lattice, so samples on or past the last row or
/// column return the edge value.
pub(crate) fn bilinear(
    width: u32,
    height: u32,
    x: f64,
    y: f64,
    fetch: impl Fn(u32, u32) -> f64,
) -> f64 {
    let x = x.clamp(0.0, (width - 1) as f64);
    let y = y.clamp(0.0, (height - 1) as f64);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let v00 = fetch(x0, y0);
    let v10 = fetch(x1, y0);
    let v01 = fetch(x0, y1);
    let v11 = fetch(x1, y1);

    v00 * (1.0 - fx) * (1.0 - fy) + v10 * fx * (1.0 - fy) + v01 * (1.0 - fx) * fy + v11 * fx * fy
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_values_rejects_wrong_length() {
        assert!(SourceRaster::from_values(4, 4, vec![0.0; 15]).is_err());
        assert!(SourceRaster::from_values(0, 4, vec![]).is_err());
    }

    #[test]
    fn test_bilinear_midpoint() {
        let raster = SourceRaster::from_values(2, 2, vec![0.0, 1.0, 1.0, 2.0]).unwrap();
        assert_relative_eq!(raster.sample_bilinear(0.5, 0.5), 1.0);
        assert_relative_eq!(raster.sample_bilinear(1.0, 0.0), 1.0);
        // Past the edge clamps.
        assert_relative_eq!(raster.sample_bilinear(5.0, 5.0), 2.0);
    }

    #[test]
    fn test_sample_normalized_clamps_each_pixel() {
        let raster = SourceRaster::from_values(2, 1, vec![0.0, 3.0]).unwrap();
        let cal = Calibration::with_default_anchors(0.0, 1.0);
        // The right pixel saturates at 1 before blending.
        assert_relative_eq!(raster.sample_normalized(0.5, 0.0, &cal), 0.5);
        assert_relative_eq!(raster.sample_normalized(1.0, 0.0, &cal), 1.0);
    }

    #[test]
    fn test_estimate_range_on_gradient() {
        let raster = SourceRaster::from_fn(100, 10, |x, _| x as f32 / 99.0).unwrap();
        let (min, max) = raster.estimate_range(2048);
        assert_relative_eq!(min, 0.0);
        assert_relative_eq!(max, 1.0);
    }

    #[test]
    fn test_estimate_range_is_sparse() {
        // With a stride of 2 the odd column holding the spike is never visited.
        let raster = SourceRaster::from_fn(8, 1, |x, _| if x == 3 { 9.0 } else { 0.5 }).unwrap();
        let (min, max) = raster.estimate_range(4);
        assert_relative_eq!(min, 0.5);
        assert_relative_eq!(max, 0.5);
    }

    #[test]
    fn test_open_missing_file() {
        let err = SourceRaster::open("does/not/exist.png").unwrap_err();
        assert!(matches!(err, TileError::Load { .. }));
    }
}
