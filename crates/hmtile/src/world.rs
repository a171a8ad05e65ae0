//! World-space coordinates and their mapping onto the source raster.

use serde::{Deserialize, Serialize};

/// Affine mapping from world (x, z) to source-raster pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldFrame {
    /// World x of raster column 0.
    pub origin_x: f64,
    /// World z of raster row 0.
    pub origin_z: f64,
    /// World units per source pixel.
    pub units_per_pixel: f64,
}

impl Default for WorldFrame {
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_z: 0.0,
            units_per_pixel: 1.0,
        }
    }
}

impl WorldFrame {
    /// World position to raster pixel position.
    pub fn to_raster(&self, world_x: f64, world_z: f64) -> (f64, f64) {
        (
            (world_x - self.origin_x) / self.units_per_pixel,
            (world_z - self.origin_z) / self.units_per_pixel,
        )
    }

    /// Raster pixel position to world position.
    pub fn to_world(&self, px: f64, pz: f64) -> (f64, f64) {
        (
            px * self.units_per_pixel + self.origin_x,
            pz * self.units_per_pixel + self.origin_z,
        )
    }
}

/// Axis-aligned world-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldRect {
    /// Lower x bound.
    pub min_x: f64,
    /// Lower z bound.
    pub min_z: f64,
    /// Upper x bound.
    pub max_x: f64,
    /// Upper z bound.
    pub max_z: f64,
}

impl WorldRect {
    /// Create a rectangle from two corners in any order.
    pub fn new(x0: f64, z0: f64, x1: f64, z1: f64) -> Self {
        Self {
            min_x: x0.min(x1),
            min_z: z0.min(z1),
            max_x: x0.max(x1),
            max_z: z0.max(z1),
        }
    }

    /// Rectangle centered on a point.
    pub fn around(x: f64, z: f64, half_extent: f64) -> Self {
        Self::new(x - half_extent, z - half_extent, x + half_extent, z + half_extent)
    }

    /// Width along x.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Depth along z.
    pub fn depth(&self) -> f64 {
        self.max_z - self.min_z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let frame = WorldFrame {
            origin_x: -1000.0,
            origin_z: 250.0,
            units_per_pixel: 4.0,
        };
        assert_eq!(frame.to_raster(-1000.0, 250.0), (0.0, 0.0));
        assert_eq!(frame.to_raster(-996.0, 258.0), (1.0, 2.0));
        assert_eq!(frame.to_world(1.0, 2.0), (-996.0, 258.0));
    }

    #[test]
    fn test_rect_normalizes_corners() {
        let rect = WorldRect::new(10.0, 5.0, -2.0, 7.0);
        assert_eq!(rect, WorldRect { min_x: -2.0, min_z: 5.0, max_x: 10.0, max_z: 7.0 });
        assert_eq!(rect.width(), 12.0);
        assert_eq!(rect.depth(), 2.0);
    }
}
