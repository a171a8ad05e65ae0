//! Decoded tiles and the binary tile file format.
//!
//! A tile file is a 4-byte header followed by the samples:
//!
//! ```text
//! [0..2]  width   u16 little-endian
//! [2..4]  height  u16 little-endian
//! [4..]   width * height samples, u16 little-endian, row-major,
//!         top-to-bottom, left-to-right
//! ```

use crate::raster::bilinear;
use crate::{Result, TileError};
use std::fmt;
use std::fs;
use std::path::Path;

/// Size of the tile file header in bytes.
pub const TILE_HEADER_LEN: usize = 4;

/// Address of a tile within the pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    /// Level of detail, 0 is finest.
    pub lod: u8,
    /// Tile column.
    pub tx: u32,
    /// Tile row.
    pub ty: u32,
}

impl TileKey {
    /// Create a new tile key.
    pub const fn new(lod: u8, tx: u32, ty: u32) -> Self {
        Self { lod, tx, ty }
    }

    /// Key string used in index documents and file names, e.g. `"3_7"`.
    pub fn grid_key(&self) -> String {
        format!("{}_{}", self.tx, self.ty)
    }

    /// Parse a `"<tx>_<ty>"` key string.
    pub fn parse_grid_key(lod: u8, key: &str) -> Option<Self> {
        let (tx, ty) = key.split_once('_')?;
        Some(Self {
            lod,
            tx: tx.parse().ok()?,
            ty: ty.parse().ok()?,
        })
    }

    /// File name relative to the pyramid root, e.g. `lod1/tile_3_7.bin`.
    pub fn lod_file_name(&self) -> String {
        format!("lod{}/tile_{}.bin", self.lod, self.grid_key())
    }

    /// Legacy flat file name, e.g. `tile_3_7.bin`.
    pub fn flat_file_name(&self) -> String {
        format!("tile_{}.bin", self.grid_key())
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lod{}/{}_{}", self.lod, self.tx, self.ty)
    }
}

/// An immutable grid of normalized 16-bit elevation samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    width: u16,
    height: u16,
    samples: Vec<u16>,
}

impl Tile {
    /// Create a tile from row-major samples.
    pub fn new(width: u16, height: u16, samples: Vec<u16>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TileError::InvalidConfig(format!(
                "tile dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        if samples.len() != width as usize * height as usize {
            return Err(TileError::InvalidConfig(format!(
                "tile holds {} samples, expected {}x{}",
                samples.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Width in samples.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in samples.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Row-major samples.
    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    /// Sample at a tile-local integer position.
    pub fn sample(&self, x: u16, y: u16) -> u16 {
        self.samples[y as usize * self.width as usize + x as usize]
    }

    /// Bilinear sample at a fractional tile-local position, clamped to the
    /// tile's lattice.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> f64 {
        bilinear(self.width as u32, self.height as u32, x, y, |px, py| {
            self.sample(px as u16, py as u16) as f64
        })
    }

    /// Length of the encoded file for the given dimensions.
    pub fn encoded_len(width: u16, height: u16) -> usize {
        TILE_HEADER_LEN + width as usize * height as usize * 2
    }

    /// Encode into the binary tile format.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::encoded_len(self.width, self.height));
        bytes.extend_from_slice(&self.width.to_le_bytes());
        bytes.extend_from_slice(&self.height.to_le_bytes());
        for sample in &self.samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }

    /// Decode from the binary tile format.
    ///
    /// `path` is only used for error reporting.
    pub fn decode(bytes: &[u8], path: &Path) -> Result<Self> {
        if bytes.len() < TILE_HEADER_LEN {
            return Err(TileError::CorruptTile {
                path: path.to_path_buf(),
                reason: format!("{} bytes is shorter than the header", bytes.len()),
            });
        }

        let width = u16::from_le_bytes([bytes[0], bytes[1]]);
        let height = u16::from_le_bytes([bytes[2], bytes[3]]);
        let expected = Self::encoded_len(width, height);
        if bytes.len() != expected {
            return Err(TileError::CorruptTile {
                path: path.to_path_buf(),
                reason: format!(
                    "header declares {}x{} ({} bytes) but file has {} bytes",
                    width,
                    height,
                    expected,
                    bytes.len()
                ),
            });
        }
        if width == 0 || height == 0 {
            return Err(TileError::CorruptTile {
                path: path.to_path_buf(),
                reason: format!("empty tile {}x{}", width, height),
            });
        }

        let samples = bytes[TILE_HEADER_LEN..]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();

        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Read and decode a tile file.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Self::decode(&bytes, path)
    }

    /// Encode and write a tile file, returning the number of bytes written.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let bytes = self.encode();
        fs::write(path, &bytes)?;
        Ok(bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_header_layout() {
        let tile = Tile::new(2, 1, vec![0x0102, 0xFFFE]).unwrap();
        assert_eq!(tile.encode(), vec![2, 0, 1, 0, 0x02, 0x01, 0xFE, 0xFF]);
    }

    #[test]
    fn test_decode_rejects_size_mismatch() {
        let mut bytes = Tile::new(3, 3, vec![7; 9]).unwrap().encode();
        bytes.pop();
        let err = Tile::decode(&bytes, Path::new("t.bin")).unwrap_err();
        assert!(matches!(err, TileError::CorruptTile { .. }));

        let err = Tile::decode(&[1, 0], Path::new("t.bin")).unwrap_err();
        assert!(matches!(err, TileError::CorruptTile { .. }));
    }

    #[test]
    fn test_decode_reads_samples() {
        let tile = Tile::new(2, 2, vec![1, 2, 3, 65535]).unwrap();
        let decoded = Tile::decode(&tile.encode(), Path::new("t.bin")).unwrap();
        assert_eq!(decoded.sample(1, 1), 65535);
        assert_eq!(decoded.sample(0, 1), 3);
    }

    #[test]
    fn test_bilinear_clamps_to_lattice() {
        let tile = Tile::new(2, 1, vec![0, 100]).unwrap();
        assert_relative_eq!(tile.sample_bilinear(0.25, 0.0), 25.0);
        assert_relative_eq!(tile.sample_bilinear(3.0, 2.0), 100.0);
        assert_relative_eq!(tile.sample_bilinear(-1.0, 0.0), 0.0);
    }

    #[test]
    fn test_grid_key_roundtrip() {
        let key = TileKey::new(2, 13, 4);
        assert_eq!(key.grid_key(), "13_4");
        assert_eq!(TileKey::parse_grid_key(2, "13_4"), Some(key));
        assert_eq!(TileKey::parse_grid_key(2, "13-4"), None);
        assert_eq!(key.lod_file_name(), "lod2/tile_13_4.bin");
        assert_eq!(key.flat_file_name(), "tile_13_4.bin");
    }
}
