//! Stateless tile loader backed by the index.

use crate::{Result, Tile, TileError, TileIndex, TileKey};
use std::sync::Arc;

/// Source of decoded tiles for the cache.
///
/// [`TileStore`] is the production implementation; the seam exists so the
/// cache can be driven by other loaders.
pub trait TileLoader: Send + Sync {
    /// Read and decode one tile.
    fn load_tile(&self, key: TileKey) -> Result<Tile>;
}

/// Reads tile files listed in a [`TileIndex`]. Never writes.
#[derive(Debug, Clone)]
pub struct TileStore {
    index: Arc<TileIndex>,
}

impl TileStore {
    /// Create a store over a shared index.
    pub fn new(index: Arc<TileIndex>) -> Self {
        Self { index }
    }

    /// The index this store reads from.
    pub fn index(&self) -> &Arc<TileIndex> {
        &self.index
    }
}

impl TileLoader for TileStore {
    fn load_tile(&self, key: TileKey) -> Result<Tile> {
        let entry = self.index.entry(&key).ok_or(TileError::NotFound {
            lod: key.lod,
            tx: key.tx,
            ty: key.ty,
        })?;

        let tile = Tile::read_file(&entry.path)?;

        if (tile.width(), tile.height()) != (entry.width, entry.height) {
            return Err(TileError::CorruptTile {
                path: entry.path.clone(),
                reason: format!(
                    "file holds {}x{} but index declares {}x{}",
                    tile.width(),
                    tile.height(),
                    entry.width,
                    entry.height
                ),
            });
        }

        Ok(tile)
    }
}
