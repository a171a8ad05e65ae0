//! Bounded LRU cache of decoded tiles with shared in-flight loads.
//!
//! ## Thread Safety
//!
//! The cache supports concurrent access from multiple threads:
//! - Resident tiles are served after a short critical section that bumps
//!   their recency
//! - Multiple threads requesting the same missing tile coordinate, with only
//!   one reading the file while the others wait for its result
//! - Loads of different tiles run in parallel; no lock is held during I/O

use crate::pyramid::PyramidLayout;
use crate::store::{TileLoader, TileStore};
use crate::{Result, Tile, TileError, TileKey};
use hmtile_metrics::{lod_label, metric_defs};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use tracing::{debug, warn};

/// Default maximum number of decoded tiles to keep.
/// A full 512x512 tile is 512 KiB, so 64 tiles stay around 32 MiB.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// A resident tile plus its last-access marker.
#[derive(Debug)]
struct CacheEntry {
    tile: Arc<Tile>,
    last_access: u64,
}

/// Resident tiles and the recency clock.
#[derive(Debug, Default)]
struct CacheState {
    tiles: HashMap<TileKey, CacheEntry>,
    clock: u64,
}

impl CacheState {
    fn get(&mut self, key: &TileKey) -> Option<Arc<Tile>> {
        self.clock += 1;
        let clock = self.clock;
        self.tiles.get_mut(key).map(|entry| {
            entry.last_access = clock;
            Arc::clone(&entry.tile)
        })
    }

    /// Insert a tile, evicting least-recently-used entries first.
    ///
    /// Returns the number of evicted tiles.
    fn insert(&mut self, key: TileKey, tile: Arc<Tile>, capacity: usize) -> usize {
        self.clock += 1;
        if let Some(entry) = self.tiles.get_mut(&key) {
            entry.last_access = self.clock;
            return 0;
        }

        let mut evicted = 0;
        while self.tiles.len() >= capacity {
            let oldest = self
                .tiles
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(k, _)| *k);
            match oldest {
                Some(oldest) => {
                    self.tiles.remove(&oldest);
                    debug!("Evicted tile {}", oldest);
                    evicted += 1;
                }
                None => break,
            }
        }

        self.tiles.insert(
            key,
            CacheEntry {
                tile,
                last_access: self.clock,
            },
        );
        evicted
    }
}

/// Status of a load in progress.
#[derive(Debug)]
enum LoadStatus {
    /// The loading thread has not finished.
    Loading,
    /// Load finished; errors are carried as text for the waiters.
    Done(std::result::Result<Arc<Tile>, String>),
}

/// Rendezvous for threads waiting on the same tile.
#[derive(Debug)]
struct InFlightLoad {
    status: Mutex<LoadStatus>,
    done: Condvar,
}

impl InFlightLoad {
    fn new() -> Self {
        Self {
            status: Mutex::new(LoadStatus::Loading),
            done: Condvar::new(),
        }
    }

    fn complete(&self, result: std::result::Result<Arc<Tile>, String>) {
        if let Ok(mut status) = self.status.lock() {
            *status = LoadStatus::Done(result);
        }
        self.done.notify_all();
    }

    fn wait(&self, key: TileKey) -> Result<Arc<Tile>> {
        let status = self.status.lock().map_err(|_| TileError::CacheLockPoisoned)?;
        let status = self
            .done
            .wait_while(status, |s| matches!(s, LoadStatus::Loading))
            .map_err(|_| TileError::CacheLockPoisoned)?;
        match &*status {
            LoadStatus::Done(Ok(tile)) => Ok(Arc::clone(tile)),
            LoadStatus::Done(Err(reason)) => Err(TileError::LoadFailed {
                lod: key.lod,
                tx: key.tx,
                ty: key.ty,
                reason: reason.clone(),
            }),
            LoadStatus::Loading => Err(TileError::CacheLockPoisoned),
        }
    }
}

/// Completes an in-flight load even if the loader unwinds, so waiters never
/// block forever.
struct LoadGuard<'a> {
    cache: &'a LodCache,
    key: TileKey,
    slot: Arc<InFlightLoad>,
    finished: bool,
}

impl LoadGuard<'_> {
    fn finish(mut self, result: std::result::Result<Arc<Tile>, String>) {
        self.cache.retire(self.key);
        self.slot.complete(result);
        self.finished = true;
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.cache.retire(self.key);
            self.slot.complete(Err("tile loader panicked".to_string()));
        }
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from resident tiles.
    pub hits: u64,
    /// Requests that found no resident tile.
    pub misses: u64,
    /// Tiles read from the loader.
    pub loads: u64,
    /// Requests that joined another thread's load.
    pub shared_waits: u64,
    /// Tiles evicted under capacity pressure.
    pub evictions: u64,
    /// Tiles currently resident.
    pub resident: usize,
}

impl CacheStats {
    /// Fraction of requests served without a miss.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Outcome of warming a neighborhood.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadStats {
    /// Tiles read during the preload.
    pub loaded: usize,
    /// Tiles that were already resident.
    pub already_cached: usize,
    /// Tiles absent from the index.
    pub missing: usize,
    /// Tiles that failed to load.
    pub failed: usize,
}

/// Bounded cache of decoded tiles keyed by (LOD, tile coordinate).
pub struct LodCache {
    loader: Arc<dyn TileLoader>,
    layout: PyramidLayout,
    capacity: usize,
    state: Mutex<CacheState>,
    in_flight: Mutex<HashMap<TileKey, Arc<InFlightLoad>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    shared_waits: AtomicU64,
    evictions: AtomicU64,
}

impl std::fmt::Debug for LodCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LodCache")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

impl LodCache {
    /// Create a cache in front of an arbitrary loader.
    ///
    /// `layout` is used to address tiles for [`LodCache::preload`]. A capacity
    /// of zero is treated as one.
    pub fn new(loader: Arc<dyn TileLoader>, layout: PyramidLayout, capacity: usize) -> Self {
        Self {
            loader,
            layout,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
            in_flight: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            shared_waits: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Create a cache in front of a [`TileStore`].
    pub fn from_store(store: TileStore, capacity: usize) -> Self {
        let layout = *store.index().layout();
        Self::new(Arc::new(store), layout, capacity)
    }

    /// Maximum number of resident tiles.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return a resident tile or load it.
    ///
    /// Concurrent callers asking for the same missing key share one load and
    /// one decoded result.
    pub fn get_or_load(&self, key: TileKey) -> Result<Arc<Tile>> {
        if let Some(tile) = self.lock_state()?.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(metric_defs::CACHE_HITS.name, &lod_label(key.lod)).increment(1);
            return Ok(tile);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(metric_defs::CACHE_MISSES.name, &lod_label(key.lod)).increment(1);

        let slot = {
            let mut in_flight = self.in_flight.lock().map_err(|_| TileError::CacheLockPoisoned)?;
            if let Some(slot) = in_flight.get(&key) {
                let slot = Arc::clone(slot);
                drop(in_flight);
                self.shared_waits.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(metric_defs::CACHE_SHARED_WAITS.name).increment(1);
                return slot.wait(key);
            }

            // The previous loader may have finished between the miss and here.
            if let Some(tile) = self.lock_state()?.get(&key) {
                return Ok(tile);
            }

            let slot = Arc::new(InFlightLoad::new());
            in_flight.insert(key, Arc::clone(&slot));
            slot
        };

        let guard = LoadGuard {
            cache: self,
            key,
            slot,
            finished: false,
        };

        self.loads.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(metric_defs::CACHE_LOADS.name, &lod_label(key.lod)).increment(1);
        debug!("Loading tile {}", key);

        match self.loader.load_tile(key) {
            Ok(tile) => {
                let tile = Arc::new(tile);
                let evicted = {
                    let mut state = match self.lock_state() {
                        Ok(state) => state,
                        Err(e) => {
                            guard.finish(Err(e.to_string()));
                            return Err(e);
                        }
                    };
                    let evicted = state.insert(key, Arc::clone(&tile), self.capacity);
                    metrics::gauge!(metric_defs::CACHE_RESIDENT_TILES.name).set(state.tiles.len() as f64);
                    evicted
                };
                if evicted > 0 {
                    self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
                    metrics::counter!(metric_defs::CACHE_EVICTIONS.name).increment(evicted as u64);
                }
                guard.finish(Ok(Arc::clone(&tile)));
                Ok(tile)
            }
            Err(e) => {
                guard.finish(Err(e.to_string()));
                Err(e)
            }
        }
    }

    /// Return a resident tile without loading it.
    pub fn get(&self, key: &TileKey) -> Option<Arc<Tile>> {
        self.state.lock().ok().and_then(|mut s| s.get(key))
    }

    /// Whether a tile is resident.
    pub fn contains(&self, key: &TileKey) -> bool {
        self.state
            .lock()
            .map(|s| s.tiles.contains_key(key))
            .unwrap_or(false)
    }

    /// Number of resident tiles.
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.tiles.len()).unwrap_or(0)
    }

    /// Whether no tiles are resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every resident tile. Counters are kept.
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.tiles.clear();
        }
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            shared_waits: self.shared_waits.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            resident: self.len(),
        }
    }

    /// Warm every tile at `lod` overlapping a square neighborhood.
    ///
    /// `center_x`/`center_z` and `radius` are in source-raster pixels. Tiles
    /// missing from the index are counted, not treated as errors. A `lod`
    /// past the coarsest level is clamped to it.
    pub fn preload(&self, center_x: f64, center_z: f64, radius: f64, lod: u8) -> PreloadStats {
        let lod = lod.min(self.layout.lod_levels.saturating_sub(1));
        let radius = radius.max(0.0);
        let first = self.layout.tile_at(lod, center_x - radius, center_z - radius);
        let last = self.layout.tile_at(lod, center_x + radius, center_z + radius);

        let mut stats = PreloadStats::default();
        for ty in first.ty..=last.ty {
            for tx in first.tx..=last.tx {
                let key = TileKey::new(lod, tx, ty);
                if self.contains(&key) {
                    stats.already_cached += 1;
                    continue;
                }
                match self.get_or_load(key) {
                    Ok(_) => stats.loaded += 1,
                    Err(TileError::NotFound { .. }) => stats.missing += 1,
                    Err(e) => {
                        warn!("Preload of tile {} failed: {}", key, e);
                        stats.failed += 1;
                    }
                }
            }
        }

        debug!(
            "Preloaded lod {} around ({:.1}, {:.1}) r={:.1}: {:?}",
            lod, center_x, center_z, radius, stats
        );
        stats
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, CacheState>> {
        self.state.lock().map_err(|_| TileError::CacheLockPoisoned)
    }

    fn retire(&self, key: TileKey) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&key);
        }
    }
}
