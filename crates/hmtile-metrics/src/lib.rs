//! Metrics infrastructure for the heightmap tile pyramid.
//!
//! This crate describes all metrics emitted by the tile builder, the LOD cache
//! and the elevation provider. It re-exports the `metrics` crate for convenience
//! and defines every metric as a structured [`Metric`] constant to avoid typos
//! and keep name, unit and label keys in one place.
//!
//! No recorder is installed here; a host application that wants the numbers
//! installs one (for example a Prometheus exporter) and calls
//! [`describe_metrics`] once at startup.
//!
//! # Example
//!
//! ```rust,ignore
//! use hmtile_metrics::{metric_defs, describe_metrics};
//!
//! describe_metrics();
//! metrics::counter!(metric_defs::CACHE_HITS.name).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// # Example
///
/// ```rust
/// use hmtile_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const TILES_READ: Metric = Metric::counter("hmtile.example.tiles_read")
///     .with_description("Tiles read from disk")
///     .with_unit(Unit::Count)
///     .with_labels(&["lod"]);
///
/// assert_eq!(TILES_READ.name, "hmtile.example.tiles_read");
/// assert_eq!(TILES_READ.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "hmtile.cache.hits").
    pub name: &'static str,
    /// The kind of metric (counter, gauge, histogram).
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Gauge,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Histogram,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    ///
    /// This should be called once at startup for each metric.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the tile pyramid.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // LOD Cache
    // ========================================================================

    /// Lookups served from resident tiles.
    pub const CACHE_HITS: Metric = Metric::counter("hmtile.cache.hits")
        .with_description("Tile lookups served from the cache")
        .with_unit(Unit::Count)
        .with_labels(&["lod"]);

    /// Lookups that found no resident tile.
    pub const CACHE_MISSES: Metric = Metric::counter("hmtile.cache.misses")
        .with_description("Tile lookups that missed the cache")
        .with_unit(Unit::Count)
        .with_labels(&["lod"]);

    /// Tiles read and decoded from disk.
    pub const CACHE_LOADS: Metric = Metric::counter("hmtile.cache.loads")
        .with_description("Tiles read and decoded from disk")
        .with_unit(Unit::Count)
        .with_labels(&["lod"]);

    /// Requests that waited on another thread's in-flight load.
    pub const CACHE_SHARED_WAITS: Metric = Metric::counter("hmtile.cache.shared_waits")
        .with_description("Requests that joined an in-flight load of the same tile")
        .with_unit(Unit::Count);

    /// Tiles dropped under capacity pressure.
    pub const CACHE_EVICTIONS: Metric = Metric::counter("hmtile.cache.evictions")
        .with_description("Tiles evicted from the cache")
        .with_unit(Unit::Count);

    /// Number of decoded tiles currently held.
    pub const CACHE_RESIDENT_TILES: Metric = Metric::gauge("hmtile.cache.resident_tiles")
        .with_description("Decoded tiles currently resident in the cache")
        .with_unit(Unit::Count);

    // ========================================================================
    // Builder
    // ========================================================================

    /// Tile files written by the pyramid builder.
    pub const BUILD_TILES_WRITTEN: Metric = Metric::counter("hmtile.build.tiles_written")
        .with_description("Binary tile files written")
        .with_unit(Unit::Count)
        .with_labels(&["lod"]);

    /// Bytes of tile payload written by the pyramid builder.
    pub const BUILD_TILE_BYTES: Metric = Metric::counter("hmtile.build.tile_bytes")
        .with_description("Bytes of binary tile data written")
        .with_unit(Unit::Bytes);

    /// Wall-clock time to build one LOD level.
    pub const BUILD_LOD_TIME: Metric = Metric::histogram("hmtile.build.lod_time_ms")
        .with_description("Wall-clock time to generate one LOD level in milliseconds")
        .with_unit(Unit::Milliseconds)
        .with_labels(&["lod"]);

    // ========================================================================
    // Provider
    // ========================================================================

    /// Queries that had to leave the finest tile path.
    ///
    /// Labels: reason (`not_found`, `corrupt`, `load_failed`, `io`, `other`)
    pub const PROVIDER_FALLBACKS: Metric = Metric::counter("hmtile.provider.fallbacks")
        .with_description("Elevation queries that fell back to a coarser LOD")
        .with_unit(Unit::Count)
        .with_labels(&["reason"]);

    /// Queries that could not be answered at all.
    pub const PROVIDER_UNAVAILABLE: Metric = Metric::counter("hmtile.provider.unavailable")
        .with_description("Elevation queries with no tile able to answer")
        .with_unit(Unit::Count);

    pub const ALL: &[&Metric] = &[
        &CACHE_HITS,
        &CACHE_MISSES,
        &CACHE_LOADS,
        &CACHE_SHARED_WAITS,
        &CACHE_EVICTIONS,
        &CACHE_RESIDENT_TILES,
        &BUILD_TILES_WRITTEN,
        &BUILD_TILE_BYTES,
        &BUILD_LOD_TIME,
        &PROVIDER_FALLBACKS,
        &PROVIDER_UNAVAILABLE,
    ];
}

/// Registers descriptions for every metric in [`metric_defs::ALL`].
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

/// Label pair for LOD-scoped metrics.
pub fn lod_label(lod: u8) -> [(&'static str, String); 1] {
    [("lod", lod.to_string())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_unique() {
        let mut names: Vec<_> = metric_defs::ALL.iter().map(|m| m.name).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn test_all_metrics_are_namespaced() {
        for metric in metric_defs::ALL {
            assert!(metric.name.starts_with("hmtile."), "{}", metric.name);
            assert!(!metric.description.is_empty(), "{} has no description", metric.name);
        }
    }

    #[test]
    fn test_metric_builder() {
        const M: Metric = Metric::gauge("hmtile.test.gauge")
            .with_description("test")
            .with_unit(Unit::Count)
            .with_labels(&["lod"]);
        assert_eq!(M.kind, MetricKind::Gauge);
        assert_eq!(M.unit, Some(Unit::Count));
        assert_eq!(M.labels, &["lod"]);
        assert_eq!(M.kind.to_string(), "gauge");
    }

    #[test]
    fn test_describe_without_recorder() {
        // No recorder installed: describing must be a no-op, not a panic.
        describe_metrics();
    }

    #[test]
    fn test_lod_label() {
        assert_eq!(lod_label(3), [("lod", "3".to_string())]);
    }
}
