//! Mapping between raw raster values, 16-bit samples and meters.

use serde::{Deserialize, Serialize};

/// Default depth assigned to the lowest raw value (Challenger Deep).
pub const DEFAULT_LOW_ANCHOR_METERS: f64 = -10994.0;

/// Default height assigned to the highest raw value (Everest).
pub const DEFAULT_HIGH_ANCHOR_METERS: f64 = 8849.0;

/// Raw value extremes plus the meter anchors they map to.
///
/// Tiled and raw-raster queries both go through [`Calibration::normalize`]
/// and [`Calibration::to_meters`], so the two paths agree to within one
/// quantization step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Lowest raw value observed in the source.
    pub min_value: f64,
    /// Highest raw value observed in the source.
    pub max_value: f64,
    /// Meters at normalized 0.
    pub low_anchor_meters: f64,
    /// Meters at normalized 1.
    pub high_anchor_meters: f64,
}

impl Calibration {
    /// Create a calibration from an observed range and anchors.
    pub fn new(min_value: f64, max_value: f64, low_anchor_meters: f64, high_anchor_meters: f64) -> Self {
        Self {
            min_value,
            max_value,
            low_anchor_meters,
            high_anchor_meters,
        }
    }

    /// Create a calibration with the default anchors.
    pub fn with_default_anchors(min_value: f64, max_value: f64) -> Self {
        Self::new(
            min_value,
            max_value,
            DEFAULT_LOW_ANCHOR_METERS,
            DEFAULT_HIGH_ANCHOR_METERS,
        )
    }

    /// Divisor for normalization; a degenerate range falls back to 1.
    pub fn value_range(&self) -> f64 {
        if self.max_value > self.min_value {
            self.max_value - self.min_value
        } else {
            1.0
        }
    }

    /// Raw value to `[0, 1]` (not clamped).
    pub fn normalize(&self, raw: f64) -> f64 {
        (raw - self.min_value) / self.value_range()
    }

    /// Raw value to `[0, 1]`, clamped like a stored sample.
    ///
    /// Pixels outside the estimated range saturate at the anchors.
    pub fn normalize_clamped(&self, raw: f64) -> f64 {
        self.normalize(raw).clamp(0.0, 1.0)
    }

    /// Raw value to a 16-bit sample, rounded and clamped.
    pub fn quantize(&self, raw: f64) -> u16 {
        (self.normalize(raw) * u16::MAX as f64)
            .round()
            .clamp(0.0, u16::MAX as f64) as u16
    }

    /// Normalized value to meters.
    pub fn to_meters(&self, normalized: f64) -> f64 {
        normalized * (self.high_anchor_meters - self.low_anchor_meters) + self.low_anchor_meters
    }

    /// Stored 16-bit sample (possibly interpolated) to meters.
    pub fn sample_to_meters(&self, sample: f64) -> f64 {
        self.to_meters(sample / u16::MAX as f64)
    }

    /// Raw raster value to meters, bypassing quantization but not the clamp.
    pub fn raw_to_meters(&self, raw: f64) -> f64 {
        self.to_meters(self.normalize_clamped(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_midpoint_elevation() {
        let cal = Calibration::new(0.0, 1.0, -10994.0, 8849.0);
        assert_relative_eq!(cal.raw_to_meters(0.5), -1072.5);
    }

    #[test]
    fn test_extremes_hit_anchors() {
        let cal = Calibration::new(0.2, 0.8, -500.0, 1500.0);
        assert_eq!(cal.quantize(0.2), 0);
        assert_eq!(cal.quantize(0.8), u16::MAX);
        assert_relative_eq!(cal.sample_to_meters(0.0), -500.0);
        assert_relative_eq!(cal.sample_to_meters(u16::MAX as f64), 1500.0);
    }

    #[test]
    fn test_quantize_clamps_outside_estimated_range() {
        let cal = Calibration::with_default_anchors(0.25, 0.75);
        assert_eq!(cal.quantize(0.0), 0);
        assert_eq!(cal.quantize(1.0), u16::MAX);
    }

    #[test]
    fn test_raw_to_meters_saturates_at_anchors() {
        let cal = Calibration::new(0.25, 0.75, -500.0, 1500.0);
        assert_relative_eq!(cal.raw_to_meters(1.0), 1500.0);
        assert_relative_eq!(cal.raw_to_meters(0.0), -500.0);
        assert_relative_eq!(cal.normalize_clamped(0.5), 0.5);
    }

    #[test]
    fn test_degenerate_range_uses_unit_divisor() {
        let cal = Calibration::with_default_anchors(0.5, 0.5);
        assert_relative_eq!(cal.value_range(), 1.0);
        assert_relative_eq!(cal.normalize(0.75), 0.25);
    }
}
