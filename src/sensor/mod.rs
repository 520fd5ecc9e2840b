// Sensor module - sample types shared across the ingestion pipeline
//
// Samples are produced by a backend (simulated, stub, or the Android push
// bridge), travel through the lock-free ring buffer, and fan out to
// subscribers via the readings broadcast channel.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sensor kinds understood by the pipeline.
///
/// Motion kinds (accelerometer, gyroscope, magnetic field, gravity) are
/// triaxial; proximity and light carry a single value in the first slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
    MagneticField,
    Proximity,
    Light,
    Gravity,
}

impl SensorKind {
    /// All kinds the pipeline can carry, in registration order.
    pub const ALL: [SensorKind; 6] = [
        SensorKind::Accelerometer,
        SensorKind::Gyroscope,
        SensorKind::MagneticField,
        SensorKind::Proximity,
        SensorKind::Light,
        SensorKind::Gravity,
    ];

    /// Whether samples of this kind carry three meaningful axes.
    pub fn is_triaxial(self) -> bool {
        !matches!(self, SensorKind::Proximity | SensorKind::Light)
    }

    /// Stable lowercase label, identical to the serde tag.
    pub fn label(self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::Gyroscope => "gyroscope",
            SensorKind::MagneticField => "magnetic_field",
            SensorKind::Proximity => "proximity",
            SensorKind::Light => "light",
            SensorKind::Gravity => "gravity",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One sensor reading at one point in time.
///
/// Values are raw floats as delivered by the source; the pipeline enforces
/// no bounds. `timestamp_ms` is milliseconds since monitoring start, as
/// assigned by the source's time source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub kind: SensorKind,
    pub values: [f32; 3],
    pub timestamp_ms: u64,
}

impl SensorSample {
    pub fn new(kind: SensorKind, values: [f32; 3], timestamp_ms: u64) -> Self {
        Self {
            kind,
            values,
            timestamp_ms,
        }
    }

    /// Build a single-valued sample (proximity, light); trailing axes zero.
    pub fn single(kind: SensorKind, value: f32, timestamp_ms: u64) -> Self {
        Self::new(kind, [value, 0.0, 0.0], timestamp_ms)
    }

    pub fn x(&self) -> f32 {
        self.values[0]
    }

    pub fn y(&self) -> f32 {
        self.values[1]
    }

    pub fn z(&self) -> f32 {
        self.values[2]
    }
}

impl fmt::Display for SensorSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_triaxial() {
            write!(
                f,
                "{} X: {:.3} Y: {:.3} Z: {:.3}",
                self.kind,
                self.x(),
                self.y(),
                self.z()
            )
        } else {
            write!(f, "{} value: {:.3}", self.kind, self.x())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_are_snake_case() {
        let json = serde_json::to_string(&SensorKind::MagneticField).unwrap();
        assert_eq!(json, "\"magnetic_field\"");

        let parsed: SensorKind = serde_json::from_str("\"accelerometer\"").unwrap();
        assert_eq!(parsed, SensorKind::Accelerometer);
    }

    #[test]
    fn all_covers_every_kind_once() {
        let mut labels: Vec<&str> = SensorKind::ALL.iter().map(|k| k.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), 6);
    }

    #[test]
    fn single_valued_sample_zero_fills_trailing_axes() {
        let sample = SensorSample::single(SensorKind::Light, 321.5, 10);
        assert_eq!(sample.values, [321.5, 0.0, 0.0]);
        assert!(!sample.kind.is_triaxial());
    }

    #[test]
    fn sample_round_trips_through_json() {
        let sample = SensorSample::new(SensorKind::Gyroscope, [0.1, -0.2, 0.3], 42);
        let json = serde_json::to_string(&sample).unwrap();
        let back: SensorSample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn display_formats_by_axis_count() {
        let tri = SensorSample::new(SensorKind::Accelerometer, [1.0, 2.0, 3.0], 0);
        assert_eq!(tri.to_string(), "accelerometer X: 1.000 Y: 2.000 Z: 3.000");

        let mono = SensorSample::single(SensorKind::Proximity, 5.0, 0);
        assert_eq!(mono.to_string(), "proximity value: 5.000");
    }
}
