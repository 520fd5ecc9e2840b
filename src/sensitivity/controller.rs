// Threshold ownership and control input mapping

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;
use crate::error::{log_sensor_error, SensorError};

/// Linear mapping from a bounded control input onto the threshold scale.
///
/// `threshold = input * scale + baseline`, with the input clamped to
/// `0..=control_max`. The mapping is monotonic non-decreasing, so the
/// resulting threshold always lies within
/// `[baseline, baseline + control_max * scale]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlMapping {
    pub baseline: f32,
    pub scale: f32,
    pub control_max: u32,
}

impl ControlMapping {
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            baseline: config.baseline,
            scale: config.scale,
            control_max: config.control_max,
        }
    }

    /// Map a control position to a threshold, clamping into the valid range.
    pub fn threshold_for(&self, input: u32) -> f32 {
        self.clamp_input(input) as f32 * self.scale + self.baseline
    }

    pub fn clamp_input(&self, input: u32) -> u32 {
        input.min(self.control_max)
    }

    /// Threshold at the top of the control range (least sensitive).
    pub fn max_threshold(&self) -> f32 {
        self.threshold_for(self.control_max)
    }
}

impl Default for ControlMapping {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

/// Owner of the current shake threshold.
///
/// The value is stored as f32 bits in an `AtomicU32` so the per-sample read
/// on the detection worker takes no lock. There is one logical writer (the
/// control surface) and any number of readers; relaxed ordering is enough
/// because each sample only needs some recently written value.
pub struct SensitivityController {
    mapping: ControlMapping,
    threshold_bits: AtomicU32,
    control_input: AtomicU32,
}

impl SensitivityController {
    pub fn new(config: &DetectionConfig) -> Self {
        let mapping = ControlMapping::from_config(config);
        let input = mapping.clamp_input(config.initial_control_input);
        let threshold = mapping.threshold_for(input);
        Self {
            mapping,
            threshold_bits: AtomicU32::new(threshold.to_bits()),
            control_input: AtomicU32::new(input),
        }
    }

    pub fn mapping(&self) -> ControlMapping {
        self.mapping
    }

    /// Current threshold. Called once per classified sample.
    pub fn current(&self) -> f32 {
        f32::from_bits(self.threshold_bits.load(Ordering::Relaxed))
    }

    pub fn control_input(&self) -> u32 {
        self.control_input.load(Ordering::Relaxed)
    }

    /// Apply a control position and return the threshold it mapped to.
    ///
    /// Out-of-range positions clamp to the top of the range rather than
    /// erroring; a bounded control cannot meaningfully overshoot.
    pub fn set_control_input(&self, input: u32) -> f32 {
        let clamped = self.mapping.clamp_input(input);
        if clamped != input {
            log::debug!(
                "[Sensitivity] control input {} clamped to {}",
                input,
                clamped
            );
        }

        let threshold = self.mapping.threshold_for(clamped);
        self.control_input.store(clamped, Ordering::Relaxed);
        self.threshold_bits
            .store(threshold.to_bits(), Ordering::Relaxed);
        log::info!(
            "[Sensitivity] control input {} -> threshold {:.2}",
            clamped,
            threshold
        );
        threshold
    }

    /// Write the threshold directly, bypassing the control mapping.
    ///
    /// Values below the baseline floor or non-finite values are rejected;
    /// the stored threshold is left untouched in that case.
    pub fn set_threshold(&self, value: f32) -> Result<(), SensorError> {
        if !value.is_finite() || value < self.mapping.baseline {
            let err = SensorError::ThresholdInvalid {
                value,
                baseline: self.mapping.baseline,
            };
            log_sensor_error(&err, "set_threshold");
            return Err(err);
        }

        self.threshold_bits.store(value.to_bits(), Ordering::Relaxed);

        // Keep the reported control position coherent with the new value.
        if self.mapping.scale > 0.0 {
            let approx = ((value - self.mapping.baseline) / self.mapping.scale).round();
            let approx = self.mapping.clamp_input(approx.max(0.0) as u32);
            self.control_input.store(approx, Ordering::Relaxed);
        }

        log::info!("[Sensitivity] threshold set directly to {:.2}", value);
        Ok(())
    }

    pub fn snapshot(&self) -> SensitivitySnapshot {
        SensitivitySnapshot {
            threshold: self.current(),
            control_input: self.control_input(),
            baseline: self.mapping.baseline,
            scale: self.mapping.scale,
            control_max: self.mapping.control_max,
        }
    }
}

/// Point-in-time view of the sensitivity state for reports and HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivitySnapshot {
    pub threshold: f32,
    pub control_input: u32,
    pub baseline: f32,
    pub scale: f32,
    pub control_max: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_controller() -> SensitivityController {
        SensitivityController::new(&DetectionConfig::default())
    }

    #[test]
    fn zero_input_maps_to_baseline() {
        let mapping = ControlMapping::default();
        assert_eq!(mapping.threshold_for(0), 9.9);
    }

    #[test]
    fn mapping_is_monotonic_non_decreasing() {
        let mapping = ControlMapping::default();
        let mut previous = mapping.threshold_for(0);
        for input in 1..=mapping.control_max {
            let current = mapping.threshold_for(input);
            assert!(
                current >= previous,
                "threshold decreased at input {}: {} < {}",
                input,
                current,
                previous
            );
            previous = current;
        }
    }

    #[test]
    fn inputs_above_the_range_clamp_to_the_top() {
        let mapping = ControlMapping::default();
        assert_eq!(mapping.threshold_for(100_000), mapping.max_threshold());
        assert_eq!(mapping.clamp_input(101), 100);
    }

    #[test]
    fn initial_threshold_comes_from_the_initial_control_input() {
        let controller = default_controller();
        let expected = controller.mapping().threshold_for(100);
        assert_eq!(controller.current(), expected);
        assert_eq!(controller.control_input(), 100);
        assert!((controller.current() - 59.9).abs() < 1e-3);
    }

    #[test]
    fn set_control_input_updates_the_threshold() {
        let controller = default_controller();
        let applied = controller.set_control_input(0);
        assert_eq!(applied, 9.9);
        assert_eq!(controller.current(), 9.9);
        assert_eq!(controller.control_input(), 0);
    }

    #[test]
    fn set_threshold_rejects_values_below_the_baseline() {
        let controller = default_controller();
        let before = controller.current();

        let err = controller.set_threshold(4.0).unwrap_err();
        assert!(matches!(err, SensorError::ThresholdInvalid { .. }));
        assert_eq!(controller.current(), before);
    }

    #[test]
    fn set_threshold_rejects_non_finite_values() {
        let controller = default_controller();
        assert!(controller.set_threshold(f32::NAN).is_err());
        assert!(controller.set_threshold(f32::INFINITY).is_err());
    }

    #[test]
    fn set_threshold_accepts_values_at_or_above_the_baseline() {
        let controller = default_controller();
        controller.set_threshold(9.9).unwrap();
        assert_eq!(controller.current(), 9.9);

        controller.set_threshold(12.4).unwrap();
        assert_eq!(controller.current(), 12.4);
        assert_eq!(controller.control_input(), 5);
    }

    #[test]
    fn latest_write_wins() {
        let controller = default_controller();
        controller.set_control_input(10);
        controller.set_threshold(30.0).unwrap();
        controller.set_control_input(4);
        let expected = controller.mapping().threshold_for(4);
        assert_eq!(controller.current(), expected);
    }

    #[test]
    fn snapshot_reflects_current_state() {
        let controller = default_controller();
        controller.set_control_input(20);
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.control_input, 20);
        assert_eq!(snapshot.baseline, 9.9);
        assert_eq!(snapshot.control_max, 100);
        assert_eq!(snapshot.threshold, controller.current());
    }
}
