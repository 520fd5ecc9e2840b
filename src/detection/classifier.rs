// Shake classification - magnitude versus threshold
//
// The classification itself is pure arithmetic on the supplied floats.
// `ShakeClassifier` only binds the pure functions to the shared sensitivity
// controller so the worker loop reads the live threshold per sample.

use std::sync::Arc;

use crate::detection::ShakeEvent;
use crate::sensitivity::SensitivityController;
use crate::sensor::{SensorKind, SensorSample};

/// Euclidean norm of a three-axis sample.
pub fn magnitude(values: [f32; 3]) -> f32 {
    let [x, y, z] = values;
    (x * x + y * y + z * z).sqrt()
}

/// Strict threshold comparison.
///
/// Every sample is evaluated independently; there is no hysteresis and no
/// cooldown, so a sustained shake keeps producing events for as long as the
/// magnitude stays above the threshold. Non-finite inputs produce a
/// non-finite magnitude and never fire.
pub fn exceeds_threshold(values: [f32; 3], threshold: f32) -> bool {
    magnitude(values) > threshold
}

/// Classifier bound to the live threshold.
pub struct ShakeClassifier {
    sensitivity: Arc<SensitivityController>,
}

impl ShakeClassifier {
    pub fn new(sensitivity: Arc<SensitivityController>) -> Self {
        Self { sensitivity }
    }

    /// Evaluate one accelerometer sample against the current threshold.
    ///
    /// Non-accelerometer samples are never shakes regardless of magnitude.
    pub fn classify(&self, sample: &SensorSample) -> Option<ShakeEvent> {
        if sample.kind != SensorKind::Accelerometer {
            return None;
        }

        let threshold = self.sensitivity.current();
        let magnitude = magnitude(sample.values);
        if magnitude > threshold {
            Some(ShakeEvent {
                magnitude,
                threshold,
                timestamp_ms: sample.timestamp_ms,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;

    fn accel(values: [f32; 3], timestamp_ms: u64) -> SensorSample {
        SensorSample::new(SensorKind::Accelerometer, values, timestamp_ms)
    }

    #[test]
    fn classification_matches_the_norm_comparison() {
        let cases = [
            ([0.0, 0.0, 0.0], 0.0),
            ([1.0, 2.0, 2.0], 2.9),
            ([1.0, 2.0, 2.0], 3.0),
            ([-5.5, 0.25, 10.0], 9.9),
            ([0.1, -0.1, 0.1], 0.05),
            ([12.0, -9.0, 3.5], 15.0),
        ];

        for (values, threshold) in cases {
            assert_eq!(
                exceeds_threshold(values, threshold),
                magnitude(values) > threshold,
                "mismatch for {:?} against {}",
                values,
                threshold
            );
        }
    }

    #[test]
    fn magnitude_is_symmetric_under_sign_flips() {
        let values = [3.0, -4.0, 12.0];
        let flipped = [
            [-3.0, -4.0, 12.0],
            [3.0, 4.0, 12.0],
            [3.0, -4.0, -12.0],
        ];
        for candidate in flipped {
            assert_eq!(magnitude(candidate), magnitude(values));
            assert_eq!(
                exceeds_threshold(candidate, 10.0),
                exceeds_threshold(values, 10.0)
            );
        }
    }

    #[test]
    fn zero_vector_never_fires_for_non_negative_thresholds() {
        for threshold in [0.0, 0.5, 9.9, 100.0] {
            assert!(!exceeds_threshold([0.0, 0.0, 0.0], threshold));
        }
    }

    #[test]
    fn three_four_zero_fires_just_below_its_norm() {
        // |(3, 4, 0)| = 5.0
        assert!(exceeds_threshold([3.0, 4.0, 0.0], 4.9));
    }

    #[test]
    fn comparison_is_strict_at_the_boundary() {
        assert!(!exceeds_threshold([3.0, 4.0, 0.0], 5.0));
    }

    #[test]
    fn non_finite_axes_never_fire() {
        assert!(!exceeds_threshold([f32::NAN, 0.0, 0.0], 1.0));
        assert!(!exceeds_threshold([1.0, f32::NAN, 1.0], 0.0));
    }

    #[test]
    fn classifier_reads_the_live_threshold() {
        let sensitivity = Arc::new(SensitivityController::new(&DetectionConfig::default()));
        let classifier = ShakeClassifier::new(Arc::clone(&sensitivity));
        let sample = accel([3.0, 4.0, 0.0], 7);

        // Default threshold (59.9) is far above |sample| = 5.0.
        assert!(classifier.classify(&sample).is_none());

        sensitivity.set_threshold(4.9).unwrap_err();
        // 4.9 is below the baseline floor, so the threshold is unchanged.
        assert!(classifier.classify(&sample).is_none());

        sensitivity.set_control_input(0);
        // Threshold is now the baseline (9.9); still above 5.0.
        assert!(classifier.classify(&sample).is_none());

        let strong = accel([6.0, 8.0, 0.0], 8);
        let event = classifier.classify(&strong).expect("|10| > 9.9 fires");
        assert_eq!(event.timestamp_ms, 8);
        assert_eq!(event.threshold, 9.9);
        assert!((event.magnitude - 10.0).abs() < 1e-5);
    }

    #[test]
    fn non_accelerometer_kinds_are_ignored() {
        let sensitivity = Arc::new(SensitivityController::new(&DetectionConfig::default()));
        sensitivity.set_control_input(0);
        let classifier = ShakeClassifier::new(sensitivity);

        let gyro = SensorSample::new(SensorKind::Gyroscope, [50.0, 50.0, 50.0], 1);
        assert!(classifier.classify(&gyro).is_none());
    }
}
