// Detection module - shake detection over the live sample stream
//
// This module owns the consumer side of the sensor ring buffer. A dedicated
// worker thread pops samples in arrival order, fans every sample out to the
// readings broadcast channel, classifies accelerometer samples against the
// live threshold, and on a hit emits a ShakeEvent and triggers the cue.
//
// Architecture:
// - DetectionWorker: main loop consuming from the SPSC queue
// - Pipeline: SensorSample -> readings broadcast -> ShakeClassifier -> ShakeEvent
// - Output: ShakeEvent sent via tokio broadcast to subscribers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rtrb::{Consumer, PopError};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::managers::cue_manager::CueManager;
use crate::sensitivity::SensitivityController;
use crate::sensor::SensorSample;
use crate::telemetry;

pub mod classifier;

use classifier::ShakeClassifier;

/// How many samples pass between queue occupancy reports.
const OCCUPANCY_REPORT_INTERVAL: u64 = 64;

/// Shake detection result.
///
/// Emitted once per sample whose magnitude strictly exceeds the threshold
/// that was current at evaluation time. Not persisted anywhere; subscribers
/// see it live or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShakeEvent {
    /// Euclidean norm of the accelerometer sample
    pub magnitude: f32,
    /// Threshold the magnitude was compared against
    pub threshold: f32,
    /// Timestamp of the originating sample, ms since monitoring start
    pub timestamp_ms: u64,
}

struct DetectionWorker {
    consumer: Consumer<SensorSample>,
    classifier: ShakeClassifier,
    readings_tx: broadcast::Sender<SensorSample>,
    shake_tx: broadcast::Sender<ShakeEvent>,
    cue: Arc<CueManager>,
    shutdown: Arc<AtomicBool>,
    queue_capacity: usize,
    samples_processed: u64,
}

impl DetectionWorker {
    fn new(
        consumer: Consumer<SensorSample>,
        sensitivity: Arc<SensitivityController>,
        readings_tx: broadcast::Sender<SensorSample>,
        shake_tx: broadcast::Sender<ShakeEvent>,
        cue: Arc<CueManager>,
        shutdown: Arc<AtomicBool>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            consumer,
            classifier: ShakeClassifier::new(sensitivity),
            readings_tx,
            shake_tx,
            cue,
            shutdown,
            queue_capacity,
            samples_processed: 0,
        }
    }

    fn run(mut self) {
        tracing::info!("[DetectionWorker] Starting detection loop");

        loop {
            let sample = match self.consumer.pop() {
                Ok(sample) => sample,
                Err(PopError::Empty) => {
                    // Check shutdown only when the queue is drained so no
                    // delivered sample is ever lost.
                    if self.shutdown.load(Ordering::SeqCst) {
                        tracing::info!(
                            "[DetectionWorker] Shutdown flag set and queue empty, exiting"
                        );
                        break;
                    }
                    thread::sleep(Duration::from_millis(1));
                    continue;
                }
            };

            let started = Instant::now();
            self.samples_processed += 1;
            log::trace!("[DetectionWorker] {}", sample);

            telemetry::hub().record_sample();
            let _ = self.readings_tx.send(sample);

            if let Some(event) = self.classifier.classify(&sample) {
                log::info!(
                    "[DetectionWorker] Shake detected: magnitude {:.2} > threshold {:.2} at {} ms",
                    event.magnitude,
                    event.threshold,
                    event.timestamp_ms
                );
                telemetry::hub().record_shake(&event);
                let _ = self.shake_tx.send(event);
                self.cue.trigger();
            }

            telemetry::hub().record_detection_latency(started.elapsed());

            if self.samples_processed % OCCUPANCY_REPORT_INTERVAL == 0 {
                let occupancy =
                    self.consumer.slots() as f32 / self.queue_capacity.max(1) as f32 * 100.0;
                telemetry::hub().record_queue_occupancy("sample_queue", occupancy);
            }
        }
    }
}

/// Spawn the detection worker on its own thread.
///
/// The thread exits once `shutdown` is set and the queue has been drained;
/// the caller joins the returned handle during stop.
pub fn spawn_detection_thread(
    consumer: Consumer<SensorSample>,
    sensitivity: Arc<SensitivityController>,
    readings_tx: broadcast::Sender<SensorSample>,
    shake_tx: broadcast::Sender<ShakeEvent>,
    cue: Arc<CueManager>,
    shutdown: Arc<AtomicBool>,
    queue_capacity: usize,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let worker = DetectionWorker::new(
            consumer,
            sensitivity,
            readings_tx,
            shake_tx,
            cue,
            shutdown,
            queue_capacity,
        );
        worker.run();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CueConfig, DetectionConfig};
    use crate::sensor::SensorKind;
    use rtrb::RingBuffer;

    fn silent_cue() -> Arc<CueManager> {
        Arc::new(CueManager::new(CueConfig {
            enabled: false,
            ..CueConfig::default()
        }))
    }

    fn accel(values: [f32; 3], timestamp_ms: u64) -> SensorSample {
        SensorSample::new(SensorKind::Accelerometer, values, timestamp_ms)
    }

    #[test]
    fn worker_forwards_readings_in_arrival_order() {
        let (mut producer, consumer) = RingBuffer::new(64);
        let (readings_tx, mut readings_rx) = broadcast::channel(32);
        let (shake_tx, _shake_keepalive) = broadcast::channel(32);
        let sensitivity = Arc::new(SensitivityController::new(&DetectionConfig::default()));
        let shutdown = Arc::new(AtomicBool::new(false));

        producer.push(accel([0.1, 0.2, 0.3], 1)).unwrap();
        producer
            .push(SensorSample::single(SensorKind::Light, 420.0, 2))
            .unwrap();
        producer.push(accel([0.0, 0.0, 9.8], 3)).unwrap();
        shutdown.store(true, Ordering::SeqCst);

        let worker = DetectionWorker::new(
            consumer,
            sensitivity,
            readings_tx,
            shake_tx,
            silent_cue(),
            shutdown,
            64,
        );
        worker.run();

        let timestamps: Vec<u64> = (0..3)
            .map(|_| readings_rx.try_recv().expect("reading").timestamp_ms)
            .collect();
        assert_eq!(timestamps, vec![1, 2, 3]);
        assert!(readings_rx.try_recv().is_err());
    }

    #[test]
    fn worker_emits_shake_events_above_threshold_only() {
        let (mut producer, consumer) = RingBuffer::new(64);
        let (readings_tx, _readings_keepalive) = broadcast::channel(32);
        let (shake_tx, mut shake_rx) = broadcast::channel(32);
        let sensitivity = Arc::new(SensitivityController::new(&DetectionConfig::default()));
        // Baseline threshold: 9.9
        sensitivity.set_control_input(0);
        let shutdown = Arc::new(AtomicBool::new(false));

        producer.push(accel([1.0, 1.0, 1.0], 10)).unwrap();
        producer.push(accel([6.0, 8.0, 0.0], 11)).unwrap();
        producer.push(accel([0.0, 0.0, 9.8], 12)).unwrap();
        shutdown.store(true, Ordering::SeqCst);

        let worker = DetectionWorker::new(
            consumer,
            sensitivity,
            readings_tx,
            shake_tx,
            silent_cue(),
            shutdown,
            64,
        );
        worker.run();

        let event = shake_rx.try_recv().expect("one shake event");
        assert_eq!(event.timestamp_ms, 11);
        assert!((event.magnitude - 10.0).abs() < 1e-5);
        assert_eq!(event.threshold, 9.9);
        assert!(shake_rx.try_recv().is_err(), "only one sample fired");
    }

    #[test]
    fn repeated_samples_above_threshold_fire_repeatedly() {
        let (mut producer, consumer) = RingBuffer::new(64);
        let (readings_tx, _readings_keepalive) = broadcast::channel(32);
        let (shake_tx, mut shake_rx) = broadcast::channel(32);
        let sensitivity = Arc::new(SensitivityController::new(&DetectionConfig::default()));
        sensitivity.set_control_input(0);
        let shutdown = Arc::new(AtomicBool::new(false));

        // No debounce: every sample above threshold produces its own event.
        for t in 0..5 {
            producer.push(accel([12.0, 0.0, 0.0], t)).unwrap();
        }
        shutdown.store(true, Ordering::SeqCst);

        let worker = DetectionWorker::new(
            consumer,
            sensitivity,
            readings_tx,
            shake_tx,
            silent_cue(),
            shutdown,
            64,
        );
        worker.run();

        for t in 0..5 {
            assert_eq!(shake_rx.try_recv().expect("event").timestamp_ms, t);
        }
    }

    #[test]
    fn non_accelerometer_samples_never_fire() {
        let (mut producer, consumer) = RingBuffer::new(64);
        let (readings_tx, _readings_keepalive) = broadcast::channel(32);
        let (shake_tx, mut shake_rx) = broadcast::channel(32);
        let sensitivity = Arc::new(SensitivityController::new(&DetectionConfig::default()));
        sensitivity.set_control_input(0);
        let shutdown = Arc::new(AtomicBool::new(false));

        producer
            .push(SensorSample::new(SensorKind::Gyroscope, [40.0, 40.0, 40.0], 1))
            .unwrap();
        producer
            .push(SensorSample::single(SensorKind::Proximity, 900.0, 2))
            .unwrap();
        shutdown.store(true, Ordering::SeqCst);

        let worker = DetectionWorker::new(
            consumer,
            sensitivity,
            readings_tx,
            shake_tx,
            silent_cue(),
            shutdown,
            64,
        );
        worker.run();

        assert!(shake_rx.try_recv().is_err());
    }
}
