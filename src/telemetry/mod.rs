//! Diagnostics telemetry collector and helpers.
//!
//! The collector multiplexes shake detections, worker latency, queue
//! occupancy, and lifecycle events into a bounded history plus an async
//! broadcast stream. A set of atomic counters backs the `/metrics` endpoint
//! and the CLI reports.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

use crate::detection::ShakeEvent;

pub mod events;

pub use events::{DiagnosticError, LifecyclePhase, MetricEvent};

/// Global telemetry hub shared across the crate.
static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

/// Access the global telemetry hub.
pub fn hub() -> &'static TelemetryHub {
    &HUB
}

/// Snapshot of collector state for HTTP/CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
    pub samples_processed: u64,
    pub shakes_detected: u64,
    pub cues_triggered: u64,
    pub samples_dropped: u64,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer);
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = self.history.lock().expect("history poisoned");
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn recent(&self) -> Vec<MetricEvent> {
        let history = self.history.lock().expect("history poisoned");
        history.iter().cloned().collect()
    }

    pub fn total_events(&self) -> u64 {
        self.total_events.load(Ordering::Relaxed)
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_history.load(Ordering::Relaxed)
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Latency tracker maintains a rolling window to compute avg/max latency.
struct LatencyTracker {
    samples: VecDeque<f32>,
    max_samples: usize,
}

impl LatencyTracker {
    fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    fn observe(&mut self, value: f32) -> (f32, f32, usize) {
        if self.samples.len() == self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(value.abs());

        let count = self.samples.len();
        let sum: f32 = self.samples.iter().copied().sum();
        let max = self
            .samples
            .iter()
            .copied()
            .fold(0.0_f32, |acc, next| acc.max(next));
        let avg = if count == 0 { 0.0 } else { sum / count as f32 };
        (avg, max, count)
    }
}

/// Top-level hub wrapping collector state plus counters and derived gauges.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    latency: Mutex<LatencyTracker>,
    queue_gauges: Mutex<HashMap<&'static str, f32>>,
    samples_processed: AtomicU64,
    shakes_detected: AtomicU64,
    cues_triggered: AtomicU64,
    samples_dropped: AtomicU64,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize, latency_window: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            latency: Mutex::new(LatencyTracker::new(latency_window)),
            queue_gauges: Mutex::new(HashMap::new()),
            samples_processed: AtomicU64::new(0),
            shakes_detected: AtomicU64::new(0),
            cues_triggered: AtomicU64::new(0),
            samples_dropped: AtomicU64::new(0),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            recent: self.collector.recent(),
            total_events: self.collector.total_events(),
            dropped_events: self.collector.dropped_events(),
            samples_processed: self.samples_processed.load(Ordering::Relaxed),
            shakes_detected: self.shakes_detected.load(Ordering::Relaxed),
            cues_triggered: self.cues_triggered.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
        }
    }

    /// Count a sample popped from the queue. Counter only, no event; at
    /// sensor rates a per-sample event would drown the history.
    pub fn record_sample(&self) {
        self.samples_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_shake(&self, event: &ShakeEvent) {
        self.shakes_detected.fetch_add(1, Ordering::Relaxed);
        self.collector.publish(MetricEvent::ShakeDetected {
            magnitude: event.magnitude,
            threshold: event.threshold,
            timestamp_ms: event.timestamp_ms,
        });
    }

    pub fn record_cue_trigger(&self) {
        self.cues_triggered.fetch_add(1, Ordering::Relaxed);
        self.collector.publish(MetricEvent::CueTriggered {
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_detection_latency(&self, elapsed: Duration) {
        let (avg, max, count) = {
            let mut tracker = self.latency.lock().expect("latency tracker poisoned");
            tracker.observe(elapsed.as_secs_f32() * 1000.0)
        };

        self.collector.publish(MetricEvent::Latency {
            avg_ms: avg,
            max_ms: max,
            sample_count: count,
        });
    }

    pub fn record_queue_occupancy(&self, channel: &'static str, percent: f32) {
        let normalized = percent.clamp(0.0, 100.0);
        let mut gauges = self.queue_gauges.lock().expect("queue gauge lock poisoned");

        let should_emit = gauges
            .get(channel)
            .map(|last| (last - normalized).abs() >= 2.5)
            .unwrap_or(true);

        if should_emit {
            gauges.insert(channel, normalized);
            self.collector.publish(MetricEvent::QueueOccupancy {
                channel: channel.to_string(),
                percent: normalized,
            });
        }
    }

    pub fn record_dropped_sample(&self, channel: &'static str) {
        let total = self.samples_dropped.fetch_add(1, Ordering::Relaxed) + 1;
        self.collector.publish(MetricEvent::SamplesDropped {
            channel: channel.to_string(),
            total,
        });
    }

    pub fn record_lifecycle(&self, phase: LifecyclePhase) {
        self.collector.publish(MetricEvent::Lifecycle {
            phase,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_error(&self, code: DiagnosticError, context: impl Into<String>) {
        self.collector.publish(MetricEvent::Error {
            code,
            context: context.into(),
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64, 32)
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shake(magnitude: f32, threshold: f32, timestamp_ms: u64) -> ShakeEvent {
        ShakeEvent {
            magnitude,
            threshold,
            timestamp_ms,
        }
    }

    #[test]
    fn collector_preserves_order_within_history() {
        let collector = TelemetryCollector::new(8, 3);
        collector.publish(MetricEvent::Latency {
            avg_ms: 1.0,
            max_ms: 2.0,
            sample_count: 1,
        });
        collector.publish(MetricEvent::Latency {
            avg_ms: 3.0,
            max_ms: 4.0,
            sample_count: 2,
        });
        collector.publish(MetricEvent::QueueOccupancy {
            channel: "test".to_string(),
            percent: 50.0,
        });

        let recent = collector.recent();
        assert_eq!(recent.len(), 3);
        assert!(
            matches!(recent[0], MetricEvent::Latency { avg_ms, .. } if (avg_ms - 1.0).abs() < f32::EPSILON)
        );
        assert!(matches!(recent[2], MetricEvent::QueueOccupancy { .. }));
    }

    #[test]
    fn collector_drops_history_when_full() {
        let collector = TelemetryCollector::new(8, 2);
        for n in 1..=3 {
            collector.publish(MetricEvent::Latency {
                avg_ms: n as f32,
                max_ms: n as f32,
                sample_count: n,
            });
        }

        let recent = collector.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(collector.dropped_events(), 1);
        assert!(
            matches!(recent[0], MetricEvent::Latency { avg_ms, .. } if (avg_ms - 2.0).abs() < f32::EPSILON)
        );
    }

    #[test]
    fn hub_counts_samples_and_shakes() {
        let hub = TelemetryHub::new(8, 8, 4);
        hub.record_sample();
        hub.record_sample();
        hub.record_sample();
        hub.record_shake(&shake(12.5, 9.9, 100));

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.samples_processed, 3);
        assert_eq!(snapshot.shakes_detected, 1);
        assert!(snapshot.recent.iter().any(|event| matches!(
            event,
            MetricEvent::ShakeDetected { magnitude, .. } if (magnitude - 12.5).abs() < f32::EPSILON
        )));
    }

    #[test]
    fn hub_emits_latency_with_rolling_window() {
        let hub = TelemetryHub::new(16, 16, 4);
        hub.record_detection_latency(Duration::from_millis(12));
        hub.record_detection_latency(Duration::from_millis(6));

        let snapshot = hub.snapshot();
        let latency_events: Vec<_> = snapshot
            .recent
            .iter()
            .filter(|event| matches!(event, MetricEvent::Latency { .. }))
            .collect();
        assert_eq!(latency_events.len(), 2);
        if let MetricEvent::Latency {
            avg_ms,
            max_ms,
            sample_count,
        } = latency_events[1]
        {
            assert_eq!(*sample_count, 2);
            assert!((*avg_ms - 9.0).abs() < 0.5);
            assert!((*max_ms - 12.0).abs() < 0.5);
        }
    }

    #[test]
    fn queue_gauge_debounces_small_changes() {
        let hub = TelemetryHub::new(8, 8, 4);
        hub.record_queue_occupancy("sample_queue", 10.0);
        hub.record_queue_occupancy("sample_queue", 10.5);
        hub.record_queue_occupancy("sample_queue", 25.0);

        let snapshot = hub.snapshot();
        assert_eq!(
            snapshot
                .recent
                .iter()
                .filter(|event| matches!(event, MetricEvent::QueueOccupancy { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn dropped_samples_carry_running_total() {
        let hub = TelemetryHub::new(8, 8, 4);
        hub.record_dropped_sample("sample_queue");
        hub.record_dropped_sample("sample_queue");

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.samples_dropped, 2);
        assert!(snapshot
            .recent
            .iter()
            .any(|event| matches!(event, MetricEvent::SamplesDropped { total: 2, .. })));
    }
}
