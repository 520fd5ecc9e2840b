use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rtrb::Producer;

use crate::error::SensorError;
use crate::sensor::SensorSample;
use crate::telemetry;

use super::{EngineStartContext, SensorBackend, TimeSource};

/// Stub sensor source used for deterministic testing and CLI tooling.
///
/// Retains the queue producer handed over at start so tests can inject
/// samples by hand instead of waiting on a real source.
pub struct StubBackend {
    running: AtomicBool,
    start_count: AtomicU64,
    stop_count: AtomicU64,
    sink: Mutex<Option<Producer<SensorSample>>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            start_count: AtomicU64::new(0),
            stop_count: AtomicU64::new(0),
            sink: Mutex::new(None),
        }
    }

    /// Push a sample into the retained queue.
    ///
    /// Returns false when the source is stopped or the queue is full; a
    /// full queue is also reported through the telemetry drop counter,
    /// matching real source behavior.
    pub fn push_sample(&self, sample: SensorSample) -> bool {
        let mut guard = match self.sink.lock() {
            Ok(guard) => guard,
            Err(_) => return false,
        };
        match guard.as_mut() {
            Some(producer) => match producer.push(sample) {
                Ok(()) => true,
                Err(_) => {
                    telemetry::hub().record_dropped_sample("sample_queue");
                    false
                }
            },
            None => false,
        }
    }

    pub fn start_count(&self) -> u64 {
        self.start_count.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> u64 {
        self.stop_count.load(Ordering::SeqCst)
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorBackend for StubBackend {
    fn start(&self, ctx: EngineStartContext) -> Result<(), SensorError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SensorError::AlreadyRunning);
        }

        self.start_count.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.sink.lock().map_err(|_| SensorError::LockPoisoned {
            component: "stub_source".to_string(),
        })?;
        *guard = Some(ctx.producer);

        Ok(())
    }

    fn stop(&self) -> Result<(), SensorError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(SensorError::NotRunning);
        }

        self.stop_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.sink.lock() {
            guard.take();
        }

        Ok(())
    }
}

/// Deterministic time source for desktop runs.
///
/// Each call to `now()` advances by a fixed 10ms to guarantee monotonic
/// timestamps even when no real sensor hardware is attached.
pub struct StubTimeSource {
    start: Instant,
    offset_ms: AtomicU64,
}

impl StubTimeSource {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }
}

impl Default for StubTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for StubTimeSource {
    fn now(&self) -> Instant {
        let ms = self.offset_ms.fetch_add(10, Ordering::SeqCst);
        self.start + Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorSourceConfig;
    use crate::sensor::SensorKind;
    use rtrb::RingBuffer;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn start_ctx(capacity: usize) -> (EngineStartContext, rtrb::Consumer<SensorSample>) {
        let (producer, consumer) = RingBuffer::new(capacity);
        let ctx = EngineStartContext {
            producer,
            sensors: SensorSourceConfig::default(),
            shutdown: Arc::new(AtomicBool::new(false)),
        };
        (ctx, consumer)
    }

    #[test]
    fn push_before_start_reports_failure() {
        let backend = StubBackend::new();
        let sample = SensorSample::new(SensorKind::Accelerometer, [1.0, 2.0, 3.0], 0);
        assert!(!backend.push_sample(sample));
    }

    #[test]
    fn pushed_samples_reach_the_consumer_in_order() {
        let backend = StubBackend::new();
        let (ctx, mut consumer) = start_ctx(8);
        backend.start(ctx).unwrap();

        for t in 0..3 {
            let sample = SensorSample::new(SensorKind::Accelerometer, [0.0, 0.0, 9.8], t);
            assert!(backend.push_sample(sample));
        }

        for t in 0..3 {
            assert_eq!(consumer.pop().unwrap().timestamp_ms, t);
        }

        backend.stop().unwrap();
    }

    #[test]
    fn full_queue_rejects_newest() {
        let backend = StubBackend::new();
        let (ctx, consumer) = start_ctx(2);
        backend.start(ctx).unwrap();

        let sample = |t| SensorSample::new(SensorKind::Accelerometer, [0.0, 0.0, 9.8], t);
        assert!(backend.push_sample(sample(0)));
        assert!(backend.push_sample(sample(1)));
        assert!(!backend.push_sample(sample(2)));

        backend.stop().unwrap();
        drop(consumer);
    }

    #[test]
    fn lifecycle_counters_track_start_stop() {
        let backend = StubBackend::new();
        assert!(matches!(backend.stop(), Err(SensorError::NotRunning)));

        let (ctx, _consumer) = start_ctx(4);
        backend.start(ctx).unwrap();
        assert_eq!(backend.start_count(), 1);

        let (second_ctx, _second_consumer) = start_ctx(4);
        assert!(matches!(
            backend.start(second_ctx),
            Err(SensorError::AlreadyRunning)
        ));

        backend.stop().unwrap();
        assert_eq!(backend.stop_count(), 1);
    }

    #[test]
    fn stub_time_source_is_monotonic() {
        let time = StubTimeSource::new();
        let a = time.now();
        let b = time.now();
        let c = time.now();
        assert!(b > a);
        assert!(c > b);
        assert_eq!(c.duration_since(a), Duration::from_millis(20));
    }
}
