//! Sensor source abstractions for the reusable engine core.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use rtrb::Producer;

use crate::config::SensorSourceConfig;
use crate::error::SensorError;
use crate::sensor::SensorSample;

/// Context provided to sensor sources when starting the engine.
///
/// This bundles the queue producer and the shared state a source needs to
/// deliver samples without coupling it to higher-level code. Queue overflow
/// is handled source-side: the newest sample is dropped and reported via the
/// telemetry hub, never blocking the delivery context.
pub struct EngineStartContext {
    pub producer: Producer<SensorSample>,
    pub sensors: SensorSourceConfig,
    pub shutdown: Arc<AtomicBool>,
}

/// Trait implemented by platform-specific sensor sources.
///
/// Each backend is responsible for feeding the lock-free sample queue
/// provided via [EngineStartContext] until the shutdown flag is raised.
pub trait SensorBackend: Send + Sync {
    fn start(&self, ctx: EngineStartContext) -> Result<(), SensorError>;
    fn stop(&self) -> Result<(), SensorError>;
}

/// Trait representing a monotonic time source used for sample timestamps.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Instant;
}

/// Default time source backed by `Instant::now`.
#[derive(Default)]
pub struct SystemTimeSource {
    _unit: (),
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

mod simulated;
pub use simulated::SimulatedBackend;

mod stub;
pub use stub::{StubBackend, StubTimeSource};

#[cfg(target_os = "android")]
mod android;
#[cfg(target_os = "android")]
pub use android::AndroidBackend;
