//! Seeded synthetic sensor source for desktop runs and demos.
//!
//! Emits plausible readings for every enabled sensor kind at the configured
//! rate: a gravity-dominated accelerometer with noise, earth-field
//! magnetometer, near/far proximity flips, and so on. Periodic shake bursts
//! push the accelerometer magnitude well above resting gravity so the whole
//! pipeline is observable end to end. All randomness comes from one seeded
//! generator, so a fixed seed and time source replay the same trace.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rtrb::Producer;

use crate::config::SensorSourceConfig;
use crate::error::SensorError;
use crate::sensor::{SensorKind, SensorSample};
use crate::telemetry;

use super::{EngineStartContext, SensorBackend, SystemTimeSource, TimeSource};

/// Resting gravity on the z axis, m/s^2.
const GRAVITY_Z: f32 = 9.81;
/// Duration of each injected shake burst in seconds.
const BURST_LEN_S: f32 = 0.5;

/// Simulated sensor source driving the pipeline with synthetic samples.
pub struct SimulatedBackend {
    running: AtomicBool,
    worker: Mutex<Option<(Arc<AtomicBool>, JoinHandle<()>)>>,
    time: Arc<dyn TimeSource>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::with_time_source(Arc::new(SystemTimeSource::default()))
    }

    /// Use an explicit time source; tests pass a stub for determinism.
    pub fn with_time_source(time: Arc<dyn TimeSource>) -> Self {
        Self {
            running: AtomicBool::new(false),
            worker: Mutex::new(None),
            time,
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorBackend for SimulatedBackend {
    fn start(&self, ctx: EngineStartContext) -> Result<(), SensorError> {
        if !ctx.sensors.rate_hz.is_finite() || ctx.sensors.rate_hz <= 0.0 {
            return Err(SensorError::RateInvalid {
                rate_hz: ctx.sensors.rate_hz,
            });
        }

        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SensorError::AlreadyRunning);
        }

        let shutdown = Arc::clone(&ctx.shutdown);
        let time = Arc::clone(&self.time);
        let handle = thread::spawn(move || {
            run_source(ctx.producer, ctx.sensors, ctx.shutdown, time);
        });

        let mut slot = self.worker.lock().map_err(|_| {
            let err = SensorError::LockPoisoned {
                component: "simulated_source".to_string(),
            };
            crate::error::log_sensor_error(&err, "start_simulated");
            err
        })?;
        *slot = Some((shutdown, handle));

        Ok(())
    }

    fn stop(&self) -> Result<(), SensorError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(SensorError::NotRunning);
        }

        let taken = self
            .worker
            .lock()
            .map_err(|_| SensorError::LockPoisoned {
                component: "simulated_source".to_string(),
            })?
            .take();

        if let Some((shutdown, handle)) = taken {
            shutdown.store(true, Ordering::SeqCst);
            if handle.join().is_err() {
                log::error!("[Sensors] Simulated source thread panicked");
            }
        }

        Ok(())
    }
}

/// Source loop: one tick per period, one sample per enabled kind per tick.
fn run_source(
    mut producer: Producer<SensorSample>,
    cfg: SensorSourceConfig,
    shutdown: Arc<AtomicBool>,
    time: Arc<dyn TimeSource>,
) {
    let mut rng = StdRng::seed_from_u64(cfg.simulation_seed);
    let period = Duration::from_secs_f64(1.0 / cfg.rate_hz as f64);
    let session_start = time.now();

    log::info!(
        "[Sensors] Simulated source running: {} kinds at {} Hz (seed {})",
        cfg.enabled.len(),
        cfg.rate_hz,
        cfg.simulation_seed
    );

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        let elapsed = time.now().duration_since(session_start);
        let t_ms = elapsed.as_millis() as u64;
        let in_burst = match cfg.shake_burst_period_s {
            Some(p) if p > 0.0 => (elapsed.as_secs_f32() % p) < BURST_LEN_S,
            _ => false,
        };

        for &kind in &cfg.enabled {
            let sample = synthesize(kind, t_ms, in_burst, &mut rng);
            if producer.push(sample).is_err() {
                telemetry::hub().record_dropped_sample("sample_queue");
                log::debug!("[Sensors] Sample queue full, dropped {} sample", kind);
            }
        }

        thread::sleep(period);
    }

    log::debug!("[Sensors] Simulated source thread exiting");
}

/// Synthetic reading for one sensor kind.
fn synthesize(kind: SensorKind, t_ms: u64, in_burst: bool, rng: &mut StdRng) -> SensorSample {
    match kind {
        SensorKind::Accelerometer => {
            let dir: f32 = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let mut values = [
                rng.gen_range(-0.35..0.35),
                rng.gen_range(-0.35..0.35),
                GRAVITY_Z + rng.gen_range(-0.35..0.35),
            ];
            if in_burst {
                values[0] += dir * rng.gen_range(12.0..22.0);
                values[1] -= dir * rng.gen_range(12.0..22.0);
                values[2] += dir * rng.gen_range(4.0..9.0);
            }
            SensorSample::new(kind, values, t_ms)
        }
        SensorKind::Gyroscope => {
            let spread = if in_burst { 3.5 } else { 0.2 };
            SensorSample::new(
                kind,
                [
                    rng.gen_range(-spread..spread),
                    rng.gen_range(-spread..spread),
                    rng.gen_range(-spread..spread),
                ],
                t_ms,
            )
        }
        SensorKind::MagneticField => SensorSample::new(
            kind,
            [
                22.4 + rng.gen_range(-1.5..1.5),
                5.3 + rng.gen_range(-1.5..1.5),
                -43.1 + rng.gen_range(-1.5..1.5),
            ],
            t_ms,
        ),
        SensorKind::Proximity => {
            let distance = if rng.gen_bool(0.03) { 0.0 } else { 5.0 };
            SensorSample::single(kind, distance, t_ms)
        }
        SensorKind::Light => {
            SensorSample::single(kind, 320.0 + rng.gen_range(-25.0..25.0), t_ms)
        }
        SensorKind::Gravity => SensorSample::new(
            kind,
            [
                rng.gen_range(-0.05..0.05),
                rng.gen_range(-0.05..0.05),
                GRAVITY_Z + rng.gen_range(-0.05..0.05),
            ],
            t_ms,
        ),
    }
}
