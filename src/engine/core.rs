//! EngineHandle: sensor monitoring orchestration layer.
//!
//! Owns the sensor backend, the detection worker, the sensitivity
//! controller, and the cue manager, exposing trait-based backends and a
//! `ParamPatch` command pipeline shared across CLI, HTTP, and JNI entry
//! points. Monitoring is a scoped resource: `start_scoped` hands out a
//! guard whose drop stops the session, and the handle's own drop is the
//! final backstop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::thread::JoinHandle;
use std::time::Instant;

use rtrb::RingBuffer;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};

use crate::config::AppConfig;
use crate::detection::spawn_detection_thread;
use crate::engine::backend::{EngineStartContext, SensorBackend, SystemTimeSource, TimeSource};
#[cfg(target_os = "android")]
use crate::engine::backend::AndroidBackend;
#[cfg(not(target_os = "android"))]
use crate::engine::backend::SimulatedBackend;
use crate::error::{log_sensor_error, SensorError};
use crate::managers::{BroadcastChannelManager, CueManager};
use crate::sensitivity::{SensitivityController, SensitivitySnapshot};
use crate::telemetry::{self, DiagnosticError, LifecyclePhase};

#[path = "core_subscriptions.rs"]
mod core_subscriptions;

/// Patch describing parameter updates to apply to the running engine.
///
/// Fields are applied independently; per field the latest write wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamPatch {
    #[serde(default)]
    pub control_input: Option<u32>,
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default)]
    pub cue_enabled: Option<bool>,
}

/// Live state owned by a running monitoring session.
struct MonitorSession {
    shutdown: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

/// EngineHandle orchestrates the detection pipeline and shared channels.
pub struct EngineHandle {
    config: Arc<RwLock<AppConfig>>,
    backend: Arc<dyn SensorBackend>,
    sensitivity: Arc<SensitivityController>,
    cue: Arc<CueManager>,
    broadcasts: BroadcastChannelManager,
    command_tx: mpsc::Sender<ParamPatch>,
    command_rx: Arc<Mutex<mpsc::Receiver<ParamPatch>>>,
    command_worker_started: AtomicBool,
    session: StdMutex<Option<MonitorSession>>,
    monitoring: AtomicBool,
    time_source: Arc<dyn TimeSource>,
    start_instant: Instant,
}

impl EngineHandle {
    /// Create a new EngineHandle with platform defaults.
    pub fn new() -> Self {
        Self::from_config(Self::load_platform_config())
    }

    /// Create a handle for the given configuration with the platform backend.
    pub fn from_config(config: AppConfig) -> Self {
        let backend = Self::create_backend();
        Self::with_backend(config, backend)
    }

    /// Create a handle with an explicit sensor backend (tests, tooling).
    pub fn with_backend(initial_config: AppConfig, backend: Arc<dyn SensorBackend>) -> Self {
        let sensitivity = Arc::new(SensitivityController::new(&initial_config.detection));
        let cue = Arc::new(CueManager::new(initial_config.cue.clone()));
        let config = Arc::new(RwLock::new(initial_config));
        let broadcasts = BroadcastChannelManager::new();
        let (command_tx, command_rx) = mpsc::channel(64);

        Self {
            config,
            backend,
            sensitivity,
            cue,
            broadcasts,
            command_tx,
            command_rx: Arc::new(Mutex::new(command_rx)),
            command_worker_started: AtomicBool::new(false),
            session: StdMutex::new(None),
            monitoring: AtomicBool::new(false),
            time_source: Arc::new(SystemTimeSource::default()),
            start_instant: Instant::now(),
        }
    }

    fn load_platform_config() -> AppConfig {
        #[cfg(target_os = "android")]
        {
            AppConfig::load_android()
        }

        #[cfg(not(target_os = "android"))]
        {
            AppConfig::load()
        }
    }

    #[cfg(target_os = "android")]
    fn create_backend() -> Arc<dyn SensorBackend> {
        Arc::new(AndroidBackend::new())
    }

    #[cfg(not(target_os = "android"))]
    fn create_backend() -> Arc<dyn SensorBackend> {
        Arc::new(SimulatedBackend::new())
    }

    fn lock_session(&self) -> Result<std::sync::MutexGuard<'_, Option<MonitorSession>>, SensorError> {
        self.session.lock().map_err(|_| {
            let err = SensorError::LockPoisoned {
                component: "monitor_session".to_string(),
            };
            log_sensor_error(&err, "lock_session");
            err
        })
    }

    fn init_command_worker(&self) {
        if self
            .command_worker_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let sensitivity = Arc::clone(&self.sensitivity);
        let cue = Arc::clone(&self.cue);
        let command_rx = Arc::clone(&self.command_rx);

        // Dedicated thread with its own Tokio runtime: push surfaces (JNI,
        // signal handlers) may not have a runtime available when they send.
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create Tokio runtime for command worker");

            rt.block_on(async move {
                loop {
                    let patch = {
                        let mut guard = command_rx.lock().await;
                        guard.recv().await
                    };

                    match patch {
                        Some(patch) => {
                            if let Err(err) = apply_patch(&sensitivity, &cue, &patch) {
                                log::warn!("[Engine] Rejected param patch: {}", err);
                                telemetry::hub()
                                    .record_error(DiagnosticError::Unknown, err.to_string());
                            }
                        }
                        None => break,
                    }
                }
            });
        });
    }

    // ========================================================================
    // MONITORING LIFECYCLE
    // ========================================================================

    /// Start sensor monitoring.
    ///
    /// Initializes the broadcast channels, creates the sample queue, spawns
    /// the detection worker, opens the cue stream, and starts the backend.
    /// A cue device failure degrades to a silent session with a warning; a
    /// backend failure rolls the partial session back and is returned.
    pub fn start_monitoring(&self) -> Result<(), SensorError> {
        let mut session = self.lock_session()?;
        if session.is_some() {
            let err = SensorError::AlreadyRunning;
            log_sensor_error(&err, "start_monitoring");
            return Err(err);
        }

        let cfg = self.config_snapshot();
        let readings_tx = self.broadcasts.init_readings();
        let shake_tx = self.broadcasts.init_shake();
        let (producer, consumer) = RingBuffer::new(cfg.sensors.queue_capacity);
        let shutdown = Arc::new(AtomicBool::new(false));

        if let Err(err) = self.cue.start() {
            log::warn!("[Engine] Continuing without audio cue: {}", err);
        }

        let worker = spawn_detection_thread(
            consumer,
            Arc::clone(&self.sensitivity),
            readings_tx,
            shake_tx,
            Arc::clone(&self.cue),
            Arc::clone(&shutdown),
            cfg.sensors.queue_capacity,
        );

        let ctx = EngineStartContext {
            producer,
            sensors: cfg.sensors.clone(),
            shutdown: Arc::clone(&shutdown),
        };

        if let Err(err) = self.backend.start(ctx) {
            shutdown.store(true, Ordering::SeqCst);
            if worker.join().is_err() {
                log::error!("[Engine] Detection worker panicked during rollback");
            }
            self.cue.stop();
            log_sensor_error(&err, "start_monitoring");
            telemetry::hub().record_error(DiagnosticError::BackendStart, err.to_string());
            return Err(err);
        }

        *session = Some(MonitorSession { shutdown, worker });
        self.monitoring.store(true, Ordering::SeqCst);
        telemetry::hub().record_lifecycle(LifecyclePhase::MonitoringStarted);
        log::info!(
            "[Engine] Monitoring started (threshold {:.1})",
            self.sensitivity.current()
        );
        self.init_command_worker();
        Ok(())
    }

    /// Stop sensor monitoring.
    ///
    /// Stops the backend, raises the shutdown flag, joins the worker once
    /// the queue is drained, and closes the cue stream. Teardown always
    /// runs to completion; the first backend error is reported after the
    /// session is fully released. The handle stays reusable.
    pub fn stop_monitoring(&self) -> Result<(), SensorError> {
        let mut session = self.lock_session()?;
        let state = match session.take() {
            Some(state) => state,
            None => {
                let err = SensorError::NotRunning;
                log_sensor_error(&err, "stop_monitoring");
                return Err(err);
            }
        };

        let mut failure = None;
        if let Err(err) = self.backend.stop() {
            log_sensor_error(&err, "stop_monitoring");
            failure = Some(err);
        }

        state.shutdown.store(true, Ordering::SeqCst);
        if state.worker.join().is_err() {
            log::error!("[Engine] Detection worker panicked");
        }
        self.cue.stop();
        self.monitoring.store(false, Ordering::SeqCst);
        telemetry::hub().record_lifecycle(LifecyclePhase::MonitoringStopped);
        log::info!("[Engine] Monitoring stopped");

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Start monitoring as a scoped resource.
    ///
    /// The returned guard stops monitoring when dropped, so a session can
    /// never outlive the scope that acquired it.
    pub fn start_scoped(&self) -> Result<MonitorGuard<'_>, SensorError> {
        self.start_monitoring()?;
        Ok(MonitorGuard { engine: self })
    }

    // ========================================================================
    // PARAMETERS
    // ========================================================================

    /// Move the sensitivity control; returns the threshold that now applies.
    pub fn set_control_input(&self, input: u32) -> f32 {
        self.sensitivity.set_control_input(input)
    }

    /// Set the detection threshold directly.
    pub fn set_threshold(&self, value: f32) -> Result<(), SensorError> {
        self.sensitivity.set_threshold(value)
    }

    pub fn current_threshold(&self) -> f32 {
        self.sensitivity.current()
    }

    pub fn sensitivity_snapshot(&self) -> SensitivitySnapshot {
        self.sensitivity.snapshot()
    }

    /// Fire the cue manually; coalesces with detection triggers.
    pub fn trigger_cue(&self) {
        self.cue.trigger();
    }

    pub fn set_cue_enabled(&self, enabled: bool) {
        if let Err(err) = self.cue.set_enabled(enabled) {
            log::warn!("[Engine] Cue toggle failed: {}", err);
        }
    }

    pub fn cue_enabled(&self) -> bool {
        self.cue.is_enabled()
    }

    /// Apply a parameter patch synchronously; returns the resulting
    /// sensitivity snapshot.
    pub fn apply_params(&self, patch: &ParamPatch) -> Result<SensitivitySnapshot, SensorError> {
        apply_patch(&self.sensitivity, &self.cue, patch)?;
        Ok(self.sensitivity.snapshot())
    }
}

/// Apply a patch field-wise against the shared controller and cue manager.
///
/// Threshold rejections abort with the controller's error; a cue stream
/// failure is logged and counted but does not fail the patch, mirroring
/// start-time degradation.
fn apply_patch(
    sensitivity: &SensitivityController,
    cue: &CueManager,
    patch: &ParamPatch,
) -> Result<(), SensorError> {
    if let Some(input) = patch.control_input {
        let applied = sensitivity.set_control_input(input);
        log::debug!(
            "[Engine] Control input {} applied, threshold now {:.1}",
            input,
            applied
        );
    }

    if let Some(threshold) = patch.threshold {
        sensitivity.set_threshold(threshold)?;
        log::debug!("[Engine] Threshold set to {:.1}", threshold);
    }

    if let Some(enabled) = patch.cue_enabled {
        if let Err(err) = cue.set_enabled(enabled) {
            log::warn!("[Engine] Cue toggle failed: {}", err);
            telemetry::hub().record_error(DiagnosticError::CuePlayback, err.to_string());
        }
    }

    Ok(())
}

/// RAII guard for a monitoring session.
///
/// Dropping the guard stops monitoring; errors during the implicit stop are
/// logged, not surfaced. Call [`MonitorGuard::stop`] to observe them.
pub struct MonitorGuard<'a> {
    engine: &'a EngineHandle,
}

impl MonitorGuard<'_> {
    /// Stop the session now, reporting any teardown error.
    pub fn stop(self) -> Result<(), SensorError> {
        // Drop runs after this returns; it sees the session already gone.
        self.engine.stop_monitoring()
    }

    pub fn engine(&self) -> &EngineHandle {
        self.engine
    }
}

impl Drop for MonitorGuard<'_> {
    fn drop(&mut self) {
        if self.engine.is_monitoring() {
            if let Err(err) = self.engine.stop_monitoring() {
                log::warn!("[Engine] Scoped stop failed: {}", err);
            }
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        // Final backstop for the scoped-release guarantee.
        if self.is_monitoring() {
            let _ = self.stop_monitoring();
        }
    }
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

// ========================================================================
// TEST HELPERS
// ========================================================================
