//! Android sensor source fed through the JNI bridge.
//!
//! Sensor registration stays on the host side: the app registers listeners
//! with `SensorManager` for whatever sensors the device actually has and
//! forwards every callback through `nativePushSample`. Kinds the device
//! lacks simply never push, so absent sensors contribute no events and
//! raise no error. This backend only parks the queue producer where the
//! bridge can reach it.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::bridge;
use crate::error::SensorError;

use super::{EngineStartContext, SensorBackend};

pub struct AndroidBackend {
    running: AtomicBool,
}

impl AndroidBackend {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }
}

impl Default for AndroidBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorBackend for AndroidBackend {
    fn start(&self, ctx: EngineStartContext) -> Result<(), SensorError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SensorError::AlreadyRunning);
        }

        bridge::install_sink(ctx.producer, ctx.sensors.enabled.clone());
        log::info!(
            "[Sensors] JNI sample sink installed ({} kinds accepted)",
            ctx.sensors.enabled.len()
        );
        Ok(())
    }

    fn stop(&self) -> Result<(), SensorError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(SensorError::NotRunning);
        }

        bridge::clear_sink();
        log::info!("[Sensors] JNI sample sink cleared");
        Ok(())
    }
}
