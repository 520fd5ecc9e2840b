// Sensor pipeline error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Sensor pipeline error code constants
///
/// These constants provide a single source of truth for error codes shared
/// with the JNI bridge and the debug HTTP surface.
///
/// Error code range: 1001-1007
pub struct SensorErrorCodes {}

impl SensorErrorCodes {
    /// Monitoring is already running
    pub const ALREADY_RUNNING: i32 = 1001;

    /// Monitoring is not running
    pub const NOT_RUNNING: i32 = 1002;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1003;

    /// Sensor backend failed or is unavailable on this host
    pub const BACKEND_UNAVAILABLE: i32 = 1004;

    /// Threshold value rejected (non-finite or below the baseline floor)
    pub const THRESHOLD_INVALID: i32 = 1005;

    /// Sample rate rejected (must be finite and > 0)
    pub const RATE_INVALID: i32 = 1006;

    /// Command or broadcast channel closed unexpectedly
    pub const CHANNEL_CLOSED: i32 = 1007;
}

/// Log a sensor pipeline error with structured context
///
/// Logs the numeric code alongside the operation that failed so bridge
/// consumers can correlate log lines with returned codes.
pub fn log_sensor_error(err: &SensorError, context: &str) {
    error!(
        "Sensor error in {}: code={}, component=SensorPipeline, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Sensor pipeline errors
///
/// These errors cover monitoring lifecycle, threshold updates, and backend
/// supervision. Classification itself has no failure modes; everything here
/// belongs to the collaborator layer around it.
///
/// Error code range: 1001-1007
#[derive(Debug, Clone, PartialEq)]
pub enum SensorError {
    /// Monitoring is already running
    AlreadyRunning,

    /// Monitoring is not running
    NotRunning,

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Sensor backend failed or is unavailable on this host
    BackendUnavailable { details: String },

    /// Threshold value rejected (non-finite or below the baseline floor)
    ThresholdInvalid { value: f32, baseline: f32 },

    /// Sample rate rejected (must be finite and > 0)
    RateInvalid { rate_hz: f32 },

    /// Command or broadcast channel closed unexpectedly
    ChannelClosed { channel: String },
}

impl ErrorCode for SensorError {
    fn code(&self) -> i32 {
        match self {
            SensorError::AlreadyRunning => SensorErrorCodes::ALREADY_RUNNING,
            SensorError::NotRunning => SensorErrorCodes::NOT_RUNNING,
            SensorError::LockPoisoned { .. } => SensorErrorCodes::LOCK_POISONED,
            SensorError::BackendUnavailable { .. } => SensorErrorCodes::BACKEND_UNAVAILABLE,
            SensorError::ThresholdInvalid { .. } => SensorErrorCodes::THRESHOLD_INVALID,
            SensorError::RateInvalid { .. } => SensorErrorCodes::RATE_INVALID,
            SensorError::ChannelClosed { .. } => SensorErrorCodes::CHANNEL_CLOSED,
        }
    }

    fn message(&self) -> String {
        match self {
            SensorError::AlreadyRunning => {
                "Monitoring already running. Call stop_monitoring() first.".to_string()
            }
            SensorError::NotRunning => {
                "Monitoring not running. Call start_monitoring() first.".to_string()
            }
            SensorError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            SensorError::BackendUnavailable { details } => {
                format!("Sensor backend unavailable: {}", details)
            }
            SensorError::ThresholdInvalid { value, baseline } => {
                format!(
                    "Threshold must be finite and >= {} (got {})",
                    baseline, value
                )
            }
            SensorError::RateInvalid { rate_hz } => {
                format!("Sample rate must be finite and > 0 (got {})", rate_hz)
            }
            SensorError::ChannelClosed { channel } => {
                format!("Channel {} closed unexpectedly", channel)
            }
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SensorError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SensorError {}

impl From<std::io::Error> for SensorError {
    fn from(err: std::io::Error) -> Self {
        SensorError::BackendUnavailable {
            details: err.to_string(),
        }
    }
}
