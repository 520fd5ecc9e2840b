// Error types for the motion monitor engine
//
// This module defines custom error types for sensor pipeline and audio cue
// operations, providing structured error handling with numeric codes suitable
// for bridge and HTTP surfaces.

mod cue;
mod sensor;

pub use cue::{log_cue_error, CueError, CueErrorCodes};
pub use sensor::{log_sensor_error, SensorError, SensorErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// process boundaries (JNI bridge, debug HTTP, CLI reports).
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
