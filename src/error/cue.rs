// Audio cue error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio cue error code constants
///
/// Error code range: 2001-2007
pub struct CueErrorCodes {}

impl CueErrorCodes {
    /// No audio output device available
    pub const NO_OUTPUT_DEVICE: i32 = 2001;

    /// Output stream configuration not supported by the device
    pub const CONFIG_UNSUPPORTED: i32 = 2002;

    /// Failed to build the output stream
    pub const STREAM_BUILD_FAILED: i32 = 2003;

    /// Failed to start the output stream
    pub const STREAM_START_FAILED: i32 = 2004;

    /// Cue asset could not be decoded
    pub const ASSET_DECODE_FAILED: i32 = 2005;

    /// Mutex was poisoned
    pub const LOCK_POISONED: i32 = 2006;

    /// Playback fault reported by the output stream
    pub const PLAYBACK_FAULT: i32 = 2007;
}

/// Log a cue error with structured context
pub fn log_cue_error(err: &CueError, context: &str) {
    error!(
        "Cue error in {}: code={}, component=CuePlayer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio cue errors
///
/// These errors cover output device negotiation, stream lifecycle, and cue
/// asset decoding. Triggering a cue is fire-and-forget and never surfaces
/// an error to the detection path; failures land here only during setup
/// and teardown.
///
/// Error code range: 2001-2007
#[derive(Debug, Clone, PartialEq)]
pub enum CueError {
    /// No audio output device available
    NoOutputDevice,

    /// Output stream configuration not supported by the device
    ConfigUnsupported { details: String },

    /// Failed to build the output stream
    StreamBuildFailed { reason: String },

    /// Failed to start the output stream
    StreamStartFailed { reason: String },

    /// Cue asset could not be decoded
    AssetDecodeFailed { path: String, reason: String },

    /// Mutex was poisoned
    LockPoisoned { component: String },

    /// Playback fault reported by the output stream
    PlaybackFault { reason: String },
}

impl ErrorCode for CueError {
    fn code(&self) -> i32 {
        match self {
            CueError::NoOutputDevice => CueErrorCodes::NO_OUTPUT_DEVICE,
            CueError::ConfigUnsupported { .. } => CueErrorCodes::CONFIG_UNSUPPORTED,
            CueError::StreamBuildFailed { .. } => CueErrorCodes::STREAM_BUILD_FAILED,
            CueError::StreamStartFailed { .. } => CueErrorCodes::STREAM_START_FAILED,
            CueError::AssetDecodeFailed { .. } => CueErrorCodes::ASSET_DECODE_FAILED,
            CueError::LockPoisoned { .. } => CueErrorCodes::LOCK_POISONED,
            CueError::PlaybackFault { .. } => CueErrorCodes::PLAYBACK_FAULT,
        }
    }

    fn message(&self) -> String {
        match self {
            CueError::NoOutputDevice => {
                "No audio output device available for cue playback".to_string()
            }
            CueError::ConfigUnsupported { details } => {
                format!("Output configuration not supported: {}", details)
            }
            CueError::StreamBuildFailed { reason } => {
                format!("Failed to build cue output stream: {}", reason)
            }
            CueError::StreamStartFailed { reason } => {
                format!("Failed to start cue output stream: {}", reason)
            }
            CueError::AssetDecodeFailed { path, reason } => {
                format!("Failed to decode cue asset {}: {}", path, reason)
            }
            CueError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            CueError::PlaybackFault { reason } => {
                format!("Cue playback fault: {}", reason)
            }
        }
    }
}

impl fmt::Display for CueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CueError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CueError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_error_codes() {
        assert_eq!(
            CueError::NoOutputDevice.code(),
            CueErrorCodes::NO_OUTPUT_DEVICE
        );
        assert_eq!(
            CueError::ConfigUnsupported {
                details: "test".to_string()
            }
            .code(),
            CueErrorCodes::CONFIG_UNSUPPORTED
        );
        assert_eq!(
            CueError::StreamBuildFailed {
                reason: "test".to_string()
            }
            .code(),
            CueErrorCodes::STREAM_BUILD_FAILED
        );
        assert_eq!(
            CueError::StreamStartFailed {
                reason: "test".to_string()
            }
            .code(),
            CueErrorCodes::STREAM_START_FAILED
        );
        assert_eq!(
            CueError::AssetDecodeFailed {
                path: "cue.wav".to_string(),
                reason: "test".to_string()
            }
            .code(),
            CueErrorCodes::ASSET_DECODE_FAILED
        );
        assert_eq!(
            CueError::LockPoisoned {
                component: "cue_player".to_string()
            }
            .code(),
            CueErrorCodes::LOCK_POISONED
        );
        assert_eq!(
            CueError::PlaybackFault {
                reason: "test".to_string()
            }
            .code(),
            CueErrorCodes::PLAYBACK_FAULT
        );
    }

    #[test]
    fn test_cue_error_messages() {
        let err = CueError::NoOutputDevice;
        assert!(err.message().contains("output device"));

        let err = CueError::AssetDecodeFailed {
            path: "assets/crack.wav".to_string(),
            reason: "not a wav".to_string(),
        };
        assert!(err.message().contains("assets/crack.wav"));
        assert!(err.message().contains("not a wav"));
    }

    #[test]
    fn test_cue_error_display() {
        let err = CueError::NoOutputDevice;
        let display = format!("{}", err);
        assert!(display.contains("CueError"));
        assert!(display.contains("2001"));
    }
}
