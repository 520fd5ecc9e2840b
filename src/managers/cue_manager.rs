// CueManager: Focused manager for cue player lifecycle
//
// Single Responsibility: Cue output stream start/stop/trigger
// Keeps the platform CuePlayer behind a lock so detection and control
// surfaces can share one instance

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::config::CueConfig;
use crate::cue::{cue_samples_for, CuePlayer};
use crate::error::{log_cue_error, CueError};
use crate::telemetry::{self, DiagnosticError};

/// Manages cue player lifecycle and triggering
///
/// Single Responsibility: Cue output stream start/stop/trigger
///
/// This manager handles:
/// - Opening and closing the platform output stream around a monitoring
///   session
/// - Fire-and-forget triggering from the detection worker (never blocks,
///   never fails the caller)
/// - Runtime enable/disable without tearing down the session
///
/// A cue failure is never fatal to monitoring: when the output device is
/// missing or the stream cannot be built, the manager logs the error and
/// detection continues silently.
///
/// # Example
/// ```ignore
/// let manager = CueManager::new(config.cue.clone());
/// manager.start()?;
/// manager.trigger(); // on every shake
/// manager.stop();
/// ```
pub struct CueManager {
    config: CueConfig,
    player: Mutex<Option<CuePlayer>>,
    enabled: AtomicBool,
    session_active: AtomicBool,
}

impl CueManager {
    /// Create a new CueManager with no output stream open.
    ///
    /// The enabled flag is seeded from the config; the stream itself is
    /// opened by [`Self::start`].
    pub fn new(config: CueConfig) -> Self {
        let enabled = config.enabled;
        Self {
            config,
            player: Mutex::new(None),
            enabled: AtomicBool::new(enabled),
            session_active: AtomicBool::new(false),
        }
    }

    /// Open the cue output stream for a monitoring session.
    ///
    /// No-op when the cue is disabled or the session is already active.
    /// A device/stream failure is returned so the caller can log it, but
    /// the manager stays usable: triggers simply do nothing until a later
    /// enable retries the stream.
    pub fn start(&self) -> Result<(), CueError> {
        if self.session_active.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if !self.enabled.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.open_player()
    }

    /// Close the output stream and end the session.
    ///
    /// Safe to call when not running.
    pub fn stop(&self) {
        self.session_active.store(false, Ordering::SeqCst);
        match self.player.lock() {
            Ok(mut guard) => {
                if let Some(player) = guard.take() {
                    drop(player);
                    log::debug!("[Cue] Output stream closed");
                }
            }
            Err(_) => {
                let err = CueError::LockPoisoned {
                    component: "cue_player".to_string(),
                };
                log_cue_error(&err, "stop_cue");
            }
        }
    }

    /// Restart cue playback from the top.
    ///
    /// Fire-and-forget: triggers arriving while the cue is playing coalesce
    /// into a single restart picked up by the next audio callback. Disabled
    /// or stream-less managers ignore the call.
    pub fn trigger(&self) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }
        match self.player.lock() {
            Ok(guard) => {
                if let Some(player) = guard.as_ref() {
                    player.trigger();
                    telemetry::hub().record_cue_trigger();
                }
            }
            Err(_) => {
                let err = CueError::LockPoisoned {
                    component: "cue_player".to_string(),
                };
                log_cue_error(&err, "trigger_cue");
            }
        }
    }

    /// Enable or disable the cue at runtime.
    ///
    /// Disabling drops the output stream; enabling during an active session
    /// reopens it. Outside a session only the flag changes and the stream
    /// is opened by the next [`Self::start`].
    pub fn set_enabled(&self, enabled: bool) -> Result<(), CueError> {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if was == enabled {
            return Ok(());
        }

        if enabled {
            if self.session_active.load(Ordering::SeqCst) {
                self.open_player()
            } else {
                Ok(())
            }
        } else {
            match self.player.lock() {
                Ok(mut guard) => {
                    guard.take();
                    Ok(())
                }
                Err(_) => {
                    let err = CueError::LockPoisoned {
                        component: "cue_player".to_string(),
                    };
                    log_cue_error(&err, "set_cue_enabled");
                    Err(err)
                }
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Whether an output stream is currently open.
    pub fn is_active(&self) -> bool {
        self.player
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Whether the cue is audibly playing right now.
    pub fn is_playing(&self) -> bool {
        self.player
            .lock()
            .map(|guard| guard.as_ref().map(CuePlayer::is_playing).unwrap_or(false))
            .unwrap_or(false)
    }

    // ========================================================================
    // PRIVATE HELPER METHODS
    // ========================================================================

    /// Build the platform player and stash it in the slot.
    fn open_player(&self) -> Result<(), CueError> {
        let mut guard = self.lock_player()?;
        if guard.is_some() {
            return Ok(());
        }

        let (samples, sample_rate) = cue_samples_for(&self.config);
        let player = CuePlayer::new(samples, sample_rate).map_err(|err| {
            log_cue_error(&err, "open_cue_player");
            telemetry::hub().record_error(DiagnosticError::CuePlayback, err.to_string());
            err
        })?;

        *guard = Some(player);
        Ok(())
    }

    /// Safely acquire the player lock.
    fn lock_player(&self) -> Result<std::sync::MutexGuard<'_, Option<CuePlayer>>, CueError> {
        self.player.lock().map_err(|_| {
            let err = CueError::LockPoisoned {
                component: "cue_player".to_string(),
            };
            log_cue_error(&err, "lock_player");
            err
        })
    }
}
