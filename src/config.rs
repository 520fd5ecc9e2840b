//! Configuration management for dynamic parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration without recompilation. Key parameters for
//! shake detection, the sensor source, and cue playback can be adjusted
//! via the config file for rapid experimentation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::sensor::SensorKind;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub detection: DetectionConfig,
    pub sensors: SensorSourceConfig,
    pub cue: CueConfig,
}

/// Shake detection and sensitivity mapping parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Minimum sensitivity floor; the mapped threshold never goes below this
    pub baseline: f32,
    /// Scale applied to the control input before adding the baseline
    pub scale: f32,
    /// Upper bound of the control input range (inclusive)
    pub control_max: u32,
    /// Control position applied at startup
    pub initial_control_input: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            baseline: 9.9,
            scale: 0.5,
            control_max: 100,
            // Start at the least sensitive end of the range
            initial_control_input: 100,
        }
    }
}

/// Sensor source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSourceConfig {
    /// Delivery cadence in samples per second per sensor kind
    pub rate_hz: f32,
    /// Kinds the source should deliver; kinds the host lacks are skipped
    pub enabled: Vec<SensorKind>,
    /// Capacity of the ring buffer between source and detection worker
    pub queue_capacity: usize,
    /// Seed for the simulated source's noise generator
    pub simulation_seed: u64,
    /// Seconds between injected shake bursts in the simulated source
    pub shake_burst_period_s: Option<f32>,
}

impl Default for SensorSourceConfig {
    fn default() -> Self {
        Self {
            // Matches the normal-delay cadence of the original sensor feed
            rate_hz: 5.0,
            enabled: SensorKind::ALL.to_vec(),
            queue_capacity: 1024,
            simulation_seed: 42,
            shake_burst_period_s: Some(4.0),
        }
    }
}

/// Audio cue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CueConfig {
    /// Whether shake events trigger cue playback
    pub enabled: bool,
    /// Output sample rate for the synthesized cue
    pub sample_rate: u32,
    /// Cue length in milliseconds
    pub duration_ms: u32,
    /// Peak amplitude of the synthesized cue (0.0..=1.0)
    pub amplitude: f32,
    /// Optional WAV file to play instead of the synthesized burst
    pub asset_path: Option<PathBuf>,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate: 48000,
            duration_ms: 120,
            amplitude: 0.8,
            asset_path: None,
        }
    }
}

impl Default for AppConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            sensors: SensorSourceConfig::default(),
            cue: CueConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or defaults (with a warning) if the file
    /// is missing or invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration on Android
    ///
    /// Config assets travel inside the APK and are only reachable through
    /// the platform asset manager, so the bridge passes values through
    /// parameter patches instead of a file read.
    #[cfg(target_os = "android")]
    pub fn load_android() -> Self {
        log::info!("[Config] Using default configuration on Android");
        Self::default()
    }

    /// Load configuration for non-Android platforms
    #[cfg(not(target_os = "android"))]
    pub fn load() -> Self {
        Self::load_from_file("assets/monitor_config.json")
    }
}
