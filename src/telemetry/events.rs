//! Core telemetry event types describing diagnostics data exposed to
//! CLI/HTTP surfaces and async subscribers.

use serde::{Deserialize, Serialize};

/// High-level lifecycle stages reported by JNI/engine instrumentation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    LibraryLoaded,
    ContextInitialized,
    MonitoringStarted,
    MonitoringStopped,
    LibraryUnloaded,
}

/// Diagnostic error codes surfaced via telemetry metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticError {
    BackendStart,
    CuePlayback,
    Unknown,
}

/// Rich metric events covering detections, latency, queue occupancy, and
/// lifecycle details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    ShakeDetected {
        magnitude: f32,
        threshold: f32,
        timestamp_ms: u64,
    },
    CueTriggered {
        timestamp_ms: u64,
    },
    Latency {
        avg_ms: f32,
        max_ms: f32,
        sample_count: usize,
    },
    QueueOccupancy {
        channel: String,
        percent: f32,
    },
    SamplesDropped {
        channel: String,
        total: u64,
    },
    Lifecycle {
        phase: LifecyclePhase,
        timestamp_ms: u64,
    },
    Error {
        code: DiagnosticError,
        context: String,
    },
}
