//! Engine module housing the reusable monitoring core.
//!
//! This module exposes trait-based sensor sources (`backend`) and the
//! `EngineHandle` orchestration layer (`core`) shared by the CLI, HTTP,
//! and JNI entry points.

pub mod backend;
pub mod core;

#[cfg(target_os = "android")]
pub use backend::AndroidBackend;
pub use backend::{
    SensorBackend, SimulatedBackend, StubBackend, StubTimeSource, SystemTimeSource, TimeSource,
};
pub use core::{EngineHandle, MonitorGuard, ParamPatch};
