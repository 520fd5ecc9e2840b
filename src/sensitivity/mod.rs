// Sensitivity module - ownership of the shake threshold
//
// The threshold is explicit state with a single owner. Control surfaces
// (CLI, HTTP, JNI bridge) write through the controller; the detection
// worker reads through it once per classified sample. Latest write wins.

mod controller;

pub use controller::{ControlMapping, SensitivityController, SensitivitySnapshot};
