//! Integration tests for the sensitivity workflow.
//!
//! These tests validate threshold ownership across the Rust layer:
//! - Control input mapping through the engine surface
//! - Direct threshold writes and their validation
//! - Field-wise parameter patches and latest-write-wins ordering
//! - Concurrent writers settling on a single written value
//!
//! The cue stays disabled throughout so no test touches an audio device.

use std::sync::Arc;
use std::thread;

use motion_monitor::config::AppConfig;
use motion_monitor::engine::{EngineHandle, ParamPatch};
use motion_monitor::error::SensorError;

fn quiet_engine() -> EngineHandle {
    let mut config = AppConfig::default();
    config.cue.enabled = false;
    EngineHandle::from_config(config)
}

/// Test the linear control mapping across its full range
#[test]
fn control_input_maps_linearly_across_the_range() {
    let engine = quiet_engine();

    // Startup position sits at the least sensitive end
    assert!((engine.current_threshold() - 59.9).abs() < 1e-3);

    assert!((engine.set_control_input(0) - 9.9).abs() < 1e-4);
    assert!((engine.set_control_input(50) - 34.9).abs() < 1e-3);
    assert!((engine.set_control_input(100) - 59.9).abs() < 1e-3);

    // Positions beyond the range clamp to the top instead of erroring
    assert!((engine.set_control_input(250) - 59.9).abs() < 1e-3);
    assert_eq!(engine.sensitivity_snapshot().control_input, 100);
}

/// Test that rejected direct writes leave the threshold untouched
#[test]
fn direct_threshold_rejections_leave_state_untouched() {
    let engine = quiet_engine();
    engine.set_control_input(0);

    let result = engine.set_threshold(5.0);
    assert!(result.is_err(), "threshold below the baseline must fail");
    match result.unwrap_err() {
        SensorError::ThresholdInvalid { value, baseline } => {
            assert_eq!(value, 5.0);
            assert_eq!(baseline, 9.9);
        }
        other => panic!("Expected ThresholdInvalid, got {:?}", other),
    }
    assert_eq!(engine.current_threshold(), 9.9);

    assert!(engine.set_threshold(f32::NAN).is_err());
    assert_eq!(engine.current_threshold(), 9.9);

    // The baseline itself is a valid floor
    engine.set_threshold(9.9).expect("baseline is inclusive");
}

/// Test that an explicit threshold in a patch wins over the mapped input
#[test]
fn patch_applies_fields_in_declaration_order() {
    let engine = quiet_engine();

    let snapshot = engine
        .apply_params(&ParamPatch {
            control_input: Some(0),
            threshold: Some(20.0),
            cue_enabled: None,
        })
        .expect("patch should apply");
    assert_eq!(
        snapshot.threshold, 20.0,
        "explicit threshold wins over the mapped input"
    );
}

/// Test that a rejected threshold aborts the patch after the input applied
#[test]
fn rejected_threshold_aborts_the_patch_after_the_input() {
    let engine = quiet_engine();

    let result = engine.apply_params(&ParamPatch {
        control_input: Some(0),
        threshold: Some(1.0),
        cue_enabled: None,
    });
    assert!(
        result.is_err(),
        "threshold below the baseline must be rejected"
    );

    // The control input had already been applied when the threshold failed
    assert_eq!(engine.current_threshold(), 9.9);
}

/// Test latest-write-wins across control surface and direct writes
#[test]
fn latest_write_wins_across_surfaces() {
    let engine = quiet_engine();

    engine.set_control_input(10);
    engine.set_threshold(30.0).expect("valid threshold");
    let snapshot = engine
        .apply_params(&ParamPatch {
            control_input: Some(4),
            threshold: None,
            cue_enabled: None,
        })
        .expect("patch should apply");

    assert!((snapshot.threshold - 11.9).abs() < 1e-3);
    assert!((engine.current_threshold() - 11.9).abs() < 1e-3);
}

/// Test the cue toggle travelling through parameter patches
#[test]
fn cue_toggle_round_trips_through_patches() {
    let engine = quiet_engine();
    assert!(!engine.cue_enabled());

    engine
        .apply_params(&ParamPatch {
            control_input: None,
            threshold: None,
            cue_enabled: Some(true),
        })
        .expect("enable patch");
    assert!(engine.cue_enabled());

    engine
        .apply_params(&ParamPatch {
            cue_enabled: Some(false),
            ..ParamPatch::default()
        })
        .expect("disable patch");
    assert!(!engine.cue_enabled());
}

/// Test concurrent control writes (multiple threads)
///
/// Racing writers may interleave, but each stored value must be one that
/// some thread actually wrote; blended or torn values are never visible.
#[test]
fn concurrent_writers_settle_on_one_written_value() {
    let engine = Arc::new(quiet_engine());
    let inputs: Vec<u32> = vec![0, 20, 40, 60, 80];

    let mut handles = vec![];
    for input in inputs.clone() {
        let engine_clone = Arc::clone(&engine);
        let handle = thread::spawn(move || {
            engine_clone.set_control_input(input);
        });
        handles.push(handle);
    }
    for handle in handles {
        handle.join().expect("Thread should not panic");
    }

    let snapshot = engine.sensitivity_snapshot();
    assert!(inputs.contains(&snapshot.control_input));
    let mapped: Vec<f32> = inputs
        .iter()
        .map(|input| *input as f32 * snapshot.scale + snapshot.baseline)
        .collect();
    assert!(mapped
        .iter()
        .any(|threshold| (snapshot.threshold - threshold).abs() < 1e-4));
}
