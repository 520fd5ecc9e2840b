use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_motion_cli"))
}

fn fixture_file(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

#[test]
fn replay_fixture_succeeds() {
    let output = cli()
        .args(["replay", "--trace", "shake_burst"])
        .output()
        .expect("failed to run motion_cli replay");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(stdout.trim()).expect("replay report JSON payload");
    assert_eq!(json["fixture"], "shake_burst");
    assert_eq!(json["event_count"], 3);
}

#[test]
fn replay_detects_expectation_mismatch() {
    let output = cli()
        .args([
            "replay",
            "--trace",
            "shake_burst",
            "--expect",
            &fixture_file("shake_burst_incorrect.expect.json"),
        ])
        .output()
        .expect("failed to run mismatch replay");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(
        stderr.contains("\"failures\""),
        "expected diff JSON in stderr, got {stderr}"
    );
}

#[test]
fn replay_accepts_threshold_override() {
    // Threshold 16 sits above the strongest burst, so the trace goes silent
    // and no longer matches its shipped expectations.
    let output = cli()
        .args(["replay", "--trace", "shake_burst", "--threshold", "16"])
        .output()
        .expect("failed to run replay with override");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(
        stderr.contains("count_mismatch"),
        "expected count mismatch in stderr, got {stderr}"
    );
}

#[test]
fn replay_writes_report_file() {
    let output_path =
        std::env::temp_dir().join(format!("motion-replay-{}.json", std::process::id()));

    let output = cli()
        .args([
            "replay",
            "--trace",
            "calm_drift",
            "--output",
            output_path.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run replay with output");
    assert!(
        output.status.success(),
        "replay exited with {:?}",
        output.status.code()
    );

    let data = std::fs::read_to_string(&output_path).expect("replay report written to disk");
    let json: Value = serde_json::from_str(&data).expect("valid JSON payload");
    assert_eq!(json["fixture"], "calm_drift");
    assert_eq!(json["event_count"], 0);
    let _ = std::fs::remove_file(&output_path);
}

#[test]
fn fixtures_listing_names_assets() {
    let output = cli()
        .arg("fixtures")
        .output()
        .expect("failed to run fixtures");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    assert!(
        stdout.contains("shake_burst"),
        "expected fixture listing, got {stdout}"
    );
    assert!(stdout.contains("calm_drift"));
    assert!(stdout.contains("threshold_edge"));
}

#[test]
fn classify_reports_the_verdict() {
    let output = cli()
        .args([
            "classify",
            "--x",
            "6",
            "--y",
            "8",
            "--z",
            "0.1",
            "--control-input",
            "0",
        ])
        .output()
        .expect("failed to run classify");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(stdout.trim()).expect("classify report JSON");
    assert_eq!(json["shake"], true);
    assert!((json["threshold"].as_f64().unwrap() - 9.9).abs() < 1e-3);
}

#[test]
fn classify_respects_the_strict_inequality() {
    // |(6, 8, 0)| is exactly 10; at threshold 10 it must not fire
    let output = cli()
        .args([
            "classify",
            "--x",
            "6",
            "--y",
            "8",
            "--z",
            "0",
            "--threshold",
            "10",
        ])
        .output()
        .expect("failed to run classify");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(stdout.trim()).expect("classify report JSON");
    assert_eq!(json["shake"], false);
    assert_eq!(json["magnitude"], 10.0);
}

#[test]
fn render_cue_writes_wav() {
    let out_path = std::env::temp_dir().join(format!("motion-cue-{}.wav", std::process::id()));

    let output = cli()
        .args(["render-cue", "--out", out_path.to_str().unwrap()])
        .output()
        .expect("failed to run render-cue");
    assert!(
        output.status.success(),
        "render-cue exited with {:?}",
        output.status.code()
    );

    let bytes = std::fs::read(&out_path).expect("WAV written to disk");
    assert_eq!(&bytes[..4], b"RIFF");

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(stdout.trim()).expect("render report JSON");
    assert_eq!(json["sample_rate"], 48000);
    let _ = std::fs::remove_file(&out_path);
}
