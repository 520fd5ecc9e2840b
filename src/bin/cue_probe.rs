//! Hardware smoke check: open the default output device and play the cue once.
//!
//! Exits non-zero when no output stream can be opened, so CI boxes without
//! audio hardware fail fast instead of hanging.

use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use motion_monitor::config::CueConfig;
use motion_monitor::cue::{cue_samples_for, CuePlayer};

fn main() -> ExitCode {
    motion_monitor::init_logging();

    let config = CueConfig::default();
    eprintln!(
        "[cue_probe] Synthesizing {} ms cue at {} Hz...",
        config.duration_ms, config.sample_rate
    );
    let (samples, rate) = cue_samples_for(&config);
    eprintln!("[cue_probe] {} samples ready", samples.len());

    eprintln!("[cue_probe] Opening default output device...");
    let start = Instant::now();
    let mut player = match CuePlayer::new(samples, rate) {
        Ok(player) => {
            eprintln!("[cue_probe] Stream open and started ({:?})", start.elapsed());
            player
        }
        Err(err) => {
            eprintln!("[cue_probe] ERROR: Failed to open output stream: {}", err);
            return ExitCode::from(1);
        }
    };

    eprintln!("[cue_probe] Triggering cue...");
    player.trigger();

    // Sleep past the cue tail so the transient is audible before teardown.
    thread::sleep(Duration::from_millis(config.duration_ms as u64 + 500));

    if player.is_playing() {
        eprintln!("[cue_probe] WARNING: cue still marked playing after the wait");
    }
    player.stop();
    eprintln!("[cue_probe] Done.");
    ExitCode::SUCCESS
}
