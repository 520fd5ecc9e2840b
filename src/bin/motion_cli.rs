use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use motion_monitor::config::{AppConfig, DetectionConfig};
use motion_monitor::cue::synthesize_cue;
use motion_monitor::detection::classifier::magnitude;
use motion_monitor::detection::ShakeEvent;
use motion_monitor::engine::EngineHandle;
use motion_monitor::fixtures::{ExpectationDiff, FixtureCatalog, FixtureProcessor};
use motion_monitor::sensitivity::SensitivityController;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "motion_cli",
    about = "Deterministic trace harness for the motion monitor"
)]
struct Cli {
    /// Override directory containing fixture traces (defaults to the crate's fixtures dir)
    #[arg(long)]
    fixtures_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a single accelerometer sample against the threshold
    Classify {
        #[arg(long, allow_hyphen_values = true)]
        x: f32,
        #[arg(long, allow_hyphen_values = true)]
        y: f32,
        #[arg(long, allow_hyphen_values = true)]
        z: f32,
        /// Explicit threshold (validated against the baseline floor)
        #[arg(long, conflicts_with = "control_input")]
        threshold: Option<f32>,
        /// Control position mapped onto the threshold (0 = most sensitive)
        #[arg(long)]
        control_input: Option<u32>,
    },
    /// Replay a JSON trace and optionally compare against expectations
    Replay {
        #[arg(long)]
        trace: String,
        #[arg(long)]
        expect: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, conflicts_with = "control_input")]
        threshold: Option<f32>,
        #[arg(long)]
        control_input: Option<u32>,
    },
    /// List available fixture traces on disk
    Fixtures,
    /// Run the live engine with the simulated backend and stream events
    Simulate {
        /// How long to run, in seconds
        #[arg(long)]
        duration_s: f32,
        /// Sample delivery rate per sensor kind (defaults to the config value)
        #[arg(long)]
        rate_hz: Option<f32>,
        /// Seed for the simulated noise generator
        #[arg(long)]
        seed: Option<u64>,
        /// Control position applied at start (0 = most sensitive)
        #[arg(long, default_value_t = 0)]
        control_input: u32,
        /// Play the audio cue on detection (needs an output device)
        #[arg(long)]
        cue: bool,
    },
    /// Render the synthesized cue to a WAV file
    RenderCue {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 120)]
        duration_ms: u32,
        #[arg(long, default_value_t = 48000)]
        sample_rate: u32,
        #[arg(long, default_value_t = 0.8)]
        amplitude: f32,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    motion_monitor::init_logging();

    let cli = Cli::parse();
    let catalog = cli
        .fixtures_dir
        .map(FixtureCatalog::new)
        .unwrap_or_else(FixtureCatalog::default);

    match cli.command {
        Commands::Classify {
            x,
            y,
            z,
            threshold,
            control_input,
        } => run_classify([x, y, z], threshold, control_input),
        Commands::Replay {
            trace,
            expect,
            output,
            threshold,
            control_input,
        } => run_replay(&catalog, &trace, expect, output, threshold, control_input),
        Commands::Fixtures => run_fixtures(&catalog),
        Commands::Simulate {
            duration_s,
            rate_hz,
            seed,
            control_input,
            cue,
        } => run_simulate(duration_s, rate_hz, seed, control_input, cue),
        Commands::RenderCue {
            out,
            duration_ms,
            sample_rate,
            amplitude,
        } => run_render_cue(out, duration_ms, sample_rate, amplitude),
    }
}

fn run_classify(
    values: [f32; 3],
    threshold: Option<f32>,
    control_input: Option<u32>,
) -> Result<ExitCode> {
    let threshold = resolve_threshold(&DetectionConfig::default(), threshold, control_input)?;
    let magnitude = magnitude(values);

    let report = ClassifyReportPayload {
        values,
        magnitude,
        threshold,
        shake: magnitude > threshold,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

fn run_replay(
    catalog: &FixtureCatalog,
    trace: &str,
    override_expect: Option<PathBuf>,
    output_path: Option<PathBuf>,
    threshold: Option<f32>,
    control_input: Option<u32>,
) -> Result<ExitCode> {
    let mut processor = FixtureProcessor::new(DetectionConfig::default());
    if let Some(input) = control_input {
        processor = processor.with_control_input(input);
    }
    if let Some(value) = threshold {
        processor = processor.with_threshold(value);
    }

    let data = catalog.load(trace, override_expect)?;
    let actual = processor
        .run(&data)
        .with_context(|| format!("replaying trace {}", trace))?;

    emit_report(
        &data.metadata.name,
        data.trace.samples.len(),
        &actual,
        output_path,
    )?;

    if let Some(expectations) = data.expectations {
        match expectations.verify(&actual) {
            Ok(()) => Ok(ExitCode::from(0)),
            Err(diff) => {
                emit_diff(&diff)?;
                Ok(ExitCode::from(2))
            }
        }
    } else {
        Ok(ExitCode::from(0))
    }
}

fn run_fixtures(catalog: &FixtureCatalog) -> Result<ExitCode> {
    let fixtures = catalog.discover()?;
    if fixtures.is_empty() {
        println!("No fixtures found under {}", catalog.root().display());
        return Ok(ExitCode::from(0));
    }

    for metadata in fixtures {
        if let Some(expect) = metadata.expect_path {
            println!("{} -> {}", metadata.name, expect.display());
        } else {
            println!("{}", metadata.name);
        }
    }
    Ok(ExitCode::from(0))
}

fn run_simulate(
    duration_s: f32,
    rate_hz: Option<f32>,
    seed: Option<u64>,
    control_input: u32,
    cue: bool,
) -> Result<ExitCode> {
    let mut config = AppConfig::default();
    config.detection.initial_control_input = control_input;
    config.cue.enabled = cue;
    if let Some(rate) = rate_hz {
        config.sensors.rate_hz = rate;
    }
    if let Some(seed) = seed {
        config.sensors.simulation_seed = seed;
    }

    // Leaked so the debug HTTP server (when compiled in) can hold the
    // handle for the rest of the process.
    let engine: &'static EngineHandle = Box::leak(Box::new(EngineHandle::from_config(config)));
    motion_monitor::http::spawn_if_enabled(engine);

    let guard = engine.start_scoped().context("starting monitor")?;
    eprintln!(
        "Simulating for {:.1}s at {} Hz (threshold {:.1}); Ctrl-C stops early",
        duration_s,
        engine.config_snapshot().sensors.rate_hz,
        engine.current_threshold()
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building simulate runtime")?;

    let mut event_count: u64 = 0;
    runtime.block_on(async {
        let mut shakes = guard.engine().subscribe_shake();
        let deadline = tokio::time::sleep(Duration::from_secs_f32(duration_s.max(0.0)));
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                _ = tokio::signal::ctrl_c() => {
                    eprintln!("Interrupted, stopping monitor");
                    break;
                }
                event = shakes.recv() => match event {
                    Some(event) => {
                        event_count += 1;
                        println!("{}", serde_json::to_string(&event)?);
                    }
                    None => break,
                },
            }
        }
        anyhow::Ok(())
    })?;

    guard.stop().context("stopping monitor")?;
    eprintln!("Simulation finished: {} shake event(s)", event_count);
    Ok(ExitCode::from(0))
}

fn run_render_cue(
    out: PathBuf,
    duration_ms: u32,
    sample_rate: u32,
    amplitude: f32,
) -> Result<ExitCode> {
    let samples = synthesize_cue(sample_rate, duration_ms, amplitude);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&out, spec)
        .with_context(|| format!("creating {}", out.display()))?;
    for &sample in &samples {
        writer.write_sample(sample)?;
    }
    writer
        .finalize()
        .with_context(|| format!("finalizing {}", out.display()))?;

    let report = RenderReportPayload {
        out: out.display().to_string(),
        sample_rate,
        duration_ms,
        samples: samples.len(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

fn resolve_threshold(
    detection: &DetectionConfig,
    threshold: Option<f32>,
    control_input: Option<u32>,
) -> Result<f32> {
    let controller = SensitivityController::new(detection);
    if let Some(input) = control_input {
        controller.set_control_input(input);
    }
    if let Some(value) = threshold {
        controller
            .set_threshold(value)
            .context("threshold rejected")?;
    }
    Ok(controller.current())
}

fn emit_report(
    fixture: &str,
    sample_count: usize,
    events: &[ShakeEvent],
    output_path: Option<PathBuf>,
) -> Result<()> {
    let report = ReplayReportPayload {
        fixture,
        sample_count,
        event_count: events.len(),
        events,
    };
    let json = serde_json::to_string_pretty(&report)?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }

    Ok(())
}

fn emit_diff(diff: &ExpectationDiff) -> Result<()> {
    let json = serde_json::to_string_pretty(&diff.to_json())?;
    eprintln!("{json}");
    Ok(())
}

#[derive(Serialize)]
struct ClassifyReportPayload {
    values: [f32; 3],
    magnitude: f32,
    threshold: f32,
    shake: bool,
}

#[derive(Serialize)]
struct ReplayReportPayload<'a> {
    fixture: &'a str,
    sample_count: usize,
    event_count: usize,
    #[serde(skip_serializing_if = "slice_empty")]
    events: &'a [ShakeEvent],
}

#[derive(Serialize)]
struct RenderReportPayload {
    out: String,
    sample_rate: u32,
    duration_ms: u32,
    samples: usize,
}

fn slice_empty(events: &&[ShakeEvent]) -> bool {
    events.is_empty()
}
