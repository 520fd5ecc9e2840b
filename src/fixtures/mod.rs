//! Fixture utilities for the deterministic CLI harness.
//!
//! This module discovers JSON trace fixtures, parses optional expectation
//! sidecars, and replays recorded sample traces through the shake classifier
//! exactly as the live detection worker would see them. It is intentionally
//! desktop-focused to support CI and QA workflows.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;
use crate::detection::classifier::ShakeClassifier;
use crate::detection::ShakeEvent;
use crate::sensitivity::SensitivityController;
use crate::sensor::{SensorKind, SensorSample};

/// Default location for fixture trace/expectation assets.
pub const DEFAULT_FIXTURE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures");

/// Metadata describing an available fixture.
#[derive(Clone, Debug)]
pub struct FixtureMetadata {
    pub name: String,
    pub trace_path: PathBuf,
    pub expect_path: Option<PathBuf>,
}

/// One recorded sensor reading inside a trace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TraceRow {
    pub kind: SensorKind,
    pub values: [f32; 3],
    pub t_ms: u64,
}

impl TraceRow {
    pub fn to_sample(&self) -> SensorSample {
        SensorSample::new(self.kind, self.values, self.t_ms)
    }
}

/// JSON trace schema: samples in arrival order plus the sensitivity settings
/// the recording was made against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceFixture {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default)]
    pub control_input: Option<u32>,
    pub samples: Vec<TraceRow>,
}

/// Loaded fixture with its expectations, when a sidecar exists.
pub struct FixtureData {
    pub metadata: FixtureMetadata,
    pub trace: TraceFixture,
    pub expectations: Option<FixtureExpectations>,
}

/// JSON expectation schema for fixture verification.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureExpectations {
    pub fixture: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub events: Vec<ExpectedShake>,
    #[serde(default)]
    pub exact_count: Option<usize>,
}

/// Expected shake event definition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExpectedShake {
    pub t_ms: u64,
    #[serde(default = "default_tolerance")]
    pub tolerance_ms: u64,
}

fn default_tolerance() -> u64 {
    50
}

impl FixtureExpectations {
    /// Compare actual events against the sidecar, index by index.
    pub fn verify(&self, actual: &[ShakeEvent]) -> std::result::Result<(), ExpectationDiff> {
        let mut failures = Vec::new();

        for (idx, expected) in self.events.iter().enumerate() {
            match actual.get(idx) {
                Some(event) => {
                    let delta = event.timestamp_ms.abs_diff(expected.t_ms);
                    if delta > expected.tolerance_ms {
                        failures.push(ExpectationFailure {
                            index: idx,
                            kind: FailureKind::OutOfTolerance,
                            expected: Some(*expected),
                            actual: Some(*event),
                            delta_ms: Some(delta),
                        });
                    }
                }
                None => failures.push(ExpectationFailure {
                    index: idx,
                    kind: FailureKind::Missing,
                    expected: Some(*expected),
                    actual: None,
                    delta_ms: None,
                }),
            }
        }

        for (idx, event) in actual.iter().enumerate().skip(self.events.len()) {
            failures.push(ExpectationFailure {
                index: idx,
                kind: FailureKind::Extra,
                expected: None,
                actual: Some(*event),
                delta_ms: None,
            });
        }

        let count_mismatch = self.exact_count.and_then(|expected| {
            (actual.len() != expected).then_some(CountMismatch {
                expected,
                actual: actual.len(),
            })
        });

        if failures.is_empty() && count_mismatch.is_none() {
            Ok(())
        } else {
            Err(ExpectationDiff {
                failures,
                count_mismatch,
            })
        }
    }
}

/// How a single expectation entry failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Missing,
    Extra,
    OutOfTolerance,
}

/// Outcome of comparing actual events with expectations.
#[derive(Debug, Serialize)]
pub struct ExpectationDiff {
    pub failures: Vec<ExpectationFailure>,
    pub count_mismatch: Option<CountMismatch>,
}

impl ExpectationDiff {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "failures": self.failures,
            "count_mismatch": self.count_mismatch,
        })
    }
}

/// Event-count divergence when the sidecar pins an exact count.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CountMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// Detailed diff entry for a single failure.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExpectationFailure {
    pub index: usize,
    pub kind: FailureKind,
    pub expected: Option<ExpectedShake>,
    pub actual: Option<ShakeEvent>,
    pub delta_ms: Option<u64>,
}

/// Catalog responsible for discovering fixtures on disk.
pub struct FixtureCatalog {
    root: PathBuf,
}

impl FixtureCatalog {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List all fixtures by their metadata.
    pub fn discover(&self) -> Result<Vec<FixtureMetadata>> {
        let mut fixtures = Vec::new();
        if !self.root.exists() {
            return Ok(fixtures);
        }

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if !file_name.ends_with(".json") || file_name.ends_with(".expect.json") {
                continue;
            }

            let expect = path.with_extension("expect.json");
            fixtures.push(FixtureMetadata {
                name: path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string(),
                trace_path: path.clone(),
                expect_path: expect.exists().then_some(expect),
            });
        }

        fixtures.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(fixtures)
    }

    /// Load a trace + expectations for the provided name or path.
    pub fn load(&self, fixture: &str, override_expect: Option<PathBuf>) -> Result<FixtureData> {
        let trace_path = self.resolve_fixture_path(fixture)?;
        let metadata = self.metadata_for_path(&trace_path)?;
        let trace = read_trace(&trace_path)?;

        let expectation_path = override_expect.or(metadata.expect_path.clone());
        let expectations = match expectation_path {
            Some(path) => {
                let json = fs::read_to_string(&path)
                    .with_context(|| format!("reading expectation {}", path.display()))?;
                Some(
                    serde_json::from_str(&json)
                        .with_context(|| format!("parsing {}", path.display()))?,
                )
            }
            None => None,
        };

        Ok(FixtureData {
            metadata,
            trace,
            expectations,
        })
    }

    fn resolve_fixture_path(&self, fixture: &str) -> Result<PathBuf> {
        let as_path = Path::new(fixture);
        if as_path.exists() {
            return Ok(as_path.to_path_buf());
        }

        let candidate = self.root.join(format!("{fixture}.json"));
        if candidate.exists() {
            Ok(candidate)
        } else {
            Err(anyhow!(
                "Fixture '{fixture}' not found in {}",
                self.root.display()
            ))
        }
    }

    fn metadata_for_path(&self, trace_path: &Path) -> Result<FixtureMetadata> {
        let name = trace_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("Invalid fixture name for {}", trace_path.display()))?
            .to_string();
        let expect_path = trace_path.with_extension("expect.json");
        Ok(FixtureMetadata {
            name,
            trace_path: trace_path.to_path_buf(),
            expect_path: expect_path.exists().then_some(expect_path),
        })
    }
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_FIXTURE_ROOT)
    }
}

fn read_trace(path: &Path) -> Result<TraceFixture> {
    let json =
        fs::read_to_string(path).with_context(|| format!("reading trace {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

/// Replays traces through the classifier with resolved sensitivity settings.
///
/// Later writers win: the config default, then the trace's own
/// `control_input` and `threshold`, then explicit overrides set on the
/// processor itself.
pub struct FixtureProcessor {
    detection: DetectionConfig,
    control_input: Option<u32>,
    threshold: Option<f32>,
}

impl FixtureProcessor {
    pub fn new(detection: DetectionConfig) -> Self {
        Self {
            detection,
            control_input: None,
            threshold: None,
        }
    }

    pub fn with_control_input(mut self, input: u32) -> Self {
        self.control_input = Some(input);
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn run(&self, data: &FixtureData) -> Result<Vec<ShakeEvent>> {
        self.run_trace(&data.trace)
    }

    pub fn run_trace(&self, trace: &TraceFixture) -> Result<Vec<ShakeEvent>> {
        let sensitivity = Arc::new(SensitivityController::new(&self.detection));

        if let Some(input) = trace.control_input {
            sensitivity.set_control_input(input);
        }
        if let Some(threshold) = trace.threshold {
            sensitivity
                .set_threshold(threshold)
                .with_context(|| format!("trace '{}' declares an invalid threshold", trace.name))?;
        }
        if let Some(input) = self.control_input {
            sensitivity.set_control_input(input);
        }
        if let Some(threshold) = self.threshold {
            sensitivity
                .set_threshold(threshold)
                .context("threshold override rejected")?;
        }

        let classifier = ShakeClassifier::new(Arc::clone(&sensitivity));
        Ok(trace
            .samples
            .iter()
            .filter_map(|row| classifier.classify(&row.to_sample()))
            .collect())
    }
}
