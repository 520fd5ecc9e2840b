//! Cue waveform generation and asset loading
//!
//! The cue is a short crack-like transient: seeded white noise shaped by an
//! exponential decay envelope. Generation is deterministic (fixed seed) so
//! rendered output is identical across runs. An optional WAV asset replaces
//! the synthesized burst when configured.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::CueConfig;
use crate::error::CueError;

/// Fixed seed for deterministic noise generation
const SYNTH_SEED: u64 = 42;

/// Envelope time constants per cue duration; the tail lands at e^-5.
const DECAY_CONSTANTS: f32 = 5.0;

/// Generate the cue waveform.
///
/// # Arguments
/// * `sample_rate` - Output sample rate in Hz (typically 48000)
/// * `duration_ms` - Cue length in milliseconds
/// * `amplitude` - Peak amplitude, clamped to [0.0, 1.0]
///
/// # Returns
/// A `Vec<f32>` with exactly `duration_ms` worth of samples, every value
/// within `[-amplitude, amplitude]`.
pub fn synthesize_cue(sample_rate: u32, duration_ms: u32, amplitude: f32) -> Vec<f32> {
    let num_samples = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
    let amplitude = amplitude.clamp(0.0, 1.0);

    let mut rng = StdRng::seed_from_u64(SYNTH_SEED);
    let tau = num_samples as f32 / DECAY_CONSTANTS;

    let mut samples = Vec::with_capacity(num_samples);
    for i in 0..num_samples {
        let noise: f32 = rng.gen_range(-1.0..1.0);
        let envelope = if tau > 0.0 { (-(i as f32) / tau).exp() } else { 0.0 };
        samples.push(noise * envelope * amplitude);
    }

    samples
}

/// Decode a WAV cue asset into f32 samples.
///
/// Multi-channel files are reduced to the first channel; integer formats
/// are normalized into [-1.0, 1.0]. Returns the samples together with the
/// asset's own sample rate.
pub fn load_cue_asset(path: &Path) -> Result<(Vec<f32>, u32), CueError> {
    let display = path.display().to_string();
    let mut reader = hound::WavReader::open(path).map_err(|err| CueError::AssetDecodeFailed {
        path: display.clone(),
        reason: err.to_string(),
    })?;

    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    let sample_rate = spec.sample_rate;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()
            .map_err(|err| CueError::AssetDecodeFailed {
                path: display.clone(),
                reason: err.to_string(),
            })?,
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            match spec.bits_per_sample {
                16 => reader
                    .samples::<i16>()
                    .map(|sample| sample.map(|value| value as f32 / max))
                    .collect::<Result<Vec<f32>, _>>(),
                24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / max))
                    .collect::<Result<Vec<f32>, _>>(),
                other => {
                    return Err(CueError::AssetDecodeFailed {
                        path: display,
                        reason: format!("unsupported bits per sample: {}", other),
                    })
                }
            }
            .map_err(|err| CueError::AssetDecodeFailed {
                path: display.clone(),
                reason: err.to_string(),
            })?
        }
    };

    // Take the first channel of interleaved frames.
    let samples: Vec<f32> = interleaved.chunks(channels).map(|frame| frame[0]).collect();

    if samples.is_empty() {
        return Err(CueError::AssetDecodeFailed {
            path: display,
            reason: "asset contains no samples".to_string(),
        });
    }

    Ok((samples, sample_rate))
}

/// Resolve the cue waveform for a configuration.
///
/// Prefers the configured asset; falls back to the synthesized burst with a
/// warning when the asset is missing or undecodable.
pub fn cue_samples_for(config: &CueConfig) -> (Vec<f32>, u32) {
    if let Some(ref path) = config.asset_path {
        match load_cue_asset(path) {
            Ok((samples, rate)) => {
                log::info!(
                    "[Cue] Loaded asset {:?} ({} samples at {} Hz)",
                    path,
                    samples.len(),
                    rate
                );
                return (samples, rate);
            }
            Err(err) => {
                log::warn!("[Cue] Falling back to synthesized cue: {}", err);
            }
        }
    }

    (
        synthesize_cue(config.sample_rate, config.duration_ms, config.amplitude),
        config.sample_rate,
    )
}

/// Linear resampler for matching an asset's rate to the device rate.
///
/// Quality is sufficient for a broadband noise transient; this is not a
/// general-purpose resampler.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == 0 || to_rate == 0 || from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round().max(1.0) as usize;

    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let source = i as f64 * ratio;
        let index = source.floor() as usize;
        let frac = (source - index as f64) as f32;
        let current = samples[index.min(samples.len() - 1)];
        let next = samples[(index + 1).min(samples.len() - 1)];
        out.push(current + (next - current) * frac);
    }

    out
}
