// Desktop cue player backed by cpal

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::cue::playback::CuePlayback;
use crate::cue::synth::resample_linear;
use crate::error::{log_cue_error, CueError};

/// Cue output over the default cpal device.
///
/// The stream runs for the lifetime of the player and idles on silence;
/// triggering resets the shared playhead rather than rebuilding the stream,
/// which keeps trigger latency at one callback period.
pub struct CuePlayer {
    stream: Option<cpal::Stream>,
    playback: Arc<CuePlayback>,
}

// SAFETY: `cpal::Stream` is `!Send` as a cross-platform lowest common
// denominator. The player lives behind `CueManager`'s mutex and crosses
// threads only as a unit; after construction the stream is never touched
// except to drop it, and `trigger`/`is_playing` go through the atomic
// `CuePlayback` state.
unsafe impl Send for CuePlayer {}

impl CuePlayer {
    pub fn new(samples: Vec<f32>, source_rate: u32) -> Result<Self, CueError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(CueError::NoOutputDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| CueError::ConfigUnsupported {
                details: format!("Failed to get default output config: {:?}", e),
            })?;

        let stream_config: cpal::StreamConfig = config.clone().into();
        let channels_count = stream_config.channels as usize;
        let device_rate = stream_config.sample_rate.0;

        let samples = if device_rate != source_rate {
            log::debug!(
                "[Cue] Resampling cue from {} Hz to device rate {} Hz",
                source_rate,
                device_rate
            );
            resample_linear(&samples, source_rate, device_rate)
        } else {
            samples
        };

        let playback = Arc::new(CuePlayback::new(samples));
        let playback_cb = Arc::clone(&playback);

        let err_fn = |err: cpal::StreamError| {
            let fault = CueError::PlaybackFault {
                reason: err.to_string(),
            };
            log_cue_error(&fault, "output_stream");
        };

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    playback_cb.fill(data, channels_count);
                },
                err_fn,
                None,
            ),
            other => {
                return Err(CueError::ConfigUnsupported {
                    details: format!("Only F32 output is supported (device offers {:?})", other),
                })
            }
        }
        .map_err(|e| CueError::StreamBuildFailed {
            reason: format!("{:?}", e),
        })?;

        stream.play().map_err(|e| CueError::StreamStartFailed {
            reason: e.to_string(),
        })?;

        log::info!(
            "[Cue] Output stream running at {} Hz, {} channels, {}-frame cue",
            device_rate,
            channels_count,
            playback.len()
        );

        Ok(Self {
            stream: Some(stream),
            playback,
        })
    }

    /// Restart cue playback from the top (also starts it when idle).
    pub fn trigger(&self) {
        self.playback.trigger();
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
    }
}

impl Drop for CuePlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
