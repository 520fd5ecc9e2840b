//! Oboe-backed cue output for Android.
//!
//! Opens a mono low-latency output stream via oboe-rs (AAudio/OpenSL ES) and
//! renders the shared [`CuePlayback`] buffer from the real-time callback. The
//! callback is real-time safe: atomic reads and buffer copies only, no locks,
//! no allocation, no blocking.

use std::sync::Arc;

use oboe::{
    AudioOutputCallback, AudioOutputStreamSafe, AudioStream, AudioStreamAsync, AudioStreamBuilder,
    DataCallbackResult, Output, PerformanceMode, SharingMode,
};

use super::playback::CuePlayback;
use crate::error::{log_cue_error, CueError};

/// Output callback feeding the oboe stream from the shared cue buffer.
struct CueOutputCallback {
    playback: Arc<CuePlayback>,
}

impl AudioOutputCallback for CueOutputCallback {
    type FrameType = (f32, oboe::Mono);

    fn on_audio_ready(
        &mut self,
        _stream: &mut dyn AudioOutputStreamSafe,
        frames: &mut [f32],
    ) -> DataCallbackResult {
        self.playback.fill(frames, 1);
        DataCallbackResult::Continue
    }

    fn on_error_after_close(&mut self, _stream: &mut dyn AudioOutputStreamSafe, error: oboe::Error) {
        let fault = CueError::PlaybackFault {
            reason: format!("{:?}", error),
        };
        log_cue_error(&fault, "on_error_after_close");
    }
}

/// Cue player holding a running oboe output stream.
///
/// The stream keeps rendering silence between triggers so retriggering never
/// pays a stream-open cost. Dropping the player stops and closes the stream.
pub struct CuePlayer {
    stream: Option<AudioStreamAsync<Output, CueOutputCallback>>,
    playback: Arc<CuePlayback>,
}

impl CuePlayer {
    /// Open and start a mono output stream playing `samples` at `source_rate`.
    pub fn new(samples: Vec<f32>, source_rate: u32) -> Result<Self, CueError> {
        let playback = Arc::new(CuePlayback::new(samples));
        let callback = CueOutputCallback {
            playback: Arc::clone(&playback),
        };

        let mut stream = AudioStreamBuilder::default()
            .set_performance_mode(PerformanceMode::LowLatency)
            .set_sharing_mode(SharingMode::Shared)
            .set_direction::<Output>()
            .set_sample_rate(source_rate as i32)
            .set_channel_count::<oboe::Mono>()
            .set_format::<f32>()
            .set_callback(callback)
            .open_stream()
            .map_err(|e| CueError::StreamBuildFailed {
                reason: format!("{:?}", e),
            })?;

        stream.start().map_err(|e| CueError::StreamStartFailed {
            reason: format!("{:?}", e),
        })?;

        log::info!(
            "[Cue] Oboe output stream running at {} Hz, mono, {}-frame cue",
            source_rate,
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
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                log::warn!("[Cue] Failed to stop oboe output stream: {:?}", e);
            }
        }
    }
}

impl Drop for CuePlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
