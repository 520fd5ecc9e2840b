//! Audible shake cue: synthesis, shared playback state, and platform output.
//!
//! The cue pipeline is split into three layers:
//! - [`synth`] produces or decodes the cue sample buffer (percussive burst or
//!   a WAV asset),
//! - [`playback`] holds the lock-free playhead shared with the audio callback,
//! - a platform `CuePlayer` owns the output stream (oboe on Android, cpal on
//!   desktop) and renders the shared buffer from the real-time thread.
//!
//! Triggering is fire-and-forget: [`playback::CuePlayback::trigger`] flags a
//! restart that the next audio callback picks up, so overlapping triggers
//! coalesce into a single restart from the top of the cue.

pub mod playback;
pub mod synth;

cfg_if::cfg_if! {
    if #[cfg(target_os = "android")] {
        mod player_oboe;
        pub use player_oboe::CuePlayer;
    } else {
        mod player_cpal;
        pub use player_cpal::CuePlayer;
    }
}

pub use playback::CuePlayback;
pub use synth::{cue_samples_for, load_cue_asset, resample_linear, synthesize_cue};
