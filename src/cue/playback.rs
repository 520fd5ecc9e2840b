// Shared playhead state between trigger callers and the output callback
//
// Trigger and render run on different threads. A pending flag carries the
// restart request into the callback: any number of triggers between two
// callbacks collapse into a single restart, which is exactly the coalescing
// behavior the cue contract asks for. The callback itself stays allocation
// free and lock free.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub struct CuePlayback {
    cue: Vec<f32>,
    playhead: AtomicUsize,
    pending: AtomicBool,
}

impl CuePlayback {
    pub fn new(cue: Vec<f32>) -> Self {
        let len = cue.len();
        Self {
            cue,
            // Start exhausted: the stream idles on silence until triggered.
            playhead: AtomicUsize::new(len),
            pending: AtomicBool::new(false),
        }
    }

    /// Request a restart of the cue from the top.
    ///
    /// Fire-and-forget: works identically whether the cue is idle or
    /// mid-flight, and repeated calls before the next render collapse
    /// into one restart.
    pub fn trigger(&self) {
        self.pending.store(true, Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.pending.load(Ordering::Acquire) || self.playhead.load(Ordering::Relaxed) < self.cue.len()
    }

    pub fn len(&self) -> usize {
        self.cue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cue.is_empty()
    }

    /// Fill an interleaved output block, all channels carrying the cue.
    ///
    /// Returns the number of frames rendered from the cue (the rest of the
    /// block is silence).
    pub fn fill(&self, data: &mut [f32], channels: usize) -> usize {
        if channels == 0 {
            return 0;
        }

        let mut pos = if self.pending.swap(false, Ordering::AcqRel) {
            0
        } else {
            self.playhead.load(Ordering::Relaxed)
        };

        let frame_count = data.len() / channels;
        let mut rendered = 0;

        for i in 0..frame_count {
            let value = if pos < self.cue.len() {
                let v = self.cue[pos];
                pos += 1;
                rendered += 1;
                v
            } else {
                0.0
            };

            for ch in 0..channels {
                data[i * channels + ch] = value;
            }
        }

        self.playhead.store(pos, Ordering::Relaxed);
        rendered
    }
}
