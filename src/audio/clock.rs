//! Virtual playback clock driven by rendered frames.

/// Counts frames rendered in the current pass and reports them as time.
///
/// Time is kept as an integer frame count so it never drifts, no matter how
/// the backend slices its callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackClock {
    frames: u64,
    sample_rate: u32,
}

impl PlaybackClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: 0,
            sample_rate,
        }
    }

    /// Frames rendered since the start of the pass.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Current time in milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.frames_to_ms(self.frames)
    }

    /// Time in milliseconds `frames` from now.
    pub fn ms_after(&self, frames: usize) -> f64 {
        self.frames_to_ms(self.frames + frames as u64)
    }

    /// Moves the clock forward by `frames`.
    pub fn advance(&mut self, frames: usize) {
        self.frames += frames as u64;
    }

    /// Rewinds to zero at the loop point.
    pub fn reset(&mut self) {
        self.frames = 0;
    }

    fn frames_to_ms(&self, frames: u64) -> f64 {
        frames as f64 * 1000.0 / self.sample_rate as f64
    }
}
