//! Errors returned by session start-up.

use crate::audio::{DeviceError, SoundBankError};
use crate::midi::TimelineError;

/// Status code for a successful start.
pub const STATUS_OK: i32 = 0;

/// Why a playback session could not start.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("a playback session is already running")]
    AlreadyRunning,
    #[error("out of memory while loading the timeline")]
    AllocationFailure,
    #[error("failed to load MIDI file: {0}")]
    TimelineLoad(#[source] TimelineError),
    #[error("failed to load SoundFont: {0}")]
    SoundBankLoad(#[from] SoundBankError),
    #[error("audio device error: {0}")]
    Device(#[from] DeviceError),
}

impl PlaybackError {
    /// Numeric status for callers that speak in codes.
    pub fn code(&self) -> i32 {
        match self {
            PlaybackError::AlreadyRunning => -1,
            PlaybackError::AllocationFailure => 1,
            PlaybackError::TimelineLoad(_) => 2,
            PlaybackError::SoundBankLoad(_) => 3,
            PlaybackError::Device(_) => 4,
        }
    }
}

impl From<TimelineError> for PlaybackError {
    fn from(e: TimelineError) -> Self {
        match e {
            TimelineError::Allocation(_) => PlaybackError::AllocationFailure,
            other => PlaybackError::TimelineLoad(other),
        }
    }
}

/// Maps a start result to its status code.
pub fn status_code(result: &Result<(), PlaybackError>) -> i32 {
    match result {
        Ok(()) => STATUS_OK,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(status_code(&Ok(())), 0);
        assert_eq!(status_code(&Err(PlaybackError::AlreadyRunning)), -1);

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(PlaybackError::from(TimelineError::Io(io)).code(), 2);

        let mut v: Vec<u8> = Vec::new();
        let overflow = v.try_reserve(usize::MAX).unwrap_err();
        assert!(matches!(
            PlaybackError::from(TimelineError::Allocation(overflow)),
            PlaybackError::AllocationFailure
        ));

        let bank = SoundBankError::Invalid("bad".into());
        assert_eq!(PlaybackError::from(bank).code(), 3);
        assert_eq!(
            PlaybackError::from(DeviceError::Open("none".into())).code(),
            4
        );
    }
}
