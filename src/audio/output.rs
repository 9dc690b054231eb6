//! Audio output devices.
//!
//! The [`AudioBackend`] trait is the seam between the scheduler and a real
//! device: it takes a render callback and returns a stream handle whose drop
//! stops the device. [`RodioBackend`] plays through the default output
//! device via rodio.

use rodio::{OutputStream, OutputStreamHandle, Source};
use std::time::Duration;

/// Interleaved stereo render callback, invoked from the audio thread.
pub type RenderCallback = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// Output channels. The callback always produces interleaved stereo.
pub const OUTPUT_CHANNELS: u16 = 2;

/// Errors from opening or starting an output stream.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// No usable output device
    #[error("failed to open audio output: {0}")]
    Open(String),
    /// The device opened but refused to play
    #[error("failed to start audio playback: {0}")]
    Start(String),
}

/// Stream parameters requested from a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    /// Frames per callback invocation, where the backend lets us choose.
    pub buffer_frames: usize,
}

/// Something that can play a render callback.
pub trait AudioBackend {
    /// Keeps the stream alive. Dropping it must stop the device and drop
    /// the callback before returning.
    type Stream;

    /// Opens and starts a stream driven by `callback`.
    fn open(&self, format: StreamFormat, callback: RenderCallback)
        -> Result<Self::Stream, DeviceError>;
}

/// Plays through the system's default output device.
#[derive(Debug, Clone, Copy, Default)]
pub struct RodioBackend;

/// A running rodio stream.
pub struct RodioStream {
    /// Audio output stream (must be kept alive).
    _stream: OutputStream,
    /// Audio output handle for playback.
    _stream_handle: OutputStreamHandle,
}

impl AudioBackend for RodioBackend {
    type Stream = RodioStream;

    fn open(
        &self,
        format: StreamFormat,
        callback: RenderCallback,
    ) -> Result<RodioStream, DeviceError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| DeviceError::Open(e.to_string()))?;

        let source = CallbackSource::new(callback, format);
        stream_handle
            .play_raw(source)
            .map_err(|e| DeviceError::Start(e.to_string()))?;

        Ok(RodioStream {
            _stream: stream,
            _stream_handle: stream_handle,
        })
    }
}

/// Adapts a block render callback to rodio's per-sample `Source`.
struct CallbackSource {
    callback: RenderCallback,
    /// Interleaved stereo buffer.
    buffer: Vec<f32>,
    /// Current position in the buffer.
    pos: usize,
    sample_rate: u32,
}

impl CallbackSource {
    fn new(callback: RenderCallback, format: StreamFormat) -> Self {
        let len = format.buffer_frames.max(1) * OUTPUT_CHANNELS as usize;
        Self {
            callback,
            buffer: vec![0.0; len],
            pos: len, // Start at end to trigger first render
            sample_rate: format.sample_rate,
        }
    }
}

impl Iterator for CallbackSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.pos >= self.buffer.len() {
            // A callback that writes nothing leaves silence
            self.buffer.fill(0.0);
            (self.callback)(&mut self.buffer[..]);
            self.pos = 0;
        }
        let sample = self.buffer[self.pos];
        self.pos += 1;
        Some(sample)
    }
}

impl Source for CallbackSource {
    fn current_frame_len(&self) -> Option<usize> {
        None // Continuous stream
    }

    fn channels(&self) -> u16 {
        OUTPUT_CHANNELS
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None // Infinite stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_source_refills_per_buffer() {
        let mut calls = 0u32;
        let callback: RenderCallback = Box::new(move |out: &mut [f32]| {
            calls += 1;
            for (i, frame) in out.chunks_exact_mut(2).enumerate() {
                frame[0] = calls as f32;
                frame[1] = -(i as f32);
            }
        });
        let format = StreamFormat {
            sample_rate: 48000,
            buffer_frames: 2,
        };
        let source = CallbackSource::new(callback, format);
        assert_eq!(source.channels(), 2);
        assert_eq!(source.sample_rate(), 48000);

        let samples: Vec<f32> = source.take(8).collect();
        assert_eq!(samples, vec![1.0, 0.0, 1.0, -1.0, 2.0, 0.0, 2.0, -1.0]);
    }

    #[test]
    fn test_untouched_buffer_plays_silence() {
        let callback: RenderCallback = Box::new(|_: &mut [f32]| {});
        let format = StreamFormat {
            sample_rate: 44100,
            buffer_frames: 4,
        };
        let source = CallbackSource::new(callback, format);
        assert!(source.take(16).all(|s| s == 0.0));
    }
}
