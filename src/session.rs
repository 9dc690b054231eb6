//! Playback session lifecycle.
//!
//! A [`Session`] binds one timeline, one synthesizer, one set of channel
//! gates and one output stream. At most one session exists per process;
//! the marker is claimed before any loading and released only after the
//! stream and everything it owns are gone.

use crate::audio::{
    AudioBackend, ChannelGates, Scheduler, SoundBankError, SoundFontSynth, StreamFormat,
    SynthPort,
};
use crate::config::{DeviceErrorPolicy, PlayerConfig};
use crate::error::PlaybackError;
use crate::midi::{Timeline, CHANNEL_COUNT};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set while a session exists anywhere in the process.
static SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Ownership of the process-wide session marker. Released on drop.
#[derive(Debug)]
struct InstanceGuard(());

impl InstanceGuard {
    fn acquire() -> Result<Self, PlaybackError> {
        SESSION_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InstanceGuard(()))
            .map_err(|_| PlaybackError::AlreadyRunning)
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        SESSION_ACTIVE.store(false, Ordering::Release);
    }
}

/// Returns true if a session is live anywhere in the process.
pub fn is_session_active() -> bool {
    SESSION_ACTIVE.load(Ordering::Acquire)
}

/// A running playback session.
///
/// Dropping the session stops it: the stream goes first (which quiesces and
/// drops the callback, then the synthesizer, then the timeline), and the
/// process-wide marker last.
pub struct Session<St> {
    stream: Option<St>,
    gates: Arc<ChannelGates>,
    /// Cleared before the stream is torn down; the callback renders nothing after.
    live: Arc<AtomicBool>,
    _instance: InstanceGuard,
}

impl<St> Session<St> {
    /// Starts playback of a MIDI file through a SoundFont.
    ///
    /// `initial_channels` gives each channel's starting mute state; when
    /// absent, the config's default is used, and failing that every channel
    /// starts active.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Another session is already running
    /// - The MIDI file or SoundFont cannot be loaded
    /// - The output device fails and the config says to abort
    pub fn start<B, P1, P2>(
        midi_path: P1,
        soundfont_path: P2,
        initial_channels: Option<[bool; CHANNEL_COUNT]>,
        backend: &B,
        config: &PlayerConfig,
    ) -> Result<Self, PlaybackError>
    where
        B: AudioBackend<Stream = St>,
        P1: AsRef<Path>,
        P2: AsRef<Path>,
    {
        let soundfont_path = soundfont_path.as_ref();
        Self::start_with(
            midi_path,
            |sample_rate, block_frames| {
                SoundFontSynth::load(soundfont_path, sample_rate, block_frames)
            },
            initial_channels,
            backend,
            config,
        )
    }

    /// Like [`Session::start`], with a caller-supplied synthesizer loader.
    ///
    /// `load_synth` receives the sample rate and render block size.
    pub fn start_with<B, S, F, P>(
        midi_path: P,
        load_synth: F,
        initial_channels: Option<[bool; CHANNEL_COUNT]>,
        backend: &B,
        config: &PlayerConfig,
    ) -> Result<Self, PlaybackError>
    where
        B: AudioBackend<Stream = St>,
        S: SynthPort + 'static,
        F: FnOnce(u32, usize) -> Result<S, SoundBankError>,
        P: AsRef<Path>,
    {
        let instance = InstanceGuard::acquire()?;

        let midi_path = midi_path.as_ref();
        let timeline = Timeline::load(midi_path)?;

        let initial = initial_channels
            .or(config.initial_channels)
            .unwrap_or([true; CHANNEL_COUNT]);
        let gates = Arc::new(ChannelGates::new(timeline.used_channels(), initial));

        let synth = load_synth(config.sample_rate, config.render_block_frames)?;

        let mut scheduler = Scheduler::new(
            synth,
            timeline,
            Arc::clone(&gates),
            config.sample_rate,
            config.render_block_frames,
        );
        let live = Arc::new(AtomicBool::new(true));
        let callback_live = Arc::clone(&live);
        let callback = Box::new(move |out: &mut [f32]| {
            if callback_live.load(Ordering::Acquire) {
                scheduler.process(out);
            }
        });

        let format = StreamFormat {
            sample_rate: config.sample_rate,
            buffer_frames: config.device_buffer_frames,
        };
        let stream = match backend.open(format, callback) {
            Ok(stream) => Some(stream),
            Err(e) => match config.on_device_error {
                DeviceErrorPolicy::Abort => return Err(e.into()),
                DeviceErrorPolicy::Degrade => {
                    tracing::warn!("Continuing without audio output: {}", e);
                    None
                }
            },
        };

        tracing::info!(
            "Playing {} (channels in use: {})",
            midi_path.display(),
            crate::midi::format_channels(&gates.used_channels())
        );

        Ok(Self {
            stream,
            gates,
            live,
            _instance: instance,
        })
    }

    /// The channel gate table shared with the callback.
    pub fn gates(&self) -> &ChannelGates {
        &self.gates
    }

    /// Whether an output stream is running. False for a degraded session.
    pub fn has_output(&self) -> bool {
        self.stream.is_some()
    }

    /// Stops playback and releases every resource.
    pub fn stop(self) {
        drop(self);
    }
}

impl<St> Drop for Session<St> {
    fn drop(&mut self) {
        self.live.store(false, Ordering::Release);
        drop(self.stream.take());
        tracing::info!("Playback stopped");
    }
}
