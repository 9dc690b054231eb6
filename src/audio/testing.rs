//! Test doubles for the synthesizer and output device.

use super::output::{AudioBackend, DeviceError, RenderCallback, StreamFormat};
use super::synth::{SoundBankError, SynthPort};
use std::sync::{Arc, Mutex, MutexGuard};

/// One command received by a [`RecordingSynth`].
#[derive(Debug, Clone, PartialEq)]
pub enum SynthCall {
    Preset { channel: u8, program: u8, drums: bool },
    NoteOn { channel: u8, key: u8, velocity: f32 },
    NoteOff { channel: u8, key: u8 },
    PitchBend { channel: u8, value: u16 },
    Control { channel: u8, controller: u8, value: u8 },
    Silence { channel: u8 },
    Reset,
}

impl SynthCall {
    pub fn channel(&self) -> Option<u8> {
        match *self {
            SynthCall::Preset { channel, .. }
            | SynthCall::NoteOn { channel, .. }
            | SynthCall::NoteOff { channel, .. }
            | SynthCall::PitchBend { channel, .. }
            | SynthCall::Control { channel, .. }
            | SynthCall::Silence { channel } => Some(channel),
            SynthCall::Reset => None,
        }
    }
}

/// Logs every command and renders the number of sounding voices as a
/// constant signal on both channels.
///
/// Each NoteOn starts a new voice, like a real synthesizer retriggering a
/// key. The log is shared so tests can read it after the synth has moved
/// into a stream.
#[derive(Debug, Default)]
pub struct RecordingSynth {
    log: Arc<Mutex<Vec<SynthCall>>>,
    voices: Vec<(u8, u8)>,
    calls: Vec<SynthCall>,
}

impl RecordingSynth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of the command log.
    pub fn log(&self) -> Arc<Mutex<Vec<SynthCall>>> {
        Arc::clone(&self.log)
    }

    /// Commands received so far.
    pub fn calls(&self) -> &[SynthCall] {
        &self.calls
    }

    fn record(&mut self, call: SynthCall) {
        self.log.lock().unwrap().push(call.clone());
        self.calls.push(call);
    }
}

impl SynthPort for RecordingSynth {
    fn set_preset(&mut self, channel: u8, program: u8, drums: bool) {
        self.record(SynthCall::Preset {
            channel,
            program,
            drums,
        });
    }

    fn note_on(&mut self, channel: u8, key: u8, velocity: f32) {
        self.voices.push((channel, key));
        self.record(SynthCall::NoteOn {
            channel,
            key,
            velocity,
        });
    }

    fn note_off(&mut self, channel: u8, key: u8) {
        self.voices.retain(|&v| v != (channel, key));
        self.record(SynthCall::NoteOff { channel, key });
    }

    fn pitch_bend(&mut self, channel: u8, value: u16) {
        self.record(SynthCall::PitchBend { channel, value });
    }

    fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        self.record(SynthCall::Control {
            channel,
            controller,
            value,
        });
    }

    fn silence_channel(&mut self, channel: u8) {
        self.voices.retain(|&(c, _)| c != channel);
        self.record(SynthCall::Silence { channel });
    }

    fn reset(&mut self) {
        self.voices.clear();
        self.record(SynthCall::Reset);
    }

    fn render(&mut self, out: &mut [f32]) {
        out.fill(self.voices.len() as f32);
    }
}

/// Loader returning a fresh [`RecordingSynth`] and a handle to its log.
pub fn recording_loader() -> (
    impl FnOnce(u32, usize) -> Result<RecordingSynth, SoundBankError>,
    Arc<Mutex<Vec<SynthCall>>>,
) {
    let synth = RecordingSynth::new();
    let log = synth.log();
    (move |_, _| Ok(synth), log)
}

type Slot = Arc<Mutex<Option<RenderCallback>>>;

/// Holds the render callback so tests can pump it by hand.
#[derive(Default, Clone)]
pub struct ManualBackend {
    slot: Slot,
    fail: bool,
}

/// Stream handle for [`ManualBackend`]; dropping it drops the callback.
pub struct ManualStream {
    slot: Slot,
}

impl ManualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose `open` always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Whether a stream currently holds a callback.
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Invokes the callback for `frames` frames, like a device would.
    ///
    /// Returns `None` when no stream is open.
    pub fn pump(&self, frames: usize) -> Option<Vec<f32>> {
        let mut slot = self.lock();
        let callback = slot.as_mut()?;
        let mut buf = vec![0.0; frames * 2];
        callback(buf.as_mut_slice());
        Some(buf)
    }

    fn lock(&self) -> MutexGuard<'_, Option<RenderCallback>> {
        self.slot.lock().unwrap()
    }
}

impl AudioBackend for ManualBackend {
    type Stream = ManualStream;

    fn open(
        &self,
        _format: StreamFormat,
        callback: RenderCallback,
    ) -> Result<ManualStream, DeviceError> {
        if self.fail {
            return Err(DeviceError::Open("no device".to_string()));
        }
        *self.lock() = Some(callback);
        Ok(ManualStream {
            slot: Arc::clone(&self.slot),
        })
    }
}

impl Drop for ManualStream {
    fn drop(&mut self) {
        self.slot.lock().unwrap().take();
    }
}
