//! Timestamped MIDI events as the scheduler consumes them.

/// A channel message the scheduler knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    /// Selects the instrument preset for a channel.
    ProgramChange { channel: u8, program: u8 },
    /// Starts a note. Velocity is the raw 0-127 value.
    NoteOn { channel: u8, key: u8, velocity: u8 },
    /// Releases a note.
    NoteOff { channel: u8, key: u8 },
    /// Pitch wheel position, raw 14-bit value (8192 = centre).
    PitchBend { channel: u8, value: u16 },
    /// Controller change, raw 0-127 value.
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
}

impl MidiEvent {
    /// Returns the MIDI channel (0-15) this event addresses.
    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::ProgramChange { channel, .. }
            | MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::PitchBend { channel, .. }
            | MidiEvent::ControlChange { channel, .. } => channel,
        }
    }
}

/// An event positioned on the timeline, in milliseconds from the start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedEvent {
    pub time_ms: f64,
    pub event: MidiEvent,
}

impl TimedEvent {
    pub fn new(time_ms: f64, event: MidiEvent) -> Self {
        Self { time_ms, event }
    }
}
