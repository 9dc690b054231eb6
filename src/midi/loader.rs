//! Standard MIDI File (SMF) loading.
//!
//! Flattens every track of a .mid file into a single [`Timeline`] whose
//! timestamps are milliseconds, with tempo changes already applied.
//!
//! # Behaviour
//!
//! - Format 0 and 1 tracks play in parallel; Format 2 tracks play one after another
//! - Tempo meta events from any track form a global tempo map
//! - NoteOn with velocity 0 is treated as NoteOff
//! - Aftertouch, SysEx and non-tempo meta events are skipped

use super::event::{MidiEvent, TimedEvent};
use super::timeline::Timeline;
use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::TryReserveError;
use std::fs;
use std::path::Path;

/// Microseconds per beat until the first tempo event (120 BPM).
const DEFAULT_TEMPO_US: u32 = 500_000;

/// Errors that can occur while loading a timeline.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// MIDI parsing failed
    #[error("MIDI parse error: {0}")]
    Parse(#[from] midly::Error),
    /// The event buffer could not be allocated
    #[error("out of memory while building timeline: {0}")]
    Allocation(#[from] TryReserveError),
}

/// A channel message or tempo change at an absolute tick.
#[derive(Clone, Copy)]
struct RawEvent {
    tick: u64,
    kind: RawKind,
}

#[derive(Clone, Copy)]
enum RawKind {
    Tempo(u32),
    Channel(u8, MidiMessage),
}

/// Converts absolute ticks to milliseconds, following tempo changes.
enum TickClock {
    Metrical {
        ticks_per_beat: f64,
        us_per_beat: f64,
        anchor_tick: u64,
        anchor_ms: f64,
    },
    Timecode {
        ms_per_tick: f64,
    },
}

impl TickClock {
    fn new(timing: Timing) -> Self {
        match timing {
            Timing::Metrical(tpb) => TickClock::Metrical {
                ticks_per_beat: tpb.as_int().max(1) as f64,
                us_per_beat: DEFAULT_TEMPO_US as f64,
                anchor_tick: 0,
                anchor_ms: 0.0,
            },
            Timing::Timecode(fps, subframes) => TickClock::Timecode {
                ms_per_tick: 1000.0 / (fps.as_f32() as f64 * subframes.max(1) as f64),
            },
        }
    }

    fn to_ms(&self, tick: u64) -> f64 {
        match *self {
            TickClock::Metrical {
                ticks_per_beat,
                us_per_beat,
                anchor_tick,
                anchor_ms,
            } => {
                let beats = (tick - anchor_tick) as f64 / ticks_per_beat;
                anchor_ms + beats * us_per_beat / 1000.0
            }
            TickClock::Timecode { ms_per_tick } => tick as f64 * ms_per_tick,
        }
    }

    /// Applies a tempo change at `tick`. Timecode timing ignores tempo.
    fn set_tempo(&mut self, tick: u64, us: u32) {
        let now_ms = self.to_ms(tick);
        if let TickClock::Metrical {
            us_per_beat,
            anchor_tick,
            anchor_ms,
            ..
        } = self
        {
            *anchor_ms = now_ms;
            *anchor_tick = tick;
            *us_per_beat = us as f64;
        }
    }
}

impl Timeline {
    /// Loads a timeline from a Standard MIDI File.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TimelineError> {
        let data = fs::read(path.as_ref())?;
        let timeline = parse_smf(&data)?;
        tracing::debug!(
            "Loaded {} events ({:.0} ms) from {}",
            timeline.len(),
            timeline.duration_ms(),
            path.as_ref().display()
        );
        Ok(timeline)
    }
}

/// Parses SMF bytes into a timeline.
pub fn parse_smf(data: &[u8]) -> Result<Timeline, TimelineError> {
    let smf = Smf::parse(data)?;
    let sequential = smf.header.format == Format::Sequential;

    let capacity = smf.tracks.iter().map(|t| t.len()).sum();
    let mut raw: Vec<RawEvent> = Vec::new();
    raw.try_reserve_exact(capacity)?;

    let mut track_offset: u64 = 0;
    for track in &smf.tracks {
        let mut tick = track_offset;
        for event in track {
            tick += event.delta.as_int() as u64;
            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(us)) => raw.push(RawEvent {
                    tick,
                    kind: RawKind::Tempo(us.as_int()),
                }),
                TrackEventKind::Midi { channel, message } => raw.push(RawEvent {
                    tick,
                    kind: RawKind::Channel(channel.as_int(), message),
                }),
                _ => {}
            }
        }
        if sequential {
            track_offset = tick;
        }
    }

    // Stable: equal ticks keep track order, then in-track order
    raw.sort_by_key(|e| e.tick);

    let mut clock = TickClock::new(smf.header.timing);
    let mut events: Vec<TimedEvent> = Vec::new();
    events.try_reserve_exact(raw.len())?;

    for RawEvent { tick, kind } in raw {
        match kind {
            RawKind::Tempo(us) => clock.set_tempo(tick, us),
            RawKind::Channel(channel, message) => {
                if let Some(event) = convert_message(channel, message) {
                    events.push(TimedEvent::new(clock.to_ms(tick), event));
                }
            }
        }
    }

    Ok(Timeline::from_events(events))
}

fn convert_message(channel: u8, message: MidiMessage) -> Option<MidiEvent> {
    let event = match message {
        MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => MidiEvent::NoteOff {
            channel,
            key: key.as_int(),
        },
        MidiMessage::NoteOn { key, vel } => MidiEvent::NoteOn {
            channel,
            key: key.as_int(),
            velocity: vel.as_int(),
        },
        MidiMessage::NoteOff { key, .. } => MidiEvent::NoteOff {
            channel,
            key: key.as_int(),
        },
        MidiMessage::ProgramChange { program } => MidiEvent::ProgramChange {
            channel,
            program: program.as_int(),
        },
        MidiMessage::Controller { controller, value } => MidiEvent::ControlChange {
            channel,
            controller: controller.as_int(),
            value: value.as_int(),
        },
        MidiMessage::PitchBend { bend } => MidiEvent::PitchBend {
            channel,
            value: bend.0.as_int(),
        },
        _ => return None,
    };
    Some(event)
}
