//! Immutable event timeline and its forward-only read cursor.
//!
//! The timeline is shared (`Arc<[TimedEvent]>`) and never mutated after load.
//! Playback position lives in a separate [`Cursor`], which only the
//! scheduler advances.

use super::event::{MidiEvent, TimedEvent};
use super::CHANNEL_COUNT;
use std::sync::Arc;

/// A time-ordered sequence of MIDI events for one playback pass.
#[derive(Debug, Clone)]
pub struct Timeline {
    events: Arc<[TimedEvent]>,
}

impl Timeline {
    /// Builds a timeline from events in any order.
    ///
    /// Events are sorted by timestamp; the sort is stable, so events sharing
    /// a timestamp keep the order they were given in.
    pub fn from_events(mut events: Vec<TimedEvent>) -> Self {
        events.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));
        Self {
            events: events.into(),
        }
    }

    /// Returns the number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the timeline has no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns all events in playback order.
    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    /// Timestamp of the last event, or 0 for an empty timeline.
    pub fn duration_ms(&self) -> f64 {
        self.events.last().map_or(0.0, |e| e.time_ms)
    }

    /// Scans for channels that carry at least one NoteOn.
    pub fn used_channels(&self) -> [bool; CHANNEL_COUNT] {
        let mut used = [false; CHANNEL_COUNT];
        for timed in self.events.iter() {
            if let MidiEvent::NoteOn { channel, .. } = timed.event {
                if let Some(slot) = used.get_mut(channel as usize) {
                    *slot = true;
                }
            }
        }
        used
    }

    fn get(&self, index: usize) -> Option<&TimedEvent> {
        self.events.get(index)
    }
}

/// Result of polling the cursor against a deadline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step<'a> {
    /// The next event is due; the cursor has moved past it.
    Due(&'a TimedEvent),
    /// Events remain, but none is due yet.
    Pending,
    /// The cursor is past the last event.
    End,
}

/// Marks the next event of a [`Timeline`] that has not been applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    next: usize,
}

impl Cursor {
    /// Creates a cursor at the timeline head.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next unapplied event.
    pub fn position(&self) -> usize {
        self.next
    }

    /// Rewinds to the timeline head. This is the only way to move backwards.
    pub fn reset(&mut self) {
        self.next = 0;
    }

    /// Returns true once every event has been consumed.
    pub fn is_exhausted(&self, timeline: &Timeline) -> bool {
        self.next >= timeline.len()
    }

    /// Consumes the next event if its timestamp is at or before `deadline_ms`.
    pub fn step<'a>(&mut self, timeline: &'a Timeline, deadline_ms: f64) -> Step<'a> {
        match timeline.get(self.next) {
            None => Step::End,
            Some(event) if event.time_ms <= deadline_ms => {
                self.next += 1;
                Step::Due(event)
            }
            Some(_) => Step::Pending,
        }
    }

    /// Lazily yields every event due by `deadline_ms`, in order.
    ///
    /// Stops without consuming at the first event later than the deadline.
    pub fn advance_to<'a>(&'a mut self, timeline: &'a Timeline, deadline_ms: f64) -> Due<'a> {
        Due {
            cursor: self,
            timeline,
            deadline_ms,
        }
    }
}

/// Iterator returned by [`Cursor::advance_to`].
pub struct Due<'a> {
    cursor: &'a mut Cursor,
    timeline: &'a Timeline,
    deadline_ms: f64,
}

impl<'a> Iterator for Due<'a> {
    type Item = &'a TimedEvent;

    fn next(&mut self) -> Option<&'a TimedEvent> {
        match self.cursor.step(self.timeline, self.deadline_ms) {
            Step::Due(event) => Some(event),
            Step::Pending | Step::End => None,
        }
    }
}
