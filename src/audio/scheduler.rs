//! The audio callback: interleaves timeline events with block rendering.
//!
//! Rendering proceeds on a fixed grid of `block_frames`-frame blocks that
//! starts at the beginning of each pass and carries across callbacks. At
//! the start of every grid block the scheduler applies all events due by the
//! block's end time, so events land on the same frames however the backend
//! sizes its callbacks. A block split over two callbacks is finished by the
//! second one without draining again.
//!
//! When a block completes with the timeline exhausted, the synthesizer,
//! clock and cursor are reset and playback loops from the top.

use super::clock::PlaybackClock;
use super::gate::ChannelGates;
use super::synth::SynthPort;
use crate::midi::{Cursor, MidiEvent, Timeline, CHANNEL_COUNT, DRUM_CHANNEL};
use std::sync::Arc;

/// Per-stream playback state, owned by the audio thread.
///
/// Field order is drop order: the synthesizer is released before the
/// timeline.
pub struct Scheduler<S: SynthPort> {
    synth: S,
    timeline: Timeline,
    cursor: Cursor,
    clock: PlaybackClock,
    gates: Arc<ChannelGates>,
    block_frames: usize,
}

impl<S: SynthPort> Scheduler<S> {
    /// Creates a scheduler positioned at the start of the timeline.
    ///
    /// `block_frames` is clamped to at least one frame.
    pub fn new(
        synth: S,
        timeline: Timeline,
        gates: Arc<ChannelGates>,
        sample_rate: u32,
        block_frames: usize,
    ) -> Self {
        Self {
            synth,
            timeline,
            cursor: Cursor::new(),
            clock: PlaybackClock::new(sample_rate),
            gates,
            block_frames: block_frames.max(1),
        }
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn synth(&self) -> &S {
        &self.synth
    }

    /// Fills `out` with `out.len() / 2` frames of interleaved stereo.
    ///
    /// A trailing odd sample is left untouched.
    pub fn process(&mut self, out: &mut [f32]) {
        let mut remaining = out.len() / 2;
        let mut offset = 0;

        while remaining > 0 {
            self.apply_silence_requests();

            let phase = (self.clock.frames() % self.block_frames as u64) as usize;
            if phase == 0 {
                self.drain_due_events();
            }

            let frames = remaining.min(self.block_frames - phase);
            self.synth.render(&mut out[offset..offset + frames * 2]);
            self.clock.advance(frames);
            offset += frames * 2;
            remaining -= frames;

            let block_done = phase + frames == self.block_frames;
            if block_done && self.cursor.is_exhausted(&self.timeline) {
                self.restart();
            }
        }
    }

    /// Applies every event due by the end of the block starting now.
    fn drain_due_events(&mut self) {
        let Self {
            synth,
            timeline,
            cursor,
            clock,
            gates,
            block_frames,
        } = self;
        let deadline_ms = clock.ms_after(*block_frames);
        for timed in cursor.advance_to(timeline, deadline_ms) {
            apply_event(synth, gates, &timed.event);
        }
    }

    fn apply_silence_requests(&mut self) {
        let mut mask = self.gates.take_silence_requests();
        while mask != 0 {
            let channel = mask.trailing_zeros() as u8;
            self.synth.silence_channel(channel);
            mask &= mask - 1;
        }
    }

    /// Loop point: fresh voices, clock at zero, cursor at the head.
    fn restart(&mut self) {
        self.synth.reset();
        self.clock.reset();
        self.cursor.reset();
    }
}

/// Sends one event to the synthesizer, honouring channel mutes.
///
/// Program changes always pass so a channel unmuted later has the right
/// instrument. Everything else on a muted channel is dropped for good.
fn apply_event<S: SynthPort>(synth: &mut S, gates: &ChannelGates, event: &MidiEvent) {
    let channel = event.channel();
    if channel as usize >= CHANNEL_COUNT {
        return;
    }
    if let MidiEvent::ProgramChange { program, .. } = *event {
        synth.set_preset(channel, program, channel == DRUM_CHANNEL);
        return;
    }
    if !gates.is_active(channel as usize) {
        return;
    }

    match *event {
        MidiEvent::NoteOn { key, velocity, .. } => {
            synth.note_on(channel, key, velocity as f32 / 127.0)
        }
        MidiEvent::NoteOff { key, .. } => synth.note_off(channel, key),
        MidiEvent::PitchBend { value, .. } => synth.pitch_bend(channel, value),
        MidiEvent::ControlChange {
            controller, value, ..
        } => synth.control_change(channel, controller, value),
        MidiEvent::ProgramChange { .. } => {}
    }
}
