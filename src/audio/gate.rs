//! Per-channel mute state shared between the control thread and the audio
//! callback.
//!
//! Every flag is an atomic, so neither side ever blocks. Muting a channel
//! also posts a "silence this channel" request into a bitmask that the
//! scheduler drains inside the callback, so voice teardown never races a
//! render.

use crate::midi::CHANNEL_COUNT;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

/// Mute flags, used-channel flags, and pending silence requests.
#[derive(Debug)]
pub struct ChannelGates {
    /// Whether each channel passes synthesis commands.
    active: [AtomicBool; CHANNEL_COUNT],
    /// Channels containing at least one NoteOn. Fixed at load time.
    has_notes: [bool; CHANNEL_COUNT],
    /// One bit per channel muted since the last drain.
    pending_silence: AtomicU16,
}

impl ChannelGates {
    /// Creates the table from a used-channel scan and initial mute states.
    pub fn new(has_notes: [bool; CHANNEL_COUNT], initial: [bool; CHANNEL_COUNT]) -> Self {
        Self {
            active: initial.map(AtomicBool::new),
            has_notes,
            pending_silence: AtomicU16::new(0),
        }
    }

    /// Mutes or unmutes a channel. Out-of-range channels are ignored.
    ///
    /// Muting an active channel queues a request to silence its voices.
    pub fn set_active(&self, channel: usize, active: bool) {
        let Some(flag) = self.active.get(channel) else {
            return;
        };
        let was_active = flag.swap(active, Ordering::AcqRel);
        if was_active && !active {
            self.pending_silence
                .fetch_or(1 << channel, Ordering::Release);
        }
    }

    /// Returns whether a channel passes commands. Out-of-range channels never do.
    pub fn is_active(&self, channel: usize) -> bool {
        self.active
            .get(channel)
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Snapshot of every channel's mute state.
    pub fn states(&self) -> [bool; CHANNEL_COUNT] {
        std::array::from_fn(|channel| self.is_active(channel))
    }

    /// Channels that contain at least one NoteOn, regardless of mute state.
    pub fn used_channels(&self) -> [bool; CHANNEL_COUNT] {
        self.has_notes
    }

    /// Takes all pending silence requests as a channel bitmask.
    pub fn take_silence_requests(&self) -> u16 {
        self.pending_silence.swap(0, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_on() -> ChannelGates {
        ChannelGates::new([false; CHANNEL_COUNT], [true; CHANNEL_COUNT])
    }

    #[test]
    fn test_mute_queues_silence_once() {
        let gates = all_on();
        gates.set_active(3, false);
        gates.set_active(3, false);
        assert!(!gates.is_active(3));
        assert_eq!(gates.take_silence_requests(), 1 << 3);
        assert_eq!(gates.take_silence_requests(), 0);
    }

    #[test]
    fn test_unmute_does_not_queue_silence() {
        let gates = ChannelGates::new([false; CHANNEL_COUNT], [false; CHANNEL_COUNT]);
        gates.set_active(15, true);
        assert!(gates.is_active(15));
        assert_eq!(gates.take_silence_requests(), 0);
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let gates = all_on();
        gates.set_active(16, false);
        gates.set_active(usize::MAX, false);
        assert_eq!(gates.states(), [true; CHANNEL_COUNT]);
        assert!(!gates.is_active(16));
        assert_eq!(gates.take_silence_requests(), 0);
    }

    #[test]
    fn test_used_channels_independent_of_mute() {
        let mut used = [false; CHANNEL_COUNT];
        used[0] = true;
        used[9] = true;
        let gates = ChannelGates::new(used, [true; CHANNEL_COUNT]);
        gates.set_active(0, false);
        assert_eq!(gates.used_channels(), used);
    }

    #[test]
    fn test_flags_visible_across_threads() {
        let gates = std::sync::Arc::new(all_on());
        let writer = {
            let gates = std::sync::Arc::clone(&gates);
            std::thread::spawn(move || {
                for channel in 0..CHANNEL_COUNT {
                    gates.set_active(channel, channel % 2 == 0);
                }
            })
        };
        writer.join().unwrap();
        for channel in 0..CHANNEL_COUNT {
            assert_eq!(gates.is_active(channel), channel % 2 == 0);
        }
        assert_eq!(gates.take_silence_requests(), 0b1010_1010_1010_1010);
    }
}
