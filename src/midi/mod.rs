//! MIDI timeline types.
//!
//! A loaded file becomes an immutable [`Timeline`] of [`TimedEvent`]s in
//! millisecond time. The scheduler walks it with a [`Cursor`].

mod event;
mod loader;
mod timeline;

pub use event::{MidiEvent, TimedEvent};
pub use loader::{parse_smf, TimelineError};
pub use timeline::{Cursor, Due, Step, Timeline};

/// Number of MIDI channels.
pub const CHANNEL_COUNT: usize = 16;

/// Channel 10 in 1-based numbering, reserved for drums in General MIDI.
pub const DRUM_CHANNEL: u8 = 9;

/// Formats a channel mask as a list of 0-based channel numbers, e.g. "0, 3, 9".
pub fn format_channels(mask: &[bool; CHANNEL_COUNT]) -> String {
    let list: Vec<String> = mask
        .iter()
        .enumerate()
        .filter(|(_, &set)| set)
        .map(|(channel, _)| channel.to_string())
        .collect();
    if list.is_empty() {
        "none".to_string()
    } else {
        list.join(", ")
    }
}
