//! midiloop - Loops a MIDI file through a SoundFont synthesizer.
//!
//! This library provides the real-time playback core: an immutable event
//! timeline, a sample-accurate callback scheduler, and per-channel muting
//! that is safe to change while audio is running.

pub mod audio;
pub mod config;
pub mod error;
pub mod midi;
pub mod player;
pub mod session;

// Re-export commonly used types
pub use audio::{AudioBackend, ChannelGates, RodioBackend, Scheduler, SoundFontSynth, SynthPort};
pub use config::{DeviceErrorPolicy, PlayerConfig};
pub use error::{status_code, PlaybackError};
pub use midi::{MidiEvent, TimedEvent, Timeline, CHANNEL_COUNT};
pub use player::Player;
pub use session::Session;
