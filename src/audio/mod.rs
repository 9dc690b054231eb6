//! Real-time rendering: channel gates, playback clock, the callback
//! scheduler, and the synthesizer and device seams it drives.

pub mod clock;
pub mod gate;
pub mod output;
pub mod scheduler;
pub mod synth;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::PlaybackClock;
pub use gate::ChannelGates;
pub use output::{AudioBackend, DeviceError, RenderCallback, RodioBackend, StreamFormat};
pub use scheduler::Scheduler;
pub use synth::{SoundBankError, SoundFontSynth, SynthPort};
