//! Synthesizer seam and its SoundFont implementation.

use rustysynth::{SoundFont, Synthesizer, SynthesizerSettings};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Control change 120: All Sound Off.
const CC_ALL_SOUND_OFF: i32 = 0x78;

/// Errors from loading an instrument bank.
#[derive(Debug, thiserror::Error)]
pub enum SoundBankError {
    /// File could not be opened
    #[error("failed to open SoundFont {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The SoundFont or synthesizer could not be built
    #[error("invalid SoundFont: {0}")]
    Invalid(String),
}

/// Commands the scheduler issues to a synthesizer.
///
/// Every method is called from the audio callback and must not block or
/// allocate.
pub trait SynthPort: Send {
    /// Selects a preset. `drums` is set for the percussion channel.
    fn set_preset(&mut self, channel: u8, program: u8, drums: bool);

    /// Starts a note. `velocity` is normalized to 0.0..=1.0.
    fn note_on(&mut self, channel: u8, key: u8, velocity: f32);

    fn note_off(&mut self, channel: u8, key: u8);

    /// Raw 14-bit pitch wheel value.
    fn pitch_bend(&mut self, channel: u8, value: u16);

    fn control_change(&mut self, channel: u8, controller: u8, value: u8);

    /// Cuts every voice on a channel immediately.
    fn silence_channel(&mut self, channel: u8);

    /// Drops all voices and restores controllers to their defaults.
    fn reset(&mut self);

    /// Renders `out.len() / 2` frames of interleaved stereo.
    fn render(&mut self, out: &mut [f32]);
}

/// A rustysynth synthesizer with preallocated planar scratch buffers.
pub struct SoundFontSynth {
    synth: Synthesizer,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl SoundFontSynth {
    /// Loads a SoundFont and builds a synthesizer for it.
    ///
    /// `block_frames` becomes the synthesizer's internal block size and the
    /// size of the scratch buffers used by [`SynthPort::render`].
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The SoundFont file cannot be read
    /// - The SoundFont is invalid
    pub fn load<P: AsRef<Path>>(
        path: P,
        sample_rate: u32,
        block_frames: usize,
    ) -> Result<Self, SoundBankError> {
        let file = File::open(path.as_ref()).map_err(|source| SoundBankError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        let soundfont = Arc::new(
            SoundFont::new(&mut reader).map_err(|e| SoundBankError::Invalid(format!("{:?}", e)))?,
        );
        tracing::debug!(
            "SoundFont {} has {} presets",
            path.as_ref().display(),
            soundfont.get_presets().len()
        );

        let mut settings = SynthesizerSettings::new(sample_rate as i32);
        settings.block_size = block_frames;
        let synth = Synthesizer::new(&soundfont, &settings)
            .map_err(|e| SoundBankError::Invalid(format!("{:?}", e)))?;

        Ok(Self {
            synth,
            left: vec![0.0; block_frames],
            right: vec![0.0; block_frames],
        })
    }
}

impl SynthPort for SoundFontSynth {
    fn set_preset(&mut self, channel: u8, program: u8, _drums: bool) {
        // rustysynth maps channel 9 onto the percussion bank by itself
        self.synth
            .process_midi_message(channel as i32, 0xC0, program as i32, 0);
    }

    fn note_on(&mut self, channel: u8, key: u8, velocity: f32) {
        let velocity = (velocity * 127.0).round().clamp(0.0, 127.0) as i32;
        self.synth.note_on(channel as i32, key as i32, velocity);
    }

    fn note_off(&mut self, channel: u8, key: u8) {
        self.synth.note_off(channel as i32, key as i32);
    }

    fn pitch_bend(&mut self, channel: u8, value: u16) {
        let lsb = (value & 0x7F) as i32;
        let msb = ((value >> 7) & 0x7F) as i32;
        self.synth
            .process_midi_message(channel as i32, 0xE0, lsb, msb);
    }

    fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        self.synth
            .process_midi_message(channel as i32, 0xB0, controller as i32, value as i32);
    }

    fn silence_channel(&mut self, channel: u8) {
        self.synth
            .process_midi_message(channel as i32, 0xB0, CC_ALL_SOUND_OFF, 0);
    }

    fn reset(&mut self) {
        self.synth.reset();
    }

    fn render(&mut self, out: &mut [f32]) {
        let block = self.left.len();
        for chunk in out.chunks_mut(block * 2) {
            let frames = chunk.len() / 2;
            let left = &mut self.left[..frames];
            let right = &mut self.right[..frames];
            self.synth.render(left, right);

            // Interleave stereo samples: L, R, L, R, ...
            for (frame, (l, r)) in chunk.chunks_exact_mut(2).zip(left.iter().zip(right.iter())) {
                frame[0] = *l;
                frame[1] = *r;
            }
        }
    }
}
