//! Control-plane facade: start, stop, mute and query.
//!
//! [`Player`] owns at most one [`Session`] and never fails on control
//! calls: mutes and queries without a running session are no-ops or return
//! neutral values.

use crate::audio::{AudioBackend, RodioBackend};
use crate::config::PlayerConfig;
use crate::error::PlaybackError;
use crate::midi::CHANNEL_COUNT;
use crate::session::Session;
use std::path::Path;

/// Plays one MIDI file at a time and exposes per-channel muting.
pub struct Player<B: AudioBackend = RodioBackend> {
    backend: B,
    config: PlayerConfig,
    session: Option<Session<B::Stream>>,
}

impl Player<RodioBackend> {
    /// Creates a player on the default output device.
    pub fn new(config: PlayerConfig) -> Self {
        Self::with_backend(RodioBackend, config)
    }
}

impl<B: AudioBackend> Player<B> {
    pub fn with_backend(backend: B, config: PlayerConfig) -> Self {
        Self {
            backend,
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Whether this player has a running session.
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Starts looping playback.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::AlreadyRunning`] if any session is live in
    /// the process, leaving it untouched, or the load/device error that
    /// stopped this one.
    pub fn start_playback<P1, P2>(
        &mut self,
        midi_path: P1,
        soundfont_path: P2,
        initial_channels: Option<[bool; CHANNEL_COUNT]>,
    ) -> Result<(), PlaybackError>
    where
        P1: AsRef<Path>,
        P2: AsRef<Path>,
    {
        if self.session.is_some() {
            return Err(PlaybackError::AlreadyRunning);
        }
        let session = Session::start(
            midi_path,
            soundfont_path,
            initial_channels,
            &self.backend,
            &self.config,
        )?;
        self.session = Some(session);
        Ok(())
    }

    /// Stops playback. Does nothing if nothing is playing.
    pub fn stop_playback(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
        }
    }

    /// Mutes or unmutes a channel. Ignores channels outside 0..16.
    pub fn set_channel_active(&self, channel: i32, active: bool) {
        let Some(session) = &self.session else {
            return;
        };
        if let Ok(channel) = usize::try_from(channel) {
            tracing::debug!(
                "{} channel {}",
                if active { "Unmuting" } else { "Muting" },
                channel
            );
            session.gates().set_active(channel, active);
        }
    }

    /// Flips a channel's mute state and returns the new state.
    ///
    /// Returns `None` without a session or for an out-of-range channel.
    pub fn toggle_channel(&self, channel: i32) -> Option<bool> {
        let session = self.session.as_ref()?;
        let index = usize::try_from(channel)
            .ok()
            .filter(|&c| c < CHANNEL_COUNT)?;
        if !session.gates().used_channels()[index] {
            tracing::debug!("Channel {} is not used in this MIDI file", index);
        }
        let active = !session.gates().is_active(index);
        self.set_channel_active(channel, active);
        Some(active)
    }

    /// Applies one mute state to every channel in `start..=end`.
    pub fn set_channel_range(&self, start: i32, end: i32, active: bool) {
        for channel in start..=end {
            self.set_channel_active(channel, active);
        }
    }

    /// Current mute state of every channel. All false without a session.
    pub fn channel_states(&self) -> [bool; CHANNEL_COUNT] {
        self.session
            .as_ref()
            .map_or([false; CHANNEL_COUNT], |s| s.gates().states())
    }

    /// Channels with at least one NoteOn. All false without a session.
    pub fn get_used_channels(&self) -> [bool; CHANNEL_COUNT] {
        self.session
            .as_ref()
            .map_or([false; CHANNEL_COUNT], |s| s.gates().used_channels())
    }

    /// Used channels as a list of channel numbers.
    pub fn used_channel_list(&self) -> Vec<u8> {
        self.get_used_channels()
            .iter()
            .enumerate()
            .filter(|(_, &used)| used)
            .map(|(channel, _)| channel as u8)
            .collect()
    }
}

impl<B: AudioBackend> Drop for Player<B> {
    fn drop(&mut self) {
        self.stop_playback();
    }
}
