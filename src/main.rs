//! midiloop - Loops a MIDI file through a SoundFont with live channel muting.
//!
//! # Usage
//!
//! ```bash
//! midiloop song.mid --soundfont bank.sf2
//! midiloop song.mid -sf bank.sf2 --mute 9,10 --config player.json
//! ```
//!
//! While playing, press `0`-`9` or `a`-`f` to toggle a channel, `u` to list
//! the channels the file uses, and `q` to quit.

use anyhow::{bail, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use midiloop::midi::{format_channels, CHANNEL_COUNT};
use midiloop::{Player, PlayerConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line options for the application.
struct CliOptions {
    midi: PathBuf,
    soundfont: PathBuf,
    /// Channels that start muted.
    muted: Vec<usize>,
    config: Option<PathBuf>,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `<MIDI>`: the file to play (positional)
    /// - `--soundfont <path>` or `-sf <path>`: SoundFont file (a positional `.sf2` also works)
    /// - `--mute <list>` or `-m <list>`: comma-separated channels (0-15) to start muted
    /// - `--config <path>` or `-c <path>`: JSON player configuration
    /// - `--help` or `-h`: Print help and exit
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut midi: Option<PathBuf> = None;
        let mut soundfont: Option<PathBuf> = None;
        let mut muted = Vec::new();
        let mut config: Option<PathBuf> = None;
        let mut i = 1;

        let value = |i: usize, flag: &str| -> Result<String> {
            args.get(i)
                .cloned()
                .with_context(|| format!("{} requires an argument", flag))
        };

        while i < args.len() {
            match args[i].as_str() {
                "--soundfont" | "-sf" => {
                    i += 1;
                    soundfont = Some(PathBuf::from(value(i, "--soundfont")?));
                }
                "--mute" | "-m" => {
                    i += 1;
                    muted = parse_channel_list(&value(i, "--mute")?)?;
                }
                "--config" | "-c" => {
                    i += 1;
                    config = Some(PathBuf::from(value(i, "--config")?));
                }
                "--help" | "-h" => {
                    print_help(args.first().map_or("midiloop", |s| s.as_str()));
                    std::process::exit(0);
                }
                other if other.ends_with(".sf2") => soundfont = Some(PathBuf::from(other)),
                other if other.starts_with('-') => {
                    bail!("Unknown option: {} (use --help for usage)", other)
                }
                other => midi = Some(PathBuf::from(other)),
            }
            i += 1;
        }

        Ok(Self {
            midi: midi.context("missing MIDI file (use --help for usage)")?,
            soundfont: soundfont.context("missing --soundfont (use --help for usage)")?,
            muted,
            config,
        })
    }
}

fn print_help(program: &str) {
    eprintln!("midiloop - Loop a MIDI file through a SoundFont");
    eprintln!();
    eprintln!("Usage: {} <MIDI> --soundfont <SF2> [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -sf, --soundfont PATH  SoundFont file (.sf2)");
    eprintln!("  -m, --mute LIST        Channels to start muted, e.g. 9 or 0,3,9");
    eprintln!("  -c, --config PATH      JSON player configuration");
    eprintln!("  -h, --help             Print this help message");
    eprintln!();
    eprintln!("Keys: 0-9/a-f toggle channel, u list used channels, q quit");
}

/// Parses "0,3,9" into channel numbers.
fn parse_channel_list(list: &str) -> Result<Vec<usize>> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            let channel: usize = s
                .trim()
                .parse()
                .with_context(|| format!("invalid channel: {}", s))?;
            if channel >= CHANNEL_COUNT {
                bail!("channel {} out of range 0-15", channel);
            }
            Ok(channel)
        })
        .collect()
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => PlayerConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PlayerConfig::default(),
    };

    let initial = if cli.muted.is_empty() {
        None
    } else {
        let mut states = config.initial_channels.unwrap_or([true; CHANNEL_COUNT]);
        for &channel in &cli.muted {
            states[channel] = false;
        }
        Some(states)
    };

    let mut player = Player::new(config);
    player
        .start_playback(&cli.midi, &cli.soundfont, initial)
        .with_context(|| format!("Failed to play {}", cli.midi.display()))?;

    println!("Channels in use: {}", format_channels(&player.get_used_channels()));
    println!("Keys: 0-9/a-f toggle channel, u list used channels, q quit");

    enable_raw_mode().context("Failed to enable raw mode")?;
    let result = run_controls(&player);
    disable_raw_mode().context("Failed to restore terminal")?;

    player.stop_playback();
    result
}

/// Reads keys until the user quits.
fn run_controls(player: &Player) -> Result<()> {
    loop {
        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
            KeyCode::Char('u') => {
                print!(
                    "Used: {}   Active: {}\r\n",
                    format_channels(&player.get_used_channels()),
                    format_channels(&player.channel_states())
                );
            }
            KeyCode::Char(c) => {
                if let Some(channel) = c.to_digit(16) {
                    if let Some(active) = player.toggle_channel(channel as i32) {
                        let action = if active { "Unmuted" } else { "Muted" };
                        print!("{} channel {}\r\n", action, channel);
                    }
                }
            }
            _ => {}
        }
    }
}
