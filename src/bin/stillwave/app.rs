//! Stillwave - application builder and interactive runner
//!
//! The engine lives inside the audio callback and owns the whole node
//! graph; the terminal thread talks to it over a lock-free ring buffer,
//! and engine events come back over a second one.

use std::io::{BufRead, Write as _};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;

use stillwave::{
    engine::EngineCommand,
    profile::{Combination, TrackDescriptor},
    AudioEngine, EngineConfig, EngineEvent, MAX_BLOCK_SIZE,
};

const COMMAND_QUEUE_CAPACITY: usize = 64;
const EVENT_QUEUE_CAPACITY: usize = 256;
const CHIME_FREQUENCY_HZ: f32 = 880.0;

/// Main application builder
pub struct Stillwave {
    tracks: Vec<TrackDescriptor>,
    combinations: Vec<Combination>,
}

impl Stillwave {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            combinations: Vec::new(),
        }
    }

    pub fn tracks(mut self, tracks: Vec<TrackDescriptor>) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn combinations(mut self, combinations: Vec<Combination>) -> Self {
        self.combinations = combinations;
        self
    }

    /// Run the application (takes over, plays audio, reads stdin).
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        println!("=== stillwave ===");
        println!("Sample rate: {} Hz", sample_rate);
        println!("Channels: {}", channels);
        println!();
        for track in &self.tracks {
            println!("  Track: {} ({})", track.id, track.display_name);
        }
        for combo in &self.combinations {
            println!("  Combination: {} ({} layers)", combo.name, combo.entries.len());
        }
        println!();
        print_help();

        let engine_config = EngineConfig {
            sample_rate,
            ..EngineConfig::default()
        };
        let mut engine = AudioEngine::new(engine_config, self.tracks, self.combinations);

        let (mut cmd_tx, mut cmd_rx) = RingBuffer::<EngineCommand>::new(COMMAND_QUEUE_CAPACITY);
        let (mut event_tx, mut event_rx) = RingBuffer::<EngineEvent>::new(EVENT_QUEUE_CAPACITY);

        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                engine.drain_commands(&mut cmd_rx);

                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames_remaining = total_frames - frames_written;
                    let frames_to_render = frames_remaining.min(MAX_BLOCK_SIZE);

                    let block = &mut render_buf[..frames_to_render];
                    engine.render_block(block);

                    // Copy to output (mono to all channels)
                    let out_off = frames_written * channels;
                    for (i, &s) in block.iter().enumerate() {
                        for ch in 0..channels {
                            data[out_off + i * channels + ch] = s;
                        }
                    }

                    frames_written += frames_to_render;
                }

                for event in engine.take_events() {
                    // A full queue just drops the notification.
                    let _ = event_tx.push(event);
                }
            },
            |err| eprintln!("Audio error: {}", err),
            None,
        )?;

        stream.play()?;

        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            while let Ok(event) = event_rx.pop() {
                match event {
                    EngineEvent::PlaybackEnded { layer_id } => {
                        println!("[ended] {layer_id}");
                    }
                    EngineEvent::ProgressTick { elapsed_secs } => {
                        print!("\r[playing] {elapsed_secs:.0}s ");
                        let _ = std::io::stdout().flush();
                    }
                    EngineEvent::ContextUnavailable => {
                        println!("[warning] audio unavailable; running silent");
                    }
                }
            }

            line.clear();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }
            let mut parts = line.split_whitespace();
            let command = match (parts.next(), parts.next(), parts.next()) {
                (Some("start"), Some(id), _) => EngineCommand::Start(id.into()),
                (Some("stop"), Some(id), _) => EngineCommand::Stop(id.into()),
                (Some("vol"), Some(id), Some(v)) => match v.parse() {
                    Ok(v) => EngineCommand::SetLayerVolume(id.into(), v),
                    Err(_) => {
                        println!("not a number: {v}");
                        continue;
                    }
                },
                (Some("master"), Some(v), _) => match v.parse() {
                    Ok(v) => EngineCommand::SetMasterVolume(v),
                    Err(_) => {
                        println!("not a number: {v}");
                        continue;
                    }
                },
                (Some("mute"), _, _) => EngineCommand::SetMute(true),
                (Some("unmute"), _, _) => EngineCommand::SetMute(false),
                (Some("combo"), Some(name), _) => EngineCommand::ApplyCombination(name.into()),
                (Some("chime"), _, _) => EngineCommand::PlayChime(CHIME_FREQUENCY_HZ),
                (Some("stopall"), _, _) => EngineCommand::StopAll,
                (Some("quit"), _, _) | (Some("exit"), _, _) => break,
                (Some("help"), _, _) => {
                    print_help();
                    continue;
                }
                (None, _, _) => continue,
                (Some(other), _, _) => {
                    println!("unknown command: {other} (try `help`)");
                    continue;
                }
            };

            if cmd_tx.push(command).is_err() {
                println!("engine busy, command dropped");
            }
        }

        Ok(())
    }
}

impl Default for Stillwave {
    fn default() -> Self {
        Self::new()
    }
}

fn print_help() {
    println!("Commands:");
    println!("  start <id>      start a track");
    println!("  stop <id>       stop a track");
    println!("  vol <id> <0-1>  set a track's volume");
    println!("  master <0-1>    set master volume");
    println!("  mute / unmute   toggle the master bus");
    println!("  combo <name>    apply a combination");
    println!("  chime           play the interval chime");
    println!("  stopall         stop everything");
    println!("  quit            exit");
}
