// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{crate_version, Args, Parser, Subcommand};
use footfall::audio;
use footfall::clip::{ClipLoader, FileLoader};
use footfall::config::{ConfigError, Settings};
use footfall::controller::{Controller, Event, USAGE};
use footfall::sync::triple_buffer;
use footfall::{render_to_wav, Engine};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// How often the play loop checks on the engine while waiting for input.
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A procedural footstep renderer."
)]
struct Cli {
    /// Path to a YAML settings file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

/// Engine settings that can be overridden from the command line.
#[derive(Args)]
struct EngineArgs {
    /// Directory holding the clips.
    clips: Option<PathBuf>,
    /// The output device name. Names starting with "mock" use a mock device.
    #[arg(short, long)]
    device: Option<String>,
    /// Output sample rate in Hz.
    #[arg(short = 'r', long)]
    sample_rate: Option<u32>,
    /// Frames per block.
    #[arg(short, long)]
    block_size: Option<usize>,
    /// Decode every clip before starting instead of streaming them.
    #[arg(long)]
    preload: bool,
    /// Seed for reproducible selection.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Lists and verifies all clips in the given directory.
    Clips {
        /// The clip directory.
        path: PathBuf,
    },
    /// Plays through the audio interface, taking parameter commands from stdin.
    Play {
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Renders to a WAV file instead of a device.
    Render {
        /// The WAV file to write.
        output: PathBuf,
        /// How many seconds to render.
        #[arg(short, long, default_value_t = 10.0)]
        seconds: f32,
        #[command(flatten)]
        engine: EngineArgs,
    },
}

fn load_settings(path: Option<&Path>, args: &EngineArgs) -> Result<Settings, ConfigError> {
    let mut settings = Settings::load(path)?;
    let engine = settings.engine_mut();
    if let Some(clips) = &args.clips {
        engine.set_clips(clips.clone());
    }
    if let Some(device) = &args.device {
        engine.set_device(device);
    }
    if let Some(sample_rate) = args.sample_rate {
        engine.set_sample_rate(sample_rate);
    }
    if let Some(block_size) = args.block_size {
        engine.set_block_size(block_size);
    }
    if args.preload {
        engine.set_preload(true);
    }
    if let Some(seed) = args.seed {
        engine.set_seed(seed);
    }
    settings.engine().validate()?;
    Ok(settings)
}

fn play(settings: Settings) -> Result<(), Box<dyn Error>> {
    let engine_settings = settings.engine();
    let sample_rate = engine_settings.sample_rate();

    let loader = FileLoader::from_dir(&engine_settings.clips(), sample_rate)?;
    let device = audio::get_device(
        engine_settings.device(),
        sample_rate,
        engine_settings.block_size(),
    )?;

    let (params_tx, params_rx) = triple_buffer(settings.params().to_play_params(sample_rate));
    let mut engine = Engine::start(engine_settings, loader, device.as_ref(), params_rx)?;
    let mut visualization = engine
        .take_visualization()
        .ok_or("visualization feed already taken")?;

    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let controller = Controller::new(settings.params().clone(), sample_rate, params_tx, events_tx);
    println!("Playing through {device}. Commands:\n{USAGE}");
    let keyboard = controller.spawn()?;

    loop {
        crossbeam_channel::select! {
            recv(events_rx) -> event => match event {
                Ok(Event::Level) => {
                    let frame = visualization.latest();
                    println!(
                        "level: rms {:.4} peak {:.4} (block {})",
                        frame.rms(),
                        frame.peak(),
                        frame.seq
                    );
                }
                Ok(Event::Quit) | Err(_) => break,
            },
            default(STATUS_INTERVAL) => {
                if !engine.is_running() {
                    warn!("Output stream stopped.");
                    break;
                }
                let stats = engine.stats();
                debug!(
                    underruns = stats.underruns,
                    played = stats.blocks_played,
                    queued = engine.queued(),
                    "Engine status."
                );
            }
        }
    }

    engine.shutdown();
    // A reader blocked on stdin cannot be interrupted; process exit reclaims it.
    if keyboard.is_finished() {
        if let Ok(Err(e)) = keyboard.join() {
            warn!(error = %e, "Keyboard input failed.");
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("footfall=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;
            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices.iter() {
                println!("- {}", device);
            }
        }
        Commands::Clips { path } => {
            let loader = FileLoader::from_dir(&path, 48000)?;
            if loader.is_empty() {
                println!("No clips found in {}.", path.display());
                return Ok(());
            }

            println!("Clips (count: {}):", loader.len());
            for index in 0..loader.len() {
                match loader.load(index) {
                    Ok(clip) => println!(
                        "- {} (channels: {}, frames: {}, duration: {:.3}s)",
                        clip.name(),
                        clip.channel_count(),
                        clip.frame_count(),
                        clip.duration().as_secs_f32()
                    ),
                    Err(e) => println!("- {} (error: {})", loader.name(index), e),
                }
            }
        }
        Commands::Play { engine } => {
            play(load_settings(cli.config.as_deref(), &engine)?)?;
        }
        Commands::Render {
            output,
            seconds,
            engine,
        } => {
            let settings = load_settings(cli.config.as_deref(), &engine)?;
            let sample_rate = settings.engine().sample_rate();
            let loader = FileLoader::from_dir(&settings.engine().clips(), sample_rate)?;
            let frames = render_to_wav(
                &output,
                settings.engine(),
                &loader,
                settings.params().to_play_params(sample_rate),
                seconds,
            )?;
            println!("Rendered {} frames to {}.", frames, output.display());
        }
    }

    Ok(())
}
