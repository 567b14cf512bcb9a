//! # Roadnoise
//!
//! Command line driver for the roadnoise audio engine. Loads the audio
//! configuration and every soundscript under an asset directory, then
//! drives a vehicle past the listener and prints what the voice pool is
//! doing.
//!
//! ```bash
//! roadnoise --assets data/sounds
//! roadnoise --assets data/sounds --config audio.toml --scene tunnel.toml --seconds 20
//! roadnoise --assets data/sounds --output      # real output, needs the rodio-backend feature
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod drive;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use roadnoise_audio::{AcousticScene, AssetLoader, AudioBackend, FsAssets, HeadlessBackend, StaticScene};
use roadnoise_common::{ActorId, AudioConfig};
use roadnoise_script::SoundEngine;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::drive::{DriveBy, DrivePath};

#[derive(Parser)]
#[command(name = "roadnoise")]
#[command(author, version, about = "Spatial vehicle audio engine driver")]
struct Args {
    /// Directory holding WAV files and soundscripts. Sub-directories are
    /// resource groups.
    #[arg(long, short = 'a', default_value = ".")]
    assets: PathBuf,

    /// Audio configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Scene description (TOML) used for reverb and obstruction
    #[arg(long, short = 's')]
    scene: Option<PathBuf>,

    /// Soundscript holding base templates, loaded before the others
    #[arg(long)]
    base_script: Option<String>,

    /// Simulated seconds
    #[arg(long, default_value = "10")]
    seconds: f32,

    /// Simulation rate in frames per second
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Print a voice report every this many seconds
    #[arg(long, default_value = "1")]
    report_every: f32,

    /// Play through the output device in real time
    #[arg(long, short = 'o')]
    output: bool,
}

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("roadnoise=info".parse()?))
        .init();

    info!("Roadnoise {} starting", env!("CARGO_PKG_VERSION"));
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AudioConfig::load_from(path),
        None => AudioConfig::default(),
    };
    config.apply_env_overrides();

    let scene = match &args.scene {
        Some(path) => Some(StaticScene::load(path).with_context(|| format!("loading scene {}", path.display()))?),
        None => None,
    };

    let assets = FsAssets::new(&args.assets);
    if args.output {
        run_output(config, assets, scene.as_ref(), &args)
    } else {
        run(HeadlessBackend::new(config.max_voices), config, assets, scene.as_ref(), &args, false)
    }
}

#[cfg(feature = "rodio-backend")]
fn run_output(config: AudioConfig, assets: FsAssets, scene: Option<&StaticScene>, args: &Args) -> Result<()> {
    match roadnoise_audio::RodioBackend::open(&config.device_name) {
        Ok(backend) => run(backend, config, assets, scene, args, true),
        Err(e) => {
            warn!("{e}, continuing without sound");
            run(HeadlessBackend::disconnected(), config, assets, scene, args, true)
        },
    }
}

#[cfg(not(feature = "rodio-backend"))]
fn run_output(config: AudioConfig, assets: FsAssets, scene: Option<&StaticScene>, args: &Args) -> Result<()> {
    warn!("Built without the rodio-backend feature, running headless");
    run(HeadlessBackend::new(config.max_voices), config, assets, scene, args, true)
}

fn run<B: AudioBackend>(
    backend: B,
    config: AudioConfig,
    assets: FsAssets,
    scene: Option<&StaticScene>,
    args: &Args,
    realtime: bool,
) -> Result<()> {
    let base = args.base_script.as_deref().map(|name| assets.read(name, None).map(|bytes| (name, bytes)));
    let mut engine = SoundEngine::new(backend, config, Box::new(assets));

    if let Some(base) = base {
        let (name, bytes) = base.context("reading base soundscript")?;
        engine.set_loading_base(true);
        engine.load_script_text(&String::from_utf8_lossy(&bytes), name, None);
        engine.set_loading_base(false);
    }
    engine.register_scripts();

    let mut sim = DriveBy::new(engine, ActorId::new(0), DrivePath::default());
    let dt = 1.0 / args.fps.max(1) as f32;
    let frames = (args.seconds.max(0.0) / dt).ceil() as u32;
    let report_frames = ((args.report_every / dt).round() as u32).max(1);
    let scene = scene.map(|s| s as &dyn AcousticScene);

    for frame in 1..=frames {
        sim.step(dt, scene);
        if frame % report_frames == 0 {
            print!("{}", sim.report());
        }
        if realtime {
            thread::sleep(Duration::from_secs_f32(dt));
        }
    }

    info!(
        "Simulation finished after {:.1}s: {} instances, {} sources",
        sim.time(),
        sim.instances().len(),
        sim.engine().voices().source_count()
    );
    Ok(())
}
