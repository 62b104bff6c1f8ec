use anyhow::{anyhow, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, info, warn};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use avmedia::backend::{MediaBackend, MediaProfile, SimulatedBackend};
use avmedia::player::{BackendFactory, EventMessage, PlayerRegistry};
use avmedia::renderer::ChannelTextureRegistry;
use avmedia::utils::{load_config, Config};

/// AVMedia - run a source through a playback session and print its events
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Media locator (file path or URL)
    #[arg(value_name = "SOURCE")]
    source: String,

    /// Initial volume (0.0 - 1.0)
    #[arg(short, long, value_name = "VOLUME")]
    volume: Option<f32>,

    /// Playback speed
    #[arg(short, long, value_name = "SPEED")]
    speed: Option<f32>,

    /// Restart from the beginning at the end of the source
    #[arg(short = 'l', long = "loop")]
    looping: bool,

    /// Simulated media duration in milliseconds (0 for an indefinite stream)
    #[arg(long, default_value = "5000")]
    duration_ms: u64,

    /// Simulated video width (0 for audio only)
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Simulated video height (0 for audio only)
    #[arg(long, default_value = "720")]
    height: u32,

    /// Simulated frame rate
    #[arg(long, default_value = "30")]
    fps: u32,

    /// How long to play before disposing the session
    #[arg(long, default_value = "3000")]
    play_for_ms: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Configuration file to use instead of the system and user files
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Args {
    fn profile(&self) -> MediaProfile {
        let duration = (self.duration_ms > 0).then(|| Duration::from_millis(self.duration_ms));
        MediaProfile {
            width: self.width,
            height: self.height,
            duration,
            fps: self.fps,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => load_config()?,
    };

    let log_level = if args.debug { "debug" } else { config.general.log_level.as_str() };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    info!("Starting AVMedia v{}", env!("CARGO_PKG_VERSION"));

    let engine = SimulatedBackend::new(args.profile())
        .with_auto_ready(true)
        .with_instant_seeks(true);
    let factory: BackendFactory = {
        let engine = engine.clone();
        Box::new(move || -> Box<dyn MediaBackend> { Box::new(engine.clone()) })
    };

    let (textures, frames) = ChannelTextureRegistry::new();
    let mut registry = PlayerRegistry::new(Arc::new(textures), factory, config.session.clone())
        .with_runtime(tokio::runtime::Handle::current());

    let id = registry
        .handle_json(&json!({"method": "create"}).to_string())?
        .as_i64()
        .ok_or_else(|| anyhow!("create returned no session id"))?;
    let events = registry.listen(id).context("Session vanished after create")?;
    let session = registry.session(id).context("Session vanished after create")?;

    // Print every event as one JSON line until the stream ends
    let printer = tokio::task::spawn_blocking(move || {
        for message in events.iter() {
            match message {
                EventMessage::Event(event) => println!("{}", event.to_json()),
                EventMessage::EndOfStream => break,
            }
        }
    });

    // Pull frames whenever the session signals one
    let weak = Arc::downgrade(&session);
    drop(session);
    let renderer = tokio::task::spawn_blocking(move || {
        let mut rendered = 0u64;
        for texture in frames.iter() {
            let Some(session) = weak.upgrade() else {
                break;
            };
            if texture != session.id() {
                continue;
            }
            if let Some(frame) = session.take_frame() {
                debug!("Frame {}x{} at {:?}", frame.width, frame.height, frame.item_time);
                rendered += 1;
            }
        }
        rendered
    });

    let mut calls = vec![json!({"method": "open", "arguments": {"id": id, "value": args.source}})];
    if let Some(volume) = args.volume {
        calls.push(json!({"method": "setVolume", "arguments": {"id": id, "value": volume}}));
    }
    if let Some(speed) = args.speed {
        calls.push(json!({"method": "setSpeed", "arguments": {"id": id, "value": speed}}));
    }
    calls.push(json!({"method": "setLooping", "arguments": {"id": id, "value": args.looping}}));
    calls.push(json!({"method": "play", "arguments": id}));
    for call in calls {
        registry.handle_json(&call.to_string())?;
    }

    // Media clock of the simulated engine
    let clock = {
        let engine = engine.clone();
        tokio::spawn(async move {
            let step = Duration::from_millis(5);
            let mut ticker = tokio::time::interval(step);
            loop {
                ticker.tick().await;
                engine.advance(step);
            }
        })
    };

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(args.play_for_ms)) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Interrupted");
        }
    }

    if let Some(session) = registry.session(id) {
        let stats = session.pump_stats();
        info!(
            "Frames signalled: {}, taken: {}, empty takes: {}",
            stats.frames_signalled, stats.frames_taken, stats.empty_takes
        );
    }

    registry.handle_json(&json!({"method": "dispose", "arguments": id}).to_string())?;
    clock.abort();
    drop(registry);

    printer.await?;
    let rendered = renderer.await?;
    info!("Rendered {} frames, exiting", rendered);
    Ok(())
}
