//! OpenCANalyzer CLI application
//!
//! Command-line front end for the canalyzer-core library and the stand-in
//! rendering collaborator: it loads a DBC schema and a CSV or BusMaster
//! log (or mock traffic), drives the playback controller and renders each
//! cursor position as text or JSON lines.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use canalyzer_core::{mock, PlaybackStatus, Player, Schema, Timeline};

mod config;
mod render;

/// OpenCANalyzer - replay and decode recorded CAN bus traffic
#[derive(Parser, Debug)]
#[command(name = "canalyzer-cli")]
#[command(about = "Replay and decode recorded CAN bus traffic", long_about = None)]
#[command(version)]
struct Args {
    /// Path to a log file to replay (CSV or BusMaster)
    #[arg(short, long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Path to a DBC file with message/signal definitions
    #[arg(long, value_name = "FILE")]
    dbc: Option<PathBuf>,

    /// Generate COUNT mock frames instead of loading a log (requires --dbc)
    #[arg(long, value_name = "COUNT")]
    mock: Option<usize>,

    /// Playback rate in frames per second (0 = render as fast as possible)
    #[arg(long, value_name = "FPS")]
    fps: Option<f64>,

    /// Jump to this frame index before playback starts
    #[arg(long, value_name = "INDEX")]
    seek: Option<usize>,

    /// Stop after rendering this many frames
    #[arg(long, value_name = "COUNT")]
    max_frames: Option<usize>,

    /// Emit one JSON object per frame instead of text
    #[arg(long)]
    json: bool,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    log::info!("OpenCANalyzer CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using core library v{}", canalyzer_core::VERSION);

    let file_config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::AppConfig::default(),
    };

    let mut player = Player::new();

    // Schema first, so mock traffic can draw IDs from it.
    let dbc_path = args.dbc.clone().or_else(|| file_config.input.dbc.clone());
    if let Some(path) = &dbc_path {
        let schema = Schema::from_dbc_file(path)
            .with_context(|| format!("failed to load DBC {:?}", path))?;
        for warning in schema.warnings() {
            log::warn!("{:?}: {}", path, warning);
        }
        player.load_schema(schema);
    }

    let log_path = args.log.clone().or_else(|| file_config.input.log.clone());
    let timeline = if let Some(count) = args.mock {
        let schema = player
            .schema()
            .context("--mock requires --dbc so frame IDs can be drawn from a schema")?;
        let frames = mock::generate(schema, count, &mut rand::thread_rng());
        log::info!("generated {} mock frames", frames.len());
        Timeline::build(frames)
    } else if let Some(path) = &log_path {
        let timeline = Timeline::from_log_file(path)
            .with_context(|| format!("failed to load log {:?}", path))?;
        for warning in timeline.warnings() {
            log::warn!("{:?}: {}", path, warning);
        }
        timeline
    } else {
        println!("OpenCANalyzer - no input specified");
        println!("\nQuick Start:");
        println!("  canalyzer-cli --log trace.csv --dbc signals.dbc");
        println!("  canalyzer-cli --dbc signals.dbc --mock 1000");
        println!("\nUse --help for more options");
        return Ok(());
    };

    player.load(timeline);
    if let Some(index) = args.seek {
        player.seek(index);
    }

    let fps = args.fps.unwrap_or(file_config.playback.fps);
    if fps > 0.0 {
        player.set_rate(fps);
    }

    replay(&mut player, fps > 0.0, args.max_frames, args.json)
}

/// Drive the player from the current cursor to the end of the run,
/// rendering every visited position.
fn replay(player: &mut Player, paced: bool, max_frames: Option<usize>, json: bool) -> Result<()> {
    render_current(player, json)?;
    let mut shown = 1usize;

    let start = player.cursor();
    let Some(token) = player.play() else {
        return Ok(());
    };
    // play() from the end wraps back to the start; show where we landed.
    if player.cursor() != start {
        render_current(player, json)?;
        shown += 1;
    }

    while player.status() == PlaybackStatus::Playing {
        if max_frames.is_some_and(|max| shown >= max) {
            log::info!("frame limit reached, pausing");
            player.pause();
            break;
        }
        if paced {
            std::thread::sleep(player.tick_interval());
        }
        if !player.tick(&token) {
            break;
        }
        render_current(player, json)?;
        shown += 1;
    }
    Ok(())
}

fn render_current(player: &Player, json: bool) -> Result<()> {
    let Some(view) = player.view() else {
        return Ok(());
    };
    if json {
        println!("{}", render::render_json(player.cursor(), &view)?);
    } else {
        print!("{}", render::render_text(player.cursor(), &view));
    }
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
