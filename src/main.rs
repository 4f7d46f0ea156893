//! macroreel command line host

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, error, info, warn};

use macroreel::config::Config;
use macroreel::data::{ActionKind, Timeline, TimelineFile};
use macroreel::input::keycode::virtual_code;
use macroreel::logging;
use macroreel::replay::{PlaybackEvent, RepeatCount};
use macroreel::target::frontmost_gate;
use macroreel::Controller;

#[derive(Debug, Parser)]
#[command(name = "macroreel", version, about = "Record keyboard and mouse macros and replay them")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record input until Ctrl+C, then save the timeline
    Record {
        /// Timeline name or file path
        name: String,
    },
    /// Replay a recorded timeline
    Play {
        /// Timeline name or file path
        name: String,

        /// Number of passes, 0 repeats until stopped
        #[arg(short, long)]
        repeat: Option<u32>,

        /// Only inject while this application is in front
        #[arg(long)]
        target_app: Option<String>,
    },
    /// List the records of a timeline
    Show {
        /// Timeline name or file path
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::init_logging()?;
    info!("macroreel {} starting", env!("CARGO_PKG_VERSION"));
    if let Ok(dir) = logging::get_log_dir() {
        debug!("Logging to {:?}", dir);
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let runtime = tokio::runtime::Runtime::new()?;

    let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received, stopping...");
        let _ = shutdown_tx.send(());
    })?;

    let result = runtime.block_on(async {
        match cli.command {
            Command::Record { name } => record(&config, &name, shutdown_rx).await,
            Command::Play {
                name,
                repeat,
                target_app,
            } => play(&config, &name, repeat, target_app, shutdown_rx).await,
            Command::Show { name } => show(&config, &name),
        }
    });

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

async fn record(
    config: &Config,
    name: &str,
    mut shutdown: mpsc::UnboundedReceiver<()>,
) -> Result<()> {
    let path = config.timeline_path(name);
    let controller = Controller::from_config(config);
    let mut records = controller.subscribe_records();

    if !controller.start_capture() {
        bail!("Input capture unavailable; check accessibility or input device permissions");
    }
    println!("Recording to {}, press Ctrl+C to stop", path.display());

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            record = records.recv() => match record {
                Ok(record) => println!("{}", record),
                Err(RecvError::Lagged(n)) => warn!("Live view skipped {} records", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    controller.stop_capture();
    let mut timeline = controller.take_recorded_timeline();
    trim_stop_chord(&mut timeline);

    if timeline.is_empty() {
        warn!("Nothing recorded, not saving");
        return Ok(());
    }

    let file = TimelineFile::new(timeline_name(&path), timeline);
    file.save(&path)?;
    println!("Saved {} records to {}", file.records.len(), path.display());
    Ok(())
}

/// Drop the trailing Ctrl and C key records of the chord that ended the recording
fn trim_stop_chord(timeline: &mut Timeline) {
    let chord: Vec<u32> = [rdev::Key::ControlLeft, rdev::Key::ControlRight, rdev::Key::KeyC]
        .into_iter()
        .filter_map(virtual_code)
        .collect();

    while let Some(last) = timeline.len().checked_sub(1) {
        match timeline.get(last) {
            Some(record) if record.kind.is_key() && chord.contains(&record.code) => {
                timeline.remove(last);
            }
            _ => break,
        }
    }
}

fn timeline_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("timeline")
        .to_string()
}

enum PlayCommand {
    Pause,
    Resume,
    Stop,
}

/// Forward stdin commands from a dedicated thread; tokio's stdin would keep
/// the runtime from shutting down while a read is pending.
fn spawn_stdin_reader() -> Result<mpsc::UnboundedReceiver<PlayCommand>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("macroreel-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let command = match line.trim() {
                    "p" => PlayCommand::Pause,
                    "r" => PlayCommand::Resume,
                    "s" => PlayCommand::Stop,
                    "" => continue,
                    other => {
                        println!("Unknown command {:?} (p = pause, r = resume, s = stop)", other);
                        continue;
                    }
                };
                if tx.send(command).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

async fn play(
    config: &Config,
    name: &str,
    repeat: Option<u32>,
    target_app: Option<String>,
    mut shutdown: mpsc::UnboundedReceiver<()>,
) -> Result<()> {
    let path = config.timeline_path(name);
    let file = TimelineFile::load(&path)?;
    let record_count = file.records.len();

    let controller = Controller::from_config(config);
    if let Some(target) = target_app {
        info!("Replay gated on target application {:?}", target);
        controller.set_gate(Some(frontmost_gate(target)));
    }
    let repeat = repeat
        .map(RepeatCount::from)
        .unwrap_or_else(|| config.default_repeat());

    let mut events = controller.subscribe_playback();
    if !controller.play(file.records, repeat).await {
        bail!("Timeline {} has no records", path.display());
    }
    let session = controller.watch_playback().borrow().session;
    println!(
        "Playing {} ({} records, repeat {:?}). Commands: p = pause, r = resume, s = stop",
        file.name, record_count, repeat
    );

    let mut commands = spawn_stdin_reader()?;
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                controller.stop().await;
            }
            command = commands.recv(), if stdin_open => match command {
                Some(PlayCommand::Pause) => {
                    if !controller.pause().await {
                        println!("Not playing");
                    }
                }
                Some(PlayCommand::Resume) => {
                    if !controller.resume().await {
                        println!("Not paused");
                    }
                }
                Some(PlayCommand::Stop) => {
                    controller.stop().await;
                }
                // stdin closed; keep playing until done or Ctrl+C
                None => stdin_open = false,
            },
            event = events.recv() => match event {
                Ok(event) if event.session() != session => {}
                Ok(PlaybackEvent::Paused { reason, .. }) => println!("Paused ({:?})", reason),
                Ok(PlaybackEvent::Resumed { .. }) => println!("Resumed"),
                Ok(PlaybackEvent::Progress { completed, .. }) => println!("Pass {} done", completed),
                Ok(PlaybackEvent::Stopped { reason, .. }) => {
                    println!("Stopped ({:?})", reason);
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}

fn show(config: &Config, name: &str) -> Result<()> {
    let path = config.timeline_path(name);
    let file = TimelineFile::load(&path)?;

    println!(
        "{} ({}), recorded {}",
        file.name,
        file.id,
        file.created_at.to_rfc3339()
    );
    println!(
        "{} records over {}ms",
        file.records.len(),
        file.records.duration_ms()
    );
    for (index, record) in file.records.iter().enumerate() {
        let marker = if record.kind == ActionKind::Delay { "~" } else { " " };
        println!("{:>4}{} {}", index, marker, record);
    }
    Ok(())
}
