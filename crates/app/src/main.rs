mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{format_clock, Command, HELP};
use podplay_core::keys::track_id_from_position_key;
use podplay_core::{AppConfig, SessionPhase};
use podplay_native::{AudioEngine, EngineEvent, EngineState, JsonFileStore, SimulatedEngine};
use podplay_session::{PlaybackSessionManager, RemoteControlBridge, SessionConfig, SessionStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

const SIMULATED_LOAD_LATENCY: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(
    name = "podplay",
    about = "Podcast playback session: load, seek, resume, remote controls"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Run,
    Status,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cmd = cli.command.unwrap_or(Commands::Run);
    let cfg_path = cli.config.unwrap_or_else(default_config_path);

    match cmd {
        Commands::Config {
            action: ConfigAction::Init,
        } => {
            init_config(&cfg_path)?;
            println!("Initialized config at {}", cfg_path.display());
            Ok(())
        }
        Commands::Status => {
            let cfg = load_or_default(&cfg_path)?;
            init_logging(&cfg.log_level);
            status(&cfg).await
        }
        Commands::Run => {
            let cfg = load_or_default(&cfg_path)?;
            init_logging(&cfg.log_level);
            run(cfg).await
        }
    }
}

async fn run(cfg: AppConfig) -> Result<()> {
    let store_path = resolve_store_path(&cfg);
    let kv = Arc::new(JsonFileStore::open(&store_path).await?);
    let engine = Arc::new(SimulatedEngine::new(SIMULATED_LOAD_LATENCY));
    let session = Arc::new(PlaybackSessionManager::new(
        engine.clone(),
        kv,
        SessionConfig::from_app_config(&cfg),
    ));

    let events = session.subscribe_events(cfg.event_channel_capacity);
    tokio::spawn(RemoteControlBridge::new(session.clone()).run(events));
    spawn_progress_ticker(engine.clone(), cfg.intervals.progress_update_secs);

    session
        .initialize()
        .await
        .context("failed to initialize audio engine")?;
    info!(store = %store_path.display(), "podplay started");
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(cmd)) => execute(&session, &engine, cmd).await,
                    Ok(None) => {}
                    Err(err) => println!("{err:#}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c; shutting down");
                break;
            }
        }
    }

    if session.phase() == SessionPhase::Playing {
        if let Err(err) = session.pause().await {
            warn!(error = %err, "failed to pause before exit");
        }
    }
    Ok(())
}

async fn execute(session: &PlaybackSessionManager, engine: &SimulatedEngine, cmd: Command) {
    let result = match cmd {
        Command::Load(track) => session.load_track(track).await,
        Command::Play => session.play().await,
        Command::Pause => session.pause().await,
        Command::Seek(secs) => session.seek_to(secs).await,
        Command::Forward(Some(secs)) => session.skip_forward(secs).await,
        Command::Forward(None) => session.skip_forward_default().await,
        Command::Back(Some(secs)) => session.skip_backward(secs).await,
        Command::Back(None) => session.skip_backward_default().await,
        Command::Speed(rate) => session.set_speed(rate).await,
        Command::Remote(event) => {
            engine.emit(event);
            Ok(())
        }
        Command::Status => {
            print_session(session);
            Ok(())
        }
        Command::Help => {
            println!("{HELP}");
            Ok(())
        }
        Command::Quit => Ok(()),
    };
    if let Err(err) = result {
        error!(error = %err, "command failed");
    }
}

fn print_session(session: &PlaybackSessionManager) {
    let state = session.snapshot();
    println!("phase: {:?}", session.phase());
    match session.current_track() {
        Some(track) => println!("track: {} ({})", track.title(), track.id()),
        None => println!("track: <none>"),
    }
    println!(
        "position: {} / {}",
        format_clock(state.position),
        if state.duration > 0.0 {
            format_clock(state.duration)
        } else {
            "?".to_string()
        }
    );
    println!("speed: {}", session.speed());
}

/// Feeds progress events into the bridge the way a platform player does.
fn spawn_progress_ticker(engine: Arc<SimulatedEngine>, every_secs: f64) {
    let every = Duration::from_secs_f64(every_secs.max(0.1));
    tokio::spawn(async move {
        let mut ended = false;
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let (Ok(state), Ok(progress)) = (engine.get_state().await, engine.get_progress().await)
            else {
                continue;
            };
            if state != EngineState::Playing {
                ended = false;
                continue;
            }
            engine.emit(EngineEvent::ProgressUpdated(progress));
            let at_end = progress.duration > 0.0 && progress.position >= progress.duration;
            if at_end && !ended {
                ended = true;
                if let Err(err) = engine.pause().await {
                    warn!(error = %err, "failed to stop at end of queue");
                }
                engine.emit(EngineEvent::QueueEnded);
            }
        }
    });
}

async fn status(cfg: &AppConfig) -> Result<()> {
    let store_path = resolve_store_path(cfg);
    let kv = Arc::new(JsonFileStore::open(&store_path).await?);
    let keys = kv.keys().await;
    let store = SessionStore::new(kv);

    println!("store: {}", store_path.display());
    match store.load_speed().await? {
        Some(speed) => println!("speed: {speed}"),
        None => println!("speed: <default>"),
    }

    let mut any = false;
    for key in &keys {
        let Some(track_id) = track_id_from_position_key(key) else {
            continue;
        };
        if let Some(record) = store.load_position(track_id).await? {
            any = true;
            println!(
                "{track_id}: {} (updated {} ms)",
                format_clock(record.position),
                record.updated_at
            );
        }
    }
    if !any {
        println!("no saved positions");
    }

    Ok(())
}

fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("podplay").join("config.toml")
}

fn resolve_store_path(cfg: &AppConfig) -> PathBuf {
    cfg.store_path.clone().unwrap_or_else(|| {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("podplay").join("store.json")
    })
}

fn init_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let cfg = AppConfig::default();
    let toml = toml::to_string_pretty(&cfg)?;
    std::fs::write(path, toml)
        .with_context(|| format!("failed to write config file {}", path.display()))?;
    Ok(())
}

fn load_or_default(path: &Path) -> Result<AppConfig> {
    let mut cfg = if !path.exists() {
        AppConfig::default()
    } else {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))?
    };
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("PODPLAY_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.log_level = v;
        }
    }
    if let Ok(v) = std::env::var("PODPLAY_STORE_PATH") {
        if !v.trim().is_empty() {
            cfg.store_path = Some(PathBuf::from(v));
        }
    }
}
