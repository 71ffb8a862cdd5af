//! Synheart Ambient CLI
//!
//! Real-time affective-state classifier for ambient UI colouring.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use synheart_ambient::{
    collector::{Collector, CollectorError, EventSender, SensorEvent},
    config::{Config, SourceConfig},
    core::{load_events, replay},
    scheduler::Scheduler,
    transparency::create_shared_log_with_persistence,
    TrackingSession, PRIVACY_DECLARATION, VERSION,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "synheart-ambient")]
#[command(author = "Synheart")]
#[command(version = VERSION)]
#[command(about = "Real-time affective-state classifier for ambient UI colouring", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a live JSON Lines event stream
    Run {
        /// Read events from a file instead of stdin
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Input sources to accept (pointer, scroll, click, keyboard, or all)
        #[arg(long)]
        sources: Option<String>,
    },

    /// Replay a recorded event stream with deterministic ticks
    Replay {
        /// JSON Lines recording
        #[arg(long, short)]
        input: PathBuf,

        /// Output format (json or jsonl)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Serve the classifier over HTTP
    #[cfg(feature = "server")]
    Serve {
        /// Port to bind on 127.0.0.1 (0 for random)
        #[arg(long, default_value = "8787")]
        port: u16,
    },

    /// Show configuration and cumulative statistics
    Status,

    /// Display privacy declaration
    Privacy,

    /// Show configuration
    Config {
        /// Write the default configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let config_file = cli.config_file.as_deref();
    match cli.command {
        Commands::Run { input, sources } => cmd_run(config_file, input, sources.as_deref()),
        Commands::Replay { input, format } => cmd_replay(config_file, &input, &format),
        #[cfg(feature = "server")]
        Commands::Serve { port } => cmd_serve(config_file, port),
        Commands::Status => cmd_status(config_file),
        Commands::Privacy => {
            println!("{PRIVACY_DECLARATION}");
            Ok(())
        }
        Commands::Config { init } => cmd_config(config_file, init),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Config::config_path);
    Config::load_from(&path).with_context(|| format!("loading {}", path.display()))
}

fn cmd_run(
    config_file: Option<&Path>,
    input: Option<PathBuf>,
    sources: Option<&str>,
) -> anyhow::Result<()> {
    let mut config = load_config(config_file)?;
    if let Some(sources) = sources {
        config.sources = SourceConfig::from_csv(sources);
    }
    if !config.sources.any_enabled() {
        bail!("At least one source must be enabled (pointer, scroll, click or keyboard)");
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    println!("Synheart Ambient v{VERSION}");
    println!();
    println!("  Tick interval: {}ms", config.tick_interval.as_millis());
    println!("  Hysteresis threshold: {} ticks", config.hysteresis_threshold);
    println!("  Idle threshold: {}s", config.idle_threshold.as_secs());
    println!(
        "  Input: {}",
        input
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdin".to_string())
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let transparency_log =
        create_shared_log_with_persistence(config.data_path.join("transparency.json"));

    let mut collector = Collector::new(config.sources.clone());
    collector.start()?;

    let mut session = TrackingSession::new(&config)?;
    session.subscribe(Box::new(|change| {
        println!("[{}] {}", change.at.format("%H:%M:%S"), change.describe());
    }));

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    spawn_reader(input, collector.sender())?;

    let scheduler = Scheduler::spawn(
        session,
        collector.receiver().clone(),
        config.tick_interval,
        transparency_log.clone(),
    )
    .context("starting scheduler")?;
    println!("Session ID: {}", scheduler.session_id());

    while running.load(Ordering::SeqCst) && !scheduler.is_finished() {
        thread::sleep(Duration::from_millis(100));
    }

    println!();
    println!("Stopping session...");
    collector.stop();
    scheduler.stop();

    if let Err(e) = transparency_log.save() {
        eprintln!("Warning: Could not save transparency log: {e}");
    }

    println!();
    println!("{}", transparency_log.summary());
    Ok(())
}

/// Feed JSON Lines events from `input` (or stdin) into the collector.
fn spawn_reader(input: Option<PathBuf>, sender: EventSender) -> anyhow::Result<()> {
    let reader: Box<dyn BufRead + Send> = match input {
        Some(path) => {
            let file = std::fs::File::open(&path)
                .with_context(|| format!("opening {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    thread::Builder::new()
        .name("synheart-reader".to_string())
        .spawn(move || {
            for (index, line) in reader.lines().enumerate() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::error!("Input read failed: {e}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                let event: SensorEvent = match serde_json::from_str(&line) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!("Skipping line {}: {e}", index + 1);
                        continue;
                    }
                };

                match sender.send(event) {
                    Ok(_) => {}
                    Err(CollectorError::QueueFull) => tracing::warn!("Event queue full, dropping event"),
                    Err(e) => {
                        tracing::debug!("Stopping reader: {e}");
                        break;
                    }
                }
            }
            tracing::debug!("Input stream ended");
        })?;

    Ok(())
}

fn cmd_replay(config_file: Option<&Path>, input: &Path, format: &str) -> anyhow::Result<()> {
    if format != "json" && format != "jsonl" {
        bail!("Unknown format '{format}'. Use 'json' or 'jsonl'.");
    }

    let config = load_config(config_file)?;
    let events = load_events(input).with_context(|| format!("reading {}", input.display()))?;
    let start = events
        .iter()
        .map(|event| event.timestamp)
        .min()
        .unwrap_or_else(Utc::now);

    let changes = replay(&config, start, &events)?;
    tracing::info!(
        events = events.len(),
        changes = changes.len(),
        "Replay finished"
    );

    if format == "jsonl" {
        for change in &changes {
            println!("{}", serde_json::to_string(change)?);
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&changes)?);
    }
    Ok(())
}

#[cfg(feature = "server")]
fn cmd_serve(config_file: Option<&Path>, port: u16) -> anyhow::Result<()> {
    use synheart_ambient::server::{run, ServerConfig};

    let config = load_config(config_file)?;
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let server = run(ServerConfig::new(port, config)).await?;
        println!("Listening on http://{}", server.addr);
        println!("Press Ctrl+C to stop");

        tokio::signal::ctrl_c().await?;
        server.shutdown().await;
        Ok::<(), anyhow::Error>(())
    })
}

fn cmd_status(config_file: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_file)?;

    println!("Synheart Ambient Status");
    println!("=======================");
    println!();

    println!("Configuration:");
    println!("  Tick interval: {}ms", config.tick_interval.as_millis());
    println!("  Hysteresis threshold: {} ticks", config.hysteresis_threshold);
    println!("  Idle threshold: {}s", config.idle_threshold.as_secs());
    println!(
        "  Attack / decay: {:.2} / {:.2}",
        config.filter.attack, config.filter.decay
    );
    let enabled = |on: bool| if on { "enabled" } else { "disabled" };
    println!("  Pointer: {}", enabled(config.sources.pointer));
    println!("  Scroll: {}", enabled(config.sources.scroll));
    println!("  Click: {}", enabled(config.sources.click));
    println!("  Keyboard: {}", enabled(config.sources.keyboard));
    println!();

    // Load and show transparency stats if available
    let stats_path = config.data_path.join("transparency.json");
    if stats_path.exists() {
        let content = std::fs::read_to_string(&stats_path)?;
        let stats: serde_json::Value = serde_json::from_str(&content)?;
        println!("Cumulative Statistics:");
        for (key, label) in [
            ("pointer_events", "Pointer events"),
            ("scroll_events", "Scroll events"),
            ("click_events", "Click events"),
            ("key_events", "Key events"),
            ("ticks_evaluated", "Ticks evaluated"),
            ("state_commits", "State changes"),
        ] {
            if let Some(value) = stats.get(key) {
                println!("  {label}: {value}");
            }
        }
    } else {
        println!("No previous session data found.");
    }
    Ok(())
}

fn cmd_config(config_file: Option<&Path>, init: bool) -> anyhow::Result<()> {
    let path = config_file
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_path);

    if init {
        Config::default().save_to(&path)?;
        println!("Wrote default configuration to {path:?}");
        return Ok(());
    }

    let config = load_config(Some(&path))?;
    println!("Configuration file: {path:?}");
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")
}
