//! mediacast-bot - media queue broadcast daemon
//!
//! Receives media submissions over the Telegram gateway, queues them,
//! and republishes them to the configured channel on the
//! administrator-set interval.

use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use libmediacast::admin::AdminController;
use libmediacast::dispatch::Dispatcher;
use libmediacast::gateway::telegram::TelegramGateway;
use libmediacast::gateway::{ChatId, MessageGateway};
use libmediacast::ingest::Ingestor;
use libmediacast::{Config, Database, PostQueue, Publisher, Result, Scheduler};

#[derive(Parser, Debug)]
#[command(name = "mediacast-bot")]
#[command(version)]
#[command(about = "Media queue broadcast daemon")]
#[command(long_about = "\
mediacast-bot - media queue broadcast daemon

DESCRIPTION:
    mediacast-bot is a long-running daemon that accepts photo and video
    submissions from chat users, stores them as pending posts, and
    republishes them to a single broadcast channel.

    Automatic publishing is off until an administrator sets an interval
    through the interactive menu. One pending post goes out per tick,
    oldest first; a failed delivery stays queued and is retried on the
    next tick.

USAGE:
    # Run in foreground (logs to stderr)
    mediacast-bot

    # Use an explicit config file
    mediacast-bot --config /etc/mediacast/config.toml

    # Enable verbose logging
    mediacast-bot --verbose

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (finishes the current cycle)

CONFIGURATION:
    Configuration file: ~/.config/mediacast/config.toml

    [database]
    path = \"~/.local/share/mediacast/mediacast.db\"

    [telegram]
    token = \"<bot token>\"        # or MEDIACAST_BOT_TOKEN
    channel_id = \"@yourchannel\"  # or MEDIACAST_CHANNEL_ID

    [admin]
    chat_ids = [123456789]

    [ingest]
    caption = \"posted via mediacast\"

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime error
    2 - Configuration error
")]
struct Cli {
    /// Path to the configuration file (overrides MEDIACAST_CONFIG)
    #[arg(long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    #[arg(help = "Enable verbose logging (useful for debugging)")]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    libmediacast::logging::init_from_env(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    if config.admin.chat_ids.is_empty() {
        info!("no admin chat ids configured; the interval can never be set");
    }

    let db = Database::new(&config.database.path).await?;
    let gateway: Arc<dyn MessageGateway> =
        Arc::new(TelegramGateway::connect(&config.telegram.token).await?);

    info!("mediacast-bot starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    setup_signal_handlers(shutdown_tx)?;

    let queue = PostQueue::new(db.clone());
    let destination = ChatId::from(config.telegram.channel_id.as_str());
    let publisher = Publisher::new(queue.clone(), db.clone(), gateway.clone(), destination);

    let (scheduler, handle) = Scheduler::new(db.clone(), publisher, shutdown_rx.clone());
    let scheduler_task = tokio::spawn(scheduler.run());

    let admins = config.admin_set();
    let admin = AdminController::new(
        db.clone(),
        queue.clone(),
        gateway.clone(),
        handle,
        admins.clone(),
    );
    let ingestor = Ingestor::new(db, queue, admins, config.ingest.caption.clone());
    let dispatcher = Dispatcher::new(gateway, ingestor, admin);

    dispatcher.run(shutdown_rx).await;

    if let Err(e) = scheduler_task.await {
        error!("scheduler task failed: {}", e);
    }

    info!("mediacast-bot stopped");
    Ok(())
}

/// Set up signal handlers for graceful shutdown
#[cfg(unix)]
fn setup_signal_handlers(shutdown: watch::Sender<bool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(|e| {
        libmediacast::MediacastError::Validation(format!("Signal setup failed: {}", e))
    })?;

    // Spawn thread to handle signals
    std::thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGTERM | SIGINT => {
                    info!("Received shutdown signal, stopping gracefully...");
                    let _ = shutdown.send(true);
                    break;
                }
                _ => {}
            }
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(_shutdown: watch::Sender<bool>) -> Result<()> {
    Ok(())
}
