//! mediacast-queue - inspect and manage the pending post queue
//!
//! Operator-side tool over the same store the daemon uses. It never
//! publishes; delivery stays with the daemon's scheduler.

use clap::{Parser, Subcommand};
use serde::Serialize;

use libmediacast::{Config, Database, MediacastError, PostQueue, Result};

#[derive(Parser, Debug)]
#[command(name = "mediacast-queue")]
#[command(version)]
#[command(about = "Manage the pending post queue")]
#[command(long_about = "\
mediacast-queue - inspect and manage the pending post queue

DESCRIPTION:
    mediacast-queue operates on the same database as mediacast-bot.
    Use it to review pending posts, drop unwanted submissions, check
    queue statistics, or read and change the broadcast interval.

    It never delivers posts itself; publishing stays with the daemon.

COMMANDS:
    list        List pending posts, oldest first
    delete      Delete a post by id
    stats       Show queue statistics
    interval    Read or set the broadcast interval

USAGE EXAMPLES:
    # List the 40 oldest pending posts
    mediacast-queue list

    # List as JSON
    mediacast-queue list --format json

    # Delete a post
    mediacast-queue delete 17

    # Show queue statistics
    mediacast-queue stats

    # Read the current interval
    mediacast-queue interval get

    # Set the interval to 15 minutes
    mediacast-queue interval set 15

CONFIGURATION:
    Configuration file: ~/.config/mediacast/config.toml
    Override with the MEDIACAST_CONFIG environment variable.

EXIT CODES:
    0 - Success
    1 - Operation or database error
    2 - Configuration error
    3 - Invalid input (missing post id, non-positive interval, etc.)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List pending posts, oldest first
    List {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Maximum number of posts to show
        #[arg(short, long, default_value_t = 40)]
        limit: i64,
    },

    /// Delete a post by id
    Delete {
        /// Post id to delete
        post_id: i64,
    },

    /// Show queue statistics
    Stats {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Read or set the broadcast interval
    Interval {
        #[command(subcommand)]
        action: IntervalAction,
    },
}

#[derive(Subcommand, Debug)]
enum IntervalAction {
    /// Print the current interval
    Get,
    /// Set the interval in minutes
    Set {
        /// Interval in minutes (positive integer)
        minutes: String,
    },
}

#[derive(Serialize)]
struct QueueStats {
    pending: i64,
    published: i64,
    interval_minutes: Option<i64>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("error")
            .with_writer(std::io::stderr)
            .init();
    }

    // Run the main logic and handle errors
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let db = Database::new(&config.database.path).await?;

    match cli.command {
        Commands::List { format, limit } => cmd_list(&db, &format, limit).await?,
        Commands::Delete { post_id } => cmd_delete(&db, post_id).await?,
        Commands::Stats { format } => cmd_stats(&db, &format).await?,
        Commands::Interval { action } => match action {
            IntervalAction::Get => cmd_interval_get(&db).await?,
            IntervalAction::Set { minutes } => cmd_interval_set(&db, &minutes).await?,
        },
    }

    Ok(())
}

fn validate_format(format: &str) -> Result<()> {
    if format != "text" && format != "json" {
        return Err(MediacastError::Validation(format!(
            "Invalid format '{}'. Must be 'text' or 'json'",
            format
        )));
    }
    Ok(())
}

fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

async fn cmd_list(db: &Database, format: &str, limit: i64) -> Result<()> {
    validate_format(format)?;

    let posts = db.list_unpublished(limit).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&posts).unwrap_or_default());
        return Ok(());
    }

    if posts.is_empty() {
        println!("No pending posts.");
        return Ok(());
    }

    println!("{:<8} {:<7} {:<20} FILE", "ID", "KIND", "CREATED");
    for post in posts {
        println!(
            "{:<8} {:<7} {:<20} {}",
            post.id,
            post.kind.as_str(),
            format_timestamp(post.created_at),
            post.file_ref
        );
    }
    Ok(())
}

async fn cmd_delete(db: &Database, post_id: i64) -> Result<()> {
    let queue = PostQueue::new(db.clone());
    queue.delete(post_id).await?;
    println!("Deleted post {}", post_id);
    Ok(())
}

async fn cmd_stats(db: &Database, format: &str) -> Result<()> {
    validate_format(format)?;

    let stats = QueueStats {
        pending: db.count_posts(false).await?,
        published: db.count_posts(true).await?,
        interval_minutes: db.settings().await?.map(|s| s.interval_minutes),
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
        return Ok(());
    }

    println!("Pending:   {}", stats.pending);
    println!("Published: {}", stats.published);
    match stats.interval_minutes {
        Some(minutes) => println!("Interval:  {} minutes", minutes),
        None => println!("Interval:  not set (automatic publishing is off)"),
    }
    Ok(())
}

async fn cmd_interval_get(db: &Database) -> Result<()> {
    match db.settings().await? {
        Some(settings) => println!("{} minutes", settings.interval_minutes),
        None => println!("not set (automatic publishing is off)"),
    }
    Ok(())
}

async fn cmd_interval_set(db: &Database, input: &str) -> Result<()> {
    let minutes = libmediacast::admin::parse_interval(input)?;
    db.set_interval(minutes).await?;
    println!("Interval set to {} minutes", minutes);
    println!("The daemon applies it on its next arming decision.");
    Ok(())
}
