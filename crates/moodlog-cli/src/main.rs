//! moodlog CLI
//!
//! Command-line and terminal interface for moodlog, a local mood journal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use moodlog_core::Config;

mod commands;
mod output;
mod tui;

use output::{Output, OutputFormat};

/// Environment variable holding the log level
pub(crate) const LOG_ENV: &str = "MOODLOG_LOG";

#[derive(Parser)]
#[command(name = "moodlog")]
#[command(about = "moodlog - A local journal of how you feel")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the TUI interface
    Tui,
    /// List entries, newest first
    #[command(alias = "ls")]
    List,
    /// Write a new entry
    Add {
        /// Mood: happy, sad, love, dead (or happy-outline, ...)
        emoticon: String,
        /// How you feel
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Replace the message of an entry
    Edit {
        /// Entry ID
        id: i64,
        /// New message
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Delete an entry
    #[command(alias = "rm")]
    Delete {
        /// Entry ID
        id: i64,
    },
    /// Show status (store location, schema, counts)
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Handle TUI (default when no command given)
    if matches!(&cli.command, Some(Commands::Tui) | None) {
        return tui::run();
    }

    init_cli_logging();

    // Commands that don't need the store
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), &output);
    }

    let config = Config::load().context("Failed to load configuration")?;
    let store = commands::open_store(&config, &output)?;

    match cli.command {
        Some(Commands::List) => commands::entry::list(&store, &output),
        Some(Commands::Add { emoticon, message }) => {
            commands::entry::add(&store, emoticon, message.join(" "), &output)
        }
        Some(Commands::Edit { id, message }) => {
            commands::entry::edit(&store, id, message.join(" "), &output)
        }
        Some(Commands::Delete { id }) => commands::entry::delete(&store, id, &output),
        Some(Commands::Status) => commands::status::show(&store, &config, &output),
        Some(Commands::Tui) | Some(Commands::Config { .. }) | None => unreachable!(), // Handled above
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

/// Filter for this workspace's crates at `level`
pub(crate) fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("moodlog_core={},moodlog={}", level, level))
}

/// Initialize stderr logging for subcommands
///
/// Level comes from MOODLOG_LOG and defaults to warn.
fn init_cli_logging() {
    let level = std::env::var(LOG_ENV).unwrap_or_else(|_| "warn".to_string());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(&level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
