//! Subcommand handlers

pub mod config;
pub mod entry;
pub mod status;

use anyhow::{anyhow, Result};
use moodlog_core::{Config, JournalError, Store};

use crate::output::Output;

/// Open the journal for a subcommand
///
/// Prints the recovery hint for startup-fatal errors before failing.
pub fn open_store(config: &Config, output: &Output) -> Result<Store> {
    Store::open_with_config(config).map_err(|e| {
        if let Some(hint) = e.recovery_suggestion() {
            if !output.is_quiet() {
                eprintln!("hint: {}", hint);
            }
        }
        anyhow::Error::new(e).context(format!(
            "Could not open journal at {}",
            config.store_path().display()
        ))
    })
}

/// Validation failures become their user prompt
pub fn journal_error(err: JournalError) -> anyhow::Error {
    match err.prompt() {
        Some(prompt) => anyhow!(prompt),
        None => err.into(),
    }
}
