//! Entry command handlers

use anyhow::{bail, Context, Result};
use tracing::warn;

use moodlog_core::{Emoticon, EntryController, Feeling, ListController, SortKey, Store};

use super::journal_error;
use crate::output::Output;

/// List entries, newest first
pub fn list(store: &Store, output: &Output) -> Result<()> {
    let feelings = store
        .objects()
        .sorted(SortKey::Id, true)
        .snapshot()
        .context("Failed to read entries")?;
    output.print_feelings(&feelings)
}

/// Write a new entry
pub fn add(store: &Store, emoticon: String, message: String, output: &Output) -> Result<()> {
    let emoticon: Emoticon = emoticon.parse()?;

    let mut entry = EntryController::new(store);
    entry.select_emoticon(emoticon);
    entry.update_message(message);
    let saved = entry.submit().map_err(journal_error)?;

    if output.is_quiet() {
        println!("{}", saved.id);
        return Ok(());
    }
    output.print_feeling(&saved)
}

/// Replace the message of an entry
///
/// Runs the same begin/submit cycle as the list screen. A rejected message
/// leaves the entry as it was.
pub fn edit(store: &Store, id: i64, message: String, output: &Output) -> Result<()> {
    let mut list = ListController::mount(store)?;
    list.begin_edit(id).map_err(journal_error)?;
    list.update_buffer(message);

    let saved = finish_edit(&mut list, id)?;
    output.print_feeling(&saved)
}

/// Submit the buffer, or leave the editing state if the submit fails
fn finish_edit(list: &mut ListController<'_>, id: i64) -> Result<Feeling> {
    match list.submit_edit(id) {
        Ok(saved) => Ok(saved),
        Err(e) => {
            if let Err(cancel) = list.cancel_edit(id) {
                warn!("Failed to cancel edit of entry {}: {}", id, cancel);
                return Err(journal_error(e)
                    .context(format!("Entry {} may still be marked as being edited", id)));
            }
            Err(journal_error(e))
        }
    }
}

/// Delete an entry by id
pub fn delete(store: &Store, id: i64, output: &Output) -> Result<()> {
    let mut list = ListController::mount(store)?;
    if !list.delete_entry(id).map_err(journal_error)? {
        bail!("No entry with id {}", id);
    }
    output.success(&format!("Deleted entry {}", id));
    Ok(())
}
