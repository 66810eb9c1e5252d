//! Screen controllers
//!
//! Framework-independent state for the two journal screens. Controllers
//! borrow the store they act on and change it only through write
//! transactions; the terminal UI (or any other front end) only renders
//! their state and forwards user input.
//!
//! - `list`: the journal list with inline editing and deletion
//! - `entry`: composing a new entry

mod entry;
mod list;

pub use entry::EntryController;
pub use list::ListController;

use thiserror::Error;

use crate::storage::StoreError;

/// Input rejected before it reaches the store
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No emoticon selected")]
    MissingEmoticon,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Entry {0} is not being edited")]
    NotEditing(i64),
}

impl ValidationError {
    /// Text shown to the user
    pub fn prompt(&self) -> &'static str {
        match self {
            ValidationError::MissingEmoticon | ValidationError::EmptyMessage => {
                "Please let me know your feelings today :)"
            }
            ValidationError::NotEditing(_) => "Press e to edit this entry first.",
        }
    }
}

/// Errors returned by controller actions
#[derive(Error, Debug)]
pub enum JournalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl JournalError {
    /// Prompt to show the user, for validation failures
    pub fn prompt(&self) -> Option<&'static str> {
        match self {
            JournalError::Validation(err) => Some(err.prompt()),
            JournalError::Store(_) => None,
        }
    }
}

/// The message as typed, or `EmptyMessage` when it is only whitespace
fn non_empty(message: &str) -> Result<&str, ValidationError> {
    if message.trim().is_empty() {
        Err(ValidationError::EmptyMessage)
    } else {
        Ok(message)
    }
}
