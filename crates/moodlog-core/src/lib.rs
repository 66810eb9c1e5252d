//! moodlog Core Library
//!
//! This crate provides the core functionality for moodlog, a local mood
//! journal: each entry pairs a mood emoticon with a short message.
//!
//! # Architecture
//!
//! - **SQLite**: Embedded, versioned record store (one `feelings` table)
//! - **Live queries**: Sorted result handles that push a fresh snapshot to
//!   their listeners after every committed write
//! - **Controllers**: Framework-independent screen state for the list and
//!   entry screens, acting on the store only through write transactions
//!
//! # Quick Start
//!
//! ```text
//! let store = Store::open_with_config(&Config::load()?)?;
//!
//! // Create an entry
//! let mut entry = EntryController::new(&store);
//! entry.select_emoticon(Emoticon::HappyOutline);
//! entry.update_message("great day");
//! entry.submit()?;
//!
//! // Observe the journal, newest first
//! let list = ListController::mount(&store)?;
//! let entries = list.entries();
//! ```
//!
//! # Modules
//!
//! - `store`: Store handle and write transactions (main entry point)
//! - `live`: Live result sets, listeners and change sets
//! - `models`: The `Feeling` record and the emoticon set
//! - `storage`: Schema revisions, migration, key generation, errors
//! - `journal`: List and entry screen controllers
//! - `config`: Application configuration

pub mod config;
pub mod journal;
pub mod live;
pub mod models;
pub mod storage;
pub mod store;

pub use config::Config;
pub use journal::{EntryController, JournalError, ListController, ValidationError};
pub use live::{ChangeSet, ListenerId, LiveResults, SortKey};
pub use models::{Emoticon, Feeling};
pub use storage::{
    migrate_feelings, KeyGenerator, NewView, OldView, StoreError, StoreResult, SCHEMA_VERSION,
};
pub use store::{Store, WriteTxn};
