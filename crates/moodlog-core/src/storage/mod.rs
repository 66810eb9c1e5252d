//! Storage layer
//!
//! SQLite persistence for the journal.
//!
//! ## Layout
//!
//! - `schema`: Table layouts per schema revision and version tracking
//! - `migration`: Transactional revision upgrades with old/new views
//! - `queries`: Row-level SQL shared by every caller
//! - `keys`: Strictly increasing primary keys
//! - `error`: Typed store errors

pub mod error;
pub mod keys;
pub mod migration;
pub mod queries;
pub mod schema;

pub use error::{StoreError, StoreResult};
pub use keys::KeyGenerator;
pub use migration::{migrate_feelings, NewView, OldView};
pub use schema::{MIN_SCHEMA_VERSION, SCHEMA_VERSION};
