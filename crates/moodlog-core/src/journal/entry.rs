//! New entry controller

use tracing::{info, warn};

use super::{non_empty, JournalError, ValidationError};
use crate::models::{Emoticon, Feeling};
use crate::storage::StoreError;
use crate::store::Store;

/// Keys tried before a collision is reported
const MAX_KEY_ATTEMPTS: usize = 3;

/// State of the "How do you feel today?" screen
pub struct EntryController<'s> {
    store: &'s Store,
    emoticon: Option<Emoticon>,
    message: String,
}

impl<'s> EntryController<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self {
            store,
            emoticon: None,
            message: String::new(),
        }
    }

    /// Select a mood, replacing any earlier choice
    pub fn select_emoticon(&mut self, emoticon: Emoticon) {
        self.emoticon = Some(emoticon);
    }

    pub fn emoticon(&self) -> Option<Emoticon> {
        self.emoticon
    }

    /// Replace the message; no transaction
    pub fn update_message(&mut self, text: impl Into<String>) {
        self.message = text.into();
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Store the entry
    ///
    /// Fails validation without a transaction when no emoticon is selected
    /// or the message is blank. Returns once the new feeling is committed,
    /// after which the form is cleared. A key collision with a record written
    /// elsewhere is retried with a fresh key.
    pub fn submit(&mut self) -> Result<Feeling, JournalError> {
        let emoticon = self.emoticon.ok_or(ValidationError::MissingEmoticon)?;
        let message = non_empty(&self.message)?.to_string();

        let mut attempt = 1;
        loop {
            let feeling = Feeling::new(self.store.next_key(), emoticon.as_str(), message.clone());
            match self.store.write(|txn| txn.create(feeling)) {
                Ok(saved) => {
                    info!("Saved feeling {} ({})", saved.id, saved.emoticon);
                    self.emoticon = None;
                    self.message.clear();
                    return Ok(saved);
                }
                Err(StoreError::DuplicateKey(id)) if attempt < MAX_KEY_ATTEMPTS => {
                    warn!("Key {} already taken, retrying with a new key", id);
                    self.store.resync_keys()?;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{migrate_feelings, SCHEMA_VERSION};
    use tempfile::TempDir;

    fn open_store(temp: &TempDir) -> Store {
        Store::open(temp.path().join("diary.db"), SCHEMA_VERSION, migrate_feelings).unwrap()
    }

    #[test]
    fn test_submit_creates_feeling() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let mut entry = EntryController::new(&store);

        entry.select_emoticon(Emoticon::HappyOutline);
        entry.update_message("great day");
        let saved = entry.submit().unwrap();

        assert_eq!(saved.emoticon, "happy-outline");
        assert_eq!(saved.message, "great day");
        assert!(!saved.is_editing);
        assert_eq!(store.object_for_key(saved.id).unwrap(), Some(saved));
        assert_eq!(entry.emoticon(), None);
        assert_eq!(entry.message(), "");
    }

    #[test]
    fn test_submit_keeps_surrounding_whitespace() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let mut entry = EntryController::new(&store);

        entry.select_emoticon(Emoticon::HeartOutline);
        entry.update_message("\tindented\n\n");
        let saved = entry.submit().unwrap();

        assert_eq!(saved.message, "\tindented\n\n");
        assert_eq!(
            store.object_for_key(saved.id).unwrap().unwrap().message,
            "\tindented\n\n"
        );
    }

    #[test]
    fn test_single_select() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let mut entry = EntryController::new(&store);

        entry.select_emoticon(Emoticon::HappyOutline);
        entry.select_emoticon(Emoticon::SkullOutline);
        assert_eq!(entry.emoticon(), Some(Emoticon::SkullOutline));
    }

    #[test]
    fn test_validation_skips_store() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let mut entry = EntryController::new(&store);

        entry.update_message("no mood picked");
        assert!(matches!(
            entry.submit().unwrap_err(),
            JournalError::Validation(ValidationError::MissingEmoticon)
        ));

        entry.select_emoticon(Emoticon::SadOutline);
        entry.update_message(" \t ");
        assert!(matches!(
            entry.submit().unwrap_err(),
            JournalError::Validation(ValidationError::EmptyMessage)
        ));

        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(entry.emoticon(), Some(Emoticon::SadOutline));
    }

    #[test]
    fn test_rapid_submits_get_distinct_keys() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let mut entry = EntryController::new(&store);

        let mut keys = Vec::new();
        for n in 0..20 {
            entry.select_emoticon(Emoticon::HeartOutline);
            entry.update_message(format!("entry {n}"));
            keys.push(entry.submit().unwrap().id);
        }

        assert!(keys.windows(2).all(|pair| pair[1] > pair[0]));
        assert_eq!(store.count().unwrap(), 20);
    }

    #[test]
    fn test_retries_key_taken_by_other_connection() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let other = open_store(&temp);

        // Occupy the next few seconds of clock keys behind the first handle's back
        let now = chrono::Utc::now().timestamp_millis();
        other
            .write(|txn| {
                for id in now..now + 10_000 {
                    txn.create(Feeling::new(id, "skull-outline", "taken"))?;
                }
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let mut entry = EntryController::new(&store);
        entry.select_emoticon(Emoticon::HappyOutline);
        entry.update_message("still saved");
        let saved = entry.submit().unwrap();

        assert!(saved.id >= now + 10_000);
        assert_eq!(store.count().unwrap(), 10_001);
    }
}
