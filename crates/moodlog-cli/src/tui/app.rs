//! Application state and logic

use std::time::{Duration, Instant};

use moodlog_core::{
    Emoticon, EntryController, Feeling, JournalError, ListController, Store, StoreResult,
};

/// Which screen is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// The journal list ("My Journal")
    Home,
    /// Composing a new entry ("How do you feel today?")
    Write,
}

/// Application state
///
/// The list controller lives as long as the app. The entry controller only
/// exists while the Write screen is open.
pub struct App<'s> {
    store: &'s Store,
    /// Home screen controller
    pub list: ListController<'s>,
    /// Write screen controller, present while the screen is mounted
    pub write: Option<EntryController<'s>>,
    /// Currently selected row on the Home screen
    pub selected: usize,
    /// Whether the app should exit
    pub should_quit: bool,
    /// Whether help overlay is visible
    pub show_help: bool,
    /// Status message to display temporarily
    pub status_message: Option<String>,
    /// When the status message was set (for auto-dismiss)
    pub status_message_time: Option<Instant>,
    /// Error shown in a modal until a key is pressed
    pub error: Option<String>,
}

impl<'s> App<'s> {
    /// Create the app and mount the Home screen
    pub fn new(store: &'s Store) -> StoreResult<Self> {
        let list = ListController::mount(store)?;
        let mut app = Self {
            store,
            list,
            write: None,
            selected: 0,
            should_quit: false,
            show_help: false,
            status_message: None,
            status_message_time: None,
            error: None,
        };
        // Land on an entry left mid-edit
        if let Some(editing) = app.list.editing() {
            app.select_id(editing.id);
        }
        Ok(app)
    }

    pub fn screen(&self) -> Screen {
        if self.write.is_some() {
            Screen::Write
        } else {
            Screen::Home
        }
    }

    /// Set a status message (will auto-dismiss after 3 seconds)
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Check and clear expired status message
    pub fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() > Duration::from_secs(3) {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Validation failures go to the status bar, anything else to the modal
    fn report(&mut self, err: JournalError) {
        match err.prompt() {
            Some(prompt) => self.set_status(prompt),
            None => self.set_error(err.to_string()),
        }
    }

    // ==================== Home ====================

    /// Entries, newest first
    pub fn entries(&self) -> Vec<Feeling> {
        self.list.entries()
    }

    /// Get the currently selected entry
    pub fn selected_entry(&self) -> Option<Feeling> {
        self.list.entries().get(self.selected).cloned()
    }

    /// Whether an entry is being edited inline
    pub fn is_editing(&self) -> bool {
        self.list.editing().is_some()
    }

    /// Move selection up
    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Move selection down
    pub fn move_down(&mut self) {
        if self.selected < self.list.len().saturating_sub(1) {
            self.selected += 1;
        }
    }

    pub fn move_to_first(&mut self) {
        self.selected = 0;
    }

    pub fn move_to_last(&mut self) {
        self.selected = self.list.len().saturating_sub(1);
    }

    /// Keep the selection inside the list after it changed
    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.list.len().saturating_sub(1));
    }

    fn select_id(&mut self, id: i64) {
        if let Some(index) = self.list.entries().iter().position(|f| f.id == id) {
            self.selected = index;
        }
    }

    /// Start editing the selected entry
    pub fn begin_edit(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        if let Err(e) = self.list.begin_edit(entry.id) {
            self.report(e);
        }
        self.select_id(entry.id);
    }

    /// Append a character to the edit buffer
    pub fn edit_insert_char(&mut self, c: char) {
        let mut buffer = self.list.buffer().to_string();
        buffer.push(c);
        self.list.update_buffer(buffer);
    }

    /// Remove the last character of the edit buffer
    pub fn edit_delete_char(&mut self) {
        let mut buffer = self.list.buffer().to_string();
        buffer.pop();
        self.list.update_buffer(buffer);
    }

    /// Save the edit buffer into the entry being edited
    pub fn commit_edit(&mut self) {
        let Some(editing) = self.list.editing() else {
            return;
        };
        match self.list.submit_edit(editing.id) {
            Ok(_) => {
                self.select_id(editing.id);
                self.set_status("Entry updated");
            }
            Err(e) => self.report(e),
        }
    }

    /// Leave the inline editor without saving
    pub fn cancel_edit(&mut self) {
        let Some(editing) = self.list.editing() else {
            return;
        };
        if let Err(e) = self.list.cancel_edit(editing.id) {
            self.report(e);
        }
    }

    /// Delete the selected entry
    pub fn delete_selected(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        match self.list.delete_entry(entry.id) {
            Ok(true) => self.set_status("Entry deleted"),
            Ok(false) => self.set_status("Entry already gone"),
            Err(e) => self.report(e),
        }
        self.clamp_selection();
    }

    // ==================== Write ====================

    /// Mount the Write screen with an empty form
    pub fn open_write(&mut self) {
        self.write = Some(EntryController::new(self.store));
    }

    /// Unmount the Write screen, dropping anything typed
    pub fn close_write(&mut self) {
        self.write = None;
    }

    pub fn select_emoticon(&mut self, emoticon: Emoticon) {
        if let Some(entry) = self.write.as_mut() {
            entry.select_emoticon(emoticon);
        }
    }

    /// Select the next mood, wrapping around
    pub fn next_emoticon(&mut self) {
        if let Some(entry) = self.write.as_mut() {
            let next = match entry.emoticon() {
                Some(current) => Emoticon::ALL[(current.index() + 1) % Emoticon::ALL.len()],
                None => Emoticon::ALL[0],
            };
            entry.select_emoticon(next);
        }
    }

    /// Select the previous mood, wrapping around
    pub fn prev_emoticon(&mut self) {
        if let Some(entry) = self.write.as_mut() {
            let count = Emoticon::ALL.len();
            let prev = match entry.emoticon() {
                Some(current) => Emoticon::ALL[(current.index() + count - 1) % count],
                None => Emoticon::ALL[count - 1],
            };
            entry.select_emoticon(prev);
        }
    }

    pub fn write_insert_char(&mut self, c: char) {
        if let Some(entry) = self.write.as_mut() {
            let mut message = entry.message().to_string();
            message.push(c);
            entry.update_message(message);
        }
    }

    pub fn write_delete_char(&mut self) {
        if let Some(entry) = self.write.as_mut() {
            let mut message = entry.message().to_string();
            message.pop();
            entry.update_message(message);
        }
    }

    /// Save the new entry and go back to Home
    ///
    /// Stays on the Write screen when validation fails.
    pub fn save_write(&mut self) {
        let Some(entry) = self.write.as_mut() else {
            return;
        };
        match entry.submit() {
            Ok(saved) => {
                self.close_write();
                self.select_id(saved.id);
                self.set_status("Entry saved");
            }
            Err(e) => self.report(e),
        }
    }
}
