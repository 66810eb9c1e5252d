//! moodlog TUI
//!
//! Terminal user interface for the journal.
//!
//! ## Screens
//!
//! - Home ("My Journal"): entries, newest first, with inline editing
//! - Write ("How do you feel today?"): pick a mood and write a message
//!
//! ## Home keys
//!
//! - j/k or ↑/↓: Move selection up/down
//! - e or Enter: Edit the selected entry (Enter saves, Esc cancels)
//! - d: Delete the selected entry
//! - a or +: Write a new entry
//! - ?: Help
//! - q: Quit
//!
//! ## Write keys
//!
//! - ←/→ or Tab: Choose a mood (Alt+1..4 jumps to one)
//! - Enter: Save and go back
//! - Esc: Go back without saving

mod app;
mod ui;

use std::fs::File;
use std::io::stdout;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing::{error, info};

use moodlog_core::{Config, Emoticon, Store};

use app::{App, Screen};

use crate::{log_filter, LOG_ENV};

/// Run the TUI application
pub fn run() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize TUI logging (file-based, only if MOODLOG_LOG is set)
    init_tui_logging(&config);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = open_and_run(&mut terminal, &config);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

/// Open the store behind a loading frame, then run the app
///
/// A store that cannot be opened or migrated is reported on a blocking
/// error screen and the TUI exits with the error.
fn open_and_run<B: Backend>(terminal: &mut Terminal<B>, config: &Config) -> Result<()> {
    let store_path = config.store_path();
    terminal.draw(|frame| ui::draw_loading(frame, &store_path))?;

    let store = match Store::open_with_config(config) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open journal: {}", e);
            terminal.draw(|frame| ui::draw_startup_error(frame, &e))?;
            wait_for_key()?;
            return Err(anyhow::Error::new(e).context(format!(
                "Could not open journal at {}",
                store_path.display()
            )));
        }
    };

    let mut app = App::new(&store)?;
    run_app(terminal, &mut app)
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App<'_>) -> Result<()> {
    loop {
        // Check for status message timeout
        app.check_status_timeout();

        // Draw UI
        terminal.draw(|frame| ui::draw(frame, app))?;

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key.code, key.modifiers);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Block until any key is pressed
fn wait_for_key() -> Result<()> {
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(());
            }
        }
    }
}

/// Route a key press to the active screen
fn handle_key(app: &mut App<'_>, code: KeyCode, modifiers: KeyModifiers) {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // If error modal is showing, any key dismisses it
    if app.has_error() {
        app.clear_error();
        return;
    }

    // If help is showing, any key dismisses it
    if app.show_help {
        app.show_help = false;
        return;
    }

    match app.screen() {
        Screen::Home if app.is_editing() => handle_edit_mode(app, code),
        Screen::Home => handle_home_mode(app, code),
        Screen::Write => handle_write_mode(app, code, modifiers),
    }
}

/// Handle key events on the Home screen
fn handle_home_mode(app: &mut App<'_>, code: KeyCode) {
    // Clear status message on navigation keys
    if matches!(
        code,
        KeyCode::Char('j') | KeyCode::Char('k') | KeyCode::Up | KeyCode::Down
    ) {
        app.status_message = None;
    }

    match code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('g') | KeyCode::Home => app.move_to_first(),
        KeyCode::Char('G') | KeyCode::End => app.move_to_last(),
        KeyCode::Char('e') | KeyCode::Enter => app.begin_edit(),
        KeyCode::Char('d') => app.delete_selected(),
        KeyCode::Char('a') | KeyCode::Char('+') => app.open_write(),
        KeyCode::Char('?') => app.toggle_help(),
        _ => {}
    }
}

/// Handle key events while an entry is edited inline
fn handle_edit_mode(app: &mut App<'_>, code: KeyCode) {
    match code {
        KeyCode::Enter => app.commit_edit(),
        KeyCode::Esc => app.cancel_edit(),
        KeyCode::Backspace => app.edit_delete_char(),
        KeyCode::Char(c) => app.edit_insert_char(c),
        _ => {}
    }
}

/// Handle key events on the Write screen
fn handle_write_mode(app: &mut App<'_>, code: KeyCode, modifiers: KeyModifiers) {
    match code {
        KeyCode::Esc => app.close_write(),
        KeyCode::Enter => app.save_write(),
        KeyCode::Left | KeyCode::BackTab => app.prev_emoticon(),
        KeyCode::Right | KeyCode::Tab => app.next_emoticon(),
        KeyCode::Char(c @ '1'..='4') if modifiers.contains(KeyModifiers::ALT) => {
            let index = c as usize - '1' as usize;
            app.select_emoticon(Emoticon::ALL[index]);
        }
        KeyCode::Backspace => app.write_delete_char(),
        KeyCode::Char(c) => app.write_insert_char(c),
        _ => {}
    }
}

/// Initialize logging for TUI mode
///
/// Only initializes if MOODLOG_LOG environment variable is set.
/// Logs to file (config.log_file or default {data_dir}/debug.log).
fn init_tui_logging(config: &Config) {
    // Only log if MOODLOG_LOG is set
    let Ok(log_level) = std::env::var(LOG_ENV) else {
        return;
    };

    // Determine log file path
    let log_path = config.log_path();

    // The data directory may not exist until the store opens
    if let Some(parent) = log_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory {:?}: {}", parent, e);
            return;
        }
    }

    // Create log file
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    // Initialize file-based logging (ignore error if already initialized)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(&log_level))
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("TUI logging initialized to {:?}", log_path);
}
