//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::Result;
use chrono::Local;
use moodlog_core::{Emoticon, Feeling};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single entry
    pub fn print_feeling(&self, feeling: &Feeling) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", feeling.id);
                println!(
                    "Mood:     {} {}",
                    glyph(feeling),
                    feeling
                        .emoticon_kind()
                        .map(Emoticon::label)
                        .unwrap_or(feeling.emoticon.as_str())
                );
                println!("Written:  {}", format_date(feeling));
                println!("Message:  {}", feeling.message);
                if feeling.is_editing {
                    println!("(being edited)");
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(feeling)?);
            }
            OutputFormat::Quiet => {
                println!("{}", feeling.id);
            }
        }
        Ok(())
    }

    /// Print entries, in the order given
    pub fn print_feelings(&self, feelings: &[Feeling]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if feelings.is_empty() {
                    println!("No entries yet.");
                    return Ok(());
                }
                for feeling in feelings {
                    println!(
                        "{} | {} | {} | {}",
                        feeling.id,
                        glyph(feeling),
                        format_date(feeling),
                        truncate(&feeling.message, 50)
                    );
                }
                println!("\n{} entr{}", feelings.len(), if feelings.len() == 1 { "y" } else { "ies" });
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(feelings)?);
            }
            OutputFormat::Quiet => {
                for feeling in feelings {
                    println!("{}", feeling.id);
                }
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Terminal glyph for an entry's mood
pub fn glyph(feeling: &Feeling) -> &'static str {
    feeling.emoticon_kind().map_or("?", Emoticon::glyph)
}

/// Local creation date of an entry
pub fn format_date(feeling: &Feeling) -> String {
    feeling
        .created_at()
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Truncate a string to max characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    if first_line.chars().count() <= max_len && first_line.len() == s.len() {
        return s.to_string();
    }
    let kept: String = first_line.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
}
