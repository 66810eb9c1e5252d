//! Status command handler

use anyhow::Result;

use moodlog_core::{Config, SortKey, Store};

use crate::output::{format_date, Output, OutputFormat};

/// Show status information
pub fn show(store: &Store, config: &Config, output: &Output) -> Result<()> {
    let entries = store.objects().sorted(SortKey::Id, true).snapshot()?;
    let editing = entries.iter().filter(|f| f.is_editing).count();
    let newest = entries.first();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "store": store.path(),
                    "schema_version": store.schema_version(),
                    "entries": entries.len(),
                    "editing": editing,
                    "newest": newest.map(|f| f.id),
                    "data_dir": config.data_dir
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", entries.len());
        }
        OutputFormat::Human => {
            println!("moodlog Status");
            println!("==============");
            println!();
            println!("Storage:");
            println!("  Location: {}", store.path().display());
            println!("  Schema:   revision {}", store.schema_version());
            println!();
            println!("Contents:");
            println!("  Entries: {}", entries.len());
            if editing > 0 {
                println!("  Editing: {}", editing);
            }
            if let Some(feeling) = newest {
                println!("  Newest:  {}", format_date(feeling));
            }
        }
    }

    Ok(())
}
