//! Output formatting for CLI

use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Print rows as a table, or as JSON when requested.
pub fn print_rows<T: Tabled + Serialize>(rows: &[T], format: &str) -> anyhow::Result<()> {
    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Table => println!("{}", Table::new(rows).with(Style::rounded()).to_string()),
        OutputFormat::Text => println!("{}", Table::new(rows).with(Style::blank()).to_string()),
    }
    Ok(())
}

/// Print a serializable value as JSON, or a text block otherwise.
pub fn print_value<T: Serialize>(value: &T, format: &str, text: impl FnOnce() -> String) -> anyhow::Result<()> {
    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table | OutputFormat::Text => println!("{}", text()),
    }
    Ok(())
}

/// Whether progress bars should be drawn.
pub fn is_interactive(format: &str) -> bool {
    OutputFormat::from(format) != OutputFormat::Json
}
