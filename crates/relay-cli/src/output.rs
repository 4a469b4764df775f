//! Output formatting utilities.

use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use tabled::{settings::Style, Table, Tabled};

use crate::config::OutputFormat;
use crate::error::CliResult;

/// Prints a success message.
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Prints a warning message.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Outputs rows in the specified format.
///
/// Quiet mode prints `key` of each row, one per line.
pub fn output<T, F>(rows: &[T], format: OutputFormat, key: F) -> CliResult<()>
where
    T: Tabled + Serialize,
    F: Fn(&T) -> &str,
{
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                info("No results found.");
            } else {
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Yaml => {
            for row in rows {
                print!("{}", to_yaml(&serde_json::to_value(row)?, 0));
                println!();
            }
        }
        OutputFormat::Quiet => {
            for row in rows {
                println!("{}", key(row));
            }
        }
    }
    Ok(())
}

/// Outputs a single document. Tables fall back to the YAML layout.
pub fn output_single<T: Serialize>(item: &T, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table | OutputFormat::Yaml => {
            print!("{}", to_yaml(&serde_json::to_value(item)?, 0));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(item)?),
        OutputFormat::Quiet => {}
    }
    Ok(())
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders a JSON value as YAML-like text.
#[must_use]
pub fn to_yaml(value: &Value, indent: usize) -> String {
    let prefix = "  ".repeat(indent);
    let mut out = String::new();

    match value {
        Value::Array(items) if items.is_empty() => out.push_str(&format!("{prefix}[]\n")),
        Value::Array(items) => {
            for item in items {
                if item.is_object() || item.is_array() {
                    out.push_str(&format!("{prefix}-\n"));
                    out.push_str(&to_yaml(item, indent + 1));
                } else {
                    out.push_str(&format!("{prefix}- {}\n", scalar(item)));
                }
            }
        }
        Value::Object(map) => {
            for (key, val) in map {
                if val.is_object() || (val.is_array() && val.as_array().is_some_and(|a| !a.is_empty())) {
                    out.push_str(&format!("{prefix}{key}:\n"));
                    out.push_str(&to_yaml(val, indent + 1));
                } else if val.is_array() {
                    out.push_str(&format!("{prefix}{key}: []\n"));
                } else {
                    out.push_str(&format!("{prefix}{key}: {}\n", scalar(val)));
                }
            }
        }
        other => out.push_str(&format!("{prefix}{}\n", scalar(other))),
    }
    out
}
