//! CLI presentation: text and json formatters for environment values.

use crate::error::EnvError;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::{Map, Value};

fn to_json(value: &impl serde::Serialize) -> Result<String, EnvError> {
    serde_json::to_string_pretty(value).map_err(|e| EnvError::Config(e.to_string()))
}

/// Strings print bare in text mode; everything else prints as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn format_value(value: &Value, format: &str) -> Result<String, EnvError> {
    match format {
        "json" => to_json(value),
        _ => Ok(display_value(value)),
    }
}

/// Render an environment map: a key/value table in text mode.
pub fn format_env(title: &str, env: &Map<String, Value>, format: &str) -> Result<String, EnvError> {
    if format == "json" {
        return to_json(env);
    }
    if env.is_empty() {
        return Ok(format!("{}\n(empty)", section_heading(title)));
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Key", "Value"]);
    for (key, value) in env {
        table.add_row(vec![key.clone(), display_value(value)]);
    }
    Ok(format!("{}\n{}", section_heading(title), table))
}

/// One `key = value` line per written key.
pub fn format_written(written: &Map<String, Value>) -> String {
    if written.is_empty() {
        return "Nothing to store.".to_string();
    }
    written
        .iter()
        .map(|(k, v)| format!("{} = {}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_check_result(consistent: bool, entries: usize) -> String {
    if consistent {
        format!("{} ({} entries)", "Consistent".green(), entries)
    } else {
        format!(
            "{}: in-memory index differs from the environment file",
            "Inconsistent".red()
        )
    }
}
