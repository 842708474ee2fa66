//! Formatting utilities for CLI output.

use serde::Serialize;

use crate::{remote::HeartbeatStatus, value::ConfigValue};

/// ANSI color codes for terminal output
pub struct Colors;

impl Colors {
    /// Reset all formatting
    pub const RESET: &'static str = "\x1b[0m";
    /// Bold text
    pub const BOLD: &'static str = "\x1b[1m";
    /// Dim text
    pub const DIM: &'static str = "\x1b[2m";
    /// Red color
    pub const RED: &'static str = "\x1b[31m";
    /// Green color
    pub const GREEN: &'static str = "\x1b[32m";
    /// Cyan color
    pub const CYAN: &'static str = "\x1b[36m";
}

/// Formats section headers with styling
pub fn format_header(text: &str) -> String {
    format!("{}{}{}{}", Colors::BOLD, Colors::CYAN, text, Colors::RESET)
}

/// Formats descriptions with muted styling
pub fn format_description(text: &str) -> String {
    format!("{}{}{}", Colors::DIM, text, Colors::RESET)
}

/// Formats error messages with red styling
pub fn format_error(text: &str) -> String {
    format!("{}{}{}{}", Colors::BOLD, Colors::RED, text, Colors::RESET)
}

/// Formats a heartbeat status, green when alive and red otherwise
pub fn format_status(status: HeartbeatStatus) -> String {
    match status {
        HeartbeatStatus::Ok => format!("{}ok{}", Colors::GREEN, Colors::RESET),
        HeartbeatStatus::Offline => format!("{}offline{}", Colors::RED, Colors::RESET),
    }
}

/// Renders any serializable value as indented JSON.
///
/// # Errors
/// Returns an error if the value cannot be serialized.
pub fn format_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Formats a single value for a change line.
///
/// Strings are quoted, collections show their size rather than their
/// contents and a missing value prints as `<removed>`.
///
/// ```
/// use conflab::{cli::formatting::format_change_value, value::ConfigValue};
///
/// assert_eq!(format_change_value(Some(&ConfigValue::string("hi"))), "\"hi\"");
/// assert_eq!(format_change_value(None), "<removed>");
/// ```
pub fn format_change_value(value: Option<&ConfigValue>) -> String {
    match value {
        None => "<removed>".to_string(),
        Some(scalar @ ConfigValue::Scalar(_)) => scalar.to_json_string(),
        Some(ConfigValue::Sequence(items)) => format!("[{}]", items.len()),
        Some(ConfigValue::Mapping(map)) => format!("{{{}}}", map.len()),
    }
}
