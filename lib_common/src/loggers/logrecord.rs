use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::utils::misc::utils::current_datetime_rfc9557;

/// Numeric level for "Silly" output.
pub const LEVEL_SILLY: i64 = 0;
/// Numeric level for "Trace" output.
pub const LEVEL_TRACE: i64 = 1;
/// Numeric level for "Debug" output.
pub const LEVEL_DEBUG: i64 = 2;
/// Numeric level for "Info" output.
pub const LEVEL_INFO: i64 = 3;
/// Numeric level for "Warn" output.
pub const LEVEL_WARN: i64 = 4;
/// Numeric level for "Error" output.
pub const LEVEL_ERROR: i64 = 5;
/// Numeric level for "Fatal" output.
pub const LEVEL_FATAL: i64 = 6;

/// Maps a textual level name (`trace`, `debug`, `info`, `warn`, `error`,
/// `fatal`, `silly`) to its numeric value. Unknown names fall back to `info`.
pub fn level_from_name(name: &str) -> i64 {
    match name.trim().to_lowercase().as_str() {
        "silly" => LEVEL_SILLY,
        "trace" => LEVEL_TRACE,
        "debug" => LEVEL_DEBUG,
        "warn" | "warning" => LEVEL_WARN,
        "error" => LEVEL_ERROR,
        "fatal" => LEVEL_FATAL,
        _ => LEVEL_INFO,
    }
}

/// Upper-case label for a numeric level, used in file output.
pub fn level_label(level: i64) -> &'static str {
    match level {
        LEVEL_FATAL => "FATAL",
        LEVEL_ERROR => "ERROR",
        LEVEL_WARN => "WARN",
        LEVEL_INFO => "INFO",
        LEVEL_DEBUG => "DEBUG",
        LEVEL_TRACE => "TRACE",
        _ => "SILLY",
    }
}

/// # Logrecord
///
/// A single log entry as it is handed to the console and file sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logrecord {
    /// The severity level of the log (0 for Silly up to 6 for Fatal).
    pub loglevel: i64,
    /// Details about the message content.
    pub message: Message,
    /// Information about the application generating the log.
    pub app: App,
    /// Flexible JSON value for arbitrary tags or additional metadata.
    pub tags: Value,
    /// RFC 9557 formatted timestamp string.
    pub rfc9557: String,
}

impl Default for Logrecord {
    /// Creates an empty record stamped with the current UTC time.
    fn default() -> Self {
        Self {
            loglevel: LEVEL_SILLY,
            message: Message::default(),
            app: App::default(),
            tags: serde_json::json!([]),
            rfc9557: current_datetime_rfc9557(),
        }
    }
}

impl Logrecord {
    /// Returns `true` when the record carries structured extras.
    pub fn has_tags(&self) -> bool {
        self.tags != serde_json::json!([])
    }

    /// Renders the record in the line format used by the file sink:
    /// `<ts> [<app>] <LEVEL> <message>` followed by the tags as JSON on the
    /// same line when present.
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{} [{}] {} {}",
            self.rfc9557,
            self.app.name,
            level_label(self.loglevel),
            self.message.text
        );
        if self.has_tags() {
            if let Ok(tags_str) = serde_json::to_string(&self.tags) {
                line.push(' ');
                line.push_str(&tags_str);
            }
        }
        line
    }
}

/// # Message
///
/// Represents the textual content of a log entry, including its language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The language of the message (e.g., "en" for English).
    pub lang: String,
    /// The actual text content of the message.
    pub text: String,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            text: String::new(),
            lang: "en".to_string(),
        }
    }
}

/// # App
///
/// Contains information about the application that generated the log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    /// The process ID (PID) of the application.
    pub pid: i64,
    /// The name of the application.
    pub name: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            name: String::new(),
            pid: std::process::id() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(level_from_name("DEBUG"), LEVEL_DEBUG);
        assert_eq!(level_from_name("warning"), LEVEL_WARN);
        assert_eq!(level_from_name("bogus"), LEVEL_INFO);
        assert_eq!(level_label(LEVEL_FATAL), "FATAL");
    }

    #[test]
    fn test_to_line_appends_tags() {
        let mut record = Logrecord::default();
        record.app.name = "findata".into();
        record.loglevel = LEVEL_WARN;
        record.message.text = "retrying".into();
        assert!(record.to_line().ends_with("[findata] WARN retrying"));

        record.tags = serde_json::json!({"attempt": 2});
        assert!(record.to_line().ends_with("WARN retrying {\"attempt\":2}"));
    }
}
