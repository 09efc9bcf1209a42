use super::logrecord::{level_from_name, Logrecord};
use super::redact::{redact, redact_value};
use chrono::Local;
use colored::*;
use glob::glob;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Every level from Fatal (6) down to Silly (0).
const ALL_LEVELS: [i64; 7] = [6, 5, 4, 3, 2, 1, 0];

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
/// # Logger Local Options
///
/// Configuration options for the `LoggerLocal` instance, controlling where and how
/// log messages are output.
pub struct LoggerLocalOptions {
    /// A list of log levels that should be printed to the TTY (console).
    pub use_tty: Option<Vec<i64>>,
    /// A list of log levels that should be written to a log file.
    pub use_file: Option<Vec<i64>>,
    /// The directory where log files should be stored. Defaults to `./logs`.
    pub log_dir: Option<PathBuf>,
}

impl LoggerLocalOptions {
    /// Builds options that print and persist every level at or above `min_level`
    /// (a name such as `"info"`). File output is only enabled when `log_dir` is given.
    pub fn from_level(min_level: &str, log_dir: Option<PathBuf>) -> Self {
        let threshold = level_from_name(min_level);
        let levels: Vec<i64> = ALL_LEVELS.iter().copied().filter(|l| *l >= threshold).collect();
        Self {
            use_tty: Some(levels.clone()),
            use_file: log_dir.as_ref().map(|_| levels),
            log_dir,
        }
    }
}

/// # Logger Local
///
/// Console and file logger shared (through `Arc`) by every market client.
/// Messages and extras are passed through [`redact`] before reaching any sink,
/// so request paths carrying API keys can be logged as-is.
pub struct LoggerLocal {
    /// The name of the application associated with this logger instance.
    app_name: String,
    /// Configuration options determining logging behavior.
    options: LoggerLocalOptions,
    /// The path to the currently active log file, if file logging is enabled.
    current_log_file: Option<PathBuf>,
}

impl LoggerLocal {
    /// Rotates log files for a given application and log directory.
    ///
    /// Keeps only the most recent log file (based on the timestamp in the filename)
    /// and deletes older log files for the application within the given directory.
    fn rotate_logs(app_name: &str, log_dir: &Path) {
        let pattern = format!("{}/{}-*.log", log_dir.display(), app_name);
        let mut log_files: Vec<PathBuf> = match glob(&pattern) {
            Ok(paths) => paths.filter_map(Result::ok).collect(),
            Err(e) => {
                eprintln!("Invalid glob pattern for log rotation {}: {}", pattern, e);
                return;
            }
        };

        // Newest first.
        log_files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

        for old_file in log_files.iter().skip(1) {
            if let Err(e) = std::fs::remove_file(old_file) {
                eprintln!("Error deleting old log file {}: {}", old_file.display(), e);
            }
        }
    }

    /// Creates a new `LoggerLocal` instance.
    ///
    /// If file logging is enabled, it ensures the log directory exists,
    /// rotates old logs, and sets up the current log file path.
    ///
    /// # Arguments
    /// * `app_name` - The name of the application using this logger.
    /// * `options` - Optional `LoggerLocalOptions`. If `None`, every level is
    ///   printed to the TTY and nothing is written to disk.
    pub fn new(app_name: String, options: Option<LoggerLocalOptions>) -> Self {
        let default_options = LoggerLocalOptions {
            use_tty: Some(ALL_LEVELS.to_vec()),
            use_file: None,
            log_dir: None,
        };
        let opts = options.unwrap_or(default_options);

        let mut logger = Self {
            app_name: app_name.clone(),
            options: opts,
            current_log_file: None,
        };

        if logger.options.use_file.is_some() {
            let log_base_dir = logger
                .options
                .log_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("./logs"));

            if let Err(e) = std::fs::create_dir_all(&log_base_dir) {
                eprintln!("Error creating log directory {}: {}", log_base_dir.display(), e);
            }

            LoggerLocal::rotate_logs(&app_name, &log_base_dir);

            let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
            let current_log_filename = format!("{}-{}.log", app_name, timestamp);
            logger.current_log_file = Some(log_base_dir.join(current_log_filename));
        }

        logger
    }

    /// A logger that drops everything. Handy for tests and library callers
    /// that do not want console output.
    pub fn silent(app_name: &str) -> Self {
        Self::new(
            app_name.to_string(),
            Some(LoggerLocalOptions {
                use_tty: None,
                use_file: None,
                log_dir: None,
            }),
        )
    }

    /// Path of the active log file, when file output is enabled.
    pub fn log_file(&self) -> Option<&Path> {
        self.current_log_file.as_deref()
    }

    /// Builds the redacted record for a message. Split out of [`LoggerLocal::log`]
    /// so that sinks and tests share exactly the same content.
    pub fn build_record(
        &self,
        log_level: i64,
        log_message: &str,
        log_extras: Option<Value>,
    ) -> Logrecord {
        let mut record = Logrecord::default();
        record.app.name = self.app_name.clone();
        record.loglevel = log_level;
        record.message.text = redact(log_message);
        if let Some(extras) = log_extras {
            record.tags = redact_value(&extras);
        }
        record
    }

    /// Asynchronously logs a message with a specified level, handling TTY output
    /// and file writing based on the logger's configuration.
    ///
    /// # Arguments
    /// * `log_level` - The numeric log level (e.g., 0 for Silly, 6 for Fatal).
    /// * `log_message` - The main message string to be logged.
    /// * `log_extras` - An `Option<Value>` for additional structured data to include in the log.
    pub async fn log(&self, log_level: i64, log_message: &str, log_extras: Option<Value>) {
        let record = self.build_record(log_level, log_message, log_extras);

        if let Some(tty_levels) = &self.options.use_tty {
            if tty_levels.contains(&log_level) {
                let ts = record.rfc9557.as_str().truecolor(128, 128, 128);
                let app_name_colored = format!("[{}]", self.app_name).truecolor(128, 128, 128);
                let text = record.message.text.as_str();
                let colored_message = match log_level {
                    6 => text.bright_white().on_bright_red(), // Fatal
                    5 => text.bright_red(),                   // Error
                    4 => text.bright_yellow(),                // Warn
                    3 => text.bright_green(),                 // Info
                    2 => text.bright_white(),                 // Debug
                    1 => text.bright_cyan(),                  // Trace
                    _ => text.blue(),                         // Silly
                };

                eprintln!("{}{}\n{}", ts, app_name_colored, colored_message);
                if record.has_tags() {
                    if let Ok(tags_str) = serde_json::to_string(&record.tags) {
                        let tags_colored = tags_str.truecolor(128, 128, 128);
                        eprintln!("{}{}{}", ts, app_name_colored, tags_colored);
                    }
                }
            }
        }

        if let Some(file_levels) = &self.options.use_file {
            if file_levels.contains(&log_level) {
                if let Some(log_file_path) = &self.current_log_file {
                    let written = OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(log_file_path)
                        .and_then(|mut file| writeln!(file, "{}", record.to_line()));
                    if let Err(e) = written {
                        eprintln!("Error writing log file {}: {}", log_file_path.display(), e);
                    }
                }
            }
        }
    }

    /// Logs a message at the "Silly" (level 0) log level.
    pub async fn silly(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(0, log_message, log_extras).await;
    }

    /// Logs a message at the "Trace" (level 1) log level.
    pub async fn trace(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(1, log_message, log_extras).await;
    }

    /// Logs a message at the "Debug" (level 2) log level.
    ///
    /// Used for schema validation successes and per-request details.
    pub async fn debug(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(2, log_message, log_extras).await;
    }

    /// Logs a message at the "Info" (level 3) log level.
    pub async fn info(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(3, log_message, log_extras).await;
    }

    /// Logs a message at the "Warn" (level 4) log level.
    ///
    /// Retry attempts and rate-limit rejections land here.
    pub async fn warn(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(4, log_message, log_extras).await;
    }

    /// Logs a message at the "Error" (level 5) log level.
    pub async fn error(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(5, log_message, log_extras).await;
    }

    /// Logs a message at the "Fatal" (level 6) log level.
    ///
    /// Reserved for exhausted retries and schema mismatches.
    pub async fn fatal(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(6, log_message, log_extras).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_from_level_filters_lower_levels() {
        let opts = LoggerLocalOptions::from_level("warn", None);
        assert_eq!(opts.use_tty, Some(vec![6, 5, 4]));
        assert!(opts.use_file.is_none());
    }

    #[test]
    fn test_build_record_redacts_message_and_extras() {
        let logger = LoggerLocal::silent("redact_test");
        let record = logger.build_record(
            4,
            "request failed for apiKey=0123456789abcdef0123456789abcdef",
            Some(json!({"path": "x?token=secret"})),
        );
        assert_eq!(record.message.text, "request failed for apiKey=[API_KEY_REDACTED]");
        assert_eq!(record.tags["path"], "x?token=[REDACTED]");
        assert_eq!(record.app.name, "redact_test");
    }

    #[tokio::test]
    async fn test_file_sink_writes_filtered_levels() {
        let temp_dir = tempdir().expect("Failed to create temporary directory");
        let options = LoggerLocalOptions {
            use_tty: None,
            use_file: Some(vec![6, 5, 4, 3]),
            log_dir: Some(temp_dir.path().to_path_buf()),
        };
        let logger = LoggerLocal::new("file_test".to_string(), Some(options));

        logger.info("chain fetched", None).await;
        logger.warn("retrying", Some(json!({"attempt": 1}))).await;
        logger.debug("not persisted", None).await;

        let path = logger.log_file().expect("file sink enabled").to_path_buf();
        let contents = fs::read_to_string(path).expect("log file exists");
        assert!(contents.contains("INFO chain fetched"));
        assert!(contents.contains("WARN retrying {\"attempt\":1}"));
        assert!(!contents.contains("not persisted"));
    }

    #[test]
    fn test_rotation_keeps_newest_file() {
        let temp_dir = tempdir().expect("Failed to create temporary directory");
        let dir = temp_dir.path();
        fs::write(dir.join("rot-20240101_000000.log"), "old").unwrap();
        fs::write(dir.join("rot-20240102_000000.log"), "new").unwrap();
        fs::write(dir.join("other-20240101_000000.log"), "other").unwrap();

        LoggerLocal::rotate_logs("rot", dir);

        assert!(!dir.join("rot-20240101_000000.log").exists());
        assert!(dir.join("rot-20240102_000000.log").exists());
        assert!(dir.join("other-20240101_000000.log").exists());
    }
}
