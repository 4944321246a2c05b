use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

static PLUGIN_LOGGER: Lazy<PluginLogger> = Lazy::new(PluginLogger::default);

/// Installs the plugin logger as the global `log` backend.
pub fn init_with_config(config: LoggerConfig) -> Result<(), String> {
    let max_level = config.min_level;
    PLUGIN_LOGGER.update_config(config);

    log::set_logger(&*PLUGIN_LOGGER).map_err(|e| format!("Failed to set logger: {:?}", e))?;
    log::set_max_level(max_level);
    Ok(())
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Trace => Color::Cyan,
        Level::Debug => Color::Blue,
        Level::Info => Color::Green,
        Level::Warn => Color::Yellow,
        Level::Error => Color::Red,
    }
}

fn level_emoji(level: Level) -> &'static str {
    match level {
        Level::Trace => "🔍",
        Level::Debug => "🐛",
        Level::Info => "💡",
        Level::Warn => "⚠️",
        Level::Error => "❌",
    }
}

/// Shape of one line in JSON mode.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl LogEntry {
    fn from_record(record: &Record, with_location: bool) -> Self {
        let location = match (with_location, record.file(), record.line()) {
            (true, Some(file), Some(line)) => Some(format!("{}:{}", file, line)),
            _ => None,
        };

        Self {
            timestamp: Utc::now(),
            level: record.level().to_string(),
            target: record.target().to_string(),
            message: record.args().to_string(),
            location,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LevelFilter,
    pub show_colors: bool,
    pub show_emojis: bool,
    pub show_file_location: bool,
    pub timestamp_format: Option<String>,
    pub output_json: bool,
    pub prefix: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LevelFilter::Info,
            show_colors: true,
            show_emojis: true,
            show_file_location: false,
            timestamp_format: Some("%H:%M:%S%.3f".to_string()),
            output_json: false,
            prefix: Some("sd-cat".to_string()),
        }
    }
}

impl LoggerConfig {
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.show_colors = enabled;
        self
    }

    /// JSON lines, no colours: for hosts that ship plugin logs to a collector.
    pub fn production() -> Self {
        Self {
            show_colors: false,
            show_emojis: false,
            output_json: true,
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            min_level: LevelFilter::Debug,
            show_file_location: true,
            ..Default::default()
        }
    }
}

#[derive(Default)]
pub struct PluginLogger {
    config: Mutex<LoggerConfig>,
}

impl PluginLogger {
    pub fn update_config(&self, new_config: LoggerConfig) {
        if let Ok(mut config) = self.config.lock() {
            *config = new_config;
        }
    }

    fn render(&self, level: Level, entry: &LogEntry, config: &LoggerConfig) -> String {
        if config.output_json {
            return serde_json::to_string(entry).unwrap_or_default();
        }

        let dim = |text: String| {
            if config.show_colors {
                text.bright_black().to_string()
            } else {
                text
            }
        };

        let mut parts = Vec::new();
        if let Some(prefix) = &config.prefix {
            parts.push(format!("[{}]", prefix));
        }
        if let Some(format) = &config.timestamp_format {
            parts.push(dim(entry.timestamp.format(format).to_string()));
        }

        let label = if config.show_emojis {
            format!("{} {:<5}", level_emoji(level), entry.level)
        } else {
            format!("{:<5}", entry.level)
        };
        if config.show_colors {
            parts.push(label.color(level_color(level)).bold().to_string());
        } else {
            parts.push(label);
        }

        parts.push(format!("{}: {}", entry.target, entry.message));
        if let Some(location) = &entry.location {
            parts.push(dim(format!("({})", location)));
        }

        parts.join(" ")
    }
}

impl log::Log for PluginLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match self.config.lock() {
            Ok(config) => metadata.level() <= config.min_level,
            Err(_) => true,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if let Ok(config) = self.config.lock() {
            let entry = LogEntry::from_record(record, config.show_file_location);
            // stdout is reserved for the reply printed by the binary
            eprintln!("{}", self.render(record.level(), &entry, &config));
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Logs how long an operation took when dropped.
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!(
            "⏱️  '{}' completed in {}ms",
            self.name,
            self.elapsed().as_millis()
        );
    }
}

pub fn timer(name: &str) -> Timer {
    log::debug!("⏱️  Starting timer: {}", name);
    Timer {
        start: Instant::now(),
        name: name.to_string(),
    }
}
