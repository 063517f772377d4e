//! Structured logging for the emulator workspace.
//!
//! Emulation cores run in tight loops, so logging has to be free when it is
//! off. Messages are built lazily through closures and gated on a global
//! configuration of per-category levels stored in atomics: a disabled
//! category costs one relaxed load per call site.
//!
//! # Usage
//!
//! ```rust
//! use vdp_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Registers, LogLevel::Trace, || {
//!     format!("R{} <- {:02X}", 1, 0xE0)
//! });
//! ```

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock};

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Log category for the different parts of a video device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Host port traffic (address/data port reads and writes)
    Io,
    /// Register writes and display mode changes
    Registers,
    /// Scanline and frame generation
    Render,
    /// Sprite evaluation (per-line limits, collisions)
    Sprites,
}

const NUM_CATEGORIES: usize = 4;

impl LogCategory {
    fn index(self) -> usize {
        match self {
            LogCategory::Io => 0,
            LogCategory::Registers => 1,
            LogCategory::Render => 2,
            LogCategory::Sprites => 3,
        }
    }
}

/// Global logging configuration
///
/// Category levels override the global level; a category left at `Off`
/// falls back to the global level.
pub struct LogConfig {
    global_level: AtomicU8,
    category_levels: [AtomicU8; NUM_CATEGORIES],
    log_file: Mutex<Option<File>>,
}

impl LogConfig {
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            category_levels: [
                AtomicU8::new(LogLevel::Off as u8),
                AtomicU8::new(LogLevel::Off as u8),
                AtomicU8::new(LogLevel::Off as u8),
                AtomicU8::new(LogLevel::Off as u8),
            ],
            log_file: Mutex::new(None),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    /// Set the global log level (applies to all categories unless overridden)
    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    /// Get the global log level
    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    /// Set log level for a specific category
    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    /// Get log level for a specific category
    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// Check if a message should be logged for the given category and level
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Reset all logging to Off and detach any log file
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for level in &self.category_levels {
            level.store(LogLevel::Off as u8, Ordering::Relaxed);
        }
        self.clear_log_file();
    }

    /// Append log output to the given file instead of stderr.
    ///
    /// Returns an error if the file cannot be opened.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        *self.log_file.lock().unwrap() = Some(file);
        Ok(())
    }

    /// Stop logging to a file; output returns to stderr
    pub fn clear_log_file(&self) {
        *self.log_file.lock().unwrap() = None;
    }

    fn write_message(&self, message: &str) {
        let mut log_file = self.log_file.lock().unwrap();
        match log_file.as_mut() {
            Some(file) => {
                // Logging must never take the emulator down with it
                let _ = writeln!(file, "{}", message);
                let _ = file.flush();
            }
            None => eprintln!("{}", message),
        }
    }
}

/// Log a message with the specified category and level.
///
/// The message is built lazily: `message_fn` only runs when the category
/// and level are enabled, so call sites in hot paths cost a single atomic
/// load while logging is off.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if config.should_log(category, level) {
        let message = message_fn();
        config.write_message(&message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_str("ERR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_str("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("Info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("4"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str("invalid"), None);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Off < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_category_levels() {
        let config = LogConfig::new();
        assert_eq!(config.get_level(LogCategory::Io), LogLevel::Off);

        config.set_level(LogCategory::Sprites, LogLevel::Debug);
        assert_eq!(config.get_level(LogCategory::Sprites), LogLevel::Debug);
        assert_eq!(config.get_level(LogCategory::Io), LogLevel::Off);
    }

    #[test]
    fn test_should_log_with_category_level() {
        let config = LogConfig::new();
        config.set_level(LogCategory::Registers, LogLevel::Info);

        assert!(config.should_log(LogCategory::Registers, LogLevel::Error));
        assert!(config.should_log(LogCategory::Registers, LogLevel::Info));
        assert!(!config.should_log(LogCategory::Registers, LogLevel::Debug));
        assert!(!config.should_log(LogCategory::Registers, LogLevel::Trace));
    }

    #[test]
    fn test_category_level_overrides_global() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Error);
        config.set_level(LogCategory::Render, LogLevel::Debug);

        // Render uses its specific level
        assert!(config.should_log(LogCategory::Render, LogLevel::Debug));

        // Io falls back to the global level
        assert!(!config.should_log(LogCategory::Io, LogLevel::Warn));
        assert!(config.should_log(LogCategory::Io, LogLevel::Error));
    }

    #[test]
    fn test_reset() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        config.set_level(LogCategory::Io, LogLevel::Debug);

        config.reset();

        assert_eq!(config.get_global_level(), LogLevel::Off);
        assert_eq!(config.get_level(LogCategory::Io), LogLevel::Off);
    }

    #[test]
    fn test_disabled_logging_skips_message_fn() {
        let config = LogConfig::new();
        let mut called = false;
        if config.should_log(LogCategory::Render, LogLevel::Trace) {
            called = true;
        }
        assert!(!called);
    }
}
