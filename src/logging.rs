/*!
 * Stderr logger for applications embedding the client.
 *
 * The library itself only emits through the `log` facade; installing a
 * logger is the embedding application's choice. `StderrLogger` prints
 * timestamped lines, coloured by level when stderr is a terminal.
 */

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::{IsTerminal, Write};

use crate::app_config::LogLevel;

/// Timestamped, optionally coloured logger writing to stderr
#[derive(Debug)]
pub struct StderrLogger {
    level: LevelFilter,
    colored: bool,
}

impl StderrLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self {
            level,
            colored: std::io::stderr().is_terminal(),
        }
    }

    pub fn colored(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    /// Install as the global logger
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(Self::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }

    /// Install as the global logger at a configured level
    pub fn init_with_level(level: LogLevel) -> Result<(), SetLoggerError> {
        Self::init(level.to_level_filter())
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }

    /// One output line, without the trailing newline
    pub fn format_line(&self, record: &Record) -> String {
        let now = chrono::Local::now().format("%H:%M:%S%.3f");
        let target = record.target().rsplit("::").next().unwrap_or_default();
        let line = format!("{} {:<5} [{}] {}", now, record.level(), target, record.args());
        if self.colored {
            format!("{}{}\x1B[0m", Self::color_for_level(record.level()), line)
        } else {
            line
        }
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = self.format_line(record);
            let _ = writeln!(std::io::stderr(), "{}", line);
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
