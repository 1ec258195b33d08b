//! Diagnostic output.
//!
//! Everything that is not the actual result of a command goes through the
//! `log` facade and ends up on stderr, so stdout stays clean for `get`
//! destinations such as `/dev/stdout` and for `tree`/`status` listings.

use colored::{ColoredString, Colorize};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::{self, Write};

struct StderrLogger;

static GLOBAL_LOGGER: StderrLogger = StderrLogger;

impl StderrLogger {
    fn tag(level: Level) -> ColoredString {
        match level {
            Level::Error => "error".red().bold(),
            Level::Warn => "warn".yellow(),
            Level::Info => "info".green(),
            Level::Debug => "debug".cyan(),
            Level::Trace => "trace".dimmed(),
        }
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = io::stderr().lock();
        // We never fail when writing to stderr.
        if log::max_level() >= LevelFilter::Debug {
            let _ = write!(stderr, "{} ", chrono::Local::now().format("[%H:%M:%S%.3f]"));
        }
        let _ = writeln!(stderr, "[{}] {}", Self::tag(record.level()), record.args());
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Installs the stderr logger with the given maximum level.
pub fn init_logging(level: LevelFilter) {
    if let Err(err) = log::set_logger(&GLOBAL_LOGGER) {
        eprintln!("Failed to initialize logger: {}.", err);
        return;
    }
    log::set_max_level(level);
}
