use std::env;
use std::io::{self, Write};

use log::{self, LevelFilter, Metadata, Record};

/// Environment variable holding the log level, e.g. `SEABATTLE_LOG=debug`.
pub const LOG_ENV: &str = "SEABATTLE_LOG";

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    // stdout belongs to the board and the prompt
    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let stderr = io::stderr();
            let _ = writeln!(
                stderr.lock(),
                "{:<5} {} - {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

static LOGGER: SimpleLogger = SimpleLogger;

/// Parse a level name, falling back to `info` when unset or invalid.
pub fn level_from_env(value: Option<String>) -> LevelFilter {
    value
        .and_then(|lvl| lvl.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Initialize logging with a level taken from the `SEABATTLE_LOG` environment variable.
/// Defaults to `info` if the variable is not set or invalid. Later calls are no-ops.
pub fn init_logging() {
    let level = level_from_env(env::var(LOG_ENV).ok());
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(level));
}
