pub use log::LevelFilter;
use log::{Level, Log, Metadata, Record, SetLoggerError};
use std::collections::VecDeque;
use std::sync::{Mutex, OnceLock};
use text_colorizer::Colorize;

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Number of entries kept in the bet log before the oldest ones are dropped.
pub const BUFFER_CAPACITY: usize = 500;

#[derive(Clone, Debug)]
pub struct LogEntry {
    pub level: Level,
    pub timestamp: String,
    pub message: String,
}

pub struct Logger {
    buffer: Option<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl Logger {
    pub fn new(with_buffer: bool) -> Self {
        Logger {
            buffer: with_buffer.then(|| Mutex::new(VecDeque::new())),
            capacity: BUFFER_CAPACITY,
        }
    }

    fn add(&self, level: Level, timestamp: String, message: String) {
        if let Some(buf) = &self.buffer {
            let mut buf = buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if buf.len() == self.capacity {
                buf.pop_front();
            }
            buf.push_back(LogEntry {
                level,
                timestamp,
                message,
            });
        }
    }

    pub fn collect(&self) -> Vec<LogEntry> {
        match &self.buffer {
            Some(buf) => buf
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .drain(..)
                .collect(),
            None => Vec::new(),
        }
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let timestamp = chrono::Local::now().format("%H:%M:%S").to_string();
        let message = format!("{}", record.args());
        let line = format!("[{timestamp}] {message}");

        match record.level() {
            Level::Info => println!("{line}"),
            Level::Warn => println!("{}", line.yellow()),
            Level::Error => println!("{}", line.red()),
            Level::Debug => println!("{}", line.magenta()),
            Level::Trace => println!("{}", line.blue()),
        }

        self.add(record.level(), timestamp, message);
    }

    fn flush(&self) {}
}

pub fn init_stdout(level: LevelFilter) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(|| Logger::new(false));
    log::set_logger(logger).map(|()| log::set_max_level(level))
}

/// Same as [`init_stdout`], but every record is also kept in memory and can be
/// drained with [`collect_logs`].
pub fn init_with_buffer(level: LevelFilter) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(|| Logger::new(true));
    log::set_logger(logger).map(|()| log::set_max_level(level))
}

pub fn collect_logs() -> Vec<LogEntry> {
    LOGGER.get().map(|l| l.collect()).unwrap_or_default()
}
