//! Process-wide log sinks
//!
//! Two streams exist: `Stream::Access` (access lines and informational
//! messages) and `Stream::Error` (warnings and failures). Each goes to a
//! standard stream unless a file is configured for it.

use serde::Deserialize;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock};

static SINKS: OnceLock<LogWriter> = OnceLock::new();

static THRESHOLD: AtomicU8 = AtomicU8::new(Level::Info as u8);

/// Severity, ordered from most to least severe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum Level {
    Error = 0,
    Warn = 1,
    #[default]
    Info = 2,
    Debug = 3,
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let level = match name.as_str() {
            "error" => Self::Error,
            "warn" | "warning" => Self::Warn,
            "info" => Self::Info,
            "debug" | "trace" => Self::Debug,
            _ => return Err(format!("unknown log level '{name}'")),
        };
        Ok(level)
    }
}

impl TryFrom<String> for Level {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        })
    }
}

pub fn set_level(level: Level) {
    THRESHOLD.store(level as u8, Ordering::Relaxed);
}

/// True when `level` passes the current threshold
pub fn enabled(level: Level) -> bool {
    level as u8 <= THRESHOLD.load(Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Access,
    Error,
}

enum Sink {
    Stdout,
    Stderr,
    Append(Mutex<File>),
}

impl Sink {
    /// An append-mode file at `path`, or `console` when no path is set.
    /// Missing parent directories are created.
    fn open(path: Option<&str>, console: Self) -> io::Result<Self> {
        let Some(path) = path else {
            return Ok(console);
        };
        match Path::new(path).parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)?,
            _ => {}
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::Append(Mutex::new(file)))
    }

    fn write_line(&self, line: &str) {
        match self {
            Self::Stdout => println!("{line}"),
            Self::Stderr => eprintln!("{line}"),
            // A poisoned lock or a full disk drops the line
            Self::Append(file) => {
                if let Ok(mut file) = file.lock() {
                    let _ = writeln!(file, "{line}");
                }
            }
        }
    }
}

pub struct LogWriter {
    access: Sink,
    error: Sink,
}

impl LogWriter {
    fn open(access_path: Option<&str>, error_path: Option<&str>) -> io::Result<Self> {
        Ok(Self {
            access: Sink::open(access_path, Sink::Stdout)?,
            error: Sink::open(error_path, Sink::Stderr)?,
        })
    }

    pub fn write(&self, stream: Stream, line: &str) {
        match stream {
            Stream::Access => self.access.write_line(line),
            Stream::Error => self.error.write_line(line),
        }
    }
}

/// Open the sinks. Only the first call takes effect; later calls fail
/// with `AlreadyExists`.
pub fn init(access_path: Option<&str>, error_path: Option<&str>) -> io::Result<()> {
    let writer = LogWriter::open(access_path, error_path)?;
    SINKS
        .set(writer)
        .map_err(|_| io::Error::new(io::ErrorKind::AlreadyExists, "log sinks already open"))
}

/// The sinks opened by `init`, if any
pub fn get() -> Option<&'static LogWriter> {
    SINKS.get()
}
