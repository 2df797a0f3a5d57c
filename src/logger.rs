//! Booth log. One file per run, overwritten on every launch:
//!
//!   Windows:  `%APPDATA%\Photobooth\photobooth.log`
//!   Linux:    `$XDG_DATA_HOME/Photobooth/photobooth.log` (or `~/.local/share/...`)
//!   macOS:    `~/Library/Application Support/Photobooth/photobooth.log`
//!
//! `log_info!`, `log_warn!` and `log_err!` format a message and tag it with a
//! clock time and level. Until `init()` has opened the file they only reach
//! stderr, and only with `--verbose`.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static ECHO_STDERR: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Panic,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Panic => "PANIC",
        }
    }
}

/// Where `init()` put the log, if it managed to open one.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

pub fn set_echo(enabled: bool) {
    ECHO_STDERR.store(enabled, Ordering::Relaxed);
}

fn emit(line: &str) {
    if ECHO_STDERR.load(Ordering::Relaxed) {
        eprintln!("{}", line);
    }
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

pub fn write(level: Level, msg: &str) {
    emit(&format_line(unix_secs(), level, msg));
}

fn format_line(secs: u64, level: Level, msg: &str) -> String {
    format!("[{}] [{}] {}", clock(secs), level.tag(), msg)
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, &format!($($arg)*));
    };
}

/// Open (and truncate) the log file and route panics into it. A second call
/// is a no-op. Failure to open the file leaves the booth running without one.
pub fn init() {
    if LOG_FILE.get().is_some() {
        return;
    }
    let path = data_dir().join("Photobooth").join("photobooth.log");
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = match OpenOptions::new().create(true).write(true).truncate(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[logger] cannot open {}: {}", path.display(), e);
            return;
        }
    };
    let _ = LOG_PATH.set(path.clone());
    let _ = LOG_FILE.set(Mutex::new(file));

    emit(&format!("=== Photobooth run at unix {} ===", unix_secs()));
    emit(&format!("Log file: {}", path.display()));
    emit("");

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write(Level::Panic, &info.to_string());
        prev(info);
    }));
}

fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|home| PathBuf::from(home).join(".local").join("share")))
        .unwrap_or_else(|_| PathBuf::from("."))
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// UTC `HH:MM:SS` of a unix time.
fn clock(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", (secs % 86_400) / 3600, (secs % 3600) / 60, secs % 60)
}
