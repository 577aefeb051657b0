//! Rolling Logger
//!
//! File logger with size-based rotation plus an in-memory circular buffer
//! of the most recent lines. Installed as the global `tracing` subscriber;
//! records from the `log` facade are bridged into it.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

/// Rotation and buffer limits
#[derive(Debug, Clone)]
pub struct RollingConfig {
    /// Rotate once the active file reaches this size
    pub max_bytes: u64,
    /// Number of rotated files kept next to the active one
    pub max_files: usize,
    /// Lines retained in memory for `recent_lines`
    pub buffer_lines: usize,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            max_bytes: 1024 * 1024,
            max_files: 3,
            buffer_lines: 200,
        }
    }
}

// ========================
// Log Sink
// ========================

/// Size-rotated log file with a ring buffer of recent lines
#[derive(Debug)]
pub struct LogSink {
    path: PathBuf,
    file: File,
    written: u64,
    recent: VecDeque<String>,
    partial: String,
    config: RollingConfig,
}

impl LogSink {
    /// Open (or append to) `<dir>/<app_name>.log`
    pub fn open(dir: &Path, app_name: &str, config: RollingConfig) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.log", app_name));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();

        Ok(Self {
            path,
            file,
            written,
            recent: VecDeque::new(),
            partial: String::new(),
            config,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the n-th rotated file (1 = most recent)
    pub fn rotated_path(&self, n: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }

    pub fn recent_lines(&self) -> Vec<String> {
        self.recent.iter().cloned().collect()
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.config.max_files == 0 {
            self.file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        let oldest = self.rotated_path(self.config.max_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for n in (1..self.config.max_files).rev() {
            let from = self.rotated_path(n);
            if from.exists() {
                fs::rename(&from, self.rotated_path(n + 1))?;
            }
        }
        fs::rename(&self.path, self.rotated_path(1))?;

        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.written = 0;
        Ok(())
    }

    fn remember(&mut self, chunk: &[u8]) {
        self.partial.push_str(&String::from_utf8_lossy(chunk));
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            if self.config.buffer_lines == 0 {
                continue;
            }
            if self.recent.len() == self.config.buffer_lines {
                self.recent.pop_front();
            }
            self.recent.push_back(line.trim_end().to_string());
        }
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.config.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.written += buf.len() as u64;
        self.remember(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Cloneable handle handed to the fmt subscriber
#[derive(Clone)]
struct SharedSink(Arc<Mutex<LogSink>>);

impl SharedSink {
    fn lock(&self) -> MutexGuard<'_, LogSink> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

/// Local wall-clock timestamps
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

// ========================
// Global Logger
// ========================

static SINK: OnceLock<SharedSink> = OnceLock::new();

/// Initialize the global logger with default limits
pub fn init_logger(log_dir: impl AsRef<Path>, app_name: &str) -> Result<(), String> {
    init_logger_with(log_dir, app_name, RollingConfig::default())
}

/// Initialize the global logger. Fails if a global subscriber already exists.
pub fn init_logger_with(
    log_dir: impl AsRef<Path>,
    app_name: &str,
    config: RollingConfig,
) -> Result<(), String> {
    if SINK.get().is_some() {
        return Err("Logger already initialized".to_string());
    }

    let sink = LogSink::open(log_dir.as_ref(), app_name, config)
        .map_err(|e| format!("Failed to open log file: {}", e))?;
    let shared = SharedSink(Arc::new(Mutex::new(sink)));

    let writer = shared.clone();
    tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_timer(LocalTime)
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .map_err(|e| format!("Failed to install subscriber: {}", e))?;

    SINK.set(shared)
        .map_err(|_| "Logger already initialized".to_string())
}

fn ensure_initialized() -> Result<(), String> {
    SINK.get()
        .map(|_| ())
        .ok_or_else(|| "Logger not initialized".to_string())
}

pub fn info(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    log::info!("{}", msg);
    Ok(())
}

pub fn warn(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    log::warn!("{}", msg);
    Ok(())
}

pub fn error(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    log::error!("{}", msg);
    Ok(())
}

/// Most recent log lines, oldest first. Empty before initialization.
pub fn recent_lines() -> Vec<String> {
    SINK.get()
        .map(|sink| sink.lock().recent_lines())
        .unwrap_or_default()
}

/// Active log file, if the logger is running
pub fn log_file_path() -> Option<PathBuf> {
    SINK.get().map(|sink| sink.lock().path().to_path_buf())
}
