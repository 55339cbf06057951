//! Logging setup on top of `tracing-subscriber`.
//!
//! Everything logs through `tracing`; this module installs the one global
//! subscriber. Records always go to stderr and, with `--log-file`, are also
//! appended to a file. The file is rolled over by size: once a record would
//! push it past `--log-max-bytes` it becomes `<file>.1`, older backups shift
//! up to `--log-backups`, and the oldest is removed.
//!
//! # Log Levels
//!
//! - `error`: fatal failures, with the full error detail
//! - `warn`: degraded mode (no alias column), decoding fallbacks
//! - `info`: run progress and counts (the default)
//! - `debug`: per-file load/save timings
//! - `trace`: worksheet-level detail

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Crates whose records pass the default filter at the configured level.
const OWN_TARGETS: &[&str] = &["pricecheck", "pricecheck_cli", "pricecheck_recon", "pricecheck_io"];

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable multi-field format.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
    /// One JSON object per record.
    Json,
}

/// Size-based rollover of the log file. `max_bytes == 0` or `backups == 0`
/// disables it and the file grows without bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation {
    pub max_bytes: u64,
    pub backups: u32,
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            max_bytes: 5_000_000,
            backups: 5,
        }
    }
}

impl Rotation {
    fn enabled(&self) -> bool {
        self.max_bytes > 0 && self.backups > 0
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Colors on stderr. Never used for the log file.
    pub with_ansi: bool,
    pub with_target: bool,
    /// Append records here as well as to stderr.
    pub log_file: Option<PathBuf>,
    pub rotation: Rotation,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            with_ansi: io::stderr().is_terminal(),
            with_target: false,
            log_file: None,
            rotation: Rotation::default(),
        }
    }
}

impl LogConfig {
    /// Map `-v` count and `-q` to a level.
    ///
    /// - `-q`: error
    /// - 0: info
    /// - 1 (`-v`): debug
    /// - 2+ (`-vv`): trace, with record targets shown
    #[must_use]
    pub fn from_verbosity(verbosity: u8, quiet: bool) -> Self {
        let level = match (quiet, verbosity) {
            (true, _) => Level::ERROR,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        };
        Self {
            level,
            with_target: verbosity >= 2,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Install the global subscriber. Call once, before any work.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened for appending.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    let file_layer = match &config.log_file {
        Some(path) => {
            let file = RotatingFile::open(path, config.rotation)?;
            Some(build_layer(config, SharedFileWriter::new(file), false))
        }
        None => None,
    };
    let mut layers = vec![build_layer(config, io::stderr, config.with_ansi)];
    layers.extend(file_layer);

    tracing_subscriber::registry()
        .with(layers)
        .with(build_env_filter(config.level))
        .init();
    Ok(())
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn build_layer<W>(config: &LogConfig, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(config.with_target)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(config.with_target)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(config.with_target)
            .boxed(),
    }
}

/// Log file that rolls over to numbered backups by size.
struct RotatingFile {
    path: PathBuf,
    file: File,
    written: u64,
    rotation: Rotation,
}

impl RotatingFile {
    fn open(path: &Path, rotation: Rotation) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            written,
            rotation,
        })
    }

    /// `app.log` → `app.log.3`.
    fn backup_path(&self, n: u32) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let oldest = self.backup_path(self.rotation.backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for n in (1..self.rotation.backups).rev() {
            let from = self.backup_path(n);
            if from.exists() {
                fs::rename(&from, self.backup_path(n + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.rotation.enabled()
            && self.written > 0
            && self.written + buf.len() as u64 >= self.rotation.max_bytes
        {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[derive(Clone)]
struct SharedFileWriter {
    file: Arc<Mutex<RotatingFile>>,
}

impl SharedFileWriter {
    fn new(file: RotatingFile) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

struct SharedFileGuard {
    file: Arc<Mutex<RotatingFile>>,
}

impl Write for SharedFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFileWriter {
    type Writer = SharedFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard {
            file: Arc::clone(&self.file),
        }
    }
}

/// `RUST_LOG` wins when set; otherwise our crates log at `level` and
/// dependencies at `warn`.
fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

fn default_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    let mut directives = vec!["warn".to_string()];
    directives.extend(OWN_TARGETS.iter().map(|t| format!("{t}={level}")));
    directives.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_mapping() {
        assert_eq!(LogConfig::from_verbosity(0, false).level, Level::INFO);
        assert_eq!(LogConfig::from_verbosity(1, false).level, Level::DEBUG);
        assert_eq!(LogConfig::from_verbosity(5, false).level, Level::TRACE);
        assert_eq!(LogConfig::from_verbosity(2, true).level, Level::ERROR);
    }

    #[test]
    fn default_filter_covers_own_crates() {
        let d = default_directives(Level::DEBUG);
        assert!(d.starts_with("warn,"));
        assert!(d.contains("pricecheck=debug"));
        assert!(d.contains("pricecheck_io=debug"));
        // Must parse as a valid filter.
        EnvFilter::try_new(&d).unwrap();
    }

    fn record(n: usize) -> Vec<u8> {
        format!("{:<39}\n", format!("record {n}")).into_bytes()
    }

    #[test]
    fn log_file_rolls_over_past_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/app.log");
        let rotation = Rotation { max_bytes: 100, backups: 2 };
        let mut file = RotatingFile::open(&path, rotation).unwrap();
        for n in 0..7 {
            file.write_all(&record(n)).unwrap();
        }
        file.flush().unwrap();

        // 40-byte records, two per file before the limit is hit.
        assert_eq!(fs::read(&path).unwrap(), record(6));
        let first = fs::read_to_string(dir.path().join("logs/app.log.1")).unwrap();
        assert!(first.starts_with("record 4"), "{first}");
        let second = fs::read_to_string(dir.path().join("logs/app.log.2")).unwrap();
        assert!(second.starts_with("record 2"), "{second}");
        assert!(!dir.path().join("logs/app.log.3").exists());
    }

    #[test]
    fn reopened_log_file_counts_existing_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, vec![b'x'; 90]).unwrap();
        let mut file = RotatingFile::open(&path, Rotation { max_bytes: 100, backups: 1 }).unwrap();
        file.write_all(&record(0)).unwrap();
        assert_eq!(fs::read(dir.path().join("app.log.1")).unwrap().len(), 90);
        assert_eq!(fs::read(&path).unwrap(), record(0));
    }

    #[test]
    fn zero_backups_disables_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut file = RotatingFile::open(&path, Rotation { max_bytes: 10, backups: 0 }).unwrap();
        for n in 0..3 {
            file.write_all(&record(n)).unwrap();
        }
        assert_eq!(fs::read(&path).unwrap().len(), 120);
        assert!(!dir.path().join("app.log.1").exists());
    }
}
