//! Tracing setup shared by every subcommand.
//!
//! Events are written to stderr, leaving stdout to command output, and to a log file without
//! ANSI colours. `PDF_RAG_LOG_FILE` picks the file; otherwise `logs/pdf-rag.log` is used.
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_NAME: &str = "pdf-rag.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Destination of the file log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFile {
    /// Path given through `PDF_RAG_LOG_FILE`.
    Explicit(PathBuf),
    /// `pdf-rag.log` under `logs/` in the working directory.
    Default,
}

impl LogFile {
    /// Resolve the destination from `PDF_RAG_LOG_FILE`.
    pub fn from_env() -> Self {
        Self::from_value(std::env::var("PDF_RAG_LOG_FILE").ok())
    }

    fn from_value(value: Option<String>) -> Self {
        match value {
            Some(path) if !path.trim().is_empty() => Self::Explicit(PathBuf::from(path.trim())),
            _ => Self::Default,
        }
    }

    /// Path the log is appended to.
    pub fn path(&self) -> PathBuf {
        match self {
            Self::Explicit(path) => path.clone(),
            Self::Default => Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_NAME),
        }
    }

    /// Open the file for appending, creating missing parent directories.
    fn open(&self) -> std::io::Result<File> {
        let path = self.path();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn writer(&self) -> std::io::Result<NonBlocking> {
        let (writer, guard) = tracing_appender::non_blocking(self.open()?);
        let _ = LOG_GUARD.set(guard);
        Ok(writer)
    }
}

/// Install the global subscriber: `RUST_LOG` filter (default `info`), stderr, and the log file.
///
/// A log file that cannot be opened is reported on stderr and skipped.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let log_file = LogFile::from_env();
    let file_layer = match log_file.writer() {
        Ok(writer) => Some(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .compact(),
        ),
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", log_file.path().display());
            None
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}
