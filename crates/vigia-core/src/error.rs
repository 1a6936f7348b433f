//! Error types for vigia-core.
//!
//! Every failure the lifecycle can hit is an explicit variant; nothing in the
//! library crates panics.

use std::path::PathBuf;

/// Result type alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, DaemonError>;

/// Error type for daemon lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// A pid file already exists at start time.
    #[error("already running (pid file {} exists)", pid_file.display())]
    AlreadyRunning {
        /// Path of the existing pid file.
        pid_file: PathBuf,
    },

    /// One of the two fork points failed.
    #[error("fork #{stage} failed: {reason}")]
    ForkFailure {
        /// Which fork failed (1 or 2).
        stage: u8,
        /// OS error description.
        reason: String,
    },

    /// Stop was requested but no pid file is present.
    #[error("not running (no pid file at {})", pid_file.display())]
    NotRunning {
        /// Path that was checked.
        pid_file: PathBuf,
    },

    /// The pid recorded in the pid file does not belong to a live process.
    #[error("no such process: {pid}")]
    NoSuchProcess {
        /// The stale pid.
        pid: u32,
    },

    /// The pid file does not hold a positive process id.
    #[error("invalid pid file {}: {content:?}", path.display())]
    InvalidPidFile {
        /// Path of the pid file.
        path: PathBuf,
        /// Raw content that failed to parse.
        content: String,
    },

    /// Signal delivery or handler installation failed.
    #[error("signal error: {0}")]
    Signal(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid state for operation.
    #[error("invalid state: {0}")]
    State(String),

    /// The HTTP service loop failed.
    #[error("serve error: {0}")]
    Serve(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DaemonError {
    /// Creates an already-running error.
    #[must_use]
    pub fn already_running(pid_file: impl Into<PathBuf>) -> Self {
        Self::AlreadyRunning {
            pid_file: pid_file.into(),
        }
    }

    /// Creates a not-running error.
    #[must_use]
    pub fn not_running(pid_file: impl Into<PathBuf>) -> Self {
        Self::NotRunning {
            pid_file: pid_file.into(),
        }
    }

    /// Creates a fork failure for the given stage.
    #[must_use]
    pub fn fork(stage: u8, reason: impl std::fmt::Display) -> Self {
        Self::ForkFailure {
            stage,
            reason: reason.to_string(),
        }
    }

    /// Creates a signal error.
    #[must_use]
    pub fn signal(msg: impl Into<String>) -> Self {
        Self::Signal(msg.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an invalid state error.
    #[must_use]
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Creates a serve error.
    #[must_use]
    pub fn serve(msg: impl Into<String>) -> Self {
        Self::Serve(msg.into())
    }
}
