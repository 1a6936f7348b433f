//! Pid file protocol.
//!
//! The pid file holds the decimal process id of the running daemon followed
//! by a newline. Its existence means "running": `claim` refuses to start over
//! an existing file and `read` reports `NotRunning` when it is absent.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{DaemonError, Result};

/// Handle to a pid file location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Creates a handle for the given path. Nothing is touched on disk.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the pid file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the pid file currently exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Claims the pid file with exclusive creation.
    ///
    /// The file is left empty; [`PidFile::write`] fills in the final pid once
    /// the process has detached. Two concurrent claims cannot both succeed.
    ///
    /// # Errors
    /// Returns [`DaemonError::AlreadyRunning`] if the file exists. Nothing on
    /// disk is modified in that case.
    pub fn claim(&self) -> Result<()> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(_) => {
                tracing::debug!(path = %self.path.display(), "claimed pid file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(DaemonError::already_running(&self.path))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes `pid` followed by a newline, creating or truncating the file.
    pub fn write(&self, pid: u32) -> Result<()> {
        let mut file = File::create(&self.path)?;
        writeln!(file, "{pid}")?;
        file.sync_all()?;
        tracing::debug!(pid, path = %self.path.display(), "wrote pid file");
        Ok(())
    }

    /// Reads the recorded pid.
    ///
    /// # Errors
    /// - [`DaemonError::NotRunning`] if the file does not exist.
    /// - [`DaemonError::InvalidPidFile`] if it does not hold a positive pid.
    pub fn read(&self) -> Result<u32> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DaemonError::not_running(&self.path));
            }
            Err(e) => return Err(e.into()),
        };

        parse_pid(&content).ok_or_else(|| DaemonError::InvalidPidFile {
            path: self.path.clone(),
            content,
        })
    }

    /// Removes the pid file. A file that is already gone is not an error.
    ///
    /// Emits no log events, so it is safe to call from an exit callback.
    pub fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Parses pid file content.
///
/// Accepts a positive integer that fits in a `pid_t`, with surrounding
/// whitespace. Zero is refused: signalling pid 0 targets the whole process
/// group of the sender.
#[must_use]
pub(crate) fn parse_pid(content: &str) -> Option<u32> {
    let pid: u32 = content.trim().parse().ok()?;
    if pid == 0 || i32::try_from(pid).is_err() {
        return None;
    }
    Some(pid)
}
