// Iron Lotus: Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # vigia-platform
//!
//! Unix process primitives for the vigia lifecycle controller.
//!
//! [`daemonize`] turns a freshly launched foreground process into a detached
//! daemon, exactly once per pid file:
//!
//! 1. fork, parent exits 0
//! 2. `chdir("/")`, `umask(0)`, `setsid()`
//! 3. fork again, session leader exits 0
//! 4. flush and `dup2` the stdio targets onto fds 0/1/2
//! 5. write the final pid to the pid file
//! 6. register an exit hook running the cleanup actions, then pid file removal
//! 7. convert SIGTERM into `exit(1)` so the hook still runs
//!
//! [`stop`] is the counterpart used by a separate invocation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use vigia_core::CleanupRegistry;
//! use vigia_platform::{DaemonOptions, daemonize};
//!
//! let options = DaemonOptions::new("/tmp/daemon.pid").with_stdout("/tmp/daemon.log");
//! let pid = daemonize(&options, CleanupRegistry::new())?;
//! // now running detached as `pid`
//! ```

#![warn(missing_docs)]

#[cfg(not(unix))]
compile_error!("vigia-platform requires a Unix target");

pub mod detach;
pub mod exit_hook;
pub mod stop;
pub mod termination;

use std::path::{Path, PathBuf};

use vigia_core::{CleanupRegistry, DaemonError, PidFile, Result, VigiaConfig};

pub use stop::{stop, terminate};

/// Exit status of the launcher and the intermediate session leader.
pub const DETACHED_EXIT_CODE: i32 = 0;

/// Exit status of a daemon ended by SIGTERM.
pub const TERMINATED_EXIT_CODE: i32 = 1;

/// Where the daemon records its pid and sends its standard streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonOptions {
    /// Pid file path.
    pub pid_file: PathBuf,
    /// Replacement for fd 0.
    pub stdin: PathBuf,
    /// Replacement for fd 1.
    pub stdout: PathBuf,
    /// Replacement for fd 2.
    pub stderr: PathBuf,
}

impl DaemonOptions {
    /// Creates options with every stdio target set to `/dev/null`.
    #[must_use]
    pub fn new(pid_file: impl Into<PathBuf>) -> Self {
        Self {
            pid_file: pid_file.into(),
            stdin: PathBuf::from("/dev/null"),
            stdout: PathBuf::from("/dev/null"),
            stderr: PathBuf::from("/dev/null"),
        }
    }

    /// Sets the stdin target.
    #[must_use]
    pub fn with_stdin(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = path.into();
        self
    }

    /// Sets the stdout target.
    #[must_use]
    pub fn with_stdout(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = path.into();
        self
    }

    /// Sets the stderr target.
    #[must_use]
    pub fn with_stderr(mut self, path: impl Into<PathBuf>) -> Self {
        self.stderr = path.into();
        self
    }

    /// Anchors every relative path to the current working directory.
    ///
    /// The daemon changes its working directory to `/` between claiming the
    /// pid file and writing it, so paths are fixed before the claim.
    ///
    /// # Errors
    /// I/O error if a path is empty or the working directory is unreadable.
    pub fn resolved(&self) -> Result<Self> {
        Ok(Self {
            pid_file: std::path::absolute(&self.pid_file)?,
            stdin: std::path::absolute(&self.stdin)?,
            stdout: std::path::absolute(&self.stdout)?,
            stderr: std::path::absolute(&self.stderr)?,
        })
    }
}

impl From<&VigiaConfig> for DaemonOptions {
    fn from(config: &VigiaConfig) -> Self {
        Self {
            pid_file: config.pid_file.clone(),
            stdin: config.stdin.clone(),
            stdout: config.stdout.clone(),
            stderr: config.stderr.clone(),
        }
    }
}

/// Detaches the calling process and establishes daemon state.
///
/// Returns the pid of the final daemon process, which is the process this
/// call returns in. The launcher and the intermediate child exit with
/// [`DETACHED_EXIT_CODE`] inside the call.
///
/// # Errors
/// - [`DaemonError::AlreadyRunning`] if the pid file exists; nothing changes
/// - [`DaemonError::ForkFailure`] if either fork fails
/// - [`DaemonError::State`] if this process already established a lifecycle
/// - I/O errors from stdio redirection or the pid file
///
/// Relative paths are resolved against the launcher's working directory.
/// Any failure after the pid file was claimed releases the claim.
pub fn daemonize(options: &DaemonOptions, cleanup: CleanupRegistry) -> Result<u32> {
    let options = options.resolved()?;
    let pid_file = PidFile::new(&options.pid_file);
    with_claim(&pid_file, || {
        tracing::info!(path = %pid_file.path().display(), "detaching from terminal");
        detach::detach()?;
        detach::redirect_stdio(&options.stdin, &options.stdout, &options.stderr)?;
        establish(&pid_file, cleanup)
    })
}

/// Establishes the pid file, exit hook and SIGTERM handler without detaching.
///
/// The process keeps its terminal, working directory and standard streams.
/// Intended for running under a supervisor that already manages those.
/// A relative `pid_file` is resolved against the current directory, so a
/// later `chdir` does not strand it.
///
/// # Errors
/// Same as [`daemonize`], minus [`DaemonError::ForkFailure`].
pub fn run_foreground(pid_file: &Path, cleanup: CleanupRegistry) -> Result<u32> {
    let pid_file = PidFile::new(std::path::absolute(pid_file)?);
    with_claim(&pid_file, || establish(&pid_file, cleanup))
}

fn with_claim(pid_file: &PidFile, body: impl FnOnce() -> Result<u32>) -> Result<u32> {
    pid_file.claim()?;

    if exit_hook::is_installed() {
        release_claim(pid_file);
        return Err(DaemonError::state(
            "daemon lifecycle already established in this process",
        ));
    }

    body().inspect_err(|_| release_claim(pid_file))
}

fn release_claim(pid_file: &PidFile) {
    if let Err(e) = pid_file.remove() {
        tracing::warn!(path = %pid_file.path().display(), error = %e, "failed to release pid file");
    }
}

fn establish(pid_file: &PidFile, mut cleanup: CleanupRegistry) -> Result<u32> {
    let pid = std::process::id();
    pid_file.write(pid)?;

    let owned = pid_file.clone();
    cleanup.push(move || {
        if let Err(e) = owned.remove() {
            tracing::warn!(path = %owned.path().display(), error = %e, "failed to remove pid file");
        }
    });

    exit_hook::install(cleanup)?;
    termination::install()?;

    tracing::info!(pid, path = %pid_file.path().display(), "daemon lifecycle established");
    Ok(pid)
}
