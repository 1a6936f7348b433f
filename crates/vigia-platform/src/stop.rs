//! Stop command: signal the daemon recorded in a pid file.

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use vigia_core::{DaemonError, PidFile, Result};

/// Sends SIGTERM to the daemon recorded in `pid_file`.
///
/// Fire-and-forget: the target is not waited on. Returns the signalled pid.
///
/// # Errors
/// - [`DaemonError::NotRunning`] if the pid file is absent (nothing is sent)
/// - [`DaemonError::InvalidPidFile`] if it does not hold a positive pid
/// - [`DaemonError::NoSuchProcess`] if the recorded process is gone
/// - [`DaemonError::Signal`] for any other `kill` failure
pub fn stop(pid_file: &PidFile) -> Result<u32> {
    let pid = pid_file.read()?;
    terminate(pid)?;
    tracing::info!(pid, path = %pid_file.path().display(), "sent SIGTERM");
    Ok(pid)
}

/// Sends SIGTERM to `pid`.
pub fn terminate(pid: u32) -> Result<()> {
    let raw = i32::try_from(pid)
        .map_err(|_| DaemonError::signal(format!("pid {pid} out of range")))?;

    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Err(DaemonError::NoSuchProcess { pid }),
        Err(e) => Err(DaemonError::signal(format!(
            "kill({pid}, SIGTERM) failed: {e}"
        ))),
    }
}
