//! Double-fork detachment and standard stream redirection.
//!
//! ```text
//! launcher ── fork #1 ──► child ── chdir("/"), umask(0), setsid() ── fork #2 ──► daemon
//!    │                      │
//!  exit(0)                exit(0)
//! ```
//!
//! The session leader created by `setsid` could still acquire a controlling
//! terminal by opening a tty, so it forks once more and exits. The surviving
//! grandchild is re-parented to init and is never a session leader.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::AsRawFd;
use std::path::Path;

use nix::sys::stat::{Mode, umask};
use nix::unistd::{ForkResult, dup2, fork, setsid};

use vigia_core::{DaemonError, Result};

use crate::DETACHED_EXIT_CODE;

/// Runs steps 1-3 of the detach protocol.
///
/// Returns only in the final daemon process; both ancestors exit with
/// status 0 inside this call.
///
/// # Errors
/// [`DaemonError::ForkFailure`] if either fork fails, or an I/O error if
/// the working directory or session cannot be changed.
pub fn detach() -> Result<()> {
    flush_std_streams();
    fork_and_exit_parent(1)?;

    std::env::set_current_dir("/")?;
    umask(Mode::empty());
    let sid = setsid().map_err(io::Error::from)?;
    tracing::debug!(sid = sid.as_raw(), "started new session");

    fork_and_exit_parent(2)?;
    Ok(())
}

fn fork_and_exit_parent(stage: u8) -> Result<()> {
    // SAFETY: no other threads exist at this point, so the child cannot
    // inherit a lock held by a thread that no longer exists.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            tracing::debug!(stage, child = child.as_raw(), "forked, parent exiting");
            std::process::exit(DETACHED_EXIT_CODE);
        }
        Ok(ForkResult::Child) => Ok(()),
        Err(e) => Err(DaemonError::fork(stage, e)),
    }
}

/// Replaces fds 0, 1 and 2 with the given files.
///
/// stdin is opened read-only; stdout and stderr are opened for append and
/// created if missing. All three are opened before any descriptor is
/// replaced, so a bad path leaves the current streams untouched.
pub fn redirect_stdio(stdin: &Path, stdout: &Path, stderr: &Path) -> Result<()> {
    flush_std_streams();

    let input = open_with_context(stdin, |p| File::open(p))?;
    let output = open_with_context(stdout, open_append)?;
    let errors = open_with_context(stderr, open_append)?;

    replace_fd(&input, libc::STDIN_FILENO)?;
    replace_fd(&output, libc::STDOUT_FILENO)?;
    replace_fd(&errors, libc::STDERR_FILENO)?;

    tracing::debug!(
        stdin = %stdin.display(),
        stdout = %stdout.display(),
        stderr = %stderr.display(),
        "redirected standard streams"
    );
    Ok(())
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().append(true).create(true).open(path)
}

fn open_with_context(path: &Path, open: impl FnOnce(&Path) -> io::Result<File>) -> Result<File> {
    open(path).map_err(|e| {
        DaemonError::Io(io::Error::new(e.kind(), format!("{}: {e}", path.display())))
    })
}

fn replace_fd(file: &File, target: i32) -> Result<()> {
    dup2(file.as_raw_fd(), target).map_err(io::Error::from)?;
    Ok(())
}

fn flush_std_streams() {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}
