//! SIGTERM handling.
//!
//! SIGTERM is blocked in the calling thread, and every thread spawned
//! afterwards inherits that mask. A dedicated `vigia-sigterm` thread then
//! receives it synchronously with `sigwait`, drains the exit hook and calls
//! `exit(1)`. Nothing runs in async-signal context.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::errno::Errno;
use nix::sys::signal::{SigSet, Signal};

use vigia_core::{DaemonError, Result};

use crate::{TERMINATED_EXIT_CODE, exit_hook};

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Installs the termination handler.
///
/// Must be called before any other thread is spawned (in particular before
/// the tokio runtime is built), otherwise threads created earlier keep
/// SIGTERM unblocked and may receive it with the default action.
///
/// # Errors
/// [`DaemonError::State`] if already installed, [`DaemonError::Signal`] if
/// the mask cannot be changed or the thread cannot be spawned.
pub fn install() -> Result<()> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Err(DaemonError::state(
            "termination handler already installed in this process",
        ));
    }

    let mut mask = SigSet::empty();
    mask.add(Signal::SIGTERM);
    mask.thread_block()
        .map_err(|e| DaemonError::signal(format!("failed to block SIGTERM: {e}")))?;

    std::thread::Builder::new()
        .name("vigia-sigterm".to_string())
        .spawn(move || wait_for_termination(&mask))
        .map_err(|e| DaemonError::signal(format!("failed to spawn signal thread: {e}")))?;

    tracing::debug!("installed SIGTERM handler");
    Ok(())
}

fn wait_for_termination(mask: &SigSet) {
    loop {
        match mask.wait() {
            Ok(Signal::SIGTERM) => {
                tracing::info!(pid = std::process::id(), "received SIGTERM, exiting");
                exit_hook::run_now();
                std::process::exit(TERMINATED_EXIT_CODE);
            }
            Ok(other) => tracing::debug!(signal = ?other, "ignoring signal"),
            Err(Errno::EINTR) => {}
            Err(e) => {
                tracing::error!(error = %e, "sigwait failed, SIGTERM handler stopped");
                return;
            }
        }
    }
}
