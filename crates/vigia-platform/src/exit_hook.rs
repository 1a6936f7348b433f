//! Process-wide exit hook.
//!
//! The cleanup registry is parked in a static. Every exit path the daemon
//! controls drains it with [`run_now`] from ordinary thread context before
//! calling `exit`: the SIGTERM thread, and `main` before it returns. Only
//! one registry can be installed per process.
//!
//! An `atexit` callback is registered as a fallback for exits that bypass
//! those paths. It runs after the exiting thread's thread-locals have been
//! destroyed, so it runs the registry without logging and never lets a
//! panic reach the C caller.

use std::panic::catch_unwind;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use vigia_core::{CleanupRegistry, DaemonError, Result};

static INSTALLED: AtomicBool = AtomicBool::new(false);
static EXIT_ACTIONS: Mutex<Option<CleanupRegistry>> = parking_lot::const_mutex(None);

/// Returns true once an exit hook has been installed in this process.
pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::SeqCst)
}

/// Installs `registry` to run at process exit.
///
/// # Errors
/// [`DaemonError::State`] if a registry is already installed, or if the C
/// runtime refuses the `atexit` registration.
pub fn install(registry: CleanupRegistry) -> Result<()> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Err(DaemonError::state(
            "exit hook already installed in this process",
        ));
    }

    let actions = registry.len();
    *EXIT_ACTIONS.lock() = Some(registry);

    // SAFETY: `run_exit_actions` takes no arguments and catches every panic
    // before returning to the C runtime.
    let rc = unsafe { libc::atexit(run_exit_actions) };
    if rc != 0 {
        EXIT_ACTIONS.lock().take();
        INSTALLED.store(false, Ordering::SeqCst);
        return Err(DaemonError::state("atexit registration failed"));
    }

    tracing::debug!(actions, "installed exit hook");
    Ok(())
}

/// Runs the installed registry now, if it has not run yet.
///
/// The lock is held while the actions run, so a concurrent caller waits for
/// them to finish and then finds nothing left to do. Returns true if this
/// call ran the registry.
pub fn run_now() -> bool {
    let mut slot = EXIT_ACTIONS.lock();
    match slot.take() {
        Some(registry) => {
            registry.run_all();
            true
        }
        None => false,
    }
}

extern "C" fn run_exit_actions() {
    // No logging here: tracing's thread-locals may already be gone.
    catch_unwind(|| {
        // try_lock: an action that called `exit` still holds the lock.
        let registry = EXIT_ACTIONS.try_lock().and_then(|mut slot| slot.take());
        if let Some(registry) = registry {
            registry.run_all_silent();
        }
    })
    .ok();
}
