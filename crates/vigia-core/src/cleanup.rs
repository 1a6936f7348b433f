//! Ordered registry of exit-time cleanup actions.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// A deferred zero-argument action run once at process exit.
pub type CleanupAction = Box<dyn FnOnce() + Send + 'static>;

/// Ordered collection of cleanup actions.
///
/// Actions run in registration order. A panicking action is logged and the
/// remaining actions still run, so a final pid file removal is never skipped
/// because of an earlier caller-supplied action.
#[derive(Default)]
pub struct CleanupRegistry {
    actions: Vec<CleanupAction>,
}

impl CleanupRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action.
    pub fn push<F>(&mut self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.actions.push(Box::new(action));
    }

    /// Builder-style [`CleanupRegistry::push`].
    #[must_use]
    pub fn with<F>(mut self, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(action);
        self
    }

    /// Number of registered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if no action is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Runs every action in registration order, consuming the registry.
    ///
    /// Returns the number of actions that panicked.
    pub fn run_all(self) -> usize {
        let total = self.actions.len();
        let failed = self.run_each(|index| {
            tracing::error!(index, total, "cleanup action panicked");
        });

        tracing::debug!(total, failed, "cleanup actions finished");
        failed
    }

    /// Same as [`CleanupRegistry::run_all`], but emits no log events.
    ///
    /// For callers running after the current thread's thread-locals were
    /// torn down, such as a C `atexit` callback, where a logging call can
    /// itself panic.
    pub fn run_all_silent(self) -> usize {
        self.run_each(|_| {})
    }

    fn run_each(self, mut on_panic: impl FnMut(usize)) -> usize {
        let mut failed = 0;
        for (index, action) in self.actions.into_iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(action)).is_err() {
                failed += 1;
                on_panic(index);
            }
        }
        failed
    }
}

impl fmt::Debug for CleanupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupRegistry")
            .field("actions", &self.actions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> CleanupAction) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let log = Arc::clone(&log);
            move |name: &'static str| -> CleanupAction {
                let log = Arc::clone(&log);
                Box::new(move || log.lock().unwrap().push(name))
            }
        };
        (log, make)
    }

    #[test]
    fn test_empty_registry_runs_nothing() {
        let registry = CleanupRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.run_all(), 0);
    }

    #[test]
    fn test_runs_in_registration_order() {
        let (log, make) = recorder();
        let mut registry = CleanupRegistry::new();
        registry.push(make("first"));
        registry.push(make("second"));
        registry.push(make("pidfile"));
        assert_eq!(registry.len(), 3);

        assert_eq!(registry.run_all(), 0);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "pidfile"]);
    }

    #[test]
    fn test_panicking_action_does_not_stop_later_ones() {
        let (log, make) = recorder();
        let registry = CleanupRegistry::new()
            .with(make("before"))
            .with(|| panic!("cleanup blew up"))
            .with(make("after"));

        assert_eq!(registry.run_all(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["before", "after"]);
    }

    #[test]
    fn test_silent_run_keeps_order_and_isolation() {
        let (log, make) = recorder();
        let registry = CleanupRegistry::new()
            .with(make("first"))
            .with(|| panic!("cleanup blew up"))
            .with(make("pidfile"));

        assert_eq!(registry.run_all_silent(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["first", "pidfile"]);
    }

    #[test]
    fn test_debug_shows_count() {
        let registry = CleanupRegistry::new().with(|| {}).with(|| {});
        assert_eq!(format!("{registry:?}"), "CleanupRegistry { actions: 2 }");
    }
}
