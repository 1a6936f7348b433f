//! vigia: a double-fork daemon wrapper serving a static directory over HTTP.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vigia::prelude::*;
//!
//! let config = VigiaConfig::default();
//! let pid = daemonize(&DaemonOptions::from(&config), CleanupRegistry::new())?;
//! println!("daemon started with pid {pid}");
//! serve_forever(&config.serve)?;
//! # Ok::<(), DaemonError>(())
//! ```

pub use vigia_core as core;
pub use vigia_platform as platform;
pub use vigia_serve as serve;

/// Prelude module for common imports.
pub mod prelude {
    pub use vigia_core::{
        CleanupRegistry, DaemonError, PidFile, Result, ServeConfig, VigiaConfig,
    };
    pub use vigia_platform::{DaemonOptions, daemonize, run_foreground, stop};
    pub use vigia_serve::serve_forever;
}
