// Iron Lotus: Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # vigia-core
//!
//! Core lifecycle primitives for the vigia daemon wrapper.
//!
//! - [`DaemonError`] covering every startup, stop and serve failure
//! - [`VigiaConfig`] for pid file, stdio targets and the served directory
//! - [`PidFile`] for the claim / write / read / remove protocol
//! - [`CleanupRegistry`] for ordered exit-time actions
//!
//! Nothing here touches process state; the fork and signal work lives in
//! `vigia-platform`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cleanup;
pub mod config;
pub mod error;
pub mod pidfile;

pub use cleanup::{CleanupAction, CleanupRegistry};
pub use config::{ServeConfig, VigiaConfig};
pub use error::{DaemonError, Result};
pub use pidfile::PidFile;
