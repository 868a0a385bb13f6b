//! snapd-backed service manager.
//!
//! Drives the `snap` command line to install, connect, configure and
//! restart the managed snap. Errors convert into
//! [`asciinema_reconciler::Error::ApplyFailed`] so they surface as failed
//! reconcile passes.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod client;
pub mod error;
pub mod manager;

pub use client::{InstalledSnap, SnapClient, config_args, parse_snap_list};
pub use error::{Error, Result};
pub use manager::{SnapServiceManager, channel_matches};
