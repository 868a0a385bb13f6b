//! Convergence reconciler for a single asciinema-server instance.
//!
//! Every pass follows the same shape:
//!
//! - **Collect**: read the database relation, ingress endpoints and local
//!   binding from a [`SignalSource`]
//! - **Resolve**: derive a [`DesiredConfig`] with the pure [`resolve`]
//!   function
//! - **Apply**: hand it to an [`Applier`] that installs, grants, configures
//!   and (re)starts the service
//! - **Report**: publish a [`ReconcileStatus`]
//!
//! A pass without a database relation stops at `Blocked` and never touches
//! the service.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use asciinema_reconciler::{
//!     ApplierConfig, Dispatcher, Reconciler, ServiceApplier, SnapshotSignalSource,
//! };
//!
//! let applier = ServiceApplier::new(manager, ApplierConfig::default());
//! let reconciler = Reconciler::builder()
//!     .with_signals(Arc::new(SnapshotSignalSource::new("/run/asciinema/signals.json")))
//!     .with_applier(Arc::new(applier))
//!     .database_name("asciinema-server")
//!     .build()?;
//!
//! let dispatcher = Dispatcher::new(Arc::new(reconciler));
//! dispatcher.dispatch("database-created").await?;
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod applier;
pub mod dispatch;
pub mod error;
pub mod reconciler;
pub mod resolver;
pub mod signals;
pub mod status;
pub mod types;

// Re-export main types
pub use applier::{Applier, ApplierConfig, ServiceApplier, ServiceManager, ensure_data_dir};
pub use dispatch::{Dispatcher, Trigger};
pub use error::{Error, ErrorKind, Result};
pub use reconciler::{Reconciler, ReconcilerBuilder, ReconcilerConfig};
pub use resolver::resolve;
pub use signals::{SignalSnapshot, SignalSource, SnapshotSignalSource, collect};
pub use status::{
    FileStatusReporter, LogStatusReporter, ReconcileStatus, StatusReport, StatusReporter,
    read_status_file,
};
pub use types::{ConfigMap, ConfigValue, DatabaseRelation, DesiredConfig, Signals};
