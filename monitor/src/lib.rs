//! Listen Monitor - desktop notifications for directory changes.
//!
//! This crate watches a directory tree and reacts to every batch of changes
//! it reports: modified and removed paths are listed on standard output, and
//! the first path of every batch of additions is announced with a desktop
//! notification that opens the file when activated.
//!
//! # Overview
//!
//! The [`watcher`] turns filesystem events into [`ChangeBatch`] values on a
//! channel. The [`monitor`] consumes that channel one batch at a time and
//! hands each batch to the [`dispatcher`], which writes the listing and talks
//! to a [`notifier`].
//!
//! # Modules
//!
//! - [`types`]: Change batches and notification requests
//! - [`config`]: Configuration from environment variables
//! - [`ignore`]: Paths that are never reported
//! - [`watcher`]: File system watcher producing change batches
//! - [`notifier`]: Desktop and in-memory notifiers
//! - [`dispatcher`]: Per-batch output and notification policy
//! - [`monitor`]: Startup notification and the watch loop
//! - [`error`]: Error types for monitor operations

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod ignore;
pub mod monitor;
pub mod notifier;
pub mod types;
pub mod watcher;

pub use config::{Config, ConfigError};
pub use dispatcher::{ChangeDispatcher, DispatchError};
pub use error::{MonitorError, Result};
pub use ignore::IgnoreRules;
pub use monitor::{Monitor, MonitorState};
pub use notifier::{DesktopNotifier, Notifier, NotifyError, RecordingNotifier};
pub use types::{file_uri, ChangeBatch, NotificationRequest};
pub use watcher::{ChangeWatcher, WatchOptions, WatcherError};
