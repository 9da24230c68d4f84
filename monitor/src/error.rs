//! Error types for the Listen Monitor.
//!
//! Each module owns its error enum; [`MonitorError`] gathers them for callers
//! that drive the whole lifecycle.

use thiserror::Error;

use crate::config::ConfigError;
use crate::dispatcher::DispatchError;
use crate::notifier::NotifyError;
use crate::watcher::WatcherError;

/// Errors that can occur during monitor operations.
///
/// This is the primary error type for the crate, encompassing all possible
/// failure modes.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Watch registration failed.
    ///
    /// Covers a missing or unreadable root directory and backend failures
    /// such as permission errors or exhausted watch limits.
    #[error("file watch error: {0}")]
    Watch(#[from] WatcherError),

    /// A notification could not be delivered.
    #[error("notification error: {0}")]
    Notify(#[from] NotifyError),

    /// A change batch could not be dispatched.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// A specialized `Result` type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
