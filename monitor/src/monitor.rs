//! Monitor lifecycle: startup notification, watch registration and the
//! sequential batch loop.
//!
//! A [`Monitor`] starts in [`MonitorState::Idle`]. [`Monitor::run`] announces
//! itself with a notification, registers the watcher and switches to
//! [`MonitorState::Watching`], where it stays until the cancellation token
//! fires or the watcher goes away. Batches are dispatched one at a time, so
//! no two dispatches ever overlap.

use std::io::Write;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::dispatcher::{ChangeDispatcher, NOTIFICATION_MESSAGE};
use crate::error::Result;
use crate::notifier::Notifier;
use crate::types::{ChangeBatch, NotificationRequest};
use crate::watcher::ChangeWatcher;

/// Lifecycle state of a [`Monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Created, not yet watching.
    Idle,
    /// Watch registered, receiving batches.
    Watching,
}

/// Builds the notification sent once when monitoring starts.
#[must_use]
pub fn startup_notification(startup_url: &str) -> NotificationRequest {
    NotificationRequest::new(NOTIFICATION_MESSAGE).with_activation_target(startup_url)
}

/// Watches the configured directory and dispatches every change batch.
#[derive(Debug)]
pub struct Monitor<W, N> {
    config: Config,
    dispatcher: ChangeDispatcher<W, N>,
    state: MonitorState,
}

impl<W, N> Monitor<W, N>
where
    W: Write + Send,
    N: Notifier,
{
    /// Creates an idle monitor.
    pub fn new(config: Config, notifier: N, output: W) -> Self {
        Self {
            config,
            dispatcher: ChangeDispatcher::new(output, notifier),
            state: MonitorState::Idle,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Runs until `shutdown` is cancelled.
    ///
    /// Sends the startup notification, registers the watcher on the
    /// configured root and dispatches batches sequentially.
    ///
    /// # Errors
    ///
    /// Returns an error if the startup notification cannot be delivered, the
    /// watcher cannot be registered, or a batch cannot be dispatched.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        info!(startup_url = %self.config.startup_url, "Sending startup notification");
        self.dispatcher
            .notifier()
            .notify(&startup_notification(&self.config.startup_url))?;

        let (batch_tx, batch_rx) = mpsc::channel::<ChangeBatch>(self.config.buffer_size);
        let watcher = ChangeWatcher::new(self.config.watch_options(), batch_tx)?;

        self.state = MonitorState::Watching;
        info!(root = %watcher.root().display(), "Watching for changes");

        let result = self.consume(batch_rx, shutdown).await;

        drop(watcher);
        info!("Monitor stopped");
        result
    }

    /// Dispatches batches from `batches` until cancelled or the channel closes.
    ///
    /// # Errors
    ///
    /// Returns the first dispatch error.
    pub async fn consume(
        &mut self,
        mut batches: mpsc::Receiver<ChangeBatch>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    return Ok(());
                }

                batch = batches.recv() => {
                    let Some(batch) = batch else {
                        debug!("Change channel closed");
                        return Ok(());
                    };
                    debug!(paths = batch.len(), "Dispatching change batch");
                    self.dispatcher.dispatch(&batch)?;
                }
            }
        }
    }
}
