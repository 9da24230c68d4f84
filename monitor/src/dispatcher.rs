//! Change dispatcher: turns one [`ChangeBatch`] into output and notifications.
//!
//! For every batch the dispatcher looks at the three sequences in the order
//! modified, added, removed:
//!
//! - modified: the whole sequence is written as a list, e.g. `["a.txt"]`
//! - added: only the first path is written, then a notification pointing at
//!   `file://<first path>` is issued; further added paths are not reported
//! - removed: the whole sequence is written as a list
//!
//! Empty sequences produce nothing.

use std::io::{self, Write};

use thiserror::Error;
use tracing::info;

use crate::notifier::{Notifier, NotifyError};
use crate::types::{file_uri, ChangeBatch, NotificationRequest};

/// Message of every notification.
pub const NOTIFICATION_MESSAGE: &str = "Hello World";

/// Title of the notification issued for added files.
pub const ADDED_TITLE: &str = "Ruby";

/// Subtitle of the notification issued for added files.
pub const ADDED_SUBTITLE: &str = "Programming Language";

/// Errors that can occur while dispatching a batch.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Writing the change listing failed.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    /// The notification for an added file could not be delivered.
    #[error("failed to notify: {0}")]
    Notify(#[from] NotifyError),
}

/// Builds the notification issued for a newly added path.
#[must_use]
pub fn added_notification(path: &str) -> NotificationRequest {
    NotificationRequest::new(NOTIFICATION_MESSAGE)
        .with_title(ADDED_TITLE)
        .with_subtitle(ADDED_SUBTITLE)
        .with_activation_target(file_uri(path))
}

/// Consumes change batches one at a time.
#[derive(Debug)]
pub struct ChangeDispatcher<W, N> {
    output: W,
    notifier: N,
}

impl<W: Write, N: Notifier> ChangeDispatcher<W, N> {
    /// Creates a dispatcher writing the listing to `output`.
    pub fn new(output: W, notifier: N) -> Self {
        Self { output, notifier }
    }

    /// Returns the notifier.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Returns the output sink.
    pub fn output(&self) -> &W {
        &self.output
    }

    /// Dispatches one batch.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Output`] if the listing cannot be written and
    /// [`DispatchError::Notify`] if the added-file notification fails. Output
    /// for sets handled before the failure has already been written.
    pub fn dispatch(&mut self, batch: &ChangeBatch) -> Result<(), DispatchError> {
        if !batch.modified.is_empty() {
            info!(paths = ?batch.modified, "Modified");
            writeln!(self.output, "{:?}", batch.modified)?;
        }

        if let Some(first) = batch.added.first() {
            info!(
                path = %first,
                added = batch.added.len(),
                "Added"
            );
            writeln!(self.output, "{first}")?;
            self.output.flush()?;
            self.notifier.notify(&added_notification(first))?;
        }

        if !batch.removed.is_empty() {
            info!(paths = ?batch.removed, "Removed");
            writeln!(self.output, "{:?}", batch.removed)?;
        }

        self.output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::RecordingNotifier;

    fn dispatcher() -> ChangeDispatcher<Vec<u8>, RecordingNotifier> {
        ChangeDispatcher::new(Vec::new(), RecordingNotifier::new())
    }

    fn output(dispatcher: &ChangeDispatcher<Vec<u8>, RecordingNotifier>) -> String {
        String::from_utf8(dispatcher.output().clone()).expect("utf-8 output")
    }

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_added_file_is_printed_and_notified() {
        let mut dispatcher = dispatcher();
        let batch = ChangeBatch::new(vec![], paths(&["/tmp/x/new.txt"]), vec![]);

        dispatcher.dispatch(&batch).unwrap();

        assert_eq!(output(&dispatcher), "/tmp/x/new.txt\n");
        let sent = dispatcher.notifier().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message, "Hello World");
        assert_eq!(sent[0].title.as_deref(), Some("Ruby"));
        assert_eq!(sent[0].subtitle.as_deref(), Some("Programming Language"));
        assert_eq!(
            sent[0].activation_target.as_deref(),
            Some("file:///tmp/x/new.txt")
        );
    }

    #[test]
    fn test_modified_prints_sequence_without_notification() {
        let mut dispatcher = dispatcher();
        let batch = ChangeBatch::new(paths(&["/tmp/x/a.txt"]), vec![], vec![]);

        dispatcher.dispatch(&batch).unwrap();

        assert_eq!(output(&dispatcher), "[\"/tmp/x/a.txt\"]\n");
        assert!(dispatcher.notifier().sent().is_empty());
    }

    #[test]
    fn test_removed_prints_sequence_without_notification() {
        let mut dispatcher = dispatcher();
        let batch = ChangeBatch::new(vec![], vec![], paths(&["/tmp/x/a.txt", "/tmp/x/b.txt"]));

        dispatcher.dispatch(&batch).unwrap();

        assert_eq!(
            output(&dispatcher),
            "[\"/tmp/x/a.txt\", \"/tmp/x/b.txt\"]\n"
        );
        assert!(dispatcher.notifier().sent().is_empty());
    }

    #[test]
    fn test_only_first_added_path_is_reported() {
        let mut dispatcher = dispatcher();
        let batch = ChangeBatch::new(vec![], paths(&["/tmp/x/a.txt", "/tmp/x/b.txt"]), vec![]);

        dispatcher.dispatch(&batch).unwrap();

        let out = output(&dispatcher);
        assert_eq!(out, "/tmp/x/a.txt\n");
        assert!(!out.contains("b.txt"));
        let sent = dispatcher.notifier().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].activation_target.as_deref(),
            Some("file:///tmp/x/a.txt")
        );
    }

    #[test]
    fn test_empty_batch_does_nothing() {
        let mut dispatcher = dispatcher();

        dispatcher.dispatch(&ChangeBatch::default()).unwrap();

        assert!(output(&dispatcher).is_empty());
        assert!(dispatcher.notifier().sent().is_empty());
    }

    #[test]
    fn test_all_sets_in_order() {
        let mut dispatcher = dispatcher();
        let batch = ChangeBatch::new(
            paths(&["m.txt"]),
            paths(&["a.txt", "b.txt"]),
            paths(&["r.txt"]),
        );

        dispatcher.dispatch(&batch).unwrap();

        assert_eq!(output(&dispatcher), "[\"m.txt\"]\na.txt\n[\"r.txt\"]\n");
        let sent = dispatcher.notifier().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].activation_target.as_deref(), Some("file://a.txt"));
    }

    #[test]
    fn test_activation_target_is_not_normalised() {
        let mut dispatcher = dispatcher();
        let batch = ChangeBatch::new(vec![], paths(&["/tmp/x/../y/my file.txt"]), vec![]);

        dispatcher.dispatch(&batch).unwrap();

        assert_eq!(
            dispatcher.notifier().sent()[0].activation_target.as_deref(),
            Some("file:///tmp/x/../y/my file.txt")
        );
    }

    #[test]
    fn test_notification_failure_is_returned() {
        let mut dispatcher =
            ChangeDispatcher::new(Vec::new(), RecordingNotifier::failing("no daemon"));
        let batch = ChangeBatch::new(vec![], paths(&["/tmp/x/new.txt"]), paths(&["/tmp/x/old"]));

        let err = dispatcher.dispatch(&batch).unwrap_err();

        assert!(matches!(err, DispatchError::Notify(_)));
        assert_eq!(err.to_string(), "failed to notify: failed to deliver notification: no daemon");
        // The added path was printed before delivery failed; removed was not reached
        let out = String::from_utf8(dispatcher.output().clone()).unwrap();
        assert_eq!(out, "/tmp/x/new.txt\n");
    }

    #[test]
    fn test_output_failure_is_returned() {
        struct BrokenPipe;

        impl Write for BrokenPipe {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut dispatcher = ChangeDispatcher::new(BrokenPipe, RecordingNotifier::new());
        let batch = ChangeBatch::new(paths(&["/tmp/x/a.txt"]), vec![], vec![]);

        let err = dispatcher.dispatch(&batch).unwrap_err();
        assert!(matches!(err, DispatchError::Output(_)));
    }
}
