//! Value types passed between the watcher, the dispatcher and the notifier.
//!
//! Both types are short-lived: a [`ChangeBatch`] is built once per watcher
//! window and consumed by the dispatcher, a [`NotificationRequest`] is handed
//! to a [`Notifier`](crate::notifier::Notifier) and dropped.

/// Scheme prefix used for activation targets that point at local files.
const FILE_URI_PREFIX: &str = "file://";

/// One reported set of filesystem changes.
///
/// Within a single batch a path appears in at most one of the three
/// sequences. Each sequence keeps the order in which the paths were first
/// observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    /// Paths whose contents or metadata changed.
    pub modified: Vec<String>,
    /// Paths that came into existence.
    pub added: Vec<String>,
    /// Paths that no longer exist.
    pub removed: Vec<String>,
}

impl ChangeBatch {
    /// Creates a batch from its three sequences.
    #[must_use]
    pub fn new(modified: Vec<String>, added: Vec<String>, removed: Vec<String>) -> Self {
        Self {
            modified,
            added,
            removed,
        }
    }

    /// Returns `true` when no path was reported in any of the sequences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }

    /// Total number of paths across all sequences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modified.len() + self.added.len() + self.removed.len()
    }
}

/// A single transient desktop notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    /// Body text.
    pub message: String,
    /// Headline shown above the message.
    pub title: Option<String>,
    /// Secondary headline.
    pub subtitle: Option<String>,
    /// URI opened when the user activates the notification.
    pub activation_target: Option<String>,
}

impl NotificationRequest {
    /// Creates a request carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            title: None,
            subtitle: None,
            activation_target: None,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the subtitle.
    #[must_use]
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    /// Sets the URI opened on activation.
    #[must_use]
    pub fn with_activation_target(mut self, target: impl Into<String>) -> Self {
        self.activation_target = Some(target.into());
        self
    }
}

/// Builds a `file://` URI from a path string.
///
/// The path is appended as-is: no normalisation and no percent-encoding, so
/// `/tmp/x/new.txt` becomes `file:///tmp/x/new.txt` and a relative path
/// yields `file://relative/path`.
#[must_use]
pub fn file_uri(path: &str) -> String {
    format!("{FILE_URI_PREFIX}{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch() {
        let batch = ChangeBatch::default();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }

    #[test]
    fn batch_with_any_sequence_is_not_empty() {
        let modified = ChangeBatch::new(vec!["a".into()], vec![], vec![]);
        let added = ChangeBatch::new(vec![], vec!["a".into()], vec![]);
        let removed = ChangeBatch::new(vec![], vec![], vec!["a".into()]);

        assert!(!modified.is_empty());
        assert!(!added.is_empty());
        assert!(!removed.is_empty());
    }

    #[test]
    fn batch_len_counts_all_sequences() {
        let batch = ChangeBatch::new(
            vec!["m".into()],
            vec!["a1".into(), "a2".into()],
            vec!["r".into()],
        );
        assert_eq!(batch.len(), 4);
    }

    #[test]
    fn notification_builder() {
        let request = NotificationRequest::new("Hello World")
            .with_title("Ruby")
            .with_subtitle("Programming Language")
            .with_activation_target("file:///tmp/x");

        assert_eq!(request.message, "Hello World");
        assert_eq!(request.title.as_deref(), Some("Ruby"));
        assert_eq!(request.subtitle.as_deref(), Some("Programming Language"));
        assert_eq!(request.activation_target.as_deref(), Some("file:///tmp/x"));
    }

    #[test]
    fn notification_defaults_to_message_only() {
        let request = NotificationRequest::new("hi");
        assert!(request.title.is_none());
        assert!(request.subtitle.is_none());
        assert!(request.activation_target.is_none());
    }

    #[test]
    fn file_uri_absolute_path() {
        assert_eq!(file_uri("/tmp/x/new.txt"), "file:///tmp/x/new.txt");
    }

    #[test]
    fn file_uri_is_verbatim() {
        assert_eq!(file_uri("dir/../a b.txt"), "file://dir/../a b.txt");
    }
}
