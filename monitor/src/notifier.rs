//! Desktop notification delivery.
//!
//! [`Notifier`] is the seam between the dispatcher and the operating system.
//! [`DesktopNotifier`] talks to the platform notification service through
//! `notify-rust`; [`RecordingNotifier`] keeps requests in memory.

use std::sync::{Arc, Mutex};

use notify_rust::Notification;
#[cfg(all(unix, not(target_os = "macos")))]
use notify_rust::{Hint, Timeout};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::NotificationRequest;

/// Application name shown by the notification service.
pub const APP_NAME: &str = "listen-monitor";

/// How long a freedesktop notification stays up before the server closes it.
pub const NOTIFICATION_TIMEOUT_MS: u32 = 10_000;

/// Errors that can occur while delivering a notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The platform notification service rejected or never received the request.
    #[error("failed to deliver notification: {0}")]
    Delivery(String),
}

/// Something that can surface a [`NotificationRequest`] to the user.
pub trait Notifier: Send + Sync {
    /// Delivers one notification. Fire-and-forget: returns once the request
    /// has been handed to the notification service.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Delivery`] when the request cannot be delivered.
    fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError> {
        (**self).notify(request)
    }
}

/// Notifier backed by the operating system notification service.
#[derive(Debug, Clone, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    /// Creates a desktop notifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError> {
        let notification = build_notification(request);

        debug!(
            summary = %notification.summary,
            activation_target = ?request.activation_target,
            "Showing desktop notification"
        );

        show(notification, request.activation_target.clone())
    }
}

/// Summary line carrying both title and subtitle, for notification services
/// without a subtitle field (`"Ruby - Programming Language"`).
#[must_use]
pub fn summary_with_subtitle(request: &NotificationRequest) -> String {
    let title = request.title.as_deref().unwrap_or(APP_NAME);
    match &request.subtitle {
        Some(subtitle) => format!("{title} - {subtitle}"),
        None => title.to_string(),
    }
}

/// Builds a freedesktop notification.
///
/// The subtitle is folded into the summary. The notification is transient
/// with an explicit timeout so the server closes it and the thread waiting
/// for its action can exit.
#[cfg(all(unix, not(target_os = "macos")))]
fn build_notification(request: &NotificationRequest) -> Notification {
    let mut notification = Notification::new();
    notification
        .appname(APP_NAME)
        .summary(&summary_with_subtitle(request))
        .body(&request.message)
        .hint(Hint::Transient(true))
        .timeout(Timeout::Milliseconds(NOTIFICATION_TIMEOUT_MS));

    if request.activation_target.is_some() {
        notification.action("default", "Open");
    }

    notification
}

/// Builds a notification for platforms with a native subtitle.
#[cfg(not(all(unix, not(target_os = "macos"))))]
fn build_notification(request: &NotificationRequest) -> Notification {
    let mut notification = Notification::new();
    notification
        .appname(APP_NAME)
        .summary(request.title.as_deref().unwrap_or(APP_NAME))
        .body(&request.message);

    if let Some(subtitle) = &request.subtitle {
        notification.subtitle(subtitle);
    }

    notification
}

/// Shows the notification and, on freedesktop systems, opens the activation
/// target when the user clicks it.
#[cfg(all(unix, not(target_os = "macos")))]
fn show(notification: Notification, target: Option<String>) -> Result<(), NotifyError> {
    let Some(target) = target else {
        return notification
            .show()
            .map(|_| ())
            .map_err(|e| NotifyError::Delivery(e.to_string()));
    };

    let (result_tx, result_rx) = std::sync::mpsc::channel();

    // wait_for_action blocks until the notification is closed or times out,
    // so the handle lives on its own thread and only the delivery result
    // comes back
    std::thread::spawn(move || match notification.show() {
        Ok(handle) => {
            let _ = result_tx.send(Ok(()));
            handle.wait_for_action(|action| {
                if action == "default" {
                    open_target(&target);
                }
            });
        }
        Err(e) => {
            let _ = result_tx.send(Err(NotifyError::Delivery(e.to_string())));
        }
    });

    result_rx
        .recv()
        .map_err(|_| NotifyError::Delivery("notification thread exited".to_string()))?
}

/// Shows the notification. Activation targets are not supported by the
/// notification backend on this platform and are only logged.
#[cfg(not(all(unix, not(target_os = "macos"))))]
fn show(notification: Notification, target: Option<String>) -> Result<(), NotifyError> {
    if let Some(target) = target {
        debug!(%target, "Activation target not supported on this platform");
    }

    notification
        .show()
        .map(|_| ())
        .map_err(|e| NotifyError::Delivery(e.to_string()))
}

#[cfg(all(unix, not(target_os = "macos")))]
fn open_target(target: &str) {
    if let Err(e) = open::that(target) {
        warn!(%target, error = %e, "Failed to open activation target");
    }
}

/// Notifier that records every request instead of showing it.
///
/// Clones share the same record. Can be switched into a failing mode to
/// exercise delivery errors.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<NotificationRequest>>>,
    failure: Option<String>,
}

impl RecordingNotifier {
    /// Creates a notifier that accepts every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier that rejects every request with `reason`.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            sent: Arc::default(),
            failure: Some(reason.into()),
        }
    }

    /// Returns a copy of the requests accepted so far.
    #[must_use]
    pub fn sent(&self) -> Vec<NotificationRequest> {
        match self.sent.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError> {
        if let Some(reason) = &self.failure {
            warn!(%reason, "Rejecting notification");
            return Err(NotifyError::Delivery(reason.clone()));
        }

        let mut guard = match self.sent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(request.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_keeps_requests_in_order() {
        let notifier = RecordingNotifier::new();
        notifier.notify(&NotificationRequest::new("first")).unwrap();
        notifier
            .notify(&NotificationRequest::new("second").with_title("t"))
            .unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].message, "first");
        assert_eq!(sent[1].title.as_deref(), Some("t"));
    }

    #[test]
    fn recording_notifier_clones_share_state() {
        let notifier = RecordingNotifier::new();
        let clone = notifier.clone();
        clone.notify(&NotificationRequest::new("hi")).unwrap();

        assert_eq!(notifier.sent().len(), 1);
    }

    #[test]
    fn failing_notifier_rejects() {
        let notifier = RecordingNotifier::failing("no notification daemon");
        let err = notifier.notify(&NotificationRequest::new("hi")).unwrap_err();

        assert_eq!(err, NotifyError::Delivery("no notification daemon".to_string()));
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn arc_notifier_delegates() {
        let inner = RecordingNotifier::new();
        let shared: Arc<dyn Notifier> = Arc::new(inner.clone());
        shared.notify(&NotificationRequest::new("hi")).unwrap();

        assert_eq!(inner.sent().len(), 1);
    }

    #[test]
    fn summary_includes_subtitle() {
        let request = NotificationRequest::new("Hello World")
            .with_title("Ruby")
            .with_subtitle("Programming Language");
        assert_eq!(summary_with_subtitle(&request), "Ruby - Programming Language");
    }

    #[test]
    fn summary_without_subtitle_is_title() {
        let request = NotificationRequest::new("Hello World").with_title("Ruby");
        assert_eq!(summary_with_subtitle(&request), "Ruby");
    }

    #[test]
    fn summary_falls_back_to_app_name() {
        let request = NotificationRequest::new("Hello World").with_subtitle("sub");
        assert_eq!(summary_with_subtitle(&request), "listen-monitor - sub");

        let bare = NotificationRequest::new("Hello World");
        assert_eq!(summary_with_subtitle(&bare), APP_NAME);
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn freedesktop_notification_is_transient_with_timeout() {
        let request = NotificationRequest::new("Hello World")
            .with_title("Ruby")
            .with_subtitle("Programming Language")
            .with_activation_target("file:///tmp/x/new.txt");

        let notification = build_notification(&request);

        assert_eq!(notification.summary, "Ruby - Programming Language");
        assert_eq!(notification.body, "Hello World");
        assert!(notification.hints.contains(&Hint::Transient(true)));
        assert_eq!(
            notification.timeout,
            Timeout::Milliseconds(NOTIFICATION_TIMEOUT_MS)
        );
        assert!(notification.actions.contains(&"default".to_string()));
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn freedesktop_notification_without_target_has_no_action() {
        let notification = build_notification(&NotificationRequest::new("Hello World"));

        assert_eq!(notification.summary, APP_NAME);
        assert!(notification.actions.is_empty());
    }

    #[test]
    fn notify_error_display() {
        let err = NotifyError::Delivery("org.freedesktop.Notifications not found".to_string());
        assert_eq!(
            err.to_string(),
            "failed to deliver notification: org.freedesktop.Notifications not found"
        );
    }
}
