// Frontend - What the action engine needs from the surrounding UI
//
// The engine reports operator-visible messages, asks for the opaque view state
// to attach to an action, hides dialogs after a failure, fires the "document
// changed" hook and obtains a progress/cancel collaborator for long edits.

use crate::document::Document;
use crate::messaging::channels::NotificationProducer;
use crate::messaging::notification::{Notification, NotificationLevel};
use ringbuf::traits::Producer;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation, polled by edits between chunks
pub trait Progress {
    /// Report the current position; returns true to request an abort
    fn check(&mut self, position: u64) -> bool;
}

/// Progress that never aborts
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn check(&mut self, _position: u64) -> bool {
        false
    }
}

/// Progress driven by a shared flag (e.g. a "Cancel" button)
#[derive(Debug, Default, Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Clear a pending request so the next operation starts fresh
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}

impl Progress for CancelToken {
    fn check(&mut self, _position: u64) -> bool {
        self.is_cancelled()
    }
}

/// Frontend positional/view state recorded on an action, never interpreted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub values: BTreeMap<String, f64>,
}

/// UI collaborator of the action engine
pub trait Frontend: Send {
    /// Show a message to the operator
    fn notify(&mut self, notification: Notification);

    /// Force-hide any parameter dialog left open by a failed action
    fn hide_dialogs(&mut self) {}

    /// Generic "document changed" hook, called after every top-level perform
    fn document_changed(&mut self, _document: Option<&Document>) {}

    fn view_state(&self, _document: Option<&Document>) -> ViewState {
        ViewState::default()
    }

    /// Progress collaborator for one top-level action
    fn begin_progress(&mut self, _title: &str) -> Box<dyn Progress> {
        Box::new(NoProgress)
    }
}

/// Frontend forwarding every message onto a notification ring buffer
pub struct NotificationFrontend {
    sender: NotificationProducer,
    cancel: CancelToken,
    documents_changed: usize,
    dialogs_hidden: usize,
}

impl NotificationFrontend {
    pub fn new(sender: NotificationProducer) -> Self {
        Self {
            sender,
            cancel: CancelToken::new(),
            documents_changed: 0,
            dialogs_hidden: 0,
        }
    }

    /// Handle for a "Cancel" button
    ///
    /// Cancelling aborts the operation currently running. A request made while
    /// nothing runs is cleared when the next operation begins.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn documents_changed(&self) -> usize {
        self.documents_changed
    }

    pub fn dialogs_hidden(&self) -> usize {
        self.dialogs_hidden
    }
}

impl Frontend for NotificationFrontend {
    fn notify(&mut self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => log::error!("{}", notification.message),
            NotificationLevel::Warning => log::warn!("{}", notification.message),
            NotificationLevel::Info => log::info!("{}", notification.message),
        }
        if self.sender.try_push(notification).is_err() {
            log::warn!("notification channel full, message dropped");
        }
    }

    fn hide_dialogs(&mut self) {
        self.dialogs_hidden += 1;
    }

    fn document_changed(&mut self, _document: Option<&Document>) {
        self.documents_changed += 1;
    }

    fn begin_progress(&mut self, title: &str) -> Box<dyn Progress> {
        if self.cancel.is_cancelled() {
            log::debug!("clearing stale cancel request before '{}'", title);
        }
        self.cancel.reset();
        Box::new(self.cancel.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::channels::create_notification_channel;
    use crate::messaging::notification::NotificationCategory;
    use ringbuf::traits::Consumer;

    #[test]
    fn test_notifications_reach_consumer() {
        let (tx, mut rx) = create_notification_channel(4);
        let mut frontend = NotificationFrontend::new(tx);

        frontend.notify(Notification::warning(
            NotificationCategory::Edit,
            "not undoable".to_string(),
        ));

        let received = rx.try_pop().expect("notification");
        assert_eq!(received.level, NotificationLevel::Warning);
        assert_eq!(received.message, "not undoable");
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_full_channel_drops_silently() {
        let (tx, _rx) = create_notification_channel(1);
        let mut frontend = NotificationFrontend::new(tx);
        for _ in 0..3 {
            frontend.notify(Notification::info(NotificationCategory::Edit, "x".to_string()));
        }
    }

    #[test]
    fn test_cancel_token_progress() {
        let (tx, _rx) = create_notification_channel(1);
        let mut frontend = NotificationFrontend::new(tx);
        let mut progress = frontend.begin_progress("Gain");
        assert!(!progress.check(0));

        frontend.cancel_token().cancel();
        assert!(progress.check(1));
    }

    #[test]
    fn test_cancel_only_reaches_running_operation() {
        let (tx, _rx) = create_notification_channel(1);
        let mut frontend = NotificationFrontend::new(tx);
        let token = frontend.cancel_token();

        let mut first = frontend.begin_progress("Gain");
        token.cancel();
        assert!(first.check(0));

        let mut second = frontend.begin_progress("Gain");
        assert!(!second.check(0));
        assert!(!token.is_cancelled());

        token.cancel();
        assert!(second.check(1));
    }
}
