//! Single-slot, self-expiring status messages.
//!
//! The slot is a `watch` channel: it only ever holds the latest notification.
//! Each `notify` aborts the pending clear of the previous message and starts a
//! fresh timer for the new one.
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::model::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    seq: u64,
}

#[derive(Clone)]
pub struct Notifier {
    inner: Arc<Inner>,
}

struct Inner {
    slot: watch::Sender<Option<Notification>>,
    ttl: Duration,
    issued: AtomicU64,
    pending_clear: Mutex<Option<JoinHandle<()>>>,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                slot,
                ttl,
                issued: AtomicU64::new(0),
                pending_clear: Mutex::new(None),
            }),
        }
    }

    pub fn info(&self, text: impl Into<String>) {
        self.notify(text, NotificationKind::Info);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.notify(text, NotificationKind::Error);
    }

    /// Replace the visible notification and schedule its removal.
    pub fn notify(&self, text: impl Into<String>, kind: NotificationKind) {
        let seq = self.inner.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let notification = Notification {
            text: text.into(),
            kind,
            created_at: Utc::now(),
            seq,
        };
        debug!(text = %notification.text, ?kind, "notification");

        let mut pending = self
            .inner
            .pending_clear
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        self.inner.slot.send_replace(Some(notification));

        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                let weak = Arc::downgrade(&self.inner);
                let ttl = self.inner.ttl;
                *pending = Some(rt.spawn(async move {
                    tokio::time::sleep(ttl).await;
                    expire(weak, seq);
                }));
            }
            Err(_) => warn!("no async runtime; notification will not auto-expire"),
        }
    }

    /// The notification currently visible, if any.
    pub fn current(&self) -> Option<Notification> {
        self.inner.slot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.inner.slot.subscribe()
    }

    /// Total number of notifications raised so far.
    pub fn issued(&self) -> u64 {
        self.inner.issued.load(Ordering::SeqCst)
    }

    pub fn dismiss(&self) {
        if let Some(handle) = self
            .inner
            .pending_clear
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
        self.inner.slot.send_replace(None);
    }
}

/// Text raised when a collection could not be fetched.
pub fn fetch_failed(kind: ResourceKind) -> String {
    format!("Failed to fetch {}! Log out and sign in again", kind.plural())
}

// Clears the slot only if it still shows the notification the timer was armed for.
fn expire(inner: Weak<Inner>, seq: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    inner.slot.send_if_modified(|current| {
        if current.as_ref().map(|n| n.seq) == Some(seq) {
            *current = None;
            true
        } else {
            false
        }
    });
}
