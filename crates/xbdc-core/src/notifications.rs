//! Unsolicited console notifications.
//!
//! The device layer pushes notifications from whatever thread it receives
//! them on. The console drains the queue between commands, so a
//! notification never interleaves with a response.
//!
//! Muting is one shared flag checked on both sides: a muted sender drops
//! the message, and a drain while muted discards whatever was already
//! queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use tracing::trace;

/// One message from the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification
{
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(serialize_with = "rfc3339")]
    timestamp: DateTime<Utc>,
    message: String,
}

impl Notification
{
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self
    {
        Self::at(Utc::now(), message)
    }

    #[must_use]
    pub fn at(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self
    {
        Self {
            kind: "notification",
            timestamp,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc>
    {
        self.timestamp
    }

    #[must_use]
    pub fn message(&self) -> &str
    {
        &self.message
    }
}

fn rfc3339<S: Serializer>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
{
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Producer handle. Cheap to clone; one per device connection.
#[derive(Debug, Clone)]
pub struct NotificationSender
{
    tx: mpsc::Sender<Notification>,
    muted: Arc<AtomicBool>,
}

impl NotificationSender
{
    /// Queue `message` unless notifications are muted.
    pub fn notify(&self, message: impl Into<String>)
    {
        self.send(Notification::new(message));
    }

    pub fn send(&self, notification: Notification)
    {
        if self.muted.load(Ordering::SeqCst) {
            trace!(message = notification.message(), "notification dropped while muted");
            return;
        }
        // The queue only goes away with the console itself.
        let _ = self.tx.send(notification);
    }
}

/// Consumer side, owned by the console loop.
#[derive(Debug)]
pub struct NotificationQueue
{
    tx: mpsc::Sender<Notification>,
    rx: mpsc::Receiver<Notification>,
    muted: Arc<AtomicBool>,
}

impl Default for NotificationQueue
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl NotificationQueue
{
    #[must_use]
    pub fn new() -> Self
    {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            muted: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn sender(&self) -> NotificationSender
    {
        NotificationSender {
            tx: self.tx.clone(),
            muted: Arc::clone(&self.muted),
        }
    }

    /// Mute or unmute. Idempotent.
    pub fn set_muted(&self, muted: bool)
    {
        self.muted.store(muted, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_muted(&self) -> bool
    {
        self.muted.load(Ordering::SeqCst)
    }

    /// Everything queued so far, in arrival order. Empty while muted.
    #[must_use]
    pub fn drain(&self) -> Vec<Notification>
    {
        let pending: Vec<Notification> = self.rx.try_iter().collect();
        if self.is_muted() {
            return Vec::new();
        }
        pending
    }
}
