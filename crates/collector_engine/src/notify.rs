use std::sync::mpsc;

use collector_core::NotifyKind;
use collector_logging::{collector_error, collector_info, collector_warn};

/// Surface for transient user feedback (toast messages).
pub trait NotificationSink: Send + Sync {
    fn notify(&self, message: &str, kind: NotifyKind);
}

/// Persistent badge counter reflecting pending refinement work.
pub trait BadgeSink: Send + Sync {
    fn set_count(&self, count: usize);
}

/// Forwards notifications to a channel; the embedding host (or a test)
/// drains it.
pub struct ChannelNotificationSink {
    tx: mpsc::Sender<(String, NotifyKind)>,
}

impl ChannelNotificationSink {
    pub fn new(tx: mpsc::Sender<(String, NotifyKind)>) -> Self {
        Self { tx }
    }
}

impl NotificationSink for ChannelNotificationSink {
    fn notify(&self, message: &str, kind: NotifyKind) {
        let _ = self.tx.send((message.to_string(), kind));
    }
}

pub struct ChannelBadgeSink {
    tx: mpsc::Sender<usize>,
}

impl ChannelBadgeSink {
    pub fn new(tx: mpsc::Sender<usize>) -> Self {
        Self { tx }
    }
}

impl BadgeSink for ChannelBadgeSink {
    fn set_count(&self, count: usize) {
        let _ = self.tx.send(count);
    }
}

/// Fallback sink that only logs; used when no UI surface is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, message: &str, kind: NotifyKind) {
        match kind {
            NotifyKind::Info => collector_info!("notification: {message}"),
            NotifyKind::Warning => collector_warn!("notification: {message}"),
            NotifyKind::Error => collector_error!("notification: {message}"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBadgeSink;

impl BadgeSink for NoopBadgeSink {
    fn set_count(&self, _count: usize) {}
}
