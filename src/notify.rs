use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use utoipa::ToSchema;

pub const AUTO_HIDE_AFTER: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Notification {
    pub message: String,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub visible: bool,
}

/// Single-slot status message channel. A new `show` replaces whatever is
/// visible; each message hides itself after `ttl` unless superseded.
#[derive(Clone)]
pub struct NotificationChannel {
    tx: Arc<watch::Sender<Notification>>,
    generation: Arc<AtomicU64>,
    ttl: Duration,
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationChannel {
    pub fn new() -> Self {
        Self::with_ttl(AUTO_HIDE_AFTER)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        let (tx, _rx) = watch::channel(Notification::default());
        Self { tx: Arc::new(tx), generation: Arc::new(AtomicU64::new(0)), ttl }
    }

    pub fn subscribe(&self) -> watch::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Notification {
        self.tx.borrow().clone()
    }

    pub fn show(&self, message: impl Into<String>, severity: Severity) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_replace(Notification { message: message.into(), severity, visible: true });

        // without a runtime the message simply stays until hidden
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let this = self.clone();
            handle.spawn(async move {
                tokio::time::sleep(this.ttl).await;
                if this.generation.load(Ordering::SeqCst) == generation {
                    this.hide();
                }
            });
        }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.show(message, Severity::Success);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.show(message, Severity::Error);
    }

    pub fn hide(&self) {
        self.tx.send_if_modified(|n| std::mem::replace(&mut n.visible, false));
    }
}
