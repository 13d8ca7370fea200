use std::sync::{Arc, Mutex};

/// User-facing notification facility.
///
/// `notice` is transient and never blocks the workflow; `alert` is the
/// blocking kind used for camera acquisition failures and stays visible until
/// the user dismisses it.
pub trait Notifier: Send + Sync {
    fn notice(&self, message: &str);
    fn alert(&self, message: &str);
}

/// Notifier that only emits tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notice(&self, message: &str) {
        tracing::info!(target: "paper2md::notice", "{message}");
    }

    fn alert(&self, message: &str) {
        tracing::warn!(target: "paper2md::alert", "{message}");
    }
}

#[derive(Debug, Default)]
struct Board {
    alert: Option<String>,
    notices: Vec<String>,
}

/// Collects notifications so the TUI can show the alert popup and the caller
/// can print notices once the dialog is gone.
#[derive(Debug, Default, Clone)]
pub struct NoticeBoard {
    inner: Arc<Mutex<Board>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_alert(&self) -> Option<String> {
        self.inner.lock().ok().and_then(|b| b.alert.clone())
    }

    pub fn take_alert(&self) -> Option<String> {
        self.inner.lock().ok().and_then(|mut b| b.alert.take())
    }

    pub fn take_notices(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|mut b| std::mem::take(&mut b.notices))
            .unwrap_or_default()
    }

    pub fn notices(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|b| b.notices.clone())
            .unwrap_or_default()
    }
}

impl Notifier for NoticeBoard {
    fn notice(&self, message: &str) {
        TracingNotifier.notice(message);
        if let Ok(mut board) = self.inner.lock() {
            board.notices.push(message.to_string());
        }
    }

    fn alert(&self, message: &str) {
        TracingNotifier.alert(message);
        if let Ok(mut board) = self.inner.lock() {
            board.alert = Some(message.to_string());
        }
    }
}
