use std::sync::Mutex;

use log::{error, info};
use serde::Serialize;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// A message for the host's toast layer.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn success(title: &str, message: &str) -> Self {
        Notice {
            kind: NoticeKind::Success,
            title: title.to_string(),
            message: message.to_string(),
        }
    }

    pub fn error(title: &str, message: &str) -> Self {
        Notice {
            kind: NoticeKind::Error,
            title: title.to_string(),
            message: message.to_string(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Success => info!("{}: {}", notice.title, notice.message),
            NoticeKind::Error => error!("{}: {}", notice.title, notice.message),
        }
    }
}

/// Collects notices until the host drains them.
#[derive(Debug, Default)]
pub struct BufferedNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl BufferedNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(mut notices) => std::mem::take(&mut *notices),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn last(&self) -> Option<Notice> {
        match self.notices.lock() {
            Ok(notices) => notices.last().cloned(),
            Err(poisoned) => poisoned.into_inner().last().cloned(),
        }
    }
}

impl Notifier for BufferedNotifier {
    fn notify(&self, notice: Notice) {
        match self.notices.lock() {
            Ok(mut notices) => notices.push(notice),
            Err(poisoned) => poisoned.into_inner().push(notice),
        }
    }
}

/// Presentation hooks a controller may ask the host for.
pub trait ViewHost: Send + Sync {
    fn scroll_to_top(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopViewHost;

impl ViewHost for NoopViewHost {
    fn scroll_to_top(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_notifier_drains_in_order() {
        let notifier = BufferedNotifier::new();
        notifier.notify(Notice::success("Success", "first"));
        notifier.notify(Notice::error("Error", "second"));

        assert_eq!(notifier.last().unwrap().message, "second");
        let drained = notifier.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].kind, NoticeKind::Success);
        assert!(notifier.drain().is_empty());
    }

    #[test]
    fn notice_kind_serializes_lowercase() {
        let json = serde_json::to_value(Notice::error("Error", "boom")).unwrap();
        assert_eq!(json["kind"], "error");
    }
}
