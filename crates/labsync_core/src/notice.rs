//! Transient success/error banners shown after a user action.

use chrono::{DateTime, Duration, Utc};

use crate::ports::ApiError;

/// How long a banner stays up, in seconds.
pub const NOTICE_TTL_SECS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    pub shown_at: DateTime<Utc>,
}

impl Notice {
    pub fn success(text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
            shown_at: now,
        }
    }

    pub fn error(text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
            shown_at: now,
        }
    }

    /// An error banner carrying the server's message.
    pub fn from_error(err: &ApiError, now: DateTime<Utc>) -> Self {
        Self::error(err.to_string(), now)
    }

    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        now - self.shown_at < Duration::seconds(NOTICE_TTL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_dismisses_itself() {
        let now = Utc::now();
        let notice = Notice::from_error(&ApiError::http(400, "Name taken"), now);
        assert_eq!(notice.text, "Name taken");
        assert!(notice.is_visible(now + Duration::seconds(2)));
        assert!(!notice.is_visible(now + Duration::seconds(3)));
    }
}
