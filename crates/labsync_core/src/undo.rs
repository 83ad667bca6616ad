//! crates/labsync_core/src/undo.rs
//!
//! Short-lived memory of deleted colleges and departments so the admin can
//! undo a delete. Undo re-creates the record through a fresh create call; the
//! restored record gets a new id and anything that pointed at the old id stays
//! broken. This is a convenience, not a transactional restore.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{College, Department};

/// How long a deleted record stays restorable, in minutes.
pub const UNDO_WINDOW_MINUTES: i64 = 5;

/// How many of the most recent deletions the admin page offers at once.
pub const UNDO_OFFERED: usize = 3;

pub fn undo_window() -> Duration {
    Duration::minutes(UNDO_WINDOW_MINUTES)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletedItem {
    College(College),
    /// The parent college is remembered by name; restore looks it up again.
    Department {
        department: Department,
        college_name: Option<String>,
    },
}

impl DeletedItem {
    pub fn name(&self) -> &str {
        match self {
            DeletedItem::College(college) => &college.name,
            DeletedItem::Department { department, .. } => &department.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DeletedItem::College(_) => "college",
            DeletedItem::Department { .. } => "department",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedEntry {
    pub id: u64,
    pub item: DeletedItem,
    pub deleted_at: DateTime<Utc>,
}

impl DeletedEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.deleted_at >= undo_window()
    }
}

#[derive(Debug, Default)]
pub struct DeletedItemBuffer {
    entries: Vec<DeletedEntry>,
    next_id: u64,
}

impl DeletedItemBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers a successful delete and returns the handle used to undo it.
    pub fn record(&mut self, item: DeletedItem, now: DateTime<Utc>) -> u64 {
        self.next_id += 1;
        self.entries.push(DeletedEntry {
            id: self.next_id,
            item,
            deleted_at: now,
        });
        self.next_id
    }

    /// Drops every entry older than the undo window. Returns how many were dropped.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    /// Entries still restorable, oldest first.
    pub fn pending(&mut self, now: DateTime<Utc>) -> &[DeletedEntry] {
        self.prune(now);
        &self.entries
    }

    /// The most recent `n` restorable entries, oldest first.
    pub fn latest(&mut self, now: DateTime<Utc>, n: usize) -> &[DeletedEntry] {
        let pending = self.pending(now);
        &pending[pending.len().saturating_sub(n)..]
    }

    pub fn get(&self, id: u64, now: DateTime<Utc>) -> Option<&DeletedEntry> {
        self.entries
            .iter()
            .find(|entry| entry.id == id && !entry.is_expired(now))
    }

    /// Removes and returns an entry if it is still inside the window.
    pub fn take(&mut self, id: u64, now: DateTime<Utc>) -> Option<DeletedEntry> {
        self.prune(now);
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn college(id: i64, name: &str) -> DeletedItem {
        DeletedItem::College(College {
            id,
            name: name.into(),
        })
    }

    #[test]
    fn entries_expire_after_five_minutes() {
        let start = Utc::now();
        let mut buffer = DeletedItemBuffer::new();
        let id = buffer.record(college(1, "GEC"), start);

        let later = start + Duration::minutes(4) + Duration::seconds(59);
        assert_eq!(buffer.pending(later).len(), 1);
        assert!(buffer.get(id, later).is_some());

        let expired = start + Duration::minutes(5);
        assert!(buffer.get(id, expired).is_none());
        assert_eq!(buffer.prune(expired), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn take_is_refused_once_expired() {
        let start = Utc::now();
        let mut buffer = DeletedItemBuffer::new();
        let id = buffer.record(college(1, "GEC"), start);
        assert!(buffer.take(id, start + Duration::minutes(6)).is_none());
    }

    #[test]
    fn latest_offers_the_newest_entries() {
        let now = Utc::now();
        let mut buffer = DeletedItemBuffer::new();
        for (i, name) in ["A", "B", "C", "D"].iter().enumerate() {
            buffer.record(college(i as i64, name), now);
        }
        let names: Vec<&str> = buffer
            .latest(now, UNDO_OFFERED)
            .iter()
            .map(|entry| entry.item.name())
            .collect();
        assert_eq!(names, vec!["B", "C", "D"]);
    }
}
