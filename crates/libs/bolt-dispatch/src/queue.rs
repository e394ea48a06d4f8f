//! Identifier → status tracking for messages awaiting a response.
//!
//! The queue does not enforce a state machine: any status may follow any other.
//! Entries stay until removed explicitly or evicted by the [`RetentionPolicy`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

use crate::error::DispatchError;
use crate::{MessageId, AWAITED};

/// Last observed lifecycle status of a dispatched message.
///
/// The vocabulary is open: anything besides the named variants is carried in
/// [`DispatchStatus::Other`]. Serializes as the plain status string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DispatchStatus {
    Awaited,
    Completed,
    Failed,
    Other(String),
}

impl DispatchStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Awaited => AWAITED,
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Other(status) => status,
        }
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DispatchStatus {
    fn from(status: &str) -> Self {
        match status {
            AWAITED => Self::Awaited,
            "Completed" => Self::Completed,
            "Failed" => Self::Failed,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for DispatchStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            AWAITED | "Completed" | "Failed" => Self::from(status.as_str()),
            _ => Self::Other(status),
        }
    }
}

impl From<DispatchStatus> for String {
    fn from(status: DispatchStatus) -> Self {
        match status {
            DispatchStatus::Other(status) => status,
            named => named.as_str().to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueueEntry {
    pub status: DispatchStatus,
    pub enqueued_at: Instant,
    pub updated_at: Instant,
}

impl QueueEntry {
    fn awaited(now: Instant) -> Self {
        Self { status: DispatchStatus::Awaited, enqueued_at: now, updated_at: now }
    }
}

/// Bounds on how much the queue retains. `None` leaves that dimension unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Enqueueing a new id at capacity evicts the least recently updated entry.
    /// `Some(0)` retains nothing: enqueues are dropped.
    pub max_entries: Option<usize>,
    /// Entries not updated for this long are dropped by `evict_expired`.
    pub max_age: Option<Duration>,
}

impl RetentionPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }
}

/// Entries keyed by id, plus an index ordered by last update so capacity and
/// age eviction only touch the entries they remove.
#[derive(Debug, Default)]
pub struct DispatchQueue {
    entries: HashMap<MessageId, QueueEntry>,
    by_update: BTreeSet<(Instant, MessageId)>,
    retention: RetentionPolicy,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: RetentionPolicy) -> Self {
        Self { retention, ..Self::default() }
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Track `id` with status `Awaited`. An existing entry is reset.
    pub fn enqueue(&mut self, id: impl Into<MessageId>) {
        self.enqueue_at(id, Instant::now());
    }

    pub fn enqueue_at(&mut self, id: impl Into<MessageId>, now: Instant) {
        let id = id.into();

        if let Some(previous) = self.entries.get(&id) {
            self.by_update.remove(&(previous.updated_at, id.clone()));
        } else if let Some(max_entries) = self.retention.max_entries {
            if max_entries == 0 {
                log::warn!("queue: capacity is zero, dropping {}", id);
                return;
            }
            while self.entries.len() >= max_entries && self.evict_oldest() {}
        }

        log::trace!("queue: enqueue {}", id);
        self.by_update.insert((now, id.clone()));
        self.entries.insert(id, QueueEntry::awaited(now));
    }

    /// Set the status of an enqueued `id`.
    pub fn update(
        &mut self,
        id: &str,
        status: impl Into<DispatchStatus>,
    ) -> Result<(), DispatchError> {
        self.update_at(id, status, Instant::now())
    }

    pub fn update_at(
        &mut self,
        id: &str,
        status: impl Into<DispatchStatus>,
        now: Instant,
    ) -> Result<(), DispatchError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| DispatchError::QueueEntryNotFound { id: id.to_owned() })?;

        self.by_update.remove(&(entry.updated_at, id.to_owned()));
        self.by_update.insert((now, id.to_owned()));
        entry.status = status.into();
        entry.updated_at = now;
        log::trace!("queue: {} -> {}", id, entry.status);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&QueueEntry> {
        self.entries.get(id)
    }

    pub fn status(&self, id: &str) -> Option<&DispatchStatus> {
        self.entries.get(id).map(|entry| &entry.status)
    }

    /// Stop tracking `id`. Missing ids are not an error.
    pub fn remove(&mut self, id: &str) -> Option<QueueEntry> {
        let entry = self.entries.remove(id)?;
        self.by_update.remove(&(entry.updated_at, id.to_owned()));
        Some(entry)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueueEntry)> + '_ {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    /// Ids still waiting for a response.
    pub fn pending(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter()
            .filter(|(_, entry)| entry.status == DispatchStatus::Awaited)
            .map(|(id, _)| id)
    }

    /// Drop entries whose last update is older than the policy's `max_age`.
    /// Returns the evicted ids, least recently updated first.
    pub fn evict_expired(&mut self) -> Vec<MessageId> {
        self.evict_expired_at(Instant::now())
    }

    pub fn evict_expired_at(&mut self, now: Instant) -> Vec<MessageId> {
        let Some(cutoff) = self.retention.max_age.and_then(|max_age| now.checked_sub(max_age))
        else {
            return Vec::new();
        };

        // Last update strictly before `cutoff` means older than `max_age`.
        let mut expired = Vec::new();
        while let Some((updated_at, _)) = self.by_update.first() {
            if *updated_at >= cutoff {
                break;
            }
            if let Some((_, id)) = self.by_update.pop_first() {
                self.entries.remove(&id);
                expired.push(id);
            }
        }

        if !expired.is_empty() {
            log::debug!("queue: evicted {} expired entries", expired.len());
        }

        expired
    }

    fn evict_oldest(&mut self) -> bool {
        let Some((_, id)) = self.by_update.pop_first() else {
            return false;
        };
        log::warn!("queue: at capacity, evicting {}", id);
        self.entries.remove(&id);
        true
    }
}
