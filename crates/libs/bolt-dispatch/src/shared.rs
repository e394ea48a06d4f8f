//! Cloneable handle for a [`DispatchQueue`] shared between senders and
//! response handlers.
//!
//! Every operation holds the queue lock for its whole duration, so an enqueue
//! and a racing update for the same id are applied one after the other.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;
use crate::queue::{DispatchQueue, DispatchStatus, QueueEntry};
use crate::MessageId;

/// Shortest period the sweeper ticks at; shorter requests are raised to it.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Clone, Debug, Default)]
pub struct SharedDispatchQueue {
    inner: Arc<Mutex<DispatchQueue>>,
}

impl SharedDispatchQueue {
    pub fn new(queue: DispatchQueue) -> Self {
        Self { inner: Arc::new(Mutex::new(queue)) }
    }

    pub async fn enqueue(&self, id: impl Into<MessageId>) {
        self.inner.lock().await.enqueue(id);
    }

    pub async fn update(
        &self,
        id: &str,
        status: impl Into<DispatchStatus>,
    ) -> Result<(), DispatchError> {
        self.inner.lock().await.update(id, status)
    }

    pub async fn get(&self, id: &str) -> Option<QueueEntry> {
        self.inner.lock().await.get(id).cloned()
    }

    pub async fn status(&self, id: &str) -> Option<DispatchStatus> {
        self.inner.lock().await.status(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> Option<QueueEntry> {
        self.inner.lock().await.remove(id)
    }

    pub async fn evict_expired(&self) -> Vec<MessageId> {
        self.inner.lock().await.evict_expired()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Run `evict_expired` every `interval` until `cancel` fires.
    ///
    /// `interval` is raised to [`MIN_SWEEP_INTERVAL`] if shorter.
    pub fn spawn_sweeper(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let queue = self.clone();
        if interval < MIN_SWEEP_INTERVAL {
            log::warn!(
                "queue: sweep interval {:?} too short, using {:?}",
                interval,
                MIN_SWEEP_INTERVAL
            );
        }
        let interval = interval.max(MIN_SWEEP_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            log::trace!("queue: start sweeper every {:?}", interval);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        break;
                    },
                    _ = ticker.tick() => {
                        queue.evict_expired().await;
                    },
                }
            }

            log::trace!("queue: sweeper stopped");
        })
    }
}

impl From<DispatchQueue> for SharedDispatchQueue {
    fn from(queue: DispatchQueue) -> Self {
        Self::new(queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::RetentionPolicy;

    #[tokio::test]
    async fn shared_handle_sees_updates_from_clones() {
        let queue = SharedDispatchQueue::default();
        let responder = queue.clone();

        queue.enqueue("abc123").await;
        responder.update("abc123", "Completed").await.expect("update");

        assert_eq!(queue.status("abc123").await, Some(DispatchStatus::Completed));
        assert!(responder.update("missing", "Completed").await.is_err());
        assert!(queue.remove("abc123").await.is_some());
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_enqueues_are_all_recorded() {
        let queue = SharedDispatchQueue::default();

        let tasks: Vec<_> = (0..32)
            .map(|n| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    let id = format!("msg-{n}");
                    queue.enqueue(id.clone()).await;
                    queue.update(&id, "Completed").await
                })
            })
            .collect();

        for task in tasks {
            task.await.expect("join").expect("update");
        }

        assert_eq!(queue.len().await, 32);
        assert_eq!(queue.status("msg-7").await, Some(DispatchStatus::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_until_cancelled() {
        let queue = SharedDispatchQueue::new(DispatchQueue::with_retention(RetentionPolicy {
            max_entries: None,
            max_age: Some(Duration::from_secs(30)),
        }));
        queue.enqueue("stale").await;

        let cancel = CancellationToken::new();
        let sweeper = queue.spawn_sweeper(Duration::from_secs(10), cancel.clone());

        time::sleep(Duration::from_secs(45)).await;
        assert!(queue.get("stale").await.is_none());

        cancel.cancel();
        sweeper.await.expect("sweeper join");

        queue.enqueue("late").await;
        time::sleep(Duration::from_secs(120)).await;
        assert!(queue.get("late").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_sweep_interval_is_clamped() {
        let queue = SharedDispatchQueue::new(DispatchQueue::with_retention(RetentionPolicy {
            max_entries: None,
            max_age: Some(Duration::from_secs(1)),
        }));
        queue.enqueue("stale").await;

        let cancel = CancellationToken::new();
        let sweeper = queue.spawn_sweeper(Duration::ZERO, cancel.clone());

        time::sleep(Duration::from_secs(2)).await;
        assert!(queue.is_empty().await);

        cancel.cancel();
        sweeper.await.expect("sweeper should stop cleanly");
    }
}
