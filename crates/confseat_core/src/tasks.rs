//! Deferred work descriptors, queue contract and runner.
//!
//! # Responsibility
//! - Describe work that must happen after a write commits.
//! - Offer an in-process FIFO queue for embedding and tests.
//! - Execute recompute descriptors against committed state.
//!
//! # Invariants
//! - Enqueue is fire-and-forget; it never fails the originating operation.
//! - Descriptors are self-contained and serialize to a JSON payload.
//! - Email descriptors are acknowledged only; delivery happens elsewhere.
//! - A descriptor leaves the queue only after it ran successfully.

use crate::cache::CacheStore;
use crate::db::transaction::{retry_on_contention, RetryPolicy};
use crate::model::conference::ConferenceId;
use crate::model::speaker::SpeakerId;
use crate::service::derived_cache::DerivedCacheEngine;
use crate::service::error::CoreResult;
use log::{debug, error, info};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// One unit of deferred work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum TaskDescriptor {
    RecomputeAnnouncement,
    RecomputeFeaturedSpeaker {
        conference_id: ConferenceId,
        speaker_ids: Vec<SpeakerId>,
    },
    SendConfirmationEmail {
        email: String,
        subject: String,
        body: String,
    },
}

impl TaskDescriptor {
    /// Stable name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RecomputeAnnouncement => "recompute_announcement",
            Self::RecomputeFeaturedSpeaker { .. } => "recompute_featured_speaker",
            Self::SendConfirmationEmail { .. } => "send_confirmation_email",
        }
    }

    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// Outbound queue contract.
pub trait TaskQueue {
    fn enqueue(&self, task: TaskDescriptor);
}

impl<Q: TaskQueue + ?Sized> TaskQueue for &Q {
    fn enqueue(&self, task: TaskDescriptor) {
        (**self).enqueue(task);
    }
}

/// Shared in-process FIFO. Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskQueue {
    items: Arc<Mutex<VecDeque<TaskDescriptor>>>,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&self) -> Option<TaskDescriptor> {
        self.lock().pop_front()
    }

    /// Puts a descriptor back at the head so it runs next.
    pub fn requeue_front(&self, task: TaskDescriptor) {
        debug!("event=task_requeue module=tasks status=ok task={}", task.name());
        self.lock().push_front(task);
    }

    /// Removes and returns every pending descriptor in FIFO order.
    pub fn drain(&self) -> Vec<TaskDescriptor> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<TaskDescriptor>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaskQueue for InMemoryTaskQueue {
    fn enqueue(&self, task: TaskDescriptor) {
        debug!("event=task_enqueue module=tasks status=ok task={}", task.name());
        self.lock().push_back(task);
    }
}

/// Result of running one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// A derived value was written to the cache.
    Published(String),
    /// The announcement slot was cleared.
    Cleared,
    /// The job ran but had nothing to publish.
    Skipped,
    /// Email handed off; nothing executed locally.
    Acknowledged,
}

/// Executes descriptors against committed state.
///
/// Store contention is retried per the runner's policy and then reported as
/// `CoreError::TransientStore`.
pub struct TaskRunner<'a, C: CacheStore> {
    conn: &'a Connection,
    engine: &'a DerivedCacheEngine<C>,
    retry: RetryPolicy,
}

impl<'a, C: CacheStore> TaskRunner<'a, C> {
    pub fn new(conn: &'a Connection, engine: &'a DerivedCacheEngine<C>) -> Self {
        Self {
            conn,
            engine,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn run(&self, task: &TaskDescriptor) -> CoreResult<TaskOutcome> {
        let outcome = retry_on_contention(&self.retry, || self.execute(task))?;
        info!(
            "event=task_run module=tasks status=ok task={}",
            task.name()
        );
        Ok(outcome)
    }

    fn execute(&self, task: &TaskDescriptor) -> CoreResult<TaskOutcome> {
        let outcome = match task {
            TaskDescriptor::RecomputeAnnouncement => {
                let text = self.engine.recompute_announcement(self.conn)?;
                if text.is_empty() {
                    TaskOutcome::Cleared
                } else {
                    TaskOutcome::Published(text)
                }
            }
            TaskDescriptor::RecomputeFeaturedSpeaker {
                conference_id,
                speaker_ids,
            } => match self
                .engine
                .recompute_featured_speaker(self.conn, *conference_id, speaker_ids)?
            {
                Some(text) => TaskOutcome::Published(text),
                None => TaskOutcome::Skipped,
            },
            TaskDescriptor::SendConfirmationEmail { .. } => TaskOutcome::Acknowledged,
        };
        Ok(outcome)
    }

    /// Runs queued descriptors until the queue is empty.
    ///
    /// Stops at the first failure and puts the failed descriptor back at the
    /// head of the queue. Returns the number of descriptors that ran.
    pub fn run_pending(&self, queue: &InMemoryTaskQueue) -> CoreResult<usize> {
        let mut completed = 0;
        while let Some(task) = queue.pop() {
            if let Err(err) = self.run(&task) {
                error!(
                    "event=task_run module=tasks status=error task={} error={}",
                    task.name(),
                    err
                );
                queue.requeue_front(task);
                return Err(err);
            }
            completed += 1;
        }
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryTaskQueue, TaskDescriptor, TaskQueue};
    use uuid::Uuid;

    #[test]
    fn descriptor_payload_is_tagged_json() {
        let conference_id = Uuid::new_v4();
        let speaker_id = Uuid::new_v4();
        let task = TaskDescriptor::RecomputeFeaturedSpeaker {
            conference_id,
            speaker_ids: vec![speaker_id],
        };

        let payload = task.to_payload().unwrap();
        assert!(payload.contains("\"task\":\"recompute_featured_speaker\""));
        assert!(payload.contains(&conference_id.to_string()));
        assert_eq!(TaskDescriptor::from_payload(&payload).unwrap(), task);
    }

    #[test]
    fn queue_clones_share_fifo_order() {
        let queue = InMemoryTaskQueue::new();
        let producer = queue.clone();

        producer.enqueue(TaskDescriptor::RecomputeAnnouncement);
        producer.enqueue(TaskDescriptor::SendConfirmationEmail {
            email: "a@example.com".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
        });

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(TaskDescriptor::RecomputeAnnouncement));
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.is_empty());

        producer.enqueue(TaskDescriptor::RecomputeAnnouncement);
        queue.requeue_front(TaskDescriptor::SendConfirmationEmail {
            email: "b@example.com".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
        });
        assert!(matches!(
            queue.pop(),
            Some(TaskDescriptor::SendConfirmationEmail { .. })
        ));
        assert_eq!(queue.pop(), Some(TaskDescriptor::RecomputeAnnouncement));
    }
}
