//! The queue capability the session depends on.
//!
//! [`QueueClient`] is shared read-only by every in-flight command, so
//! implementations must be safe to call concurrently.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

use crate::message::RawMessage;

/// Largest batch a single receive may ask for.
pub const MAX_RECEIVE_BATCH: i32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("couldn't receive messages: {0}")]
    Receive(String),
    #[error("couldn't delete messages: {0}")]
    Delete(String),
    #[error("{failed} of {total} messages couldn't be deleted: {details}")]
    PartialDelete {
        failed: usize,
        total: usize,
        details: String,
    },
    #[error("couldn't fetch queue attributes: {0}")]
    Attributes(String),
    #[error("approximate message count {0:?} isn't a number")]
    CountUnparseable(String),
}

#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Receives up to `max_messages` (1..=10). `wait_seconds > 0` long-polls.
    async fn receive(&self, max_messages: i32, wait_seconds: i32)
    -> Result<Vec<RawMessage>, QueueError>;

    /// Deletes messages by receipt handle in one batch.
    async fn delete_batch(&self, receipt_handles: Vec<String>) -> Result<(), QueueError>;

    async fn approximate_count(&self) -> Result<i64, QueueError>;
}

/// A process-local queue with SQS-like receive/delete semantics.
///
/// Received messages move to an in-flight set until deleted by receipt
/// handle. Failures can be injected per operation.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    ready: VecDeque<RawMessage>,
    in_flight: Vec<RawMessage>,
    deleted: Vec<String>,
    receipts_issued: u64,
    receive_failure: Option<String>,
    delete_failure: Option<String>,
    count_failure: Option<String>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages<I, S, B>(messages: I) -> Self
    where
        I: IntoIterator<Item = (S, B)>,
        S: Into<String>,
        B: Into<String>,
    {
        let queue = Self::new();
        for (id, body) in messages {
            queue.push(id, body);
        }
        queue
    }

    pub fn push(&self, id: impl Into<String>, body: impl Into<String>) {
        self.lock().ready.push_back(RawMessage {
            id: Some(id.into()),
            body: Some(body.into()),
            receipt_handle: None,
        });
    }

    pub fn push_raw(&self, message: RawMessage) {
        self.lock().ready.push_back(message);
    }

    pub fn fail_receives_with(&self, reason: impl Into<String>) {
        self.lock().receive_failure = Some(reason.into());
    }

    pub fn fail_deletes_with(&self, reason: impl Into<String>) {
        self.lock().delete_failure = Some(reason.into());
    }

    pub fn fail_counts_with(&self, reason: impl Into<String>) {
        self.lock().count_failure = Some(reason.into());
    }

    /// Receipt handles deleted so far, in deletion order.
    pub fn deleted_receipts(&self) -> Vec<String> {
        self.lock().deleted.clone()
    }

    pub fn in_flight_len(&self) -> usize {
        self.lock().in_flight.len()
    }

    pub fn ready_len(&self) -> usize {
        self.lock().ready.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl QueueClient for InMemoryQueue {
    async fn receive(
        &self,
        max_messages: i32,
        _wait_seconds: i32,
    ) -> Result<Vec<RawMessage>, QueueError> {
        let mut state = self.lock();
        if let Some(reason) = state.receive_failure.clone() {
            return Err(QueueError::Receive(reason));
        }

        let take = usize::try_from(max_messages.clamp(1, MAX_RECEIVE_BATCH)).unwrap_or(1);
        let mut received = Vec::with_capacity(take);
        while received.len() < take {
            let Some(mut message) = state.ready.pop_front() else {
                break;
            };
            state.receipts_issued += 1;
            let receipt = format!(
                "rh-{}-{}",
                message.id.as_deref().unwrap_or("anon"),
                state.receipts_issued
            );
            message.receipt_handle = Some(receipt);
            state.in_flight.push(message.clone());
            received.push(message);
        }
        Ok(received)
    }

    async fn delete_batch(&self, receipt_handles: Vec<String>) -> Result<(), QueueError> {
        let mut state = self.lock();
        if let Some(reason) = state.delete_failure.clone() {
            return Err(QueueError::Delete(reason));
        }

        let total = receipt_handles.len();
        let mut unknown = Vec::new();
        for handle in receipt_handles {
            let position = state
                .in_flight
                .iter()
                .position(|m| m.receipt_handle.as_deref() == Some(handle.as_str()));
            match position {
                Some(idx) => {
                    state.in_flight.remove(idx);
                    state.deleted.push(handle);
                }
                None => unknown.push(handle),
            }
        }

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(QueueError::PartialDelete {
                failed: unknown.len(),
                total,
                details: format!("unknown receipt handles: {}", unknown.join(", ")),
            })
        }
    }

    async fn approximate_count(&self) -> Result<i64, QueueError> {
        let state = self.lock();
        if let Some(reason) = state.count_failure.clone() {
            return Err(QueueError::Attributes(reason));
        }
        Ok(i64::try_from(state.ready.len()).unwrap_or(i64::MAX))
    }
}
