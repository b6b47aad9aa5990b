//! The message bus: two append-only ordered logs per session — Inbox
//! (player/world-facing) and Outbox (inter-service) — serialized per log,
//! not per envelope (spec.md §4.1, §5 "Shared resources").

use std::time::Duration;

use taleforge_domain::ids::CorrelationId;
use taleforge_shared::{MessageEnvelope, MessageStatus, SessionId};
use tokio::sync::Mutex;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Log {
    Inbox,
    Outbox,
}

#[derive(Debug, Default)]
struct BusLog {
    envelopes: Vec<MessageEnvelope>,
}

/// Owns the Inbox/Outbox for exactly one running process (scoped by
/// `session_id`), matching spec.md §4.1/§5: "Session IDs scope all bus
/// traffic so a restart does not replay prior work."
pub struct MessageBus {
    session_id: SessionId,
    inbox: Mutex<BusLog>,
    outbox: Mutex<BusLog>,
    max_lock_retry_attempts: u32,
}

impl MessageBus {
    pub fn new(session_id: SessionId) -> Self {
        Self::with_retry_budget(session_id, 10)
    }

    pub fn with_retry_budget(session_id: SessionId, max_lock_retry_attempts: u32) -> Self {
        Self {
            session_id,
            inbox: Mutex::new(BusLog::default()),
            outbox: Mutex::new(BusLog::default()),
            max_lock_retry_attempts,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    fn log(&self, which: Log) -> &Mutex<BusLog> {
        match which {
            Log::Inbox => &self.inbox,
            Log::Outbox => &self.outbox,
        }
    }

    fn check_session(&self, envelope: &MessageEnvelope) -> EngineResult<()> {
        if envelope.session_id != self.session_id {
            return Err(EngineError::SessionMismatch {
                expected: self.session_id.to_string(),
                actual: envelope.session_id.to_string(),
            });
        }
        Ok(())
    }

    /// Append-only write, serialized per log so concurrent writers never
    /// clobber each other (spec.md §4.1). Envelopes from a previous
    /// session are rejected outright.
    pub async fn append(&self, which: Log, envelope: MessageEnvelope) -> EngineResult<()> {
        self.check_session(&envelope)?;
        let mut guard = self.lock_with_retry(which).await?;
        guard.envelopes.push(envelope);
        Ok(())
    }

    /// A full snapshot of the log in append order. Readers never observe a
    /// partially-written envelope because the lock guards the whole push.
    pub async fn read_all(&self, which: Log) -> Vec<MessageEnvelope> {
        self.log(which).lock().await.envelopes.clone()
    }

    pub async fn read_by_correlation(&self, which: Log, correlation_id: CorrelationId) -> Vec<MessageEnvelope> {
        self.log(which)
            .lock()
            .await
            .envelopes
            .iter()
            .filter(|e| e.belongs_to(correlation_id))
            .cloned()
            .collect()
    }

    /// Only following legal status transitions (spec.md §4.1); anything
    /// else fails with `invalid_transition`.
    pub async fn update_status(&self, which: Log, id: uuid::Uuid, new_status: MessageStatus) -> EngineResult<()> {
        let mut guard = self.lock_with_retry(which).await?;
        let envelope = guard
            .envelopes
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| EngineError::Internal(format!("no envelope with id {id}")))?;
        if !envelope.status.can_transition_to(new_status) {
            return Err(taleforge_domain::DomainError::InvalidTransition(format!(
                "{:?} -> {:?}",
                envelope.status, new_status
            ))
            .into());
        }
        envelope.status = new_status;
        Ok(())
    }

    /// Per-`correlation_id` pruning retaining at least the last `keep_last_n`
    /// envelopes of each stage family (spec.md §4.1, §6: "MUST support
    /// per-correlation_id pruning that retains at least the last 10
    /// envelopes of each family").
    pub async fn prune(&self, which: Log, correlation_id: CorrelationId, keep_last_n: usize) -> EngineResult<()> {
        let mut guard = self.lock_with_retry(which).await?;
        let (mut matching, rest): (Vec<_>, Vec<_>) =
            guard.envelopes.drain(..).partition(|e| e.belongs_to(correlation_id));

        use std::collections::BTreeMap;
        let mut by_family: BTreeMap<String, Vec<MessageEnvelope>> = BTreeMap::new();
        for envelope in matching.drain(..) {
            by_family.entry(envelope.parsed_stage().family.clone()).or_default().push(envelope);
        }
        let mut kept: Vec<MessageEnvelope> = Vec::new();
        for (_, mut envelopes) in by_family {
            let len = envelopes.len();
            let start = len.saturating_sub(keep_last_n);
            kept.extend(envelopes.drain(start..));
        }

        guard.envelopes = rest;
        guard.envelopes.extend(kept);
        Ok(())
    }

    /// Acquire the per-log lock with bounded exponential backoff on
    /// contention (spec.md §7: "Bus contention (lock_timeout) retries with
    /// bounded exponential backoff up to 10 attempts; further contention
    /// surfaces as internal"). Once the retry budget is spent, surfaces
    /// `LockTimeout` rather than blocking — a caller that wants to keep
    /// waiting can retry the whole operation.
    async fn lock_with_retry(&self, which: Log) -> EngineResult<tokio::sync::MutexGuard<'_, BusLog>> {
        let mut delay_ms = 1u64;
        for attempt in 0..self.max_lock_retry_attempts {
            match self.log(which).try_lock() {
                Ok(guard) => return Ok(guard),
                Err(_) if attempt + 1 == self.max_lock_retry_attempts => break,
                Err(_) => {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = (delay_ms * 2).min(64);
                }
            }
        }
        Err(EngineError::LockTimeout { attempts: self.max_lock_retry_attempts })
    }
}
