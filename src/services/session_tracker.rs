//! Session → thread mapping.
//!
//! Each session owns at most one remote thread at a time. Creation is
//! serialised per session: the outer map lock is held only long enough to
//! fetch the session's slot, and the slot's own lock is held across the
//! remote `create_thread` call, so concurrent first requests for one session
//! create exactly one thread while other sessions proceed in parallel.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Session;
use crate::domain::ports::AgentRuntime;

type Slot = Arc<Mutex<Option<Session>>>;

/// Tracks which remote thread belongs to which session
pub struct SessionTracker {
    runtime: Arc<dyn AgentRuntime>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl SessionTracker {
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self {
            runtime,
            slots: Mutex::new(HashMap::new()),
        }
    }

    async fn slot(&self, session_id: &str) -> Slot {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(session_id.to_string()).or_default())
    }

    async fn create_thread(&self, session_id: &str) -> DomainResult<String> {
        self.runtime.create_thread().await.map_err(|e| {
            warn!(session_id, error = %e, "Thread creation failed");
            DomainError::RemoteUnavailable(format!("could not create thread: {e}"))
        })
    }

    /// Thread for `session_id`, creating one remotely on first use
    ///
    /// # Errors
    /// `DomainError::RemoteUnavailable` when creation fails; nothing is
    /// cached, so the next call tries again
    #[instrument(skip(self), err)]
    pub async fn get_or_create_thread(&self, session_id: &str) -> DomainResult<String> {
        let slot = self.slot(session_id).await;
        let mut session = slot.lock().await;

        if let Some(existing) = session.as_mut() {
            existing.touch();
            return Ok(existing.thread_id.clone());
        }

        match self.create_thread(session_id).await {
            Ok(thread_id) => {
                info!(session_id, thread_id = %thread_id, "Created thread for session");
                *session = Some(Session::new(session_id.to_string(), thread_id.clone()));
                Ok(thread_id)
            }
            Err(e) => {
                drop(session);
                self.release_if_unused(session_id, &slot).await;
                Err(e)
            }
        }
    }

    /// Drop a slot that never got a thread, unless another request is waiting on it
    async fn release_if_unused(&self, session_id: &str, slot: &Slot) {
        let mut slots = self.slots.lock().await;
        // New waiters clone the slot under the map lock, so the count is stable here
        let unused = slots
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
            && Arc::strong_count(slot) == 2
            && slot.try_lock().is_ok_and(|session| session.is_none());
        if unused {
            slots.remove(session_id);
        }
    }

    /// Replace the session's thread with a fresh one
    ///
    /// The old thread is abandoned, not deleted. On failure the session
    /// keeps its previous thread.
    #[instrument(skip(self), err)]
    pub async fn reset_thread(&self, session_id: &str) -> DomainResult<String> {
        let slot = self.slot(session_id).await;
        let mut session = slot.lock().await;

        let thread_id = match self.create_thread(session_id).await {
            Ok(thread_id) => thread_id,
            Err(e) => {
                drop(session);
                self.release_if_unused(session_id, &slot).await;
                return Err(e);
            }
        };
        match session.as_mut() {
            Some(existing) => {
                debug!(
                    session_id,
                    old_thread = %existing.thread_id,
                    new_thread = %thread_id,
                    "Replaced session thread"
                );
                existing.thread_id.clone_from(&thread_id);
                existing.touch();
            }
            None => *session = Some(Session::new(session_id.to_string(), thread_id.clone())),
        }
        Ok(thread_id)
    }

    /// Mark the session as used now; unknown sessions are ignored
    pub async fn touch(&self, session_id: &str) {
        let slot = {
            let slots = self.slots.lock().await;
            slots.get(session_id).cloned()
        };
        if let Some(slot) = slot {
            if let Some(session) = slot.lock().await.as_mut() {
                session.touch();
            }
        }
    }

    /// Snapshot of a session
    pub async fn get(&self, session_id: &str) -> Option<Session> {
        let slot = {
            let slots = self.slots.lock().await;
            slots.get(session_id).cloned()
        }?;
        let session = slot.lock().await;
        session.clone()
    }

    /// All sessions with a thread, most recently used first
    pub async fn list(&self) -> Vec<Session> {
        let slots: Vec<Slot> = self.slots.lock().await.values().cloned().collect();
        let mut sessions = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(session) = slot.lock().await.as_ref() {
                sessions.push(session.clone());
            }
        }
        sessions.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at));
        sessions
    }

    /// Forget a session; returns it when it had a thread
    ///
    /// Waits for a request still using the session to finish first. The
    /// remote thread is left to the caller.
    #[instrument(skip(self))]
    pub async fn remove(&self, session_id: &str) -> Option<Session> {
        let slot = self.slots.lock().await.remove(session_id)?;
        let removed = slot.lock().await.take();
        if let Some(session) = &removed {
            info!(session_id, thread_id = %session.thread_id, "Removed session");
        }
        removed
    }

    /// Number of sessions with a thread
    pub async fn len(&self) -> usize {
        let slots: Vec<Slot> = self.slots.lock().await.values().cloned().collect();
        let mut count = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                count += 1;
            }
        }
        count
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Thread ids of all live sessions
    pub async fn thread_ids(&self) -> Vec<String> {
        let slots: Vec<Slot> = self.slots.lock().await.values().cloned().collect();
        let mut ids = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(session) = slot.lock().await.as_ref() {
                ids.push(session.thread_id.clone());
            }
        }
        ids
    }

    /// Drop sessions idle for longer than `max_idle`, and slots left empty by
    /// failed creations; returns how many sessions were removed
    ///
    /// Slots busy with an in-flight request are skipped.
    pub async fn evict_idle(&self, max_idle: std::time::Duration) -> usize {
        let max_idle = chrono::Duration::from_std(max_idle).unwrap_or(chrono::Duration::MAX);
        let now = Utc::now();
        let mut slots = self.slots.lock().await;
        let before = slots.len();

        slots.retain(|_, slot| match slot.try_lock() {
            Ok(session) => session
                .as_ref()
                .is_some_and(|s| !s.is_idle(max_idle, now)),
            Err(_) => true,
        });

        let evicted = before - slots.len();
        if evicted > 0 {
            info!(evicted, remaining = slots.len(), "Evicted idle sessions");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::RuntimeError;
    use crate::infrastructure::runtime::{InMemoryRuntime, Operation};
    use std::time::Duration;

    fn tracker() -> (Arc<InMemoryRuntime>, SessionTracker) {
        let runtime = Arc::new(InMemoryRuntime::new());
        let tracker = SessionTracker::new(runtime.clone());
        (runtime, tracker)
    }

    #[tokio::test]
    async fn test_thread_is_reused() {
        let (runtime, tracker) = tracker();
        let first = tracker.get_or_create_thread("s1").await.unwrap();
        let second = tracker.get_or_create_thread("s1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(runtime.call_count(Operation::CreateThread).await, 1);
        assert_eq!(tracker.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_get_distinct_threads() {
        let (_, tracker) = tracker();
        let a = tracker.get_or_create_thread("a").await.unwrap();
        let b = tracker.get_or_create_thread("b").await.unwrap();
        assert_ne!(a, b);

        let mut ids = tracker.thread_ids().await;
        ids.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let (runtime, tracker) = tracker();
        runtime
            .fail_next(
                Operation::CreateThread,
                1,
                RuntimeError::Server(503, "busy".to_string()),
            )
            .await;

        let err = tracker.get_or_create_thread("s1").await.unwrap_err();
        assert!(matches!(err, DomainError::RemoteUnavailable(_)));
        assert!(tracker.get("s1").await.is_none());
        assert_eq!(tracker.len().await, 0);
        assert!(tracker.slots.lock().await.is_empty());

        assert!(tracker.get_or_create_thread("s1").await.is_ok());
        assert_eq!(tracker.len().await, 1);
    }

    #[tokio::test]
    async fn test_reset_replaces_thread() {
        let (_, tracker) = tracker();
        let original = tracker.get_or_create_thread("s1").await.unwrap();
        let replaced = tracker.reset_thread("s1").await.unwrap();
        assert_ne!(original, replaced);
        assert_eq!(tracker.get_or_create_thread("s1").await.unwrap(), replaced);
        assert_eq!(tracker.thread_ids().await, vec![replaced]);
    }

    #[tokio::test]
    async fn test_failed_reset_keeps_old_thread() {
        let (runtime, tracker) = tracker();
        let original = tracker.get_or_create_thread("s1").await.unwrap();
        runtime
            .fail_next(Operation::CreateThread, 1, RuntimeError::RateLimited)
            .await;

        assert!(tracker.reset_thread("s1").await.is_err());
        assert_eq!(tracker.get("s1").await.unwrap().thread_id, original);
    }

    #[tokio::test]
    async fn test_failed_creations_leave_no_slots() {
        let (runtime, tracker) = tracker();
        runtime
            .fail_next(
                Operation::CreateThread,
                5,
                RuntimeError::Network("down".to_string()),
            )
            .await;

        for _ in 0..5 {
            let session_id = Session::generate_id();
            assert!(tracker.get_or_create_thread(&session_id).await.is_err());
        }
        assert!(tracker.slots.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_is_most_recent_first() {
        let (_, tracker) = tracker();
        tracker.get_or_create_thread("old").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        tracker.get_or_create_thread("new").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        tracker.touch("old").await;

        let ids: Vec<String> = tracker.list().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["old".to_string(), "new".to_string()]);
    }

    #[tokio::test]
    async fn test_remove_forgets_session() {
        let (_, tracker) = tracker();
        let thread_id = tracker.get_or_create_thread("s1").await.unwrap();

        let removed = tracker.remove("s1").await.unwrap();
        assert_eq!(removed.thread_id, thread_id);
        assert!(tracker.get("s1").await.is_none());
        assert!(tracker.remove("s1").await.is_none());
        assert!(tracker.slots.lock().await.is_empty());

        assert_ne!(tracker.get_or_create_thread("s1").await.unwrap(), thread_id);
    }

    #[tokio::test]
    async fn test_evict_idle() {
        let (_, tracker) = tracker();
        tracker.get_or_create_thread("s1").await.unwrap();

        assert_eq!(tracker.evict_idle(Duration::from_secs(3600)).await, 0);
        assert_eq!(tracker.len().await, 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(tracker.evict_idle(Duration::from_millis(1)).await, 1);
        assert!(tracker.is_empty().await);
    }
}
