//! Session Manager — per-user conversational state for in-progress feedback.
//!
//! Lifecycle: no entry (idle) → `Collecting` on `initiate` → `Closed` on `close` or expiry.
//! A closed session is always detached from the live table, so any later `checkout` sees
//! `NoOpenSession`.
//!
//! Locking: the table is a `RwLock<HashMap<..>>` held only for lookups and insert/remove;
//! each session sits behind its own `Mutex`, which serializes calls for the same user
//! without blocking anyone else. The table lock is never held across an `.await` on a
//! session mutex.
//!
//! Evaluation has its own per-user lock, held from close (or the retry lookup) through the
//! final write, so at most one evaluate runs per user at a time.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::feedback::FeedbackPayload;
use crate::models::user::RelationInfo;

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("a feedback session is already open for user {0}")]
    AlreadyOpen(Uuid),

    #[error("no open feedback session for user {0}")]
    NoOpenSession(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Collecting,
    Closed,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub user_name: String,
    pub state: SessionState,
    pub relations: Vec<RelationInfo>,
    pub messages: Vec<String>,
    pub opened_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn accumulated_text(&self) -> String {
        self.messages.join("\n")
    }

    pub fn payload(&self) -> FeedbackPayload {
        FeedbackPayload {
            relations: self.relations.clone(),
            messages: self.messages.clone(),
        }
    }

    /// Payload as it will read once `text` is recorded.
    pub fn payload_with(&self, text: &str) -> FeedbackPayload {
        let mut payload = self.payload();
        payload.messages.push(text.to_string());
        payload
    }

    pub fn record(&mut self, text: &str, now: DateTime<Utc>) {
        self.messages.push(text.to_string());
        self.last_activity = now;
    }

    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_activity > ttl
    }
}

/// Exclusive access to one user's session; other users are unaffected while it is held.
pub type SessionGuard = OwnedMutexGuard<Session>;

/// Held for the whole of one user's evaluate.
pub type EvaluationGuard = OwnedMutexGuard<()>;

pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
    evaluating: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            evaluating: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Opens a `Collecting` session seeded with `relations`.
    /// An expired leftover for the same user is replaced silently.
    pub async fn initiate(
        &self,
        user_id: Uuid,
        user_name: &str,
        relations: Vec<RelationInfo>,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;

        if let Some(existing) = sessions.get(&user_id) {
            // A locked session is in active use, which means it is alive.
            let live = match existing.try_lock() {
                Ok(session) => {
                    session.state == SessionState::Collecting
                        && !session.is_expired(now, self.ttl)
                }
                Err(_) => true,
            };
            if live {
                return Err(SessionError::AlreadyOpen(user_id));
            }
            debug!("Replacing expired session for user {user_id}");
        }

        sessions.insert(
            user_id,
            Arc::new(Mutex::new(Session {
                user_id,
                user_name: user_name.to_string(),
                state: SessionState::Collecting,
                relations,
                messages: Vec::new(),
                opened_at: now,
                last_activity: now,
            })),
        );

        info!("Opened feedback session for user {user_id}");
        Ok(())
    }

    /// Locks the live session for one turn. Nothing changes until the caller calls
    /// `Session::record`, so a turn whose draft fails to persist leaves the session as it was.
    pub async fn checkout(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SessionGuard, SessionError> {
        let entry = self.lookup(user_id).await?;
        let mut session = entry.clone().lock_owned().await;

        if session.state != SessionState::Collecting {
            return Err(SessionError::NoOpenSession(user_id));
        }
        if session.is_expired(now, self.ttl) {
            session.state = SessionState::Closed;
            drop(session);
            self.detach(user_id, &entry).await;
            info!("Feedback session for user {user_id} expired");
            return Err(SessionError::NoOpenSession(user_id));
        }

        Ok(session)
    }

    /// Serializes evaluate calls for `user_id`; other users are unaffected.
    pub async fn evaluation_guard(&self, user_id: Uuid) -> EvaluationGuard {
        let lock = self
            .evaluating
            .lock()
            .await
            .entry(user_id)
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Detaches the session and returns its final contents for extraction.
    pub async fn close(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Session, SessionError> {
        let entry = {
            let mut sessions = self.sessions.write().await;
            sessions
                .remove(&user_id)
                .ok_or(SessionError::NoOpenSession(user_id))?
        };

        // Waits for an in-flight turn of this user to finish.
        let mut session = entry.lock().await;
        if session.state != SessionState::Collecting || session.is_expired(now, self.ttl) {
            session.state = SessionState::Closed;
            return Err(SessionError::NoOpenSession(user_id));
        }

        session.state = SessionState::Closed;
        info!(
            "Closed feedback session for user {user_id} ({} message(s), open {}s)",
            session.messages.len(),
            (now - session.opened_at).num_seconds()
        );
        Ok(session.clone())
    }

    /// Drops every expired session that is not currently in use. Returns how many were removed.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| match entry.try_lock() {
            Ok(session) => !session.is_expired(now, self.ttl),
            Err(_) => true,
        });
        let removed = before - sessions.len();
        drop(sessions);

        self.evaluating
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);
        removed
    }

    pub async fn is_open(&self, user_id: Uuid, now: DateTime<Utc>) -> bool {
        let Some(entry) = self.sessions.read().await.get(&user_id).cloned() else {
            return false;
        };
        let session = entry.lock().await;
        session.state == SessionState::Collecting && !session.is_expired(now, self.ttl)
    }

    async fn lookup(&self, user_id: Uuid) -> Result<Arc<Mutex<Session>>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or(SessionError::NoOpenSession(user_id))
    }

    /// Removes `entry` only if it is still the live session for `user_id`.
    async fn detach(&self, user_id: Uuid, entry: &Arc<Mutex<Session>>) {
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(&user_id)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
        {
            sessions.remove(&user_id);
        }
    }
}
