//! Pending-order sessions between parse and confirm/cancel.

use chrono::{Duration, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::domain::aggregates::{PendingError, PendingOrder, StructuredOrder};
use crate::domain::value_objects::ParseSource;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error("Session expired: {0}")]
    Expired(Uuid),

    #[error("Session {0} is already being written to the ledger")]
    Busy(Uuid),

    #[error("Session {0} has no recognized items to record")]
    EmptyOrder(Uuid),
}

/// Each session belongs to exactly one conversation and ends on confirm, cancel or expiry.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, PendingOrder>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self { Self { sessions: Mutex::new(HashMap::new()), ttl } }

    pub async fn open(&self, order: StructuredOrder, source: ParseSource) -> PendingOrder {
        let pending = PendingOrder::open(order, source, self.ttl);
        let mut sessions = self.sessions.lock().await;
        purge(&mut sessions);
        sessions.insert(pending.id(), pending.clone());
        pending
    }

    pub async fn get(&self, id: Uuid) -> Result<PendingOrder, SessionError> {
        let mut sessions = self.sessions.lock().await;
        live(&mut sessions, id).map(|p| p.clone())
    }

    /// Marks the session as writing. A second confirm while the first is in flight is `Busy`;
    /// a write that never reports back expires one TTL later.
    pub async fn begin_confirm(&self, id: Uuid) -> Result<PendingOrder, SessionError> {
        let mut sessions = self.sessions.lock().await;
        let pending = live(&mut sessions, id)?;
        pending.begin_write(self.ttl).map_err(|e| match e {
            PendingError::WriteInProgress => SessionError::Busy(id),
            PendingError::NoItems => SessionError::EmptyOrder(id),
        })?;
        Ok(pending.clone())
    }

    /// Ledger write succeeded: the session ends.
    pub async fn complete(&self, id: Uuid) -> Option<PendingOrder> {
        self.sessions.lock().await.remove(&id)
    }

    /// Ledger write failed: keep the order so the user can confirm again.
    pub async fn fail(&self, id: Uuid) -> Option<PendingOrder> {
        let mut sessions = self.sessions.lock().await;
        let pending = sessions.get_mut(&id)?;
        pending.write_failed(self.ttl);
        Some(pending.clone())
    }

    pub async fn cancel(&self, id: Uuid) -> Result<PendingOrder, SessionError> {
        let mut sessions = self.sessions.lock().await;
        live(&mut sessions, id)?;
        sessions.remove(&id).ok_or(SessionError::NotFound(id))
    }

    pub async fn purge_expired(&self) -> usize { purge(&mut *self.sessions.lock().await) }

    pub async fn len(&self) -> usize { self.sessions.lock().await.len() }
}

fn live(sessions: &mut HashMap<Uuid, PendingOrder>, id: Uuid) -> Result<&mut PendingOrder, SessionError> {
    let expired = sessions.get(&id).ok_or(SessionError::NotFound(id))?.is_expired(Utc::now());
    if expired {
        sessions.remove(&id);
        return Err(SessionError::Expired(id));
    }
    sessions.get_mut(&id).ok_or(SessionError::NotFound(id))
}

fn purge(sessions: &mut HashMap<Uuid, PendingOrder>) -> usize {
    let now = Utc::now();
    let before = sessions.len();
    sessions.retain(|_, p| !p.is_expired(now));
    let purged = before - sessions.len();
    if purged > 0 { debug!(purged, "expired sessions removed"); }
    purged
}
