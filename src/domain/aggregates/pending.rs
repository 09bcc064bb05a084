//! Pending Order Aggregate
//!
//! A parsed order waiting for the front end's explicit confirm or cancel.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::order::StructuredOrder;
use crate::domain::value_objects::ParseSource;

#[derive(Clone, Debug, Serialize)]
pub struct PendingOrder {
    id: Uuid,
    order: StructuredOrder,
    source: ParseSource,
    status: PendingStatus,
    failed_writes: u32,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus { #[default] AwaitingConfirmation, Writing }

impl PendingOrder {
    pub fn open(order: StructuredOrder, source: ParseSource, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), order, source, status: PendingStatus::AwaitingConfirmation,
            failed_writes: 0, created_at: now, expires_at: now + ttl,
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order(&self) -> &StructuredOrder { &self.order }
    pub fn source(&self) -> ParseSource { self.source }
    pub fn status(&self) -> PendingStatus { self.status }
    pub fn failed_writes(&self) -> u32 { self.failed_writes }
    pub fn expires_at(&self) -> DateTime<Utc> { self.expires_at }

    /// A write that never reported back expires at its own deadline, set by [`Self::begin_write`].
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool { now >= self.expires_at }

    /// Confirmation received; the ledger write is about to start and must finish within `write_window`.
    pub fn begin_write(&mut self, write_window: Duration) -> Result<(), PendingError> {
        if self.status == PendingStatus::Writing { return Err(PendingError::WriteInProgress); }
        if self.order.is_empty() { return Err(PendingError::NoItems); }
        self.status = PendingStatus::Writing;
        self.expires_at = Utc::now() + write_window;
        Ok(())
    }

    /// Ledger write failed; the order stays pending so the write can be retried.
    pub fn write_failed(&mut self, retry_ttl: Duration) {
        self.status = PendingStatus::AwaitingConfirmation;
        self.failed_writes += 1;
        self.expires_at = Utc::now() + retry_ttl;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum PendingError { WriteInProgress, NoItems }
impl std::error::Error for PendingError {}
impl std::fmt::Display for PendingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WriteInProgress => write!(f, "Ledger write already in progress"),
            Self::NoItems => write!(f, "Order has no items"),
        }
    }
}
