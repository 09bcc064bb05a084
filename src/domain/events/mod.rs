//! Domain events
use serde::Serialize;
use uuid::Uuid;
use crate::domain::value_objects::ParseSource;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderEvent {
    Interpreted { session_id: Uuid, source: ParseSource, line_count: usize, total: i64 },
    Confirmed { session_id: Uuid, row: u32, total: i64 },
    Cancelled { session_id: Uuid },
    LedgerWriteFailed { session_id: Uuid, reason: String },
}

impl OrderEvent {
    /// NATS subject suffix, e.g. `orders.confirmed`.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Interpreted { .. } => "orders.interpreted",
            Self::Confirmed { .. } => "orders.confirmed",
            Self::Cancelled { .. } => "orders.cancelled",
            Self::LedgerWriteFailed { .. } => "orders.ledger_write_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_shape() {
        let event = OrderEvent::Confirmed { session_id: Uuid::nil(), row: 8, total: 590 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "confirmed");
        assert_eq!(json["row"], 8);
        assert_eq!(event.subject(), "orders.confirmed");
    }
}
