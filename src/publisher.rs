//! Domain event fan-out over NATS.

use tracing::{debug, warn};

use crate::domain::events::OrderEvent;

/// Publishes [`OrderEvent`]s when NATS is configured; otherwise events are only logged.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    /// Connects when a URL is given. A failed connection is logged and leaves events log-only.
    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::default() };
        match async_nats::connect(url).await {
            Ok(client) => Self::new(Some(client)),
            Err(e) => {
                warn!(error = %e, url, "NATS connection failed; events will only be logged");
                Self::default()
            }
        }
    }

    pub fn is_connected(&self) -> bool { self.nats.is_some() }

    /// Best effort: publishing never fails the request that produced the event.
    pub async fn publish(&self, event: &OrderEvent) {
        let Some(client) = &self.nats else {
            debug!(subject = event.subject(), ?event, "event (no NATS)");
            return;
        };
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, subject = event.subject(), "event serialization failed");
                return;
            }
        };
        if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
            warn!(error = %e, subject = event.subject(), "event publish failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_log_only_publisher() {
        let publisher = EventPublisher::connect(None).await;
        assert!(!publisher.is_connected());
        publisher.publish(&OrderEvent::Cancelled { session_id: Uuid::nil() }).await;
    }
}
