//! Order interpretation: oracle first, keyword parser as the fallback.

pub mod deterministic;
pub mod lexicon;
pub mod modification;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::aggregates::StructuredOrder;
use crate::domain::value_objects::ParseSource;
use crate::oracle::OracleError;

pub use deterministic::DeterministicParser;

/// Something that turns message text into a [`StructuredOrder`].
#[async_trait]
pub trait OrderSource: Send + Sync {
    fn source(&self) -> ParseSource;

    async fn interpret(&self, text: &str) -> Result<StructuredOrder, OracleError>;
}

#[derive(Clone, Debug, Serialize)]
pub struct Interpretation {
    pub order: StructuredOrder,
    pub source: ParseSource,
    /// Why the primary source was not used; `None` when it was.
    pub fallback_reason: Option<String>,
}

/// Fixed-order policy: one oracle attempt, then the keyword parser. No retries.
#[derive(Clone)]
pub struct OrderInterpreter {
    primary: Arc<dyn OrderSource>,
    fallback: DeterministicParser,
}

impl OrderInterpreter {
    pub fn new(primary: Arc<dyn OrderSource>, fallback: DeterministicParser) -> Self { Self { primary, fallback } }

    pub async fn interpret(&self, text: &str) -> Interpretation {
        let reason = match self.primary.interpret(text).await {
            Ok(order) if !order.is_empty() => {
                info!(source = %self.primary.source(), lines = order.lines().len(), "order interpreted");
                return Interpretation { order, source: self.primary.source(), fallback_reason: None };
            }
            Ok(_) => {
                warn!("oracle returned no items; using keyword parser");
                "oracle returned no items".to_string()
            }
            Err(OracleError::Unavailable) => OracleError::Unavailable.to_string(),
            Err(e) => {
                warn!(error = %e, "oracle failed; using keyword parser");
                e.to_string()
            }
        };
        let order = self.fallback.parse(text);
        info!(source = %ParseSource::Deterministic, lines = order.lines().len(), "order interpreted");
        Interpretation { order, source: ParseSource::Deterministic, fallback_reason: Some(reason) }
    }
}
