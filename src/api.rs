//! HTTP front end: parse, review, then confirm or cancel.

use axum::{extract::{Path, State}, http::StatusCode, routing::{get, post}, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::domain::aggregates::{Catalog, OrderExport, PendingOrder, Product, StructuredOrder};
use crate::domain::events::OrderEvent;
use crate::domain::value_objects::ParseSource;
use crate::interpret::{DeterministicParser, OrderInterpreter};
use crate::ledger::{LedgerGrid, LedgerReconciler, MemoryGrid, SheetsGrid};
use crate::oracle::{AnthropicClient, OracleAdapter};
use crate::publisher::EventPublisher;
use crate::render::{customer_breakdown, order_summary};
use crate::session::{SessionError, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub interpreter: OrderInterpreter,
    pub ledger: Arc<LedgerReconciler>,
    pub sessions: Arc<SessionStore>,
    pub events: EventPublisher,
}

impl AppState {
    /// Wires the service from configuration. Missing oracle or spreadsheet settings
    /// degrade to the keyword parser and an in-memory ledger.
    pub async fn from_config(config: &Config) -> crate::Result<Self> {
        let catalog = Catalog::standard();

        let oracle = match config.oracle_settings() {
            Some(settings) => OracleAdapter::new(Arc::new(AnthropicClient::new(settings)?), catalog),
            None => {
                info!("no oracle credential; keyword parser only");
                OracleAdapter::unconfigured(catalog)
            }
        };

        let grid: Arc<dyn LedgerGrid> = match config.sheets_settings() {
            Some(settings) => Arc::new(SheetsGrid::new(settings)?),
            None => {
                warn!("no spreadsheet configured; confirmed orders are kept in memory");
                Arc::new(MemoryGrid::new())
            }
        };

        Ok(Self {
            catalog,
            interpreter: OrderInterpreter::new(Arc::new(oracle), DeterministicParser::new(catalog)),
            ledger: Arc::new(LedgerReconciler::new(grid, catalog, config.ledger_fallback_row)),
            sessions: Arc::new(SessionStore::new(config.session_ttl())),
            events: EventPublisher::connect(config.nats_url.as_deref()).await,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "preetos-order-intake"})) }))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/orders/parse", post(parse_order))
        .route("/api/v1/orders/:session", get(get_order))
        .route("/api/v1/orders/:session/confirm", post(confirm_order))
        .route("/api/v1/orders/:session/cancel", post(cancel_order))
        .with_state(state)
}

fn session_error(e: SessionError) -> (StatusCode, String) {
    let status = match e {
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::Expired(_) => StatusCode::GONE,
        SessionError::Busy(_) => StatusCode::CONFLICT,
        SessionError::EmptyOrder(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, e.to_string())
}

async fn list_products(State(s): State<AppState>) -> Json<Vec<Product>> { Json(s.catalog.products().to_vec()) }

#[derive(Debug, Deserialize, Validate)]
pub struct ParseRequest {
    #[validate(length(min = 1, max = 4000))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub session_id: Uuid,
    pub source: ParseSource,
    pub fallback_reason: Option<String>,
    pub order: StructuredOrder,
    pub export: OrderExport,
    pub summary: String,
    pub expires_at: DateTime<Utc>,
}

async fn parse_order(State(s): State<AppState>, Json(r): Json<ParseRequest>) -> Result<(StatusCode, Json<ParseResponse>), (StatusCode, String)> {
    r.validate().map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    if r.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message is empty".to_string()));
    }

    let interpretation = s.interpreter.interpret(&r.message).await;
    let pending = s.sessions.open(interpretation.order, interpretation.source).await;
    s.events
        .publish(&OrderEvent::Interpreted {
            session_id: pending.id(),
            source: pending.source(),
            line_count: pending.order().lines().len(),
            total: pending.order().total_amount(),
        })
        .await;

    Ok((StatusCode::CREATED, Json(ParseResponse {
        session_id: pending.id(),
        source: pending.source(),
        fallback_reason: interpretation.fallback_reason,
        export: pending.order().export(),
        summary: order_summary(pending.order()),
        expires_at: pending.expires_at(),
        order: pending.order().clone(),
    })))
}

async fn get_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<PendingOrder>, (StatusCode, String)> {
    s.sessions.get(id).await.map(Json).map_err(session_error)
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub session_id: Uuid,
    pub row: u32,
    pub breakdown: String,
    pub export: OrderExport,
}

async fn confirm_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<ConfirmResponse>, (StatusCode, String)> {
    let pending = s.sessions.begin_confirm(id).await.map_err(session_error)?;

    // Detached so a dropped request still completes or fails the session.
    match tokio::spawn(record(s.clone(), pending)).await {
        Ok(result) => result,
        Err(e) => {
            s.sessions.fail(id).await;
            warn!(session_id = %id, error = %e, "ledger write task aborted; order kept for retry");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Ledger write was interrupted, please confirm again".to_string()))
        }
    }
}

async fn record(s: AppState, pending: PendingOrder) -> Result<Json<ConfirmResponse>, (StatusCode, String)> {
    let id = pending.id();
    let order = pending.order();

    match s.ledger.append(order).await {
        Ok(receipt) => {
            s.sessions.complete(id).await;
            info!(session_id = %id, row = receipt.row, total = order.total_amount(), "order confirmed");
            s.events.publish(&OrderEvent::Confirmed { session_id: id, row: receipt.row, total: order.total_amount() }).await;
            Ok(Json(ConfirmResponse { session_id: id, row: receipt.row, breakdown: customer_breakdown(order), export: order.export() }))
        }
        Err(e) => {
            s.sessions.fail(id).await;
            warn!(session_id = %id, error = %e, "ledger write failed; order kept for retry");
            s.events.publish(&OrderEvent::LedgerWriteFailed { session_id: id, reason: e.to_string() }).await;
            Err((StatusCode::BAD_GATEWAY, format!("Could not record the order, please confirm again: {}", e)))
        }
    }
}

async fn cancel_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, (StatusCode, String)> {
    s.sessions.cancel(id).await.map_err(session_error)?;
    info!(session_id = %id, "order cancelled");
    s.events.publish(&OrderEvent::Cancelled { session_id: id }).await;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Column;
    use crate::ledger::{CellValue, LedgerError};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct OfflineGrid;

    #[async_trait]
    impl LedgerGrid for OfflineGrid {
        async fn read_columns(&self, _columns: &[Column]) -> Result<Vec<Vec<String>>, LedgerError> {
            Err(LedgerError::Connection("connection refused".into()))
        }
        async fn write_cell(&self, _row: u32, _column: Column, _value: &CellValue) -> Result<(), LedgerError> {
            Err(LedgerError::Connection("connection refused".into()))
        }
    }

    /// Memory grid whose writes take a while.
    struct SlowGrid(Arc<MemoryGrid>);

    #[async_trait]
    impl LedgerGrid for SlowGrid {
        async fn read_columns(&self, columns: &[Column]) -> Result<Vec<Vec<String>>, LedgerError> {
            self.0.read_columns(columns).await
        }
        async fn write_cell(&self, row: u32, column: Column, value: &CellValue) -> Result<(), LedgerError> {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            self.0.write_cell(row, column, value).await
        }
    }

    fn state(grid: Arc<dyn LedgerGrid>) -> AppState {
        let catalog = Catalog::standard();
        AppState {
            catalog,
            interpreter: OrderInterpreter::new(Arc::new(OracleAdapter::unconfigured(catalog)), DeterministicParser::new(catalog)),
            ledger: Arc::new(LedgerReconciler::new(grid, catalog, 2)),
            sessions: Arc::new(SessionStore::new(chrono::Duration::minutes(15))),
            events: EventPublisher::default(),
        }
    }

    async fn send(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request.header("content-type", "application/json").body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    #[tokio::test]
    async fn test_health_and_products() {
        let state = state(Arc::new(MemoryGrid::new()));
        let (status, body) = send(&state, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (_, body) = send(&state, "GET", "/api/v1/products", None).await;
        assert_eq!(body.as_array().unwrap().len(), 8);
        assert_eq!(body[0]["code"], "P-CHZ");
    }

    #[tokio::test]
    async fn test_parse_then_confirm() {
        let grid = Arc::new(MemoryGrid::new());
        let state = state(grid.clone());

        let (status, parsed) = send(&state, "POST", "/api/v1/orders/parse", Some(json!({"message": "2 P-CHZ and 1 2L-BBQ, gcash sa QC"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(parsed["source"], "deterministic");
        assert_eq!(parsed["export"]["total_amount"], 590);
        assert_eq!(parsed["export"]["assigned_seller"], "Ferdie");
        assert!(parsed["summary"].as_str().unwrap().contains("Final Total: ₱590"));

        let session = parsed["session_id"].as_str().unwrap().to_string();
        let (status, pending) = send(&state, "GET", &format!("/api/v1/orders/{}", session), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pending["status"], "awaiting_confirmation");

        let (status, confirmed) = send(&state, "POST", &format!("/api/v1/orders/{}/confirm", session), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(confirmed["row"], 1);
        assert!(confirmed["breakdown"].as_str().unwrap().ends_with("Total - ₱590"));
        assert_eq!(grid.get(1, Column::of('N')).await.as_deref(), Some("2"));
        assert_eq!(grid.get(1, Column::of('V')).await.as_deref(), Some("1"));

        let (status, _) = send(&state, "GET", &format!("/api/v1/orders/{}", session), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_ends_session() {
        let grid = Arc::new(MemoryGrid::new());
        let state = state(grid.clone());
        let (_, parsed) = send(&state, "POST", "/api/v1/orders/parse", Some(json!({"message": "isang keso"}))).await;
        let session = parsed["session_id"].as_str().unwrap().to_string();

        let (status, _) = send(&state, "POST", &format!("/api/v1/orders/{}/cancel", session), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&state, "POST", &format!("/api/v1/orders/{}/confirm", session), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(grid.get(1, Column::of('D')).await, None);
    }

    #[tokio::test]
    async fn test_ledger_failure_keeps_session() {
        let state = state(Arc::new(OfflineGrid));
        let (_, parsed) = send(&state, "POST", "/api/v1/orders/parse", Some(json!({"message": "3 P-BBQ"}))).await;
        let session = parsed["session_id"].as_str().unwrap().to_string();

        let (status, body) = send(&state, "POST", &format!("/api/v1/orders/{}/confirm", session), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.as_str().unwrap().contains("connection refused"));

        let (status, pending) = send(&state, "GET", &format!("/api/v1/orders/{}", session), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pending["failed_writes"], 1);
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let state = state(Arc::new(MemoryGrid::new()));
        let (status, _) = send(&state, "POST", "/api/v1/orders/parse", Some(json!({"message": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&state, "POST", "/api/v1/orders/parse", Some(json!({"message": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_order_is_not_recorded() {
        let grid = Arc::new(MemoryGrid::new());
        let state = state(grid.clone());
        let (_, parsed) = send(&state, "POST", "/api/v1/orders/parse", Some(json!({"message": "X-ZZZ 5"}))).await;
        let session = parsed["session_id"].as_str().unwrap().to_string();

        let (status, _) = send(&state, "POST", &format!("/api/v1/orders/{}/confirm", session), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(grid.get(1, Column::of('D')).await, None);
        assert_eq!(grid.get(1, Column::of('H')).await, None);

        let (status, pending) = send(&state, "GET", &format!("/api/v1/orders/{}", session), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pending["status"], "awaiting_confirmation");
    }

    #[tokio::test]
    async fn test_dropped_confirm_still_settles() {
        let memory = Arc::new(MemoryGrid::new());
        let state = state(Arc::new(SlowGrid(memory.clone())));
        let (_, parsed) = send(&state, "POST", "/api/v1/orders/parse", Some(json!({"message": "2 P-CHZ"}))).await;
        let session = parsed["session_id"].as_str().unwrap().to_string();

        let uri = format!("/api/v1/orders/{}/confirm", session);
        let dropped = tokio::time::timeout(std::time::Duration::from_millis(50), send(&state, "POST", &uri, None)).await;
        assert!(dropped.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert_eq!(memory.get(1, Column::of('N')).await.as_deref(), Some("2"));
        let (status, _) = send(&state, "GET", &format!("/api/v1/orders/{}", session), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
