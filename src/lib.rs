//! Preetos Order Intake
//!
//! Turns free-form Taglish chat orders for chickpea chips into structured orders and
//! records confirmed orders in a spreadsheet ledger.
//!
//! ## Features
//! - Oracle-first interpretation with a keyword parser fallback
//! - Filipino number words, flavor aliases and size cues
//! - Chronological add/remove/replace corrections
//! - Shipping fee and discount extraction
//! - Cell-by-cell ledger writes that never clobber other columns
//! - Confirm/cancel sessions over HTTP

pub mod api;
pub mod config;
pub mod domain;
pub mod interpret;
pub mod ledger;
pub mod oracle;
pub mod publisher;
pub mod render;
pub mod session;

use thiserror::Error;

pub use config::Config;
pub use domain::aggregates::{Catalog, OrderExport, Product, StructuredOrder};
pub use interpret::{Interpretation, OrderInterpreter};
pub use ledger::{LedgerError, LedgerReconciler};
pub use oracle::OracleError;
pub use session::{SessionError, SessionStore};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub type Result<T> = std::result::Result<T, IntakeError>;
