//! Spreadsheet ledger: grid access and order reconciliation.

pub mod memory;
pub mod reconciler;
pub mod sheets;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::domain::value_objects::Column;

pub use memory::MemoryGrid;
pub use reconciler::{LedgerReconciler, WriteReceipt};
pub use sheets::{SheetsGrid, SheetsSettings};

/// One cell that could not be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellFailure {
    pub column: Column,
    pub reason: String,
}

impl fmt::Display for CellFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}: {}", self.column, self.reason) }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Ledger connection error: {0}")]
    Connection(String),

    #[error("Ledger API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Some or all cells failed; cells already written stay written.
    #[error("Ledger write to row {row} failed for {count} cell(s): {detail}", count = .failed.len(), detail = failure_list(.failed))]
    Write { row: u32, written: Vec<Column>, failed: Vec<CellFailure> },
}

fn failure_list(failed: &[CellFailure]) -> String {
    failed.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(i64),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self { Self::Text(value.into()) }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Text(s) => f.write_str(s), Self::Number(n) => write!(f, "{}", n) }
    }
}

/// Row/column addressed grid. Rows are 1-based.
#[async_trait]
pub trait LedgerGrid: Send + Sync {
    /// Cell text of each requested column, top to bottom starting at row 1.
    /// Trailing blank cells may be omitted, so columns can differ in length.
    async fn read_columns(&self, columns: &[Column]) -> Result<Vec<Vec<String>>, LedgerError>;

    /// Writes a single cell, leaving the rest of the row untouched.
    async fn write_cell(&self, row: u32, column: Column, value: &CellValue) -> Result<(), LedgerError>;
}
