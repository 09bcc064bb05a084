//! Maps confirmed orders onto ledger rows.

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::aggregates::{Catalog, StructuredOrder};
use crate::domain::value_objects::{Column, Seller};
use crate::ledger::{CellFailure, CellValue, LedgerError, LedgerGrid};

pub const DATE_COLUMN: Column = Column::of('C');
pub const NAME_COLUMN: Column = Column::of('D');
pub const SELLER_COLUMN: Column = Column::of('E');
pub const PAYMENT_METHOD_COLUMN: Column = Column::of('G');
pub const PAYMENT_STATUS_COLUMN: Column = Column::of('H');

pub const DATE_FORMAT: &str = "%m/%d/%Y";
pub const UNPAID: &str = "Unpaid";
pub const UNKNOWN_CUSTOMER: &str = "Unknown";

/// Where an order landed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteReceipt {
    pub row: u32,
    pub cells: Vec<Column>,
}

pub struct LedgerReconciler {
    grid: Arc<dyn LedgerGrid>,
    catalog: Catalog,
    fallback_row: u32,
    append_lock: Mutex<()>,
}

impl LedgerReconciler {
    pub fn new(grid: Arc<dyn LedgerGrid>, catalog: Catalog, fallback_row: u32) -> Self {
        Self { grid, catalog, fallback_row, append_lock: Mutex::new(()) }
    }

    /// One past the last occupied row; the fallback row if the grid cannot be read.
    pub async fn find_next_open_row(&self) -> u32 {
        match self.last_occupied_row().await {
            Ok(last) => last + 1,
            Err(e) => {
                warn!(error = %e, fallback_row = self.fallback_row, "ledger scan failed, using fallback row");
                self.fallback_row
            }
        }
    }

    async fn last_occupied_row(&self) -> Result<u32, LedgerError> {
        let mut columns = vec![NAME_COLUMN];
        columns.extend(self.catalog.ledger_columns());
        let values = self.grid.read_columns(&columns).await?;

        let Some((names, products)) = values.split_first() else { return Ok(0) };
        let height = values.iter().map(Vec::len).max().unwrap_or(0);
        let occupied = |row: usize| {
            let name = names.get(row).is_some_and(|v| !v.trim().is_empty());
            name || products.iter().any(|col| col.get(row).is_some_and(|v| holds_quantity(v)))
        };
        Ok((0..height).rev().find(|&r| occupied(r)).map_or(0, |r| r as u32 + 1))
    }

    /// Cells for one order, in write order.
    pub fn cells_for(&self, order: &StructuredOrder, seller: Option<Seller>, date: NaiveDate) -> Vec<(Column, CellValue)> {
        let mut cells = vec![
            (DATE_COLUMN, CellValue::text(date.format(DATE_FORMAT).to_string())),
            (NAME_COLUMN, CellValue::text(order.customer_name().unwrap_or(UNKNOWN_CUSTOMER))),
            (SELLER_COLUMN, CellValue::text(seller.map_or("", |s| s.name()))),
        ];
        if let Some(method) = order.payment_method() {
            cells.push((PAYMENT_METHOD_COLUMN, CellValue::text(method.label())));
        }
        cells.push((PAYMENT_STATUS_COLUMN, CellValue::text(UNPAID)));

        let mut quantities: Vec<(Column, i64)> = Vec::new();
        for line in order.lines() {
            let column = line.product.ledger_column;
            match quantities.iter_mut().find(|(c, _)| *c == column) {
                Some((_, total)) => *total += i64::from(line.quantity),
                None => quantities.push((column, i64::from(line.quantity))),
            }
        }
        cells.extend(quantities.into_iter().map(|(c, q)| (c, CellValue::Number(q))));
        cells
    }

    pub async fn write_row(&self, row: u32, order: &StructuredOrder, seller: Option<Seller>) -> Result<WriteReceipt, LedgerError> {
        self.write_row_dated(row, order, seller, Local::now().date_naive()).await
    }

    /// Writes cell by cell; anything already written stays written on failure.
    pub async fn write_row_dated(
        &self,
        row: u32,
        order: &StructuredOrder,
        seller: Option<Seller>,
        date: NaiveDate,
    ) -> Result<WriteReceipt, LedgerError> {
        let mut written = Vec::new();
        let mut failed = Vec::new();
        let mut connection_errors = 0;
        let mut first_error = None;

        for (column, value) in self.cells_for(order, seller, date) {
            match self.grid.write_cell(row, column, &value).await {
                Ok(()) => written.push(column),
                Err(e) => {
                    if matches!(e, LedgerError::Connection(_)) { connection_errors += 1; }
                    failed.push(CellFailure { column, reason: e.to_string() });
                    first_error.get_or_insert(e);
                }
            }
        }

        if failed.is_empty() {
            info!(row, cells = written.len(), "ledger row written");
            return Ok(WriteReceipt { row, cells: written });
        }
        warn!(row, written = written.len(), failed = failed.len(), "ledger row write incomplete");
        if written.is_empty() && connection_errors == failed.len() {
            if let Some(e) = first_error { return Err(e); }
        }
        Err(LedgerError::Write { row, written, failed })
    }

    /// Next-open-row lookup and write under one lock, so concurrent confirmations in
    /// this process never pick the same row.
    pub async fn append(&self, order: &StructuredOrder) -> Result<WriteReceipt, LedgerError> {
        let _guard = self.append_lock.lock().await;
        let row = self.find_next_open_row().await;
        self.write_row(row, order, order.assigned_seller()).await
    }
}

fn holds_quantity(cell: &str) -> bool {
    let cell = cell.trim();
    !cell.is_empty() && cell != "0"
}
