//! In-process grid, used when no spreadsheet is configured and in tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::domain::value_objects::Column;
use crate::ledger::{CellValue, LedgerError, LedgerGrid};

#[derive(Debug, Default)]
pub struct MemoryGrid {
    cells: RwLock<BTreeMap<(Column, u32), String>>,
}

impl MemoryGrid {
    pub fn new() -> Self { Self::default() }

    pub async fn set(&self, row: u32, column: Column, value: impl Into<String>) {
        self.cells.write().await.insert((column, row), value.into());
    }

    pub async fn get(&self, row: u32, column: Column) -> Option<String> {
        self.cells.read().await.get(&(column, row)).cloned()
    }
}

#[async_trait]
impl LedgerGrid for MemoryGrid {
    async fn read_columns(&self, columns: &[Column]) -> Result<Vec<Vec<String>>, LedgerError> {
        let cells = self.cells.read().await;
        Ok(columns
            .iter()
            .map(|&column| {
                let filled: Vec<(u32, &String)> = cells
                    .range((column, 1)..=(column, u32::MAX))
                    .filter(|(_, v)| !v.is_empty())
                    .map(|((_, row), v)| (*row, v))
                    .collect();
                let height = filled.last().map_or(0, |(row, _)| *row as usize);
                let mut values = vec![String::new(); height];
                for (row, v) in filled {
                    values[row as usize - 1] = v.clone();
                }
                values
            })
            .collect())
    }

    async fn write_cell(&self, row: u32, column: Column, value: &CellValue) -> Result<(), LedgerError> {
        self.cells.write().await.insert((column, row), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_columns_are_padded_to_last_value() {
        let grid = MemoryGrid::new();
        let (d, n) = (Column::of('D'), Column::of('N'));
        grid.set(2, d, "Ana").await;
        grid.set(4, d, "Ben").await;
        grid.write_cell(3, n, &CellValue::Number(2)).await.unwrap();

        let cols = grid.read_columns(&[d, n, Column::of('Z')]).await.unwrap();
        assert_eq!(cols[0], vec!["", "Ana", "", "Ben"]);
        assert_eq!(cols[1], vec!["", "", "2"]);
        assert!(cols[2].is_empty());
    }
}
