//! Google Sheets v4 values API grid.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::domain::value_objects::Column;
use crate::ledger::{CellValue, LedgerError, LedgerGrid};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, Clone)]
pub struct SheetsSettings {
    pub base_url: String,
    pub spreadsheet_id: String,
    pub worksheet: String,
    /// OAuth bearer token, obtained outside this service.
    pub access_token: Option<String>,
    pub timeout_seconds: u64,
}

pub struct SheetsGrid {
    settings: SheetsSettings,
    client: Client,
}

#[derive(Deserialize)]
struct BatchGetResponse {
    #[serde(default, rename = "valueRanges")]
    value_ranges: Vec<ValueRange>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsGrid {
    pub fn new(settings: SheetsSettings) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| LedgerError::Connection(e.to_string()))?;

        Ok(Self { settings, client })
    }

    fn url(&self, tail: &[&str]) -> Result<Url, LedgerError> {
        let mut url = Url::parse(&self.settings.base_url).map_err(|e| LedgerError::Connection(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| LedgerError::Connection(format!("invalid base url {}", self.settings.base_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.settings.spreadsheet_id.as_str()])
            .extend(tail);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.settings.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, LedgerError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| LedgerError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LedgerError::Api { status, message });
        }
        Ok(response)
    }

    /// A1 range on the worksheet; the name is always quoted so tabs like "Order Log" work.
    fn range(&self, reference: &str) -> String {
        format!("'{}'!{}", self.settings.worksheet.replace('\'', "''"), reference)
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl LedgerGrid for SheetsGrid {
    async fn read_columns(&self, columns: &[Column]) -> Result<Vec<Vec<String>>, LedgerError> {
        let mut url = self.url(&["values:batchGet"])?;
        {
            let mut query = url.query_pairs_mut();
            for column in columns {
                query.append_pair("ranges", &self.range(&format!("{0}:{0}", column.letter())));
            }
            query.append_pair("majorDimension", "COLUMNS");
        }
        debug!(columns = columns.len(), "reading ledger columns");

        let body: BatchGetResponse = self
            .send(self.client.get(url))
            .await?
            .json()
            .await
            .map_err(|e| LedgerError::Connection(e.to_string()))?;

        // One value range per requested column; an empty column has no `values`.
        let mut ranges = body.value_ranges.into_iter();
        Ok(columns
            .iter()
            .map(|_| {
                ranges
                    .next()
                    .and_then(|r| r.values.into_iter().next())
                    .map(|cells| cells.iter().map(cell_text).collect())
                    .unwrap_or_default()
            })
            .collect())
    }

    async fn write_cell(&self, row: u32, column: Column, value: &CellValue) -> Result<(), LedgerError> {
        let range = self.range(&column.cell(row));
        let mut url = self.url(&["values", range.as_str()])?;
        url.query_pairs_mut().append_pair("valueInputOption", "USER_ENTERED");

        self.send(self.client.put(url).json(&json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [[value]],
        })))
        .await?;
        Ok(())
    }
}
