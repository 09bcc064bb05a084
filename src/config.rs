//! Service configuration from the environment.

use std::str::FromStr;
use validator::Validate;

use crate::ledger::{sheets::DEFAULT_BASE_URL, SheetsSettings};
use crate::oracle::OracleSettings;
use crate::{IntakeError, Result};

pub const DEFAULT_ORACLE_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_ORACLE_MODEL: &str = "claude-3-haiku-20240307";

#[derive(Debug, Clone, Validate)]
pub struct Config {
    #[validate(range(min = 1))]
    pub port: u16,

    pub oracle_api_key: Option<String>,
    #[validate(url)]
    pub oracle_endpoint: String,
    #[validate(length(min = 1))]
    pub oracle_model: String,
    #[validate(range(min = 1, max = 8192))]
    pub oracle_max_tokens: u32,
    #[validate(range(min = 1, max = 600))]
    pub oracle_timeout_seconds: u32,

    pub sheets_spreadsheet_id: Option<String>,
    #[validate(length(min = 1))]
    pub sheets_worksheet: String,
    pub sheets_access_token: Option<String>,
    #[validate(url)]
    pub sheets_base_url: String,
    #[validate(range(min = 1, max = 600))]
    pub sheets_timeout_seconds: u32,
    #[validate(range(min = 1))]
    pub ledger_fallback_row: u32,

    #[validate(range(min = 1, max = 86400))]
    pub session_ttl_seconds: u32,

    pub nats_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> { Self::from_lookup(|key| std::env::var(key).ok()) }

    /// Builds from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = Self {
            port: parsed(&get, "PORT", 8083)?,
            oracle_api_key: get("ANTHROPIC_API_KEY").or_else(|| get("CLAUDE_API_KEY")),
            oracle_endpoint: get("ORACLE_ENDPOINT").unwrap_or_else(|| DEFAULT_ORACLE_ENDPOINT.to_string()),
            oracle_model: get("ORACLE_MODEL").unwrap_or_else(|| DEFAULT_ORACLE_MODEL.to_string()),
            oracle_max_tokens: parsed(&get, "ORACLE_MAX_TOKENS", 1000)?,
            oracle_timeout_seconds: parsed(&get, "ORACLE_TIMEOUT_SECS", 30)?,
            sheets_spreadsheet_id: get("SHEETS_SPREADSHEET_ID"),
            sheets_worksheet: get("SHEETS_WORKSHEET").unwrap_or_else(|| "ORDER".to_string()),
            sheets_access_token: get("SHEETS_ACCESS_TOKEN"),
            sheets_base_url: get("SHEETS_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            sheets_timeout_seconds: parsed(&get, "SHEETS_TIMEOUT_SECS", 30)?,
            ledger_fallback_row: parsed(&get, "LEDGER_FALLBACK_ROW", 2)?,
            session_ttl_seconds: parsed(&get, "SESSION_TTL_SECS", 900)?,
            nats_url: get("NATS_URL"),
        };
        config.validate().map_err(|e| IntakeError::Config(e.to_string()))?;
        Ok(config)
    }

    /// `None` without an API key: the interpreter then goes straight to the keyword parser.
    pub fn oracle_settings(&self) -> Option<OracleSettings> {
        let api_key = self.oracle_api_key.clone()?;
        Some(OracleSettings {
            endpoint: self.oracle_endpoint.clone(),
            api_key,
            model: self.oracle_model.clone(),
            max_tokens: self.oracle_max_tokens,
            timeout_seconds: u64::from(self.oracle_timeout_seconds),
        })
    }

    /// `None` without a spreadsheet id: the service keeps an in-memory ledger.
    pub fn sheets_settings(&self) -> Option<SheetsSettings> {
        let spreadsheet_id = self.sheets_spreadsheet_id.clone()?;
        Some(SheetsSettings {
            base_url: self.sheets_base_url.clone(),
            spreadsheet_id,
            worksheet: self.sheets_worksheet.clone(),
            access_token: self.sheets_access_token.clone(),
            timeout_seconds: u64::from(self.sheets_timeout_seconds),
        })
    }

    pub fn session_ttl(&self) -> chrono::Duration { chrono::Duration::seconds(i64::from(self.session_ttl_seconds)) }
}

fn parsed<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T> {
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| IntakeError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.port, 8083);
        assert_eq!(c.oracle_model, DEFAULT_ORACLE_MODEL);
        assert_eq!(c.oracle_max_tokens, 1000);
        assert_eq!(c.sheets_worksheet, "ORDER");
        assert_eq!(c.ledger_fallback_row, 2);
        assert_eq!(c.session_ttl(), chrono::Duration::minutes(15));
        assert!(c.oracle_settings().is_none());
        assert!(c.sheets_settings().is_none());
    }

    #[test]
    fn test_claude_key_alias_and_sheets() {
        let c = config(&[
            ("CLAUDE_API_KEY", "k-1"),
            ("SHEETS_SPREADSHEET_ID", "abc"),
            ("ANTHROPIC_API_KEY", "  "),
            ("ORACLE_TIMEOUT_SECS", "45"),
            ("SHEETS_TIMEOUT_SECS", "10"),
        ])
        .unwrap();
        let oracle = c.oracle_settings().unwrap();
        assert_eq!(oracle.api_key, "k-1");
        assert_eq!(oracle.timeout_seconds, 45);
        let sheets = c.sheets_settings().unwrap();
        assert_eq!(sheets.spreadsheet_id, "abc");
        assert_eq!(sheets.base_url, DEFAULT_BASE_URL);
        assert_eq!(sheets.timeout_seconds, 10);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(config(&[("PORT", "eighty")]), Err(IntakeError::Config(_))));
        assert!(matches!(config(&[("LEDGER_FALLBACK_ROW", "0")]), Err(IntakeError::Config(_))));
        assert!(matches!(config(&[("ORACLE_ENDPOINT", "not a url")]), Err(IntakeError::Config(_))));
        assert!(matches!(config(&[("SHEETS_TIMEOUT_SECS", "0")]), Err(IntakeError::Config(_))));
    }
}
