//! Configuration loading from the process environment.

use std::str::FromStr;

use thiserror::Error;
use uuid::Uuid;

use stockroom_audit::LegacyHistory;
use stockroom_core::AggregateId;
use stockroom_inventory::SameWarehouseMove;

pub const DATABASE_URL: &str = "STOCKROOM_DATABASE_URL";
pub const LEDGER_ID: &str = "STOCKROOM_LEDGER_ID";
pub const LEGACY_HISTORY: &str = "STOCKROOM_LEGACY_HISTORY";
pub const SAME_WAREHOUSE_MOVES: &str = "STOCKROOM_SAME_WAREHOUSE_MOVES";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Runtime settings for one ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockroomConfig {
    /// Postgres connection string; `None` runs on the in-memory store.
    pub database_url: Option<String>,
    /// Stream holding the ledger's events.
    pub ledger_id: AggregateId,
    pub legacy_history: LegacyHistory,
    pub same_warehouse_moves: SameWarehouseMove,
}

impl Default for StockroomConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            ledger_id: AggregateId::from_uuid(Uuid::nil()),
            legacy_history: LegacyHistory::default(),
            same_warehouse_moves: SameWarehouseMove::default(),
        }
    }
}

impl StockroomConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Unset or blank variables keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.database_url = get(DATABASE_URL);
        if let Some(raw) = get(LEDGER_ID) {
            config.ledger_id = parse(LEDGER_ID, &raw)?;
        }
        if let Some(raw) = get(LEGACY_HISTORY) {
            config.legacy_history = parse(LEGACY_HISTORY, &raw)?;
        }
        if let Some(raw) = get(SAME_WAREHOUSE_MOVES) {
            config.same_warehouse_moves = parse(SAME_WAREHOUSE_MOVES, &raw)?;
        }

        Ok(config)
    }
}

fn parse<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = StockroomConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StockroomConfig::default());
        assert_eq!(config.legacy_history, LegacyHistory::MatchSerial);
        assert_eq!(config.same_warehouse_moves, SameWarehouseMove::Record);
    }

    #[test]
    fn reads_every_variable() {
        let id = Uuid::now_v7();
        let config = StockroomConfig::from_lookup(lookup(&[
            (DATABASE_URL, "postgres://localhost/stockroom"),
            (LEDGER_ID, &id.to_string()),
            (LEGACY_HISTORY, "exclude"),
            (SAME_WAREHOUSE_MOVES, "Reject"),
        ]))
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/stockroom"));
        assert_eq!(config.ledger_id, AggregateId::from_uuid(id));
        assert_eq!(config.legacy_history, LegacyHistory::Exclude);
        assert_eq!(config.same_warehouse_moves, SameWarehouseMove::Reject);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = StockroomConfig::from_lookup(lookup(&[(LEDGER_ID, "not-a-uuid")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: LEDGER_ID, .. }));

        let err =
            StockroomConfig::from_lookup(lookup(&[(SAME_WAREHOUSE_MOVES, "sometimes")])).unwrap_err();
        assert!(err.to_string().contains(SAME_WAREHOUSE_MOVES));
    }

    #[test]
    fn blank_database_url_means_in_memory() {
        let config = StockroomConfig::from_lookup(lookup(&[(DATABASE_URL, "  ")])).unwrap();
        assert!(config.database_url.is_none());
    }
}
