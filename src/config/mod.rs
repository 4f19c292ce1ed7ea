//! Persistent defaults for the runner, stored as key-value pairs in SQLite.
//!
//! Command-line flags override whatever is stored here.

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use std::sync::Mutex;
use std::time::Duration;

use crate::runner::{RunnerConfig, Strategy};

pub const KEY_TIMEOUT_MS: &str = "timeout_ms";
pub const KEY_STRATEGY: &str = "strategy";
pub const KEY_ABORT_LOSERS: &str = "abort_losers";

/// Keys `herald config` accepts.
pub const KNOWN_KEYS: &[&str] = &[KEY_TIMEOUT_MS, KEY_STRATEGY, KEY_ABORT_LOSERS];

/// Persistent key-value configuration store.
pub struct Config {
    conn: Mutex<Connection>,
}

impl Config {
    /// Open or create the config table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open config database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create config table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Set a value (upsert). Unknown keys and malformed values are refused.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        validate(key, value)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }

    /// All stored pairs, sorted by key.
    pub fn entries(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT key, value FROM config ORDER BY key ASC")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Stored values layered over [`RunnerConfig::default`].
    pub fn runner_config(&self) -> Result<RunnerConfig> {
        let mut config = RunnerConfig::default();
        if let Some(raw) = self.get(KEY_TIMEOUT_MS)? {
            config.timeout = Duration::from_millis(parse_timeout(&raw)?);
        }
        if let Some(raw) = self.get(KEY_STRATEGY)? {
            config.strategy = parse_strategy(&raw)?;
        }
        if let Some(raw) = self.get(KEY_ABORT_LOSERS)? {
            config.abort_losers = parse_bool(&raw)?;
        }
        Ok(config)
    }
}

fn validate(key: &str, value: &str) -> Result<()> {
    match key {
        KEY_TIMEOUT_MS => parse_timeout(value).map(drop),
        KEY_STRATEGY => parse_strategy(value).map(drop),
        KEY_ABORT_LOSERS => parse_bool(value).map(drop),
        other => bail!(
            "unknown config key: {} (known: {})",
            other,
            KNOWN_KEYS.join(", ")
        ),
    }
}

fn parse_timeout(raw: &str) -> Result<u64> {
    let ms: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid {}: {:?}", KEY_TIMEOUT_MS, raw))?;
    if ms == 0 {
        bail!("invalid {}: must be greater than zero", KEY_TIMEOUT_MS);
    }
    Ok(ms)
}

fn parse_strategy(raw: &str) -> Result<Strategy> {
    raw.parse::<Strategy>()
        .with_context(|| format!("invalid {}: {:?}", KEY_STRATEGY, raw))
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!("invalid {}: {:?} (expected true or false)", KEY_ABORT_LOSERS, raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_config() -> Config {
        Config::open(":memory:").unwrap()
    }

    #[test]
    fn get_returns_none_for_missing_key() {
        let config = mem_config();
        assert!(config.get(KEY_TIMEOUT_MS).unwrap().is_none());
    }

    #[test]
    fn set_and_get() {
        let config = mem_config();
        config.set(KEY_TIMEOUT_MS, "1500").unwrap();
        assert_eq!(config.get(KEY_TIMEOUT_MS).unwrap().unwrap(), "1500");
    }

    #[test]
    fn set_overwrites_existing() {
        let config = mem_config();
        config.set(KEY_STRATEGY, "race").unwrap();
        config.set(KEY_STRATEGY, "any").unwrap();
        assert_eq!(config.get(KEY_STRATEGY).unwrap().unwrap(), "any");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let config = mem_config();
        let err = config.set("model", "sonnet").unwrap_err();
        assert!(err.to_string().contains("unknown config key: model"));
    }

    #[test]
    fn set_rejects_malformed_values() {
        let config = mem_config();
        assert!(config.set(KEY_TIMEOUT_MS, "soon").is_err());
        assert!(config.set(KEY_TIMEOUT_MS, "0").is_err());
        assert!(config.set(KEY_STRATEGY, "fastest").is_err());
        assert!(config.set(KEY_ABORT_LOSERS, "maybe").is_err());
        assert!(config.entries().unwrap().is_empty());
    }

    #[test]
    fn remove_deletes_key() {
        let config = mem_config();
        config.set(KEY_STRATEGY, "all").unwrap();
        config.remove(KEY_STRATEGY).unwrap();
        assert!(config.get(KEY_STRATEGY).unwrap().is_none());
    }

    #[test]
    fn remove_nonexistent_is_ok() {
        let config = mem_config();
        config.remove(KEY_STRATEGY).unwrap();
    }

    #[test]
    fn entries_sorted_by_key() {
        let config = mem_config();
        config.set(KEY_TIMEOUT_MS, "10").unwrap();
        config.set(KEY_ABORT_LOSERS, "true").unwrap();
        let keys: Vec<String> = config.entries().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![KEY_ABORT_LOSERS, KEY_TIMEOUT_MS]);
    }

    #[test]
    fn runner_config_defaults_when_empty() {
        let runner = mem_config().runner_config().unwrap();
        let defaults = RunnerConfig::default();
        assert_eq!(runner.strategy, defaults.strategy);
        assert_eq!(runner.timeout, defaults.timeout);
        assert_eq!(runner.abort_losers, defaults.abort_losers);
    }

    #[test]
    fn runner_config_reads_stored_values() {
        let config = mem_config();
        config.set(KEY_TIMEOUT_MS, "250").unwrap();
        config.set(KEY_STRATEGY, "all-settled").unwrap();
        config.set(KEY_ABORT_LOSERS, "yes").unwrap();

        let runner = config.runner_config().unwrap();
        assert_eq!(runner.timeout, Duration::from_millis(250));
        assert_eq!(runner.strategy, Strategy::AllSettled);
        assert!(runner.abort_losers);
    }

    #[test]
    fn persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config-test.db");
        let path_str = path.to_str().unwrap();

        {
            let config = Config::open(path_str).unwrap();
            config.set(KEY_STRATEGY, "any").unwrap();
        }

        {
            let config = Config::open(path_str).unwrap();
            assert_eq!(config.runner_config().unwrap().strategy, Strategy::Any);
        }
    }
}
