//! Named sequence configurations backed by SQLite.
//!
//! Configs are stored as JSON so new fields fall back to their defaults
//! when an older preset is loaded.

use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

use crate::sequencer::SequenceConfig;

/// Persistent preset store.
pub struct PresetStore {
    conn: Mutex<Connection>,
}

impl PresetStore {
    /// Open or create the presets table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open preset database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS presets (
                name   TEXT PRIMARY KEY,
                config TEXT NOT NULL
            )",
        )
        .context("failed to create presets table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("preset store lock poisoned"))
    }

    /// Save a preset (upsert). Invalid configs are refused.
    pub fn save(&self, name: &str, config: &SequenceConfig) -> Result<()> {
        config.timings()?;
        let json = serde_json::to_string(config)?;
        self.conn()?.execute(
            "INSERT INTO presets (name, config) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET config = excluded.config",
            [name, json.as_str()],
        )?;
        Ok(())
    }

    /// Load a preset by name.
    pub fn get(&self, name: &str) -> Result<Option<SequenceConfig>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT config FROM presets WHERE name = ?1")?;
        let mut rows = stmt.query([name])?;
        match rows.next()? {
            Some(row) => {
                let json: String = row.get(0)?;
                let config = serde_json::from_str(&json)
                    .with_context(|| format!("preset '{name}' is corrupt"))?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }

    /// All preset names, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM presets ORDER BY name ASC")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Remove a preset.
    pub fn remove(&self, name: &str) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM presets WHERE name = ?1", [name])?;
        Ok(())
    }
}
