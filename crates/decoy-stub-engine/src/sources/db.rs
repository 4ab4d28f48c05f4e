//! Persisted per-environment preset rows.
//!
//! The relational backend lives behind [`PresetStore`]; resolution only
//! needs ordered reads filtered by spec name and environment, and the
//! settings surface needs bulk replacement of one environment's rows.
//! Available as a source layer only when `db_preset_enabled` is set.

use super::SettingsSource;
use anyhow::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One persisted preset; `content` is the raw preset value in any of the
/// legal shapes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PresetRow {
    pub index: i64,
    pub method: String,
    pub pattern: String,
    pub spec_name: String,
    #[serde(default)]
    pub env: String,
    pub content: Value,
}

pub trait PresetStore: Send + Sync {
    /// Rows for one spec+environment, ordered by `index`.
    fn rows(&self, spec_name: &str, env: &str) -> Result<Vec<PresetRow>>;

    /// Replace every row of an environment.
    fn replace_env(&self, env: &str, rows: Vec<PresetRow>) -> Result<()>;
}

/// In-memory implementation for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryPresetStore {
    rows: Mutex<Vec<PresetRow>>,
}

impl InMemoryPresetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresetStore for InMemoryPresetStore {
    fn rows(&self, spec_name: &str, env: &str) -> Result<Vec<PresetRow>> {
        let mut rows: Vec<PresetRow> = self
            .rows
            .lock()
            .iter()
            .filter(|row| row.spec_name == spec_name && row.env == env)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.index);
        Ok(rows)
    }

    fn replace_env(&self, env: &str, rows: Vec<PresetRow>) -> Result<()> {
        let mut all = self.rows.lock();
        all.retain(|row| row.env != env);
        all.extend(rows);
        Ok(())
    }
}

/// The loaded source layer: one spec+environment's rows as a value map.
pub struct DbSource {
    values: Map<String, Value>,
}

impl DbSource {
    pub fn load(store: &dyn PresetStore, spec_name: &str, env: &str) -> Self {
        let mut values = Map::new();
        match store.rows(spec_name, env) {
            Ok(rows) => {
                for row in rows {
                    values.insert(format!("{}#{}", row.method, row.pattern), row.content);
                }
            }
            Err(err) => {
                tracing::warn!(spec_name, env, error = %err, "preset store read failed");
            }
        }
        DbSource { values }
    }
}

impl SettingsSource for DbSource {
    fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(index: i64, method: &str, pattern: &str, spec: &str, env: &str, content: Value) -> PresetRow {
        PresetRow {
            index,
            method: method.to_string(),
            pattern: pattern.to_string(),
            spec_name: spec.to_string(),
            env: env.to_string(),
            content,
        }
    }

    #[test]
    fn test_rows_filtered_and_ordered() {
        let store = InMemoryPresetStore::new();
        store
            .replace_env(
                "",
                vec![
                    row(2, "get", "/b/", "account", "", json!(404)),
                    row(1, "get", "/a/", "account", "", json!(200)),
                    row(1, "get", "/c/", "billing", "", json!(500)),
                ],
            )
            .unwrap();

        let rows = store.rows("account", "").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].pattern, "/a/");
        assert_eq!(rows[1].pattern, "/b/");
    }

    #[test]
    fn test_replace_env_is_scoped() {
        let store = InMemoryPresetStore::new();
        store
            .replace_env("env1", vec![row(0, "get", "/a/", "account", "env1", json!(200))])
            .unwrap();
        store
            .replace_env("env2", vec![row(0, "get", "/a/", "account", "env2", json!(404))])
            .unwrap();

        // replacing env2 leaves env1 untouched
        store
            .replace_env("env2", vec![row(0, "get", "/b/", "account", "env2", json!(500))])
            .unwrap();

        assert_eq!(store.rows("account", "env1").unwrap()[0].content, json!(200));
        let env2 = store.rows("account", "env2").unwrap();
        assert_eq!(env2.len(), 1);
        assert_eq!(env2[0].pattern, "/b/");
    }

    #[test]
    fn test_db_source_values() {
        let store = InMemoryPresetStore::new();
        store
            .replace_env(
                "",
                vec![
                    row(0, "get", "/a/{id}/", "account", "", json!({"200-ok": {"fine": true}})),
                    row(1, "post", "/a/", "account", "", json!("201")),
                ],
            )
            .unwrap();

        let source = DbSource::load(&store, "account", "");
        assert_eq!(source.patterns(), vec!["/a/{id}/", "/a/"]);
        assert_eq!(source.value_for("post#/a/"), Some(&json!("201")));
        assert!(source.value_for("post#/missing/").is_none());
    }
}
