//! File-backed stub source with an mtime-checked parse cache.
//!
//! Stub files are YAML (or JSON by extension) shaped as
//! `service -> { "method#pattern": preset }`, with two reserved top-level
//! keys: a format version marker and `PROMPT`, a global wish-list seed.
//! Keys starting with `_` are commented-out nodes and are stripped.

use super::SettingsSource;
use crate::prompt::parse_prompt;
use anyhow::Context;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

const VERSION_KEY: &str = "decoy";
const PROMPT_KEY: &str = "PROMPT";
const COMMENT_PREFIX: char = '_';
const COMMENT_DEPTH: usize = 3;

/// Shared parse cache keyed by path. Every access stats the file and
/// reuses the cached document while the mtime is unchanged; a cheap check,
/// so edits to live stub files take effect on the next request.
#[derive(Default)]
pub struct FileCache {
    entries: Mutex<HashMap<PathBuf, (SystemTime, Arc<Value>)>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and normalize a document. Missing, unreadable, or unparseable
    /// files degrade to `None` (the source reads as empty).
    pub fn load(&self, path: &Path) -> Option<Arc<Value>> {
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
        {
            let entries = self.entries.lock();
            if let Some((stamp, document)) = entries.get(path) {
                if *stamp == modified {
                    return Some(document.clone());
                }
            }
        }

        let document = match parse_document(path) {
            Ok(document) => Arc::new(document),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to parse stub file");
                return None;
            }
        };
        self.entries
            .lock()
            .insert(path.to_path_buf(), (modified, document.clone()));
        Some(document)
    }
}

fn parse_document(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let mut document = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
    } else {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        yaml_to_json(yaml)
    };
    if let Value::Object(map) = &mut document {
        map.remove(VERSION_KEY);
        strip_comment_nodes(map, 0);
    }
    Ok(document)
}

fn strip_comment_nodes(map: &mut Map<String, Value>, depth: usize) {
    if depth == COMMENT_DEPTH {
        return;
    }
    map.retain(|key, _| !key.starts_with(COMMENT_PREFIX));
    for value in map.values_mut() {
        if let Value::Object(child) = value {
            strip_comment_nodes(child, depth + 1);
        }
    }
}

/// YAML -> JSON with scalar keys stringified, so `200:` and `"200":` name
/// the same alias. Declaration order is preserved.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().map(Value::from).unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => {
            Value::Array(seq.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(scalar_key(&key), yaml_to_json(value));
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn scalar_key(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim_end()
            .to_string(),
    }
}

/// One loaded layer of a layered stub-file configuration.
pub struct FileSource {
    values: Map<String, Value>,
    prompt: Option<Vec<String>>,
}

impl FileSource {
    pub fn load(spec_name: &str, path: &Path, cache: &FileCache) -> Self {
        let mut source = FileSource {
            values: Map::new(),
            prompt: None,
        };
        let Some(document) = cache.load(path) else {
            return source;
        };
        if let Some(Value::String(raw)) = document.get(PROMPT_KEY) {
            let tokens = parse_prompt(raw);
            if !tokens.is_empty() {
                source.prompt = Some(tokens);
            }
        }
        if let Some(Value::Object(values)) = document.get(spec_name) {
            source.values = values.clone();
        }
        source
    }

    /// Global wish-list declared by this file, if any.
    pub fn prompt(&self) -> Option<&[String]> {
        self.prompt.as_deref()
    }
}

impl SettingsSource for FileSource {
    fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}
