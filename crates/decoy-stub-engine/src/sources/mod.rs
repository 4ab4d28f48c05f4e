//! Preset source layers.
//!
//! Every configuration source that can answer "what should this
//! `method#pattern` return" is a source layer: the per-request header
//! override, per-request cookies, layered declarative files, and the
//! persisted per-environment row store. They share one read contract;
//! [`crate::aggregate`] fixes their precedence.

mod cookies;
mod db;
mod file;
mod headers;

pub use cookies::{CookieSource, PROMPT_COOKIE};
pub use db::{DbSource, InMemoryPresetStore, PresetRow, PresetStore};
pub use file::{FileCache, FileSource};
pub use headers::{header_override, CONTENT_HEADER, HEADERS_HEADER, STATUS_HEADER};

use serde_json::{Map, Value};

/// Methods recognized in `method#pattern` keys and preset cookie names.
pub const METHODS: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options"];

/// Uniform read contract over one loaded source layer.
pub trait SettingsSource {
    /// Raw `"method#pattern"` -> preset value map, declaration order kept.
    fn values(&self) -> &Map<String, Value>;

    /// Route patterns declared by this source, in declaration order.
    fn patterns(&self) -> Vec<String> {
        self.values()
            .keys()
            .map(|key| key.split('#').next_back().unwrap_or(key).to_string())
            .collect()
    }

    /// Probe for a value under an exact `method#pattern` key.
    fn value_for(&self, key: &str) -> Option<&Value> {
        self.values().get(key)
    }
}
