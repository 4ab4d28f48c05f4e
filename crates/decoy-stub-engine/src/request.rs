//! Transport-agnostic view of an inbound request.
//!
//! The HTTP server framework owns parsing; resolution only needs this
//! flattened view. Query and form parameters are multi-valued, headers and
//! cookies single-valued (last write wins, as most frameworks expose them).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

fn default_scheme() -> String {
    "http".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RequestView {
    pub method: String,
    pub path: String,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default)]
    pub query: HashMap<String, Vec<String>>,
    /// Form/body parameters (`DATA.` scope in query qualifiers).
    #[serde(default)]
    pub form: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    // BTreeMap: cookie iteration order feeds pattern precedence, so it must
    // be deterministic.
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<u8>>,
}

impl RequestView {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        RequestView {
            method: method.into(),
            path: path.into(),
            scheme: default_scheme(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.entry(key.into()).or_default().push(value.into());
        self
    }

    pub fn with_form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.entry(key.into()).or_default().push(value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// First value of a query parameter.
    pub fn query_first(&self, key: &str) -> Option<&str> {
        self.query.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    /// First value of a form parameter.
    pub fn form_first(&self, key: &str) -> Option<&str> {
        self.form.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    /// Header lookup, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}
