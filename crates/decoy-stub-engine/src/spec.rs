//! OpenAPI-document-backed example lookup.
//!
//! When a preset names a status without content (or no preset exists at
//! all) the engine asks this provider for the response body: the examples
//! declared under `paths.<pattern>.<method>.responses.<status>` in the
//! service's OpenAPI document.

use crate::matcher::PatternMatcher;
use crate::preset::ExampleRef;
use crate::request::RequestView;
use crate::sources::FileCache;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

const JSON_MEDIA_TYPE: &str = "application/json";

/// Example resolved from a spec document.
#[derive(Debug, Clone)]
pub struct SpecExample {
    pub status: i64,
    pub content: Value,
    pub headers: Map<String, Value>,
}

pub trait ExampleProvider: Send + Sync {
    /// Best-matching declared path for a concrete request path.
    fn find_path(&self, spec_name: &str, path: &str) -> Option<String>;

    /// Resolve an example for `method#pattern`.
    ///
    /// Declared statuses are consulted in ascending order; a requested
    /// status is an exact filter. Example selection: integer index (out of
    /// range wraps to the first non-default example), name (direct
    /// lookup), or the first declared example when unnamed.
    fn example_for(
        &self,
        request: &RequestView,
        spec_name: &str,
        pattern: &str,
        status: Option<i64>,
        example: Option<&ExampleRef>,
    ) -> Option<SpecExample>;
}

/// Provider reading OpenAPI documents from disk through the shared
/// mtime-checked cache.
pub struct OpenApiExampleProvider {
    spec_files: HashMap<String, PathBuf>,
    matcher: Arc<PatternMatcher>,
    cache: Arc<FileCache>,
}

impl OpenApiExampleProvider {
    pub fn new(
        spec_files: HashMap<String, PathBuf>,
        matcher: Arc<PatternMatcher>,
        cache: Arc<FileCache>,
    ) -> Self {
        OpenApiExampleProvider {
            spec_files,
            matcher,
            cache,
        }
    }

    fn document(&self, spec_name: &str) -> Option<Arc<Value>> {
        let path = self.spec_files.get(spec_name)?;
        self.cache.load(path)
    }
}

impl ExampleProvider for OpenApiExampleProvider {
    fn find_path(&self, spec_name: &str, path: &str) -> Option<String> {
        let document = self.document(spec_name)?;
        let paths = document.get("paths")?.as_object()?;
        let patterns: Vec<String> = paths.keys().cloned().collect();
        self.matcher.select_best_pattern(&patterns, path, None)
    }

    fn example_for(
        &self,
        request: &RequestView,
        spec_name: &str,
        pattern: &str,
        status: Option<i64>,
        example: Option<&ExampleRef>,
    ) -> Option<SpecExample> {
        let document = self.document(spec_name)?;
        let method = request.method.to_lowercase();
        let responses =
            dig(&document, &["paths", pattern, method.as_str(), "responses"])?.as_object()?;

        let mut status_keys: Vec<&String> = responses.keys().collect();
        status_keys.sort();

        for status_key in status_keys {
            let Ok(declared) = status_key.parse::<i64>() else {
                continue;
            };
            if status.is_some_and(|wanted| wanted != declared) {
                continue;
            }
            let Some(response) = responses.get(status_key) else {
                continue;
            };
            let Some(examples) = declared_examples(response) else {
                continue;
            };

            let mut headers = Map::new();
            if declared == 202 {
                if let Some(Value::String(location)) =
                    dig(response, &["headers", "Location", "schema", "example"])
                {
                    let location = match request.header("host") {
                        Some(host) => replace_host(location, host, Some(&request.scheme)),
                        None => location.clone(),
                    };
                    headers.insert("Location".to_string(), Value::String(location));
                }
            }

            let content = select_example(&examples, example)
                .and_then(|chosen| chosen.get("value"))
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));

            return Some(SpecExample {
                status: declared,
                content,
                headers,
            });
        }

        None
    }
}

/// The `examples` mapping of the JSON media type, with a single `example`
/// normalized to a one-entry mapping named "default".
fn declared_examples(response: &Value) -> Option<Map<String, Value>> {
    if let Some(examples) = dig(response, &["content", JSON_MEDIA_TYPE, "examples"]) {
        let examples = examples.as_object()?;
        if !examples.is_empty() {
            return Some(examples.clone());
        }
    }
    if let Some(example) = dig(response, &["content", JSON_MEDIA_TYPE, "example"]) {
        let mut wrapper = Map::new();
        wrapper.insert("value".to_string(), example.clone());
        let mut examples = Map::new();
        examples.insert("default".to_string(), Value::Object(wrapper));
        return Some(examples);
    }
    None
}

fn select_example<'a>(
    examples: &'a Map<String, Value>,
    example: Option<&ExampleRef>,
) -> Option<&'a Value> {
    match example {
        Some(ExampleRef::Index(index)) => {
            let keys: Vec<&String> = examples.keys().collect();
            let mut index = if *index < 0 { 0 } else { *index as usize };
            if index >= keys.len() {
                // wrap to the first non-default example
                index = if keys.len() > 1 { 1 } else { 0 };
            }
            keys.get(index).and_then(|key| examples.get(*key))
        }
        // a missing name yields no example value; the caller still serves
        // the status with an empty body
        Some(ExampleRef::Name(name)) => examples.get(name),
        None => examples.values().next(),
    }
}

fn dig<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(value, |acc, key| acc.get(key))
}

/// Swap the authority (and optionally the scheme) of a URL-ish string.
fn replace_host(url: &str, host: &str, scheme: Option<&str>) -> String {
    let url = url.trim();
    let (old_scheme, rest) = match url.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("", url.strip_prefix("//").unwrap_or(url)),
    };
    let path = rest.find('/').map(|i| &rest[i..]).unwrap_or("");
    let scheme = scheme.filter(|s| !s.is_empty()).unwrap_or(old_scheme);
    if scheme.is_empty() {
        format!("//{host}{path}")
    } else {
        format!("{scheme}://{host}{path}")
    }
}
