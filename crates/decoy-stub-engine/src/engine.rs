//! Resolution pipeline orchestration.
//!
//! `resolve` is the single public entry point: header override, route
//! matching over the union of OpenAPI paths and source-declared patterns,
//! preset aggregation and decoding, then fall-through to spec-document
//! examples. The return is total: every failure mode degrades to `None`,
//! which the transport renders as its not-found diagnostic.

use crate::aggregate::SourceStack;
use crate::config::EngineConfig;
use crate::matcher::PatternMatcher;
use crate::preset::{self, DecodedPreset, ExampleRef, PresetValue};
use crate::prompt::PromptStore;
use crate::request::RequestView;
use crate::sources::{FileCache, PresetStore};
use crate::spec::{ExampleProvider, OpenApiExampleProvider};
use crate::state::StateStore;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Canonical resolved response handed back to the transport layer.
#[derive(Debug, Clone, Serialize)]
pub struct StubResponse {
    pub status: i64,
    pub content: Value,
    pub headers: Map<String, Value>,
    /// Matched route pattern, for diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Chosen example alias or index, for diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<ExampleRef>,
}

impl StubResponse {
    /// A status-only response: empty object body, no headers.
    pub fn bare(status: i64, pattern: impl Into<String>) -> Self {
        StubResponse {
            status,
            content: Value::Object(Map::new()),
            headers: Map::new(),
            pattern: Some(pattern.into()),
            example: None,
        }
    }
}

pub struct ResolutionEngine {
    config: EngineConfig,
    matcher: Arc<PatternMatcher>,
    file_cache: Arc<FileCache>,
    prompts: PromptStore,
    examples: Arc<dyn ExampleProvider>,
    presets: Option<Arc<dyn PresetStore>>,
}

impl ResolutionEngine {
    /// Build an engine with the bundled OpenAPI example provider reading
    /// the documents named in `config.spec_files`.
    pub fn new(
        config: EngineConfig,
        state: Arc<dyn StateStore>,
        presets: Option<Arc<dyn PresetStore>>,
    ) -> Self {
        let matcher = Arc::new(PatternMatcher::new());
        let file_cache = Arc::new(FileCache::new());
        let examples: Arc<dyn ExampleProvider> = Arc::new(OpenApiExampleProvider::new(
            config.spec_files.clone(),
            matcher.clone(),
            file_cache.clone(),
        ));
        ResolutionEngine {
            config,
            matcher,
            file_cache,
            prompts: PromptStore::new(state),
            examples,
            presets,
        }
    }

    /// Swap the example provider (tests, alternative spec stores).
    pub fn with_example_provider(mut self, examples: Arc<dyn ExampleProvider>) -> Self {
        self.examples = examples;
        self
    }

    pub fn prompt_store(&self) -> &PromptStore {
        &self.prompts
    }

    /// Resolve one request. `explicit` forbids falling through to the spec
    /// example provider when no preset named a status; `env` partitions
    /// every stateful store.
    pub fn resolve(
        &self,
        spec_name: &str,
        request: &RequestView,
        path: &str,
        explicit: bool,
        env: &str,
    ) -> Option<StubResponse> {
        let presets = self
            .presets
            .as_deref()
            .filter(|_| self.config.db_preset_enabled);
        let mut sources = SourceStack::assemble(
            &self.config,
            &self.file_cache,
            &self.prompts,
            presets,
            spec_name,
            request,
            env,
        );

        if let Some(response) = sources.header_response() {
            tracing::info!(service = spec_name, status = response.status, "serving header-override response");
            return Some(response);
        }

        // the OpenAPI-declared path is the canonical pattern identity even
        // when a source-declared pattern also matches
        let pattern = self.examples.find_path(spec_name, path).or_else(|| {
            self.matcher
                .select_best_pattern(&sources.patterns(), path, Some(request))
        });
        let Some(pattern) = pattern else {
            tracing::debug!(service = spec_name, method = %request.method, path, "no route pattern matched");
            return None;
        };

        let raw = sources.preset_for(&request.method, &pattern, path).cloned();
        let mut decoded = DecodedPreset::default();
        if let Some(raw) = raw {
            decoded = match PresetValue::from_value(&raw) {
                Some(value) => preset::decode(&value, sources.prompt_mut()),
                None => {
                    tracing::warn!(service = spec_name, pattern = %pattern, "malformed preset value, ignoring");
                    DecodedPreset::default()
                }
            };

            if decoded.status == Some(0) {
                tracing::info!(service = spec_name, pattern = %pattern, "preset suppressed (status 0)");
                return None;
            }

            if let (Some(status), Some(content)) = (decoded.status, decoded.content.take()) {
                tracing::info!(
                    service = spec_name,
                    method = %request.method,
                    pattern = %pattern,
                    status,
                    example = decoded.example.as_ref().map(tracing::field::display),
                    "serving preset response"
                );
                return Some(StubResponse {
                    status,
                    content,
                    headers: decoded.headers.unwrap_or_default(),
                    pattern: Some(pattern),
                    example: decoded.example,
                });
            }
        }

        if decoded.status.is_none() && explicit {
            tracing::debug!(service = spec_name, pattern = %pattern, "explicit mode and no preset status");
            return None;
        }

        if let Some(example) = self.examples.example_for(
            request,
            spec_name,
            &pattern,
            decoded.status,
            decoded.example.as_ref(),
        ) {
            tracing::info!(
                service = spec_name,
                method = %request.method,
                pattern = %pattern,
                status = example.status,
                "serving spec-document example"
            );
            return Some(StubResponse {
                status: example.status,
                content: example.content,
                headers: example.headers,
                pattern: Some(pattern),
                example: decoded.example,
            });
        }

        let status = decoded.status?;
        tracing::info!(service = spec_name, pattern = %pattern, status, "serving bare preset status");
        Some(StubResponse::bare(status, pattern))
    }
}
