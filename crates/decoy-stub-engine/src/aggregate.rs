//! Fixed-precedence aggregation of preset sources.
//!
//! One [`SourceStack`] is assembled per resolution. Precedence is an
//! explicit ordering, not an accident of call sites: the header override
//! short-circuits everything; for values the probe order is persisted
//! rows, cookies, then each file layer (earlier files win). The pattern
//! union for route matching concatenates the same ordering, which is what
//! makes source order a tie-break signal inside the matcher.

use crate::config::EngineConfig;
use crate::engine::StubResponse;
use crate::prompt::{PromptSelector, PromptStore};
use crate::request::RequestView;
use crate::sources::{
    header_override, CookieSource, DbSource, FileCache, FileSource, PresetStore, SettingsSource,
};
use serde_json::Value;

pub struct SourceStack {
    header_response: Option<StubResponse>,
    db: Option<DbSource>,
    cookies: CookieSource,
    files: Vec<FileSource>,
    prompt: Option<PromptSelector>,
}

impl SourceStack {
    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        config: &EngineConfig,
        file_cache: &FileCache,
        prompts: &PromptStore,
        presets: Option<&dyn PresetStore>,
        spec_name: &str,
        request: &RequestView,
        env: &str,
    ) -> Self {
        let files: Vec<FileSource> = config
            .stubs_config
            .iter()
            .map(|path| FileSource::load(spec_name, path, file_cache))
            .collect();

        // first file layer carrying a prompt seeds the selector...
        let mut prompt = files
            .iter()
            .find_map(|file| file.prompt())
            .map(|tokens| PromptSelector::new(tokens.to_vec(), env, Some(prompts.clone())));

        let cookies = CookieSource::load(request, env, prompts);
        // ...but the session prompt (cookie or persisted) always wins
        if let Some(tokens) = cookies.prompt() {
            prompt = Some(PromptSelector::new(
                tokens.to_vec(),
                env,
                Some(prompts.clone()),
            ));
        }

        let db = presets.map(|store| DbSource::load(store, spec_name, env));

        SourceStack {
            header_response: header_override(request),
            db,
            cookies,
            files,
            prompt,
        }
    }

    /// The short-circuit response, when the request carried one.
    pub fn header_response(&self) -> Option<StubResponse> {
        self.header_response.clone()
    }

    /// Union of declared patterns across all layers, in precedence order.
    pub fn patterns(&self) -> Vec<String> {
        let mut patterns = Vec::new();
        if let Some(db) = &self.db {
            patterns.extend(db.patterns());
        }
        patterns.extend(self.cookies.patterns());
        for file in &self.files {
            patterns.extend(file.patterns());
        }
        patterns
    }

    fn layers(&self) -> impl Iterator<Item = &dyn SettingsSource> {
        self.db
            .iter()
            .map(|source| source as &dyn SettingsSource)
            .chain(std::iter::once(&self.cookies as &dyn SettingsSource))
            .chain(self.files.iter().map(|source| source as &dyn SettingsSource))
    }

    /// First layer carrying a value wins outright; within a layer the
    /// concrete `method#path` key beats the matched `method#pattern` key.
    pub fn preset_for(&self, method: &str, pattern: &str, path: &str) -> Option<&Value> {
        let method = method.to_lowercase();
        let by_path = format!("{method}#{path}");
        let by_pattern = format!("{method}#{pattern}");
        for layer in self.layers() {
            if let Some(value) = layer.value_for(&by_path) {
                return Some(value);
            }
            if let Some(value) = layer.value_for(&by_pattern) {
                return Some(value);
            }
        }
        None
    }

    pub fn prompt_mut(&mut self) -> Option<&mut PromptSelector> {
        self.prompt.as_mut()
    }
}
