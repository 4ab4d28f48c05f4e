//! Prompt wish-lists: parsing, persistence, and alias rotation.
//!
//! A prompt is an operator-declared, ordered list of alias tokens persisted
//! per environment. During resolution it steers which named alias of a
//! preset is served; when a token is ambiguous between two or more
//! candidate aliases it is consumed, so repeated identical requests walk
//! the declared sequence exactly once each.

use crate::state::StateStore;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const PROMPT_KEY_PREFIX: &str = "PROMPT";

/// How long a persisted wish-list survives without updates.
pub const PROMPT_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 30);

/// TTL for a wish-list written through from a per-request cookie; it only
/// needs to outlive the immediately-following requests of the session.
pub const COOKIE_PROMPT_TTL: Duration = Duration::from_secs(30);

/// Split raw prompt text into tokens: commas stripped, newlines count as
/// spaces, blank tokens dropped.
pub fn parse_prompt(raw: &str) -> Vec<String> {
    raw.replace(',', "")
        .replace('\n', " ")
        .split(' ')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Per-environment wish-list persistence over the injected state store.
///
/// Store failures degrade to "no prompt" on read and are logged on write;
/// prompt handling must never abort a resolution.
#[derive(Clone)]
pub struct PromptStore {
    store: Arc<dyn StateStore>,
}

impl PromptStore {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        PromptStore { store }
    }

    fn key(env: &str) -> String {
        format!("{PROMPT_KEY_PREFIX}{env}")
    }

    pub fn get(&self, env: &str) -> Option<String> {
        match self.store.get(&Self::key(env)) {
            Ok(Some(Value::String(value))) => Some(value),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(env, error = %err, "prompt read failed");
                None
            }
        }
    }

    pub fn set(&self, env: &str, value: &str, ttl: Duration) {
        if let Err(err) = self
            .store
            .set(&Self::key(env), Value::String(value.to_string()), Some(ttl))
        {
            tracing::warn!(env, error = %err, "prompt write failed");
        }
    }

    pub fn delete(&self, env: &str) {
        if let Err(err) = self.store.delete(&Self::key(env)) {
            tracing::warn!(env, error = %err, "prompt delete failed");
        }
    }
}

/// One resolution's view of the wish-list, with the rotation algorithm.
pub struct PromptSelector {
    tokens: Vec<String>,
    env: String,
    store: Option<PromptStore>,
}

impl PromptSelector {
    pub fn new(tokens: Vec<String>, env: impl Into<String>, store: Option<PromptStore>) -> Self {
        PromptSelector {
            tokens,
            env: env.into(),
            store,
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Pick the best candidate alias for the current wish-list.
    ///
    /// A candidate matches when its suffix after the last `-` appears in
    /// the wish-list; among matches, the one whose token sits earliest in
    /// the list wins. With two or more matches the winning token is
    /// consumed (removed and persisted): the ambiguity is what proves the
    /// operator's intent has been served. A single match is free and can
    /// be replayed indefinitely.
    pub fn use_alias(&mut self, candidates: &[String]) -> Option<String> {
        let mut winner: Option<String> = None;
        let mut winner_index = self.tokens.len();
        let mut matched = 0usize;

        for candidate in candidates {
            let Some(alias) = candidate.split('-').next_back() else {
                continue;
            };
            if let Some(index) = self.tokens.iter().position(|token| token == alias) {
                matched += 1;
                if index < winner_index {
                    winner_index = index;
                    winner = Some(candidate.clone());
                }
            }
        }

        if matched > 1 {
            self.tokens.remove(winner_index);
            if let Some(store) = &self.store {
                store.set(&self.env, &self.tokens.join(" "), PROMPT_TTL);
            }
        }

        winner
    }
}
