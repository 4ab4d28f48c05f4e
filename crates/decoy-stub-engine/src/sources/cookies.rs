//! Per-request cookie source: preset values and the session prompt.
//!
//! Cookies named `<method>#<pattern>` carry literal preset values for this
//! request only. The `STUBS_PROMPT` cookie seeds the wish-list, taking
//! precedence over the persisted one; it is written through to the prompt
//! store with a short TTL so rotation stays observable across
//! immediately-successive requests of the same session.

use super::{SettingsSource, METHODS};
use crate::prompt::{parse_prompt, PromptStore, COOKIE_PROMPT_TTL};
use crate::request::RequestView;
use serde_json::{Map, Value};

pub const PROMPT_COOKIE: &str = "STUBS_PROMPT";

pub struct CookieSource {
    values: Map<String, Value>,
    prompt: Option<Vec<String>>,
}

impl CookieSource {
    pub fn load(request: &RequestView, env: &str, prompts: &PromptStore) -> Self {
        let mut values = Map::new();
        for (name, value) in &request.cookies {
            let is_preset = METHODS
                .iter()
                .any(|method| name.strip_prefix(method).is_some_and(|r| r.starts_with('#')));
            if is_preset {
                values.insert(name.clone(), Value::String(value.clone()));
            }
        }

        let raw = match request.cookie(PROMPT_COOKIE).filter(|c| !c.is_empty()) {
            Some(cookie) => {
                prompts.set(env, cookie, COOKIE_PROMPT_TTL);
                Some(cookie.to_string())
            }
            None => prompts.get(env),
        };
        let prompt = raw
            .map(|raw| parse_prompt(&raw))
            .filter(|tokens| !tokens.is_empty());

        CookieSource { values, prompt }
    }

    /// Wish-list for this request: the cookie's, or the persisted one.
    pub fn prompt(&self) -> Option<&[String]> {
        self.prompt.as_deref()
    }
}

impl SettingsSource for CookieSource {
    fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}
