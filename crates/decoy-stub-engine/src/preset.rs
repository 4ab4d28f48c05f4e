//! Preset values and their decoding.
//!
//! A preset is the raw, source-declared "what to respond with" for one
//! `method#pattern` key. Sources store them loosely typed; this module
//! normalizes every legal shape into one canonical decode result.

use crate::prompt::PromptSelector;
use serde_json::{Map, Value};
use std::fmt;

/// Reserved key inside a mapping-shaped payload carrying response headers.
pub const HEADERS_KEY: &str = "HEADERS";

/// The closed set of legal preset shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum PresetValue {
    /// Bare status code: `200`.
    Bare(i64),
    /// Status string, optionally carrying an alias, example index, or
    /// inline JSON payload after a dash: `"409"`, `"409-timeout"`,
    /// `"200-2"`, `"200-{\"ok\":true}"`.
    Aliased(String),
    /// Alias key -> payload mapping. Declaration order is meaningful: the
    /// first alias is the default when no prompt steers the choice.
    Named(Map<String, Value>),
}

impl PresetValue {
    /// Classify a raw source value. Anything outside the closed set is
    /// malformed and yields `None`; the caller treats that as "no preset".
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(PresetValue::Bare),
            Value::String(s) => Some(PresetValue::Aliased(s.clone())),
            Value::Object(map) => Some(PresetValue::Named(map.clone())),
            _ => None,
        }
    }

    /// Build the mapping-shaped form; the inverse of [`decode`] for that
    /// shape. Headers embed under the reserved [`HEADERS_KEY`].
    pub fn encode(
        status: i64,
        alias: Option<&str>,
        content: Option<Value>,
        headers: Option<Map<String, Value>>,
    ) -> Self {
        let key = match alias {
            Some(alias) => format!("{status}-{alias}"),
            None => status.to_string(),
        };
        let payload = match (content, headers) {
            (Some(Value::Object(mut obj)), Some(headers)) => {
                obj.insert(HEADERS_KEY.to_string(), Value::Object(headers));
                Value::Object(obj)
            }
            (Some(other), _) => other,
            (None, Some(headers)) => {
                let mut obj = Map::new();
                obj.insert(HEADERS_KEY.to_string(), Value::Object(headers));
                Value::Object(obj)
            }
            (None, None) => Value::Null,
        };
        let mut map = Map::new();
        map.insert(key, payload);
        PresetValue::Named(map)
    }
}

/// How a preset refers to a spec-document example.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum ExampleRef {
    /// Positional index into the declared examples.
    Index(i64),
    /// Example name, looked up directly.
    Name(String),
}

impl fmt::Display for ExampleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExampleRef::Index(i) => write!(f, "{i}"),
            ExampleRef::Name(name) => f.write_str(name),
        }
    }
}

/// Canonical decode result. All fields absent means the preset was
/// malformed or carried nothing; a present status with absent content
/// means "fall through to the spec example provider".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedPreset {
    pub status: Option<i64>,
    pub example: Option<ExampleRef>,
    pub content: Option<Value>,
    pub headers: Option<Map<String, Value>>,
}

/// Decode one preset value, consulting the prompt selector to pick among
/// named aliases. Malformed input never errors; it decodes to the empty
/// result.
pub fn decode(value: &PresetValue, prompt: Option<&mut PromptSelector>) -> DecodedPreset {
    match value {
        PresetValue::Bare(status) => DecodedPreset {
            status: Some(*status),
            ..Default::default()
        },
        PresetValue::Aliased(raw) => decode_aliased(raw),
        PresetValue::Named(map) => decode_named(map, prompt),
    }
}

fn decode_named(map: &Map<String, Value>, prompt: Option<&mut PromptSelector>) -> DecodedPreset {
    let aliases: Vec<String> = map.keys().cloned().collect();
    let chosen = prompt
        .and_then(|selector| selector.use_alias(&aliases))
        .or_else(|| aliases.first().cloned());
    let Some(alias) = chosen else {
        return DecodedPreset::default();
    };

    let tokens: Vec<&str> = alias.split('-').collect();
    let Some(Ok(status)) = tokens.first().map(|t| t.parse::<i64>()) else {
        return DecodedPreset::default();
    };
    let example = if tokens.len() > 1 {
        tokens.last().map(|t| ExampleRef::Name(t.to_string()))
    } else {
        None
    };

    let mut payload = map.get(&alias).cloned().unwrap_or(Value::Null);
    let mut headers = None;
    if let Value::Object(obj) = &mut payload {
        if let Some(Value::Object(popped)) = obj.remove(HEADERS_KEY) {
            headers = Some(popped);
        }
    }
    let content = match payload {
        Value::Null => None,
        other => Some(other),
    };

    DecodedPreset {
        status: Some(status),
        example,
        content,
        headers,
    }
}

fn decode_aliased(raw: &str) -> DecodedPreset {
    if let Ok(status) = raw.parse::<i64>() {
        return DecodedPreset {
            status: Some(status),
            ..Default::default()
        };
    }

    // at most two parts: everything after the first dash is one token, so
    // inline JSON payloads may themselves contain dashes
    let mut tokens = raw.splitn(2, '-');
    let (Some(first), Some(second)) = (tokens.next(), tokens.next()) else {
        return DecodedPreset::default();
    };
    let Ok(status) = first.parse::<i64>() else {
        return DecodedPreset::default();
    };

    if let Ok(index) = second.parse::<i64>() {
        return DecodedPreset {
            status: Some(status),
            example: Some(ExampleRef::Index(index)),
            ..Default::default()
        };
    }

    match serde_json::from_str::<Value>(second) {
        Ok(Value::Object(mut obj)) => {
            let mut headers = None;
            if let Some(Value::Object(popped)) = obj.remove(HEADERS_KEY) {
                headers = Some(popped);
            }
            DecodedPreset {
                status: Some(status),
                example: None,
                content: Some(Value::Object(obj)),
                headers,
            }
        }
        Ok(array @ Value::Array(_)) => DecodedPreset {
            status: Some(status),
            example: None,
            content: Some(array),
            headers: None,
        },
        // scalar JSON or plain text: an example name
        _ => DecodedPreset {
            status: Some(status),
            example: Some(ExampleRef::Name(second.to_string())),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::PromptSelector;
    use serde_json::json;

    fn decode_raw(value: Value) -> DecodedPreset {
        let preset = PresetValue::from_value(&value).expect("legal preset shape");
        decode(&preset, None)
    }

    #[test]
    fn test_decode_bare_status() {
        assert_eq!(
            decode_raw(json!(200)),
            DecodedPreset {
                status: Some(200),
                ..Default::default()
            }
        );
        assert_eq!(
            decode_raw(json!("200")),
            DecodedPreset {
                status: Some(200),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_decode_status_with_example_name() {
        assert_eq!(
            decode_raw(json!("200-key")),
            DecodedPreset {
                status: Some(200),
                example: Some(ExampleRef::Name("key".to_string())),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_decode_status_with_example_index() {
        assert_eq!(
            decode_raw(json!("200-2")),
            DecodedPreset {
                status: Some(200),
                example: Some(ExampleRef::Index(2)),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_decode_extra_dashes_stay_in_example_name() {
        assert_eq!(
            decode_raw(json!("500-server-error")),
            DecodedPreset {
                status: Some(500),
                example: Some(ExampleRef::Name("server-error".to_string())),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_decode_inline_json_payload() {
        let decoded = decode_raw(json!(r#"503-{"error":"down","HEADERS":{"Retry-After":"30"}}"#));
        assert_eq!(decoded.status, Some(503));
        assert_eq!(decoded.example, None);
        assert_eq!(decoded.content, Some(json!({"error": "down"})));
        assert_eq!(
            decoded.headers.map(Value::Object),
            Some(json!({"Retry-After": "30"}))
        );
    }

    #[test]
    fn test_decode_named_numeric_key() {
        assert_eq!(
            decode_raw(json!({"200": {"status": "ok"}})),
            DecodedPreset {
                status: Some(200),
                example: None,
                content: Some(json!({"status": "ok"})),
                headers: None,
            }
        );
    }

    #[test]
    fn test_decode_named_alias_key() {
        assert_eq!(
            decode_raw(json!({"200-full": {"status": "ok"}})),
            DecodedPreset {
                status: Some(200),
                example: Some(ExampleRef::Name("full".to_string())),
                content: Some(json!({"status": "ok"})),
                headers: None,
            }
        );
    }

    #[test]
    fn test_decode_named_defaults_to_first_alias() {
        let decoded = decode_raw(json!({
            "409-timeout": {"error": "timeout"},
            "200-late": {"status": "ok"},
        }));
        assert_eq!(decoded.status, Some(409));
        assert_eq!(decoded.example, Some(ExampleRef::Name("timeout".to_string())));
    }

    #[test]
    fn test_decode_named_with_prompt() {
        let value = json!({
            "200-full": {"status": "ok"},
            "200-empty": {"status": "ok"},
            "200-none": {"status": "ok"},
        });
        let preset = PresetValue::from_value(&value).unwrap();
        let mut prompt = PromptSelector::new(vec!["empty".to_string()], "", None);
        let decoded = decode(&preset, Some(&mut prompt));
        assert_eq!(decoded.status, Some(200));
        assert_eq!(decoded.example, Some(ExampleRef::Name("empty".to_string())));
        assert_eq!(decoded.content, Some(json!({"status": "ok"})));
    }

    #[test]
    fn test_decode_named_pops_headers() {
        let decoded = decode_raw(json!({
            "202-queued": {"job": 7, "HEADERS": {"Location": "/jobs/7"}},
        }));
        assert_eq!(decoded.content, Some(json!({"job": 7})));
        assert_eq!(
            decoded.headers.map(Value::Object),
            Some(json!({"Location": "/jobs/7"}))
        );
    }

    #[test]
    fn test_decode_named_null_payload_has_no_content() {
        let decoded = decode_raw(json!({"204": null}));
        assert_eq!(decoded.status, Some(204));
        assert_eq!(decoded.content, None);
    }

    #[test]
    fn test_malformed_shapes_decode_empty() {
        assert!(PresetValue::from_value(&json!([1, 2])).is_none());
        assert!(PresetValue::from_value(&json!(true)).is_none());
        assert_eq!(decode_raw(json!("oops")), DecodedPreset::default());
        assert_eq!(decode_raw(json!({"weird-alias": {}})), DecodedPreset::default());
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let mut headers = Map::new();
        headers.insert("X-Flag".to_string(), json!("on"));
        let encoded = PresetValue::encode(
            409,
            Some("busy"),
            Some(json!({"error": "busy"})),
            Some(headers.clone()),
        );
        let decoded = decode(&encoded, None);
        assert_eq!(decoded.status, Some(409));
        assert_eq!(decoded.example, Some(ExampleRef::Name("busy".to_string())));
        assert_eq!(decoded.content, Some(json!({"error": "busy"})));
        assert_eq!(decoded.headers, Some(headers));
    }

    #[test]
    fn test_suppression_sentinel_decodes_normally() {
        // the engine interprets 0; the codec just reports it
        assert_eq!(decode_raw(json!(0)).status, Some(0));
        assert_eq!(decode_raw(json!("0")).status, Some(0));
    }
}
