//! Route-pattern matching and selection.
//!
//! A pattern is a URL path template with `{name}` placeholders plus an
//! optional `?key=value&...` qualifier suffix. Placeholders match a run of
//! non-`/` characters; qualifiers are checked against the request's query
//! parameters, or against form parameters (`DATA.` prefix) or headers
//! (`HEADER.` prefix). Candidates are scored by template length plus the
//! number of satisfied qualifiers; an exact literal match always outranks a
//! templated one.

use crate::request::RequestView;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

const FORM_SCOPE: &str = "DATA.";
const HEADER_SCOPE: &str = "HEADER.";

/// Matches concrete paths against declared route patterns.
///
/// Templated patterns compile to anchored regexes once and are cached for
/// the lifetime of the matcher; patterns are static per loaded source, so
/// the cache only ever grows by configuration size.
#[derive(Default)]
pub struct PatternMatcher {
    compiled: Mutex<HashMap<String, Option<Arc<Regex>>>>,
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the highest-scoring pattern matching `path`.
    ///
    /// Iteration order breaks ties (first candidate wins), which makes the
    /// caller's source ordering a meaningful precedence signal. Returns
    /// `None` when nothing matches, which the engine reports as "no route".
    pub fn select_best_pattern(
        &self,
        patterns: &[String],
        path: &str,
        request: Option<&RequestView>,
    ) -> Option<String> {
        let mut best_exact: Option<(usize, &str)> = None;
        let mut best_templated: Option<(usize, &str)> = None;

        for raw in patterns {
            let (template, qualifier) = split_qualifier(raw);
            let Some(qualifier_score) = qualifier_score(request, qualifier) else {
                continue;
            };
            let score = template.chars().count() + qualifier_score;

            if template == path {
                if best_exact.is_none_or(|(s, _)| score > s) {
                    best_exact = Some((score, raw));
                }
            } else if best_templated.is_none_or(|(s, _)| score > s)
                && self.template_matches(template, path)
            {
                best_templated = Some((score, raw));
            }
        }

        best_exact.or(best_templated).map(|(_, raw)| raw.to_string())
    }

    fn template_matches(&self, template: &str, path: &str) -> bool {
        if !template.contains('{') {
            // a literal template can only match by equality, checked already
            return false;
        }
        match self.compile(template) {
            Some(regex) => regex.is_match(path),
            None => false,
        }
    }

    fn compile(&self, template: &str) -> Option<Arc<Regex>> {
        let mut cache = self.compiled.lock();
        if let Some(cached) = cache.get(template) {
            return cached.clone();
        }
        let built = build_template_regex(template).map(Arc::new);
        cache.insert(template.to_string(), built.clone());
        built
    }
}

fn split_qualifier(pattern: &str) -> (&str, Option<&str>) {
    match pattern.split_once('?') {
        Some((template, qualifier)) => (template, Some(qualifier)),
        None => (pattern, None),
    }
}

/// Check every qualifier against the request.
///
/// `None` means the pattern is eliminated outright (a mismatched qualifier
/// is a rejection, not a penalty). `Some(n)` is the number of satisfied
/// qualifiers, the pattern's specificity bonus; patterns without
/// qualifiers contribute 0, and qualifiers auto-pass without contributing
/// when no request is in play (spec-document path selection).
fn qualifier_score(request: Option<&RequestView>, qualifier: Option<&str>) -> Option<usize> {
    let qualifier = match qualifier {
        Some(q) if !q.is_empty() => q,
        _ => return Some(0),
    };
    let Some(request) = request else {
        return Some(0);
    };

    let mut score = 0;
    for (key, value) in parse_qualifier_pairs(qualifier) {
        let actual = if let Some(name) = key.strip_prefix(FORM_SCOPE) {
            request.form_first(name)
        } else if let Some(name) = key.strip_prefix(HEADER_SCOPE) {
            request.header(name)
        } else {
            request.query_first(&key)
        };
        if actual == Some(value.as_str()) {
            score += 1;
        } else {
            return None;
        }
    }
    if score == 0 {
        // qualifier text that parses to nothing can never be satisfied
        return None;
    }
    Some(score)
}

/// Parse a `key=value&...` qualifier string the way form decoding does:
/// `+` means space, percent-escapes decode, blank values are dropped, and
/// only the first occurrence of a repeated key counts.
fn parse_qualifier_pairs(qualifier: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for segment in qualifier.split('&') {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let key = decode_component(key);
        if pairs.iter().any(|(k, _)| k == &key) {
            continue;
        }
        pairs.push((key, decode_component(value)));
    }
    pairs
}

fn decode_component(raw: &str) -> String {
    let unplussed = raw.replace('+', " ");
    urlencoding::decode(&unplussed)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(unplussed)
}

/// `{name}` -> `[^/]+`, literal text escaped, anchored at both ends.
/// Unbalanced braces yield no regex: the pattern can then never match.
fn build_template_regex(template: &str) -> Option<Regex> {
    let mut pattern = String::with_capacity(template.len() + 8);
    pattern.push('^');
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let close = rest[open..].find('}')? + open;
        pattern.push_str(&regex::escape(&rest[..open]));
        pattern.push_str("[^/]+");
        rest = &rest[close + 1..];
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');
    Regex::new(&pattern).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(patterns: &[&str], path: &str, request: Option<&RequestView>) -> Option<String> {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        PatternMatcher::new().select_best_pattern(&patterns, path, request)
    }

    #[test]
    fn test_literal_match() {
        assert_eq!(
            select(&["/api/users/"], "/api/users/", None),
            Some("/api/users/".to_string())
        );
        assert_eq!(select(&["/api/users/"], "/api/users/1/", None), None);
    }

    #[test]
    fn test_templated_match_anchored() {
        assert_eq!(
            select(&["/users/{id}/"], "/users/42/", None),
            Some("/users/{id}/".to_string())
        );
        // placeholder never crosses a segment boundary
        assert_eq!(select(&["/users/{id}/"], "/users/42/extra/", None), None);
        assert_eq!(select(&["/users/{id}/"], "/prefix/users/42/", None), None);
    }

    #[test]
    fn test_exact_match_beats_longer_template() {
        let patterns = &["/users/{account_id}/", "/users/42/"];
        assert_eq!(
            select(patterns, "/users/42/", None),
            Some("/users/42/".to_string())
        );
    }

    #[test]
    fn test_longer_template_wins() {
        let patterns = &["/users/{id}/", "/users/{id}/accounts/"];
        assert_eq!(
            select(patterns, "/users/42/accounts/", None),
            Some("/users/{id}/accounts/".to_string())
        );
    }

    #[test]
    fn test_tie_first_wins() {
        let patterns = &["/users/{aa}/", "/users/{bb}/"];
        assert_eq!(
            select(patterns, "/users/42/", None),
            Some("/users/{aa}/".to_string())
        );
    }

    #[test]
    fn test_query_qualifier_matches() {
        let request = RequestView::new("get", "/users/").with_query("kind", "admin");
        assert_eq!(
            select(&["/users/?kind=admin"], "/users/", Some(&request)),
            Some("/users/?kind=admin".to_string())
        );
    }

    #[test]
    fn test_query_qualifier_mismatch_rejects() {
        let request = RequestView::new("get", "/users/").with_query("kind", "guest");
        // a mismatch eliminates the candidate even though the bare pattern
        // would match the path
        assert_eq!(select(&["/users/?kind=admin"], "/users/", Some(&request)), None);
    }

    #[test]
    fn test_qualified_pattern_outranks_bare() {
        let request = RequestView::new("get", "/users/").with_query("kind", "admin");
        let patterns = &["/users/", "/users/?kind=admin"];
        assert_eq!(
            select(patterns, "/users/", Some(&request)),
            Some("/users/?kind=admin".to_string())
        );
    }

    #[test]
    fn test_form_and_header_scopes() {
        let request = RequestView::new("post", "/orders/")
            .with_form("state", "paid")
            .with_header("X-Region", "eu");
        assert_eq!(
            select(
                &["/orders/?DATA.state=paid&HEADER.X-Region=eu"],
                "/orders/",
                Some(&request)
            ),
            Some("/orders/?DATA.state=paid&HEADER.X-Region=eu".to_string())
        );
        assert_eq!(
            select(&["/orders/?DATA.state=open"], "/orders/", Some(&request)),
            None
        );
    }

    #[test]
    fn test_qualifiers_auto_pass_without_request() {
        assert_eq!(
            select(&["/users/?kind=admin"], "/users/", None),
            Some("/users/?kind=admin".to_string())
        );
    }

    #[test]
    fn test_plus_and_percent_decoding() {
        let request = RequestView::new("get", "/search/").with_query("q", "two words");
        assert_eq!(
            select(&["/search/?q=two+words"], "/search/", Some(&request)),
            Some("/search/?q=two+words".to_string())
        );
        assert_eq!(
            select(&["/search/?q=two%20words"], "/search/", Some(&request)),
            Some("/search/?q=two%20words".to_string())
        );
    }

    #[test]
    fn test_unbalanced_braces_never_match() {
        assert_eq!(select(&["/users/{id/"], "/users/42/", None), None);
    }

    #[test]
    fn test_regex_metacharacters_escaped() {
        assert_eq!(select(&["/v1.0/{id}/"], "/v1x0/42/", None), None);
        assert_eq!(
            select(&["/v1.0/{id}/"], "/v1.0/42/", None),
            Some("/v1.0/{id}/".to_string())
        );
    }
}
