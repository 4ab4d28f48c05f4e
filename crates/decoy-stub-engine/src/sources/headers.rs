//! Explicit per-request response override carried in request headers.
//!
//! The highest-precedence source: when all three headers are present and
//! well-formed the engine answers with them immediately, bypassing
//! pattern matching, prompts, and every other source. A malformed part
//! makes the whole override absent, never an error.

use crate::engine::StubResponse;
use crate::request::RequestView;
use serde_json::Value;

pub const STATUS_HEADER: &str = "stub-response-status";
pub const CONTENT_HEADER: &str = "stub-response-content";
pub const HEADERS_HEADER: &str = "stub-response-headers";

pub fn header_override(request: &RequestView) -> Option<StubResponse> {
    let status = request.header(STATUS_HEADER)?.trim().parse::<i64>().ok()?;
    let content: Value = serde_json::from_str(request.header(CONTENT_HEADER)?).ok()?;
    let headers: Value = serde_json::from_str(request.header(HEADERS_HEADER)?).ok()?;
    let Value::Object(headers) = headers else {
        return None;
    };

    Some(StubResponse {
        status,
        content,
        headers,
        pattern: None,
        example: None,
    })
}
