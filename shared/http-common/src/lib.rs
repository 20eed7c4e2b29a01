//! Shared HTTP wire types for the URL shortener workspace.
//!
//! Request bodies and error bodies exchanged with browser clients. The link
//! record itself is serialized straight from `domain::Link`.

use serde::Deserialize;

// ============================================================================
// Request Bodies
// ============================================================================

/// Body of `POST /shorten`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShortenRequest {
    #[serde(rename = "fullUrl")]
    pub full_url: String,
}

// ============================================================================
// Error Bodies
// ============================================================================

pub const MSG_SHORTEN_FAILED: &str = "failed to shorten link";
pub const MSG_NOT_FOUND: &str = "link not found";
pub const MSG_RESOLVE_FAILED: &str = "failed to resolve link";
/// Body of `POST /shorten` was not a JSON object with a string `fullUrl`.
pub const MSG_INVALID_BODY: &str = "invalid request body";

/// Create an error JSON body.
///
/// Returns: `{"error": "<message>"}`
pub fn json_err(message: &str) -> serde_json::Value {
    serde_json::json!({ "error": message })
}
