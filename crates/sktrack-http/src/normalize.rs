//! Turning transport failures and error responses into [`ApiError`].

use reqwest::StatusCode;
use serde_json::Value;

use sktrack_core::error::ApiError;

/// A request that never produced a response.
pub(crate) fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::timeout(format!("request timed out: {}", err)).with_source(err)
    } else {
        ApiError::network(format!("request failed: {}", err)).with_source(err)
    }
}

/// A response with a non-success status.
///
/// The message is the backend `detail`, then `message`, then the status
/// reason. List-valued fields are joined. A body that is not JSON is used
/// as the message when it is short plain text. A JSON body is kept as
/// details and never shown verbatim.
pub(crate) fn status_error(status: StatusCode, body: &[u8]) -> ApiError {
    let json = serde_json::from_slice::<Value>(body).ok();

    let message = match &json {
        Some(v) => json_message(v),
        None => plain_text(body),
    }
    .unwrap_or_else(|| reason(status));

    let err = ApiError::status(status.as_u16(), message);
    match json {
        Some(details) => err.with_details(details),
        None => err,
    }
}

fn json_message(body: &Value) -> Option<String> {
    ["detail", "message"]
        .iter()
        .find_map(|key| body.get(key).and_then(joined))
}

fn joined(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        // Items are plain strings or `{loc, msg, type}` objects.
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().or_else(|| item.get("msg")?.as_str()))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn plain_text(body: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(body).ok()?.trim();
    // HTML error pages are noise in a message.
    if text.is_empty() || text.starts_with('<') || text.len() > 200 {
        return None;
    }
    Some(text.to_string())
}

fn reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
