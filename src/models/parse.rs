use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Deserialize the JSON payload of a model reply.
///
/// Models often wrap JSON in a fenced block or surround it with prose; take the
/// fenced body if present, otherwise the outermost object or array.
pub fn extract_json<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let body = fenced_body(reply).unwrap_or_else(|| outermost_json(reply).unwrap_or(reply));
    serde_json::from_str(body.trim())
        .with_context(|| format!("Model reply was not the expected JSON: {}", preview(reply)))
}

fn fenced_body(reply: &str) -> Option<&str> {
    let start = reply.find("```")?;
    let after = &reply[start + 3..];
    // Skip an info string such as `json`
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

fn outermost_json(reply: &str) -> Option<&str> {
    let start = reply.find(['{', '['])?;
    let close = if reply[start..].starts_with('{') { '}' } else { ']' };
    let end = reply.rfind(close)?;
    (end > start).then(|| &reply[start..=end])
}

fn preview(reply: &str) -> String {
    const MAX: usize = 80;
    match reply.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &reply[..idx]),
        None => reply.to_string(),
    }
}
