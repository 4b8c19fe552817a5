//! Recovering JSON from free-form model output.
//!
//! Generation endpoints are asked for "strict JSON" but routinely wrap it in
//! markdown fences or surround it with prose. [`extract_json`] is the single
//! place that interprets model text as JSON; callers never strip fences
//! themselves.

use serde_json::Value;
use thiserror::Error;

const FENCE: &str = "```";

#[derive(Debug, Error)]
pub enum ParseError {
    /// Nothing in the text looked like a JSON document.
    #[error("no JSON found in model output")]
    NoJson,

    /// A JSON-looking region was found but did not parse.
    #[error("invalid JSON in model output: {0}")]
    Invalid(#[source] serde_json::Error),
}

/// Extracts the first JSON document from model output.
///
/// Tried in order:
/// 1. the whole text, trimmed;
/// 2. the body of each markdown code fence (```` ```json ```` or bare ```` ``` ````);
/// 3. each balanced `{…}` / `[…]` region, which also covers unterminated
///    fences and JSON embedded in prose.
///
/// # Errors
///
/// Returns [`ParseError::NoJson`] when no candidate region exists, or
/// [`ParseError::Invalid`] with the last decoder error otherwise.
pub fn extract_json(text: &str) -> Result<Value, ParseError> {
    let mut last_error = None;

    let candidates = std::iter::once(text.trim())
        .chain(fenced_blocks(text))
        .chain(balanced_regions(text));

    for candidate in candidates {
        if candidate.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }
    }

    // The whole-text attempt always runs, so only a region scan tells us
    // whether anything resembled JSON.
    if balanced_regions(text).next().is_none() && fenced_blocks(text).all(str::is_empty) {
        return Err(ParseError::NoJson);
    }
    Err(last_error.map_or(ParseError::NoJson, ParseError::Invalid))
}

/// Yields the trimmed body of every closed code fence, skipping the info
/// string (`json`, `JSON`, …) on the opening line.
fn fenced_blocks(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let open = rest.find(FENCE)?;
        let after_open = &rest[open + FENCE.len()..];
        let body_start = after_open.find('\n').map_or(after_open.len(), |nl| nl + 1);
        let body = &after_open[body_start..];
        let close = body.find(FENCE)?;
        rest = &body[close + FENCE.len()..];
        Some(body[..close].trim())
    })
}

/// Yields every balanced object or array region in order of its opening
/// bracket. String literals are respected so braces inside strings do not
/// affect nesting.
fn balanced_regions(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(|&(_, c)| c == '{' || c == '[')
        .filter_map(move |(start, _)| balanced_end(&text[start..]).map(|end| &text[start..start + end]))
}

fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}
