//! Best-effort extraction of a JSON object from model output.
//!
//! Models wrap JSON in prose, code fences, or both. [`extract_json`] tries,
//! in order: the whole text, a ```` ```json ```` fence, any fence, and finally
//! a brace-matched object starting at each `{`.

use serde_json::{Map, Value};

pub type JsonObject = Map<String, Value>;

/// Pull the first JSON object out of `text`, if there is one.
pub fn extract_json(text: &str) -> Option<JsonObject> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    parse_object(text)
        .or_else(|| fenced_block(text, Some("json")).and_then(parse_object))
        .or_else(|| fenced_block(text, None).and_then(parse_object))
        .or_else(|| {
            text.char_indices()
                .filter(|(_, c)| *c == '{')
                .find_map(|(start, _)| balanced_object(&text[start..]).and_then(parse_object))
        })
}

fn parse_object(candidate: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Contents of the first fenced block, optionally only one tagged `lang`.
fn fenced_block<'a>(text: &'a str, lang: Option<&str>) -> Option<&'a str> {
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        let line_end = after.find('\n').unwrap_or(after.len());
        let tag = after[..line_end].trim();
        let body_start = (line_end + 1).min(after.len());
        let body = &after[body_start..];
        let close = body.find("```")?;

        let wanted = match lang {
            Some(lang) => tag.eq_ignore_ascii_case(lang),
            None => true,
        };
        if wanted {
            return Some(&body[..close]);
        }
        rest = &body[close + 3..];
    }
    None
}

/// The prefix of `text` (which starts with `{`) up to its matching `}`.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
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
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
