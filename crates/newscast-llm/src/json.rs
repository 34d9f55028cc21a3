//! Defensive decoding of LLM JSON replies
//!
//! Models wrap JSON in code fences or chat filler often enough that strict
//! parsing would burn retries for nothing. The extractor tolerates fences
//! and leading prose, then hands the candidate to serde.

use serde::de::DeserializeOwned;

use newscast_core::{Error, Result};

/// Parse the first JSON object found in an LLM reply.
pub fn extract_json_object<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let candidate = json_candidate(reply)
        .ok_or_else(|| Error::Parse("reply contains no JSON object".into()))?;
    serde_json::from_str(candidate).map_err(|err| Error::Parse(format!("decode reply: {err}")))
}

/// Slice of `reply` holding the outermost `{...}`, fences stripped.
fn json_candidate(reply: &str) -> Option<&str> {
    let trimmed = reply.trim();
    let body = strip_fence(trimmed).unwrap_or(trimmed);
    let start = body.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in body[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&body[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    // Tolerate a language tag on the fence line.
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.rfind("```").map(|end| rest[..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        answer: String,
    }

    #[test]
    fn parses_bare_json() {
        let reply: Reply = extract_json_object(r#"{"answer": "yes"}"#).unwrap();
        assert_eq!(reply.answer, "yes");
    }

    #[test]
    fn parses_fenced_json() {
        let text = "```json\n{\"answer\": \"yes\"}\n```";
        let reply: Reply = extract_json_object(text).unwrap();
        assert_eq!(reply.answer, "yes");
    }

    #[test]
    fn parses_json_with_leading_prose() {
        let text = "Here is the structure you asked for:\n{\"answer\": \"yes\"} hope it helps";
        let reply: Reply = extract_json_object(text).unwrap();
        assert_eq!(reply.answer, "yes");
    }

    #[test]
    fn nested_braces_and_strings_survive() {
        let text = r#"{"answer": "curly } inside", "nested": {"x": 1}}"#;
        #[derive(Deserialize)]
        struct Wide {
            answer: String,
        }
        let reply: Wide = extract_json_object(text).unwrap();
        assert_eq!(reply.answer, "curly } inside");
    }

    #[test]
    fn rejects_proseless_garbage() {
        assert!(extract_json_object::<Reply>("no structure here").is_err());
    }
}
