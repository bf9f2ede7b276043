//! Prompts for note analysis and connection suggestions, and best-effort
//! parsing of the replies.
//!
//! Models wrap JSON in code fences, add prose around it, and invent fields.
//! The parsers accept the first balanced JSON value they can find and keep
//! only well-typed entries.

use serde::Serialize;
use serde_json::Value;

use super::GenerativeAi;
use crate::brain::connections::clamp_strength;
use crate::brain::normalize_tags;
use crate::error::{Error, Result};

/// Note text beyond this is cut before prompting.
const MAX_PROMPT_CHARS: usize = 8_000;
const MAX_CONCEPTS: usize = 8;
const MAX_TAGS: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Concepts {
    pub key_concepts: Vec<String>,
    pub tags: Vec<String>,
}

impl Concepts {
    pub fn is_empty(&self) -> bool {
        self.key_concepts.is_empty() && self.tags.is_empty()
    }
}

/// A note offered to the model as a possible connection target.
#[derive(Debug, Clone)]
pub struct ConnectionCandidate {
    pub id: String,
    pub title: String,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedConnection {
    pub target_id: String,
    pub relationship: String,
    pub strength: f64,
    pub reason: Option<String>,
}

fn clip(text: &str) -> &str {
    match text.char_indices().nth(MAX_PROMPT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn summary_prompt(title: &str, body: &str) -> String {
    format!(
        "Summarize the following note in two or three sentences. \
         Reply with the summary only, no preamble.\n\n\
         Title: {title}\n\n{}",
        clip(body)
    )
}

pub fn concepts_prompt(title: &str, body: &str) -> String {
    format!(
        "Extract the key concepts and a few topical tags from this note.\n\
         Reply with JSON only, shaped as {{\"key_concepts\": [string], \"tags\": [string]}}. \
         Use at most {MAX_CONCEPTS} concepts and {MAX_TAGS} short lower-case tags.\n\n\
         Title: {title}\n\n{}",
        clip(body)
    )
}

pub fn connections_prompt(title: &str, body: &str, candidates: &[ConnectionCandidate]) -> String {
    let mut listing = String::new();
    for c in candidates {
        listing.push_str(&format!("- id: {}\n  title: {}\n  excerpt: {}\n", c.id, c.title, c.preview));
    }
    format!(
        "You link related notes in a personal knowledge base.\n\
         Source note:\nTitle: {title}\n{}\n\n\
         Candidate notes:\n{listing}\n\
         For each candidate that is meaningfully related to the source note, describe the link.\n\
         Reply with a JSON array only; each element is \
         {{\"target_id\": string, \"relationship\": string, \"strength\": number between 0 and 1, \"reason\": string}}. \
         Use short relationship labels such as \"related\", \"builds_on\", \"contradicts\", \"example_of\". \
         Reply with [] if nothing is related.",
        clip(body)
    )
}

/// Remove a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// The first balanced JSON object or array in `text`, parsed.
pub fn extract_json(text: &str) -> Option<Value> {
    let text = strip_code_fences(text);
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }

    let start = text.find(['{', '['])?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return serde_json::from_str(&text[start..=start + offset]).ok();
                }
            }
            _ => {}
        }
    }
    None
}

fn string_list(value: Option<&Value>, limit: usize) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let mut out: Vec<String> = Vec::new();
    for s in items.iter().filter_map(Value::as_str).map(str::trim) {
        if !s.is_empty() && !out.iter().any(|o| o.eq_ignore_ascii_case(s)) {
            out.push(s.to_string());
        }
        if out.len() == limit {
            break;
        }
    }
    out
}

pub fn parse_concepts(reply: &str) -> Concepts {
    let Some(value) = extract_json(reply) else {
        return Concepts::default();
    };
    let mut tags = normalize_tags(string_list(value.get("tags"), MAX_TAGS * 2));
    tags.truncate(MAX_TAGS);
    Concepts {
        key_concepts: string_list(value.get("key_concepts"), MAX_CONCEPTS),
        tags,
    }
}

/// Parse suggestions, keeping only those pointing at one of `candidate_ids`.
/// A target suggested twice keeps its first entry.
pub fn parse_suggestions(reply: &str, candidate_ids: &[&str]) -> Vec<SuggestedConnection> {
    let items = match extract_json(reply) {
        Some(Value::Array(items)) => items,
        Some(Value::Object(mut obj)) => match obj.remove("connections") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    let mut out: Vec<SuggestedConnection> = Vec::new();
    for item in items {
        let Some(target_id) = item.get("target_id").and_then(Value::as_str) else {
            continue;
        };
        if !candidate_ids.contains(&target_id) || out.iter().any(|s| s.target_id == target_id) {
            continue;
        }
        let relationship = item
            .get("relationship")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("related");
        let strength = item.get("strength").and_then(Value::as_f64).unwrap_or(0.5);
        let reason = item
            .get("reason")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from);

        out.push(SuggestedConnection {
            target_id: target_id.to_string(),
            relationship: relationship.to_string(),
            strength: clamp_strength(strength),
            reason,
        });
    }
    out
}

/// A short prose summary of the note.
pub async fn summarize(ai: &dyn GenerativeAi, title: &str, body: &str) -> Result<String> {
    let reply = ai.generate(&summary_prompt(title, body)).await?;
    let summary = strip_code_fences(&reply).trim().to_string();
    if summary.is_empty() {
        return Err(Error::ai("model returned an empty summary"));
    }
    Ok(summary)
}

pub async fn extract_concepts(ai: &dyn GenerativeAi, title: &str, body: &str) -> Result<Concepts> {
    let reply = ai.generate(&concepts_prompt(title, body)).await?;
    Ok(parse_concepts(&reply))
}

pub async fn suggest_connections(
    ai: &dyn GenerativeAi,
    title: &str,
    body: &str,
    candidates: &[ConnectionCandidate],
) -> Result<Vec<SuggestedConnection>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let reply = ai.generate(&connections_prompt(title, body, candidates)).await?;
    let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
    Ok(parse_suggestions(&reply, &ids))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1]\n```\n"), "[1]");
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn json_is_found_inside_prose() {
        let reply = "Sure! Here you go: {\"tags\": [\"a}b\"], \"n\": {\"x\": 1}} Hope that helps.";
        let value = extract_json(reply).unwrap();
        assert_eq!(value["tags"][0], "a}b");
        assert_eq!(value["n"]["x"], 1);
        assert!(extract_json("no json here").is_none());
    }

    #[test]
    fn concepts_ignore_bad_entries() {
        let reply = r##"```json
{"key_concepts": ["Ownership", 42, "", "ownership", "Borrowing"], "tags": ["#Rust", "Memory Safety", null], "extra": true}
```"##;
        let concepts = parse_concepts(reply);
        assert_eq!(concepts.key_concepts, vec!["Ownership", "Borrowing"]);
        assert_eq!(concepts.tags, vec!["memory safety", "rust"]);

        assert!(parse_concepts("I cannot help with that").is_empty());
    }

    #[test]
    fn suggestions_are_filtered_and_clamped() {
        let reply = r#"[
            {"target_id": "n1", "relationship": "builds_on", "strength": 1.4, "reason": "extends it"},
            {"target_id": "ghost", "relationship": "related", "strength": 0.9},
            {"target_id": "n2", "strength": "high"},
            {"target_id": "n1", "relationship": "duplicate", "strength": 0.1},
            {"relationship": "orphan"}
        ]"#;
        let parsed = parse_suggestions(reply, &["n1", "n2"]);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].target_id, "n1");
        assert_eq!(parsed[0].strength, 1.0);
        assert_eq!(parsed[0].reason.as_deref(), Some("extends it"));
        assert_eq!(parsed[1].relationship, "related");
        assert_eq!(parsed[1].strength, 0.5);
    }

    #[test]
    fn suggestions_accept_wrapped_object() {
        let reply = r#"{"connections": [{"target_id": "n1", "relationship": "related", "strength": 0.6}]}"#;
        assert_eq!(parse_suggestions(reply, &["n1"]).len(), 1);
        assert!(parse_suggestions("[]", &["n1"]).is_empty());
    }

    #[test]
    fn long_bodies_are_clipped() {
        let body = "x".repeat(MAX_PROMPT_CHARS + 500);
        let prompt = summary_prompt("T", &body);
        assert!(prompt.len() < MAX_PROMPT_CHARS + 200);
    }
}
