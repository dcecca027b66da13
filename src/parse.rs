//! Model response parsing.
//!
//! The endpoint contract is loose: a well-behaved proxy returns
//! `{"bullets": [...], "summary": "..."}`, but providers and misconfigured
//! endpoints return anything from chat-completion envelopes to plain prose.
//! Parsing is total: any input yields a renderable bullet list.

use serde_json::Value;

/// Ordered bullet list plus an optional one-line summary.
///
/// Rendered into the panel and then discarded, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletSummary {
    pub bullets: Vec<String>,
    pub summary: Option<String>,
}

impl BulletSummary {
    pub fn is_empty(&self) -> bool {
        self.bullets.is_empty() && self.summary.is_none()
    }
}

/// How the raw response resolved.
///
/// The structured and free-text paths are kept apart so a JSON payload is
/// never re-split as prose and prose is never half-parsed as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ParsedResponse {
    /// JSON object carrying a `bullets` array (and maybe a `summary` line)
    Structured {
        bullets: Vec<String>,
        summary: Option<String>,
    },
    /// Anything else, reduced to cleaned non-empty lines
    FreeText { lines: Vec<String> },
}

/// Parse a raw model response into a bullet summary. Never fails.
pub fn parse(raw: &str) -> BulletSummary {
    match resolve(raw) {
        ParsedResponse::Structured { bullets, summary } => BulletSummary { bullets, summary },
        ParsedResponse::FreeText { lines } => BulletSummary {
            bullets: lines,
            summary: None,
        },
    }
}

fn resolve(raw: &str) -> ParsedResponse {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        if let Some(bullets) = value.get("bullets").and_then(Value::as_array) {
            let bullets = bullets.iter().map(coerce_text).collect();
            let summary = value
                .get("summary")
                .and_then(Value::as_str)
                .map(str::to_string);
            return ParsedResponse::Structured { bullets, summary };
        }
        if let Some(summary) = value.get("summary").and_then(Value::as_str) {
            return ParsedResponse::Structured {
                bullets: split_lines(summary),
                summary: None,
            };
        }
    }

    let lines = split_lines(raw)
        .iter()
        .map(|line| strip_marker(line))
        .collect();
    ParsedResponse::FreeText { lines }
}

/// Split on newline runs, trim, drop empties
fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Strip a leading bullet or numbering run (`-`, `*`, digits, `.`, `)`,
/// whitespace) from a line
fn strip_marker(line: &str) -> String {
    line.trim_start_matches(|c: char| {
        c == '-' || c == '*' || c == '.' || c == ')' || c.is_ascii_digit() || c.is_whitespace()
    })
    .trim()
    .to_string()
}

/// A bullet element that is not a string keeps its JSON text form
fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Pull displayable text out of a provider response envelope.
///
/// Probes the shapes the configured endpoints actually return, most
/// specific first, and falls back to stringifying the payload so the
/// free-text parser always has something to chew on.
pub fn provider_text(data: &Value) -> String {
    // Gemini generateContent envelope
    if let Some(text) = data
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
    {
        return text.to_string();
    }

    if let Some(output) = data.get("output") {
        return output.to_string();
    }

    // Chat-completion style envelopes
    if let Some(choice) = data.pointer("/choices/0") {
        if let Some(text) = choice
            .pointer("/message/content/0/text")
            .and_then(Value::as_str)
        {
            return text.to_string();
        }
        if let Some(text) = choice.get("text").and_then(Value::as_str) {
            return text.to_string();
        }
        return choice.to_string();
    }

    match data {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
