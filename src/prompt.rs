//! Prompt construction for the summarize flow.

use crate::extract::{clip_chars, ContentSnapshot};

/// Cap on the header snippet included in the prompt, in characters
const HEADER_SNIPPET_MAX: usize = 1_000;

/// Cap on the body excerpt included in the prompt, in characters
const BODY_SNIPPET_MAX: usize = 3_000;

/// Build the instruction prompt for a content snapshot.
///
/// Keeps the request short but informative; the endpoint is asked for a
/// JSON object so the structured parse path gets first shot at the reply.
pub fn build_prompt(snapshot: &ContentSnapshot) -> String {
    let subject = if snapshot.subject.is_empty() {
        "[not found]"
    } else {
        &snapshot.subject
    };
    let header = if snapshot.header_text.is_empty() {
        "[none]"
    } else {
        clip_chars(&snapshot.header_text, HEADER_SNIPPET_MAX)
    };
    let body = clip_chars(&snapshot.combined_body, BODY_SNIPPET_MAX);

    format!(
        r#"You are an assistant that reads an email page and returns a concise bullet-point summary for the user.
Return only a JSON object like: {{"bullets": ["...","...","..."], "summary":"one-line summary"}}.

Page title: {}
Page URL: {}
Subject: {}
Header snippet: {}
Email/body content (trimmed): {}

Please produce 6-10 short bullet points that capture the key facts, actions required, names, dates, numbers, and a one-line summary. Keep bullets short (max 30 words each)."#,
        snapshot.title, snapshot.url, subject, header, body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn snapshot() -> ContentSnapshot {
        ContentSnapshot {
            subject: "Budget sign-off".to_string(),
            header_text: "From: CFO".to_string(),
            combined_body: "Please approve the Q3 budget by Friday.".to_string(),
            metas: HashMap::new(),
            url: "https://mail.example.com/thread/1".to_string(),
            title: "Inbox".to_string(),
        }
    }

    #[test]
    fn prompt_carries_the_snapshot_fields() {
        let prompt = build_prompt(&snapshot());
        assert!(prompt.contains("Subject: Budget sign-off"));
        assert!(prompt.contains("Header snippet: From: CFO"));
        assert!(prompt.contains("Page URL: https://mail.example.com/thread/1"));
        assert!(prompt.contains("\"bullets\""));
    }

    #[test]
    fn missing_fields_get_placeholders() {
        let mut snap = snapshot();
        snap.subject.clear();
        snap.header_text.clear();
        let prompt = build_prompt(&snap);
        assert!(prompt.contains("Subject: [not found]"));
        assert!(prompt.contains("Header snippet: [none]"));
    }

    #[test]
    fn body_excerpt_is_capped() {
        let mut snap = snapshot();
        snap.combined_body = "x".repeat(10_000);
        let prompt = build_prompt(&snap);
        assert!(prompt.len() < 5_000);
    }
}
