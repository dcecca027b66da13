//! Content extraction from an email-client page.
//!
//! Uses scraper for HTML parsing. Extraction is a pure function of the
//! current document state and never fails: fields that cannot be located
//! come back as empty strings.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

/// Subject heuristics, tried in order. Gmail keeps moving its markup, so
/// several generations of selectors are kept around.
const SUBJECT_SELECTORS: &[&str] = &[
    "h2[role=\"heading\"][data-legacy-thread-id]",
    "h2.hP",
    "h2 span.bog",
];

/// Candidate containers for message bodies, in one selector list so matches
/// come back in document order.
const BODY_CANDIDATES: &str =
    "div.a3s, div[role=\"listitem\"], div[role=\"article\"], div[role=\"textbox\"], div[aria-label=\"Message Body\"]";

/// Separator between individual message bodies in the combined text.
const BODY_SEPARATOR: &str = "\n\n---\n\n";

/// Marker appended when the combined body hits the size cap.
const TRUNCATION_MARKER: &str = "\n\n[TRUNCATED]";

/// Cap on the combined body, in characters.
const COMBINED_BODY_MAX: usize = 150_000;

/// Cap on the whole-page fallback text, in characters.
const FALLBACK_BODY_MAX: usize = 20_000;

/// Normalized snapshot of an email page, produced fresh per extraction.
#[derive(Debug, Clone)]
pub struct ContentSnapshot {
    /// Thread subject, empty when no heuristic matched
    pub subject: String,
    /// First header-like block (from/to/subject/sent), empty when absent
    pub header_text: String,
    /// All message bodies joined, capped at 150,000 chars
    pub combined_body: String,
    /// Meta tag name/property to content
    pub metas: HashMap<String, String>,
    /// Page URL
    pub url: String,
    /// Page title, empty when absent
    pub title: String,
}

/// Extract a normalized content snapshot from the page.
pub fn extract(document: &Html, url: &str) -> ContentSnapshot {
    let subject = extract_subject(document);
    let header_text = extract_header(document);
    let combined_body = extract_body(document);
    let metas = extract_metas(document);
    let title = extract_title(document).unwrap_or_default();

    ContentSnapshot {
        subject,
        header_text,
        combined_body,
        metas,
        url: url.to_string(),
        title,
    }
}

/// Try the subject selectors in order, first non-empty text wins
fn extract_subject(document: &Html) -> String {
    for selector_str in SUBJECT_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let text = element_text(&element);
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }
    String::new()
}

/// First block whose leading text looks like a message header.
///
/// Matches the original client-side heuristic: any of from/to/subject/sent
/// (case-insensitive) within the first 100 characters qualifies.
fn extract_header(document: &Html) -> String {
    let div_selector = Selector::parse("div").unwrap();
    for element in document.select(&div_selector) {
        let text = element_text(&element);
        if text.is_empty() {
            continue;
        }
        let head: String = text.chars().take(100).collect::<String>().to_lowercase();
        if ["from", "to", "subject", "sent"]
            .iter()
            .any(|needle| head.contains(needle))
        {
            return text;
        }
    }
    String::new()
}

/// Collect message bodies in document order, falling back to the main
/// content region when no candidate matches.
fn extract_body(document: &Html) -> String {
    let mut bodies: Vec<String> = Vec::new();

    if let Ok(selector) = Selector::parse(BODY_CANDIDATES) {
        for element in document.select(&selector) {
            let text = element_text(&element);
            if text.len() > 10 {
                bodies.push(text);
            }
        }
    }

    if bodies.is_empty() {
        let main_selector = Selector::parse("div[role=\"main\"]").unwrap();
        let text = match document.select(&main_selector).next() {
            Some(main) => element_text(&main),
            None => element_text(&document.root_element()),
        };
        if text.len() > 20 {
            bodies.push(clip_chars(&text, FALLBACK_BODY_MAX).to_string());
        }
    }

    let combined = bodies.join(BODY_SEPARATOR);
    let clipped = clip_chars(&combined, COMBINED_BODY_MAX);
    if clipped.len() < combined.len() {
        let mut truncated = clipped.to_string();
        truncated.push_str(TRUNCATION_MARKER);
        truncated
    } else {
        combined
    }
}

/// Collect meta tags into a name/property -> content map.
///
/// Later entries with the same key overwrite earlier ones.
fn extract_metas(document: &Html) -> HashMap<String, String> {
    let meta_selector = Selector::parse("meta").unwrap();
    let mut metas = HashMap::new();
    for element in document.select(&meta_selector) {
        let content = element.value().attr("content").unwrap_or_default();
        if let Some(name) = element.value().attr("name") {
            metas.insert(name.to_string(), content.to_string());
        } else if let Some(property) = element.value().attr("property") {
            metas.insert(property.to_string(), content.to_string());
        }
    }
    metas
}

/// Extract the page title from <title>
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").unwrap();
    if let Some(element) = document.select(&title_selector).next() {
        let title: String = element.text().collect();
        if !title.trim().is_empty() {
            return Some(title.trim().to_string());
        }
    }
    None
}

/// Collapse an element's text nodes into single-space-normalized text
fn element_text(element: &ElementRef) -> String {
    let text: String = element.text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut a string to at most `max_chars` characters on a char boundary
pub(crate) fn clip_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> Html {
        Html::parse_document(&format!(
            "<html><head><title>Inbox</title></head><body>{}</body></html>",
            body
        ))
    }

    #[test]
    fn subject_selector_chain_prefers_earlier_matches() {
        let doc = page(
            r#"<h2 class="hP">Quarterly review</h2>
               <h2><span class="bog">Stale subject</span></h2>"#,
        );
        let snapshot = extract(&doc, "https://mail.example.com/");
        assert_eq!(snapshot.subject, "Quarterly review");
    }

    #[test]
    fn subject_falls_back_down_the_chain() {
        let doc = page(r#"<h2><span class="bog">Fallback subject</span></h2>"#);
        let snapshot = extract(&doc, "https://mail.example.com/");
        assert_eq!(snapshot.subject, "Fallback subject");
    }

    #[test]
    fn missing_fields_become_empty_strings() {
        let doc = Html::parse_document("<html><body><p>hi</p></body></html>");
        let snapshot = extract(&doc, "about:blank");
        assert_eq!(snapshot.subject, "");
        assert_eq!(snapshot.header_text, "");
        assert_eq!(snapshot.title, "");
    }

    #[test]
    fn header_scan_matches_on_leading_text() {
        let doc = page(
            r#"<div><div>From: Ada Lovelace, Sent: Monday</div></div>
               <div>unrelated content</div>"#,
        );
        let snapshot = extract(&doc, "https://mail.example.com/");
        assert!(snapshot.header_text.contains("From: Ada Lovelace"));
    }

    #[test]
    fn body_candidates_join_in_document_order() {
        let doc = page(
            r#"<div class="a3s">First message body text</div>
               <div role="article">Second message body text</div>"#,
        );
        let snapshot = extract(&doc, "https://mail.example.com/");
        assert_eq!(
            snapshot.combined_body,
            "First message body text\n\n---\n\nSecond message body text"
        );
    }

    #[test]
    fn short_candidates_are_skipped() {
        let doc = page(r#"<div class="a3s">tiny</div><div class="a3s">long enough body</div>"#);
        let snapshot = extract(&doc, "https://mail.example.com/");
        assert_eq!(snapshot.combined_body, "long enough body");
    }

    #[test]
    fn body_falls_back_to_main_region() {
        let doc = page(r#"<div role="main">The main region text, no body candidates here.</div>"#);
        let snapshot = extract(&doc, "https://mail.example.com/");
        assert_eq!(
            snapshot.combined_body,
            "The main region text, no body candidates here."
        );
    }

    #[test]
    fn combined_body_is_capped_with_marker() {
        let long = "word ".repeat(40_000);
        let doc = page(&format!(r#"<div class="a3s">{}</div>"#, long));
        let snapshot = extract(&doc, "https://mail.example.com/");
        assert!(snapshot.combined_body.ends_with(TRUNCATION_MARKER));
        assert!(snapshot.combined_body.len() <= COMBINED_BODY_MAX + TRUNCATION_MARKER.len());
    }

    #[test]
    fn later_metas_overwrite_earlier_ones() {
        let doc = Html::parse_document(
            r#"<html><head>
                 <meta name="author" content="first">
                 <meta name="author" content="second">
                 <meta property="og:title" content="Inbox view">
               </head><body></body></html>"#,
        );
        let snapshot = extract(&doc, "https://mail.example.com/");
        assert_eq!(snapshot.metas.get("author").map(String::as_str), Some("second"));
        assert_eq!(
            snapshot.metas.get("og:title").map(String::as_str),
            Some("Inbox view")
        );
    }

    #[test]
    fn title_and_url_are_carried() {
        let doc = page("<p>hello</p>");
        let snapshot = extract(&doc, "https://mail.example.com/u/0/");
        assert_eq!(snapshot.title, "Inbox");
        assert_eq!(snapshot.url, "https://mail.example.com/u/0/");
    }

    #[test]
    fn clip_respects_char_boundaries() {
        let s = "héllo wörld";
        assert_eq!(clip_chars(s, 4), "héll");
        assert_eq!(clip_chars(s, 100), s);
    }
}
