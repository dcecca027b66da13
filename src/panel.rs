//! The in-page summary panel and its host page surface.
//!
//! A page carries at most one panel. Injection is decided by looking for
//! the panel marker on the page itself (injected slot or markup that
//! already carries the marker id), so the guard lives and dies with the
//! page rather than with this process.

use crate::parse::BulletSummary;
use scraper::{Html, Selector};

/// DOM id marking an injected panel
pub const PANEL_ID: &str = "mb-panel";

/// Lifecycle of one summarize flow as shown in the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelState {
    #[default]
    Idle,
    Extracting,
    AwaitingModel,
    Rendering,
}

/// What the output region currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PanelOutput {
    #[default]
    Empty,
    Bullets(BulletSummary),
    /// A one-line notice, also used for error text
    Notice(String),
}

/// The floating summary panel.
#[derive(Debug, Default)]
pub struct Panel {
    state: PanelState,
    status: String,
    output: PanelOutput,
}

impl Panel {
    fn new() -> Self {
        Panel::default()
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn output(&self) -> &PanelOutput {
        &self.output
    }

    /// A flow is in progress and the trigger must not re-enter
    pub fn is_busy(&self) -> bool {
        self.state != PanelState::Idle
    }

    /// Gate a new summarize flow. Refused while a flow is running so
    /// overlapping flows cannot interleave writes to the output region.
    pub fn begin(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.state = PanelState::Extracting;
        self.set_status("Extracting page content...");
        true
    }

    /// Extraction done, the model call is in flight
    pub fn awaiting_model(&mut self) {
        self.state = PanelState::AwaitingModel;
        self.set_status("Sending to Gemini...");
    }

    /// Terminal: show the parsed bullets and return to idle
    pub fn render_bullets(&mut self, summary: BulletSummary) {
        self.state = PanelState::Rendering;
        self.output = if summary.is_empty() {
            PanelOutput::Notice("No summary.".to_string())
        } else {
            PanelOutput::Bullets(summary)
        };
        self.finish();
    }

    /// Terminal: show a one-line error and return to idle
    pub fn render_error(&mut self, message: impl Into<String>) {
        self.output = PanelOutput::Notice(message.into());
        self.finish();
    }

    fn finish(&mut self) {
        self.state = PanelState::Idle;
        self.status.clear();
    }

    fn set_status(&mut self, text: &str) {
        self.status = text.to_string();
    }

    /// Plain-text view of the output region
    pub fn output_text(&self) -> String {
        match &self.output {
            PanelOutput::Empty => String::new(),
            PanelOutput::Notice(text) => text.clone(),
            PanelOutput::Bullets(summary) => {
                let mut lines: Vec<String> = summary
                    .bullets
                    .iter()
                    .map(|bullet| format!("• {}", bullet))
                    .collect();
                if let Some(one_liner) = &summary.summary {
                    lines.push(one_liner.clone());
                }
                lines.join("\n")
            }
        }
    }
}

/// One email-client page: its markup plus the injection slot.
///
/// The markup is kept as text and parsed on demand; a parsed document
/// holds non-atomic refcounts and must never be held across an await.
pub struct HostPage {
    url: String,
    html: String,
    markup_markers: usize,
    panel: Option<Panel>,
}

impl HostPage {
    pub fn new(html: &str, url: &str) -> Self {
        let markup_markers = count_markers(&Html::parse_document(html));
        HostPage {
            url: url.to_string(),
            html: html.to_string(),
            markup_markers,
            panel: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Parse the page markup for a read-only traversal
    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }

    /// Whether the page already carries the panel marker
    pub fn has_panel(&self) -> bool {
        self.panel.is_some() || self.markup_markers > 0
    }

    /// Inject the panel markup once. When the marker is already on the
    /// page, the existing panel is returned instead of adding a second one.
    pub fn inject_panel(&mut self) -> &mut Panel {
        if !self.has_panel() {
            self.panel = Some(Panel::new());
        }
        // A marker in the host markup without live state binds fresh state
        // to the element that is already there.
        self.panel.get_or_insert_with(Panel::new)
    }

    pub fn panel(&self) -> Option<&Panel> {
        self.panel.as_ref()
    }

    pub fn panel_mut(&mut self) -> Option<&mut Panel> {
        self.panel.as_mut()
    }

    /// Number of panel elements on the page. The injected slot only adds
    /// an element when the markup did not already carry the marker.
    pub fn panel_count(&self) -> usize {
        self.markup_markers + usize::from(self.panel.is_some() && self.markup_markers == 0)
    }

    /// Remove the panel and its style; a later inject recreates it fresh
    pub fn close_panel(&mut self) {
        self.panel = None;
    }
}

fn count_markers(document: &Html) -> usize {
    let selector = Selector::parse(&format!("#{}", PANEL_ID)).unwrap();
    document.select(&selector).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<html><body><div role=\"main\">mail</div></body></html>";

    #[test]
    fn double_injection_leaves_one_panel() {
        let mut page = HostPage::new(PAGE, "https://mail.example.com/");
        page.inject_panel();
        page.inject_panel();
        assert_eq!(page.panel_count(), 1);
    }

    #[test]
    fn markup_marker_blocks_a_second_element() {
        let html = format!("<html><body><div id=\"{}\"></div></body></html>", PANEL_ID);
        let mut page = HostPage::new(&html, "https://mail.example.com/");
        assert!(page.has_panel());
        page.inject_panel();
        assert_eq!(page.panel_count(), 1);
    }

    #[test]
    fn close_then_inject_recreates_one_fresh_panel() {
        let mut page = HostPage::new(PAGE, "https://mail.example.com/");
        page.inject_panel().render_error("Error: boom");
        page.close_panel();
        assert_eq!(page.panel_count(), 0);
        let panel = page.inject_panel();
        assert_eq!(panel.output(), &PanelOutput::Empty);
        assert_eq!(page.panel_count(), 1);
    }

    #[test]
    fn begin_gates_reentry_until_terminal() {
        let mut panel = Panel::new();
        assert!(panel.begin());
        assert!(!panel.begin());
        panel.awaiting_model();
        assert!(!panel.begin());
        panel.render_bullets(BulletSummary {
            bullets: vec!["a".to_string()],
            summary: None,
        });
        assert!(!panel.is_busy());
        assert!(panel.begin());
    }

    #[test]
    fn status_line_follows_the_flow() {
        let mut panel = Panel::new();
        panel.begin();
        assert_eq!(panel.status(), "Extracting page content...");
        assert_eq!(panel.state(), PanelState::Extracting);
        panel.awaiting_model();
        assert_eq!(panel.status(), "Sending to Gemini...");
        panel.render_error("Error: nope");
        assert_eq!(panel.status(), "");
        assert_eq!(panel.state(), PanelState::Idle);
    }

    #[test]
    fn empty_summary_renders_a_notice() {
        let mut panel = Panel::new();
        panel.begin();
        panel.render_bullets(BulletSummary {
            bullets: vec![],
            summary: None,
        });
        assert_eq!(panel.output_text(), "No summary.");
    }

    #[test]
    fn bullets_render_with_the_one_liner() {
        let mut panel = Panel::new();
        panel.render_bullets(BulletSummary {
            bullets: vec!["first".to_string(), "second".to_string()],
            summary: Some("the gist".to_string()),
        });
        assert_eq!(panel.output_text(), "• first\n• second\nthe gist");
    }
}
