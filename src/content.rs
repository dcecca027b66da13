//! The content context: one per attached page.
//!
//! Owns the host page and its panel, and runs the summarize pipeline:
//! extract, build the prompt, ask the background for the model call, parse,
//! render. The mailbox is consumed sequentially, so two summarize orders
//! can never interleave writes to the panel; a flow that fails renders its
//! error into the panel and still acknowledges the order.

use crate::extract::extract;
use crate::messages::{
    decode, CallPayload, ContextHandle, Envelope, Message, Reply, SummarizePayload,
    ERR_UNKNOWN_TYPE,
};
use crate::panel::HostPage;
use crate::parse::{parse, provider_text};
use crate::prompt::build_prompt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A running content context bound to one page.
pub struct ContentContext {
    pub handle: ContextHandle,
    pub page: Arc<Mutex<HostPage>>,
    background: ContextHandle,
}

impl ContentContext {
    /// Panel-origin summarize (the user clicked the panel's button):
    /// runs the pipeline in-process with the stored settings deciding mode.
    pub async fn summarize_now(&self) {
        run_pipeline(&self.page, &self.background, SummarizePayload::default()).await;
    }
}

/// Spawn a content context for the given page.
pub fn spawn(page: HostPage, background: ContextHandle) -> ContentContext {
    let (handle, mut rx) = crate::messages::mailbox(16);
    let page = Arc::new(Mutex::new(page));

    let task_page = Arc::clone(&page);
    let task_background = background.clone();
    tokio::spawn(async move {
        info!("content context started");
        while let Some(envelope) = rx.recv().await {
            let Envelope { body, reply } = envelope;
            let response = match decode(&body) {
                Ok(Message::DoExtractAndSummarize(payload)) => {
                    run_pipeline(&task_page, &task_background, payload).await;
                    // The flow's own outcome lives in the panel
                    Reply::ack()
                }
                Ok(_) => Reply::err(ERR_UNKNOWN_TYPE),
                Err(decode_error) => Reply::err(decode_error.message()),
            };
            let _ = reply.send(response);
        }
        info!("content context stopped");
    });

    ContentContext {
        handle,
        page,
        background,
    }
}

/// Extract, prompt, call, parse, render. Terminal either way: the panel
/// ends up showing bullets or a one-line error.
async fn run_pipeline(
    page: &Arc<Mutex<HostPage>>,
    background: &ContextHandle,
    payload: SummarizePayload,
) {
    let prompt = {
        let mut page = page.lock().await;
        if !page.inject_panel().begin() {
            debug!("summarize refused, flow already in progress");
            return;
        }
        let url = page.url().to_string();
        let document = page.document();
        let snapshot = extract(&document, &url);
        let prompt = build_prompt(&snapshot);
        if let Some(panel) = page.panel_mut() {
            panel.awaiting_model();
        }
        prompt
    };

    let message = Message::CallModel(CallPayload {
        prompt,
        use_proxy: payload.use_proxy,
        proxy_url: payload.proxy_url,
    });
    let response = background.send(&message).await;

    let mut page = page.lock().await;
    let Some(panel) = page.panel_mut() else {
        // Panel was closed while the call was in flight; nowhere to render
        warn!("panel gone before rendering");
        return;
    };
    match response {
        None => panel.render_error("Error: no response"),
        Some(reply) if !reply.ok => {
            let reason = reply.error.unwrap_or_else(|| "no response".to_string());
            panel.render_error(format!("Error: {}", reason));
        }
        Some(reply) => {
            let text = reply.data.map(|data| provider_text(&data)).unwrap_or_default();
            panel.render_bullets(parse(&text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::mailbox;
    use crate::panel::PanelOutput;
    use serde_json::json;

    const PAGE: &str = r#"<html><head><title>Inbox</title></head><body>
        <h2 class="hP">Launch plan</h2>
        <div class="a3s">We ship on Thursday, sign-off needed.</div>
    </body></html>"#;

    /// Background stub that answers every CALL_GEMINI with the given data
    fn stub_background(data: serde_json::Value) -> ContextHandle {
        let (handle, mut rx) = mailbox(8);
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                assert_eq!(envelope.body["type"], "CALL_GEMINI");
                let _ = envelope.reply.send(Reply::ok(data.clone()));
            }
        });
        handle
    }

    #[tokio::test]
    async fn extraction_order_renders_bullets_into_the_panel() {
        let background = stub_background(json!({"bullets": ["a", "b"]}));
        let content = spawn(HostPage::new(PAGE, "https://mail.example.com/"), background);

        let reply = content
            .handle
            .send(&Message::DoExtractAndSummarize(SummarizePayload::default()))
            .await
            .unwrap();
        assert!(reply.ok);

        let page = content.page.lock().await;
        let panel = page.panel().unwrap();
        assert!(!panel.is_busy());
        assert_eq!(panel.output_text(), "• a\n• b");
    }

    #[tokio::test]
    async fn prompt_carries_the_extracted_content() {
        let (background, mut rx) = mailbox(8);
        let seen = tokio::spawn(async move {
            let envelope = rx.recv().await.unwrap();
            let prompt = envelope.body["payload"]["prompt"].as_str().unwrap().to_string();
            let _ = envelope.reply.send(Reply::ok(json!({"bullets": []})));
            prompt
        });

        let content = spawn(HostPage::new(PAGE, "https://mail.example.com/"), background);
        content
            .handle
            .send(&Message::DoExtractAndSummarize(SummarizePayload::default()))
            .await
            .unwrap();

        let prompt = seen.await.unwrap();
        assert!(prompt.contains("Subject: Launch plan"));
        assert!(prompt.contains("We ship on Thursday"));
    }

    #[tokio::test]
    async fn panel_origin_summarize_runs_in_process() {
        let background = stub_background(json!({"bullets": ["x"]}));
        let content = spawn(HostPage::new(PAGE, "https://mail.example.com/"), background);

        content.summarize_now().await;

        let page = content.page.lock().await;
        assert_eq!(page.panel().unwrap().output_text(), "• x");
    }

    #[tokio::test]
    async fn gateway_failure_renders_a_one_line_error() {
        let (background, mut rx) = mailbox(8);
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let _ = envelope.reply.send(Reply::err("proxyUrl required"));
            }
        });

        let content = spawn(HostPage::new(PAGE, "https://mail.example.com/"), background);
        content
            .handle
            .send(&Message::DoExtractAndSummarize(SummarizePayload::default()))
            .await
            .unwrap();

        let page = content.page.lock().await;
        assert_eq!(
            page.panel().unwrap().output_text(),
            "Error: proxyUrl required"
        );
    }

    #[tokio::test]
    async fn dead_background_renders_no_response() {
        let (background, rx) = mailbox(8);
        drop(rx);

        let content = spawn(HostPage::new(PAGE, "https://mail.example.com/"), background);
        content
            .handle
            .send(&Message::DoExtractAndSummarize(SummarizePayload::default()))
            .await
            .unwrap();

        let page = content.page.lock().await;
        assert_eq!(page.panel().unwrap().output_text(), "Error: no response");
    }

    #[tokio::test]
    async fn content_rejects_messages_it_does_not_handle() {
        let background = stub_background(json!({}));
        let content = spawn(HostPage::new(PAGE, "https://mail.example.com/"), background);

        let reply = content
            .handle
            .send(&Message::CallModel(CallPayload {
                prompt: "p".to_string(),
                ..CallPayload::default()
            }))
            .await
            .unwrap();
        assert_eq!(reply.error.as_deref(), Some("unknown type"));
    }

    #[tokio::test]
    async fn empty_model_output_shows_the_no_summary_notice() {
        let background = stub_background(json!({"bullets": []}));
        let content = spawn(HostPage::new(PAGE, "https://mail.example.com/"), background);

        content
            .handle
            .send(&Message::DoExtractAndSummarize(SummarizePayload::default()))
            .await
            .unwrap();

        let page = content.page.lock().await;
        assert_eq!(
            page.panel().unwrap().output(),
            &PanelOutput::Notice("No summary.".to_string())
        );
    }
}
