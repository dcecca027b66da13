//! Wiring for the three execution contexts.
//!
//! `Runtime` stands in for the extension runtime: it boots the background
//! context, attaches pages (each getting its own content context and the
//! active-tab slot), and exposes the popup's summarize-now operation.

use crate::background::{self, TabRegistry};
use crate::content::{self, ContentContext};
use crate::gateway::{Gateway, GatewayError};
use crate::messages::{ContextHandle, Message, Reply, SummarizePayload};
use crate::panel::HostPage;
use crate::settings::{Mode, SettingsStore};
use std::sync::Arc;

pub struct Runtime {
    store: Arc<SettingsStore>,
    background: ContextHandle,
    tabs: TabRegistry,
}

impl Runtime {
    /// Boot the background context over the given settings store.
    pub fn start(store: SettingsStore) -> Result<Runtime, GatewayError> {
        let store = Arc::new(store);
        let gateway = Gateway::new()?;
        let background = background::spawn(Arc::clone(&store), gateway);
        Ok(Runtime {
            store,
            background: background.handle,
            tabs: background.tabs,
        })
    }

    /// Attach a page: spawn its content context and make it the active tab.
    pub async fn attach_page(&self, html: &str, url: &str) -> ContentContext {
        let content = content::spawn(HostPage::new(html, url), self.background.clone());
        self.tabs.register(content.handle.clone()).await;
        content
    }

    /// Popup-origin summarize: read the stored settings and ask the
    /// background to drive the active tab.
    pub async fn summarize_active(&self) -> Reply {
        let settings = match self.store.load() {
            Ok(settings) => settings,
            Err(err) => return Reply::err(err.to_string()),
        };
        let payload = SummarizePayload {
            use_proxy: Some(settings.mode == Mode::Proxy),
            proxy_url: settings.proxy_url,
        };
        match self
            .background
            .send(&Message::ExtractAndSummarize(payload))
            .await
        {
            Some(reply) => reply,
            None => Reply::err("no response"),
        }
    }

    pub fn background(&self) -> &ContextHandle {
        &self.background
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }
}
