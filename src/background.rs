//! The background context: message router, model gateway owner.
//!
//! Mirrors the long-lived extension process: it owns the settings store and
//! the network gateway, and it is the only context allowed to talk to both.
//! Each incoming envelope is handled on its own task so a relayed
//! extraction that calls back in with `CALL_GEMINI` cannot wedge the
//! mailbox. Every envelope gets exactly one reply; internal failures are
//! folded into `{ok:false, error}`.

use crate::gateway::Gateway;
use crate::messages::{
    decode, ContextHandle, Envelope, Message, Reply, SummarizePayload, CallPayload,
    ERR_NO_ACTIVE_TAB, ERR_NO_CONTENT_RESPONSE, ERR_UNKNOWN_TYPE,
};
use crate::settings::{Mode, SettingsStore};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// The currently active tab's content-context mailbox.
#[derive(Clone, Default)]
pub struct TabRegistry {
    active: Arc<RwLock<Option<ContextHandle>>>,
}

impl TabRegistry {
    /// Make the given content context the active tab
    pub async fn register(&self, tab: ContextHandle) {
        *self.active.write().await = Some(tab);
    }

    pub async fn active(&self) -> Option<ContextHandle> {
        self.active.read().await.clone()
    }
}

struct BackgroundState {
    gateway: Gateway,
    store: Arc<SettingsStore>,
    tabs: TabRegistry,
}

/// A running background context.
pub struct BackgroundContext {
    pub handle: ContextHandle,
    pub tabs: TabRegistry,
}

/// Spawn the background context onto the current runtime.
pub fn spawn(store: Arc<SettingsStore>, gateway: Gateway) -> BackgroundContext {
    let (handle, mut rx) = crate::messages::mailbox(32);
    let tabs = TabRegistry::default();
    let state = Arc::new(BackgroundState {
        gateway,
        store,
        tabs: tabs.clone(),
    });

    tokio::spawn(async move {
        info!("background context started");
        while let Some(envelope) = rx.recv().await {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                let Envelope { body, reply } = envelope;
                let response = handle_body(&state, body).await;
                // Receiver may be gone; nothing left to tell it
                let _ = reply.send(response);
            });
        }
        info!("background context stopped");
    });

    BackgroundContext { handle, tabs }
}

async fn handle_body(state: &BackgroundState, body: serde_json::Value) -> Reply {
    match decode(&body) {
        Ok(Message::CallModel(payload)) => call_model(state, payload).await,
        Ok(Message::ExtractAndSummarize(payload)) => relay_to_tab(state, payload).await,
        // Content-bound order; this router does not handle it
        Ok(Message::DoExtractAndSummarize(_)) => Reply::err(ERR_UNKNOWN_TYPE),
        Err(decode_error) => Reply::err(decode_error.message()),
    }
}

/// Resolve the effective mode and credentials, then call the model.
///
/// Payload fields override the stored settings; an absent `useProxy` means
/// the stored mode decides.
async fn call_model(state: &BackgroundState, payload: CallPayload) -> Reply {
    let mut settings = match state.store.load() {
        Ok(settings) => settings,
        Err(err) => {
            warn!(error = %err, "settings unavailable for model call");
            return Reply::err(err.to_string());
        }
    };

    let mode = match payload.use_proxy {
        Some(true) => Mode::Proxy,
        Some(false) => Mode::Direct,
        None => settings.mode,
    };
    if let Some(url) = payload.proxy_url.filter(|url| !url.is_empty()) {
        settings.proxy_url = Some(url);
    }

    debug!(%mode, "issuing model call");
    match state.gateway.call(&payload.prompt, mode, &settings).await {
        Ok(data) => Reply::ok(data),
        Err(err) => {
            warn!(error = %err, "model call failed");
            Reply::err(err.to_string())
        }
    }
}

/// Forward an extraction request to the active tab and relay its reply.
async fn relay_to_tab(state: &BackgroundState, payload: SummarizePayload) -> Reply {
    let Some(tab) = state.tabs.active().await else {
        return Reply::err(ERR_NO_ACTIVE_TAB);
    };

    debug!("relaying extraction to active tab");
    match tab.send(&Message::DoExtractAndSummarize(payload)).await {
        Some(reply) => reply,
        None => Reply::err(ERR_NO_CONTENT_RESPONSE),
    }
}
