//! Wire protocol between the popup, background, and content contexts.
//!
//! Messages are tagged JSON objects (`{"type": ..., "payload": ...}`) sent
//! over a mailbox channel; each envelope carries a oneshot reply sender so
//! every request gets exactly one reply or a visible routing error, never a
//! silent drop. Type names and error strings are wire-compatible with the
//! existing popup and content UI.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

pub const ERR_NO_TYPE: &str = "no-type";
pub const ERR_UNKNOWN_TYPE: &str = "unknown type";
pub const ERR_NO_ACTIVE_TAB: &str = "no active tab";
pub const ERR_NO_CONTENT_RESPONSE: &str = "no-response-from-content";

/// Typed message variants carried on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Message {
    /// Ask the background to issue the model call
    #[serde(rename = "CALL_GEMINI")]
    CallModel(CallPayload),
    /// Ask the background to drive extraction on the active tab
    #[serde(rename = "EXTRACT_AND_SUMMARIZE")]
    ExtractAndSummarize(SummarizePayload),
    /// Background-to-content order to run the pipeline in-page
    #[serde(rename = "DO_EXTRACT_AND_SUMMARIZE")]
    DoExtractAndSummarize(SummarizePayload),
}

impl Message {
    /// Wire form of the message
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("message serialization is infallible")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallPayload {
    pub prompt: String,
    /// Mode override; absent means "use the stored settings"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_proxy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_proxy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

/// Why an incoming body could not be decoded into a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// No `type` field present
    NoType,
    /// A `type` this router does not handle
    UnknownType,
    /// Known type with an unusable payload
    Malformed(String),
}

impl DecodeError {
    /// The error string reported back to the sender
    pub fn message(&self) -> String {
        match self {
            DecodeError::NoType => ERR_NO_TYPE.to_string(),
            DecodeError::UnknownType => ERR_UNKNOWN_TYPE.to_string(),
            DecodeError::Malformed(msg) => msg.clone(),
        }
    }
}

/// Decode a wire body into a typed message.
pub fn decode(body: &Value) -> Result<Message, DecodeError> {
    let message_type = body
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::NoType)?;
    match message_type {
        "CALL_GEMINI" | "EXTRACT_AND_SUMMARIZE" | "DO_EXTRACT_AND_SUMMARIZE" => {
            serde_json::from_value(body.clone())
                .map_err(|err| DecodeError::Malformed(err.to_string()))
        }
        _ => Err(DecodeError::UnknownType),
    }
}

/// The single reply a handler sends back: `{ok, data?}` or `{ok, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    pub fn ok(data: Value) -> Self {
        Reply {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Bare acknowledgment without a data payload
    pub fn ack() -> Self {
        Reply {
            ok: true,
            data: None,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Reply {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// A request in flight: the wire body plus its one-shot response channel.
#[derive(Debug)]
pub struct Envelope {
    pub body: Value,
    pub reply: oneshot::Sender<Reply>,
}

/// Sending half of a context mailbox.
#[derive(Debug, Clone)]
pub struct ContextHandle {
    tx: mpsc::Sender<Envelope>,
}

/// Create a mailbox for one execution context.
pub fn mailbox(buffer: usize) -> (ContextHandle, mpsc::Receiver<Envelope>) {
    let (tx, rx) = mpsc::channel(buffer);
    (ContextHandle { tx }, rx)
}

impl ContextHandle {
    /// Send a body and wait for the single reply.
    ///
    /// `None` means the recipient context is gone or dropped its reply
    /// channel without answering.
    pub async fn request(&self, body: Value) -> Option<Reply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let envelope = Envelope {
            body,
            reply: reply_tx,
        };
        if self.tx.send(envelope).await.is_err() {
            return None;
        }
        reply_rx.await.ok()
    }

    /// Send a typed message and wait for the single reply.
    pub async fn send(&self, message: &Message) -> Option<Reply> {
        self.request(message.to_value()).await
    }
}
