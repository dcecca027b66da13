//! # Mailbrief
//!
//! Summarizes the email page in front of the user into short bullet points
//! using an LLM endpoint.
//!
//! ## Design
//!
//! - **Three contexts, one wire**: background, content, and popup surfaces
//!   talk only through tagged request/reply messages with a single reply
//!   per request
//! - **Resilient parsing**: structured `{"bullets": ...}` replies and
//!   free-text model output both render; parsing never fails
//! - **Proxy or direct**: calls go through a user-configured proxy or
//!   straight to the provider with stored credentials

pub mod background;
pub mod content;
pub mod extract;
pub mod gateway;
pub mod messages;
pub mod panel;
pub mod parse;
pub mod prompt;
pub mod runtime;
pub mod settings;

pub use extract::ContentSnapshot;
pub use parse::BulletSummary;
pub use runtime::Runtime;
pub use settings::{Mode, Settings, SettingsStore};
