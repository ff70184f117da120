//! Model proxy
//!
//! Thin server-side relay between the chat widget and Gemini, keeping the
//! API key off the client.

pub mod api_client;
pub mod gemini_types;
pub mod handler;

pub use api_client::{build_prompt, call_gemini, GeminiReply};
pub use handler::{chat, ProxyState};
