//! Services module
//!
//! Text rendering and outbound link helpers shared by the chat session and
//! the front-ends.

pub mod links;
pub mod markdown;

pub use links::{contact_link, whatsapp_link, ContactTopic};
pub use markdown::{escape_html, html_to_plain, parse_markdown};
