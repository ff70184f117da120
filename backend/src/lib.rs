//! Rinconcito chat backend
//!
//! Session logic of the site chat widget plus the model proxy it talks to.
//! The proxy binary is in `src/main.rs`; `src/bin/chat_console.rs` drives a
//! session from a terminal.

pub mod chat;
pub mod config;
pub mod error;
pub mod proxy;
pub mod server;
pub mod services;
/// Front-end preference storage
pub mod state;
