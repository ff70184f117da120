//! Chat module
//!
//! Session state machine of the site chat widget: persona assignment, name
//! capture, conversation turns against the model proxy, reply routing,
//! inactivity timers, rating and reconnect.

pub mod config;
pub mod controller;
pub mod models;
pub mod prompts;
pub mod rating;
pub mod remote;
pub mod router;
pub mod scheduler;
pub mod view;

pub use config::{ChatConfig, ConfigError};
pub use controller::{ChatEvent, ChatHandle, Deferred, SessionController};
pub use models::{Phase, Role, Sender, Session, TranscriptEntry, Turn};
pub use remote::{ChatTransport, ClientError, HttpTransport, RemoteClient};
pub use router::{Directive, RouteStep};
pub use view::{ChatView, RecordingView, ViewUpdate};
