//! Terminal chat driver
//!
//! Runs a live chat session against the proxy (`CHAT_ENDPOINT`, default
//! `http://127.0.0.1:8080/api/chat`). Plain lines are sent as messages;
//! `/rate N`, `/reconnect`, `/toggle` and `/quit` drive the rest of the
//! widget. `/contactar [banner|servicios|club|<raza>]` prints the matching
//! WhatsApp link.

use rinconcito_backend::chat::{
    ChatConfig, ChatEvent, ChatView, RemoteClient, SessionController, ViewUpdate,
};
use rinconcito_backend::chat::models::Sender;
use rinconcito_backend::services::{contact_link, html_to_plain, ContactTopic};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Prints view updates to stdout
struct ConsoleView;

impl ChatView for ConsoleView {
    fn apply(&self, update: ViewUpdate) {
        match update {
            ViewUpdate::WidgetVisible(visible) => {
                println!("[widget {}]", if visible { "open" } else { "hidden" });
            }
            ViewUpdate::ClearMessages => println!("----------------------------------------"),
            ViewUpdate::AgentLabel(label) => println!("== {} ==", label),
            ViewUpdate::Message(entry) => {
                let who = match entry.sender {
                    Sender::User => "Tú",
                    Sender::Bot => "Agente",
                };
                println!("{}: {}\n", who, html_to_plain(&entry.content));
            }
            ViewUpdate::Loading(true) => println!("..."),
            ViewUpdate::Loading(false) | ViewUpdate::Chime { .. } => {}
            ViewUpdate::HandoffLink { label, url } | ViewUpdate::ComplaintLink { label, url } => {
                println!("[{}] {}\n", label, url);
            }
            ViewUpdate::RatingPrompt { question, levels } => {
                println!("{} (/rate 1-{})", question, levels);
            }
            ViewUpdate::RatingSelection(chosen) => {
                println!("{}", "★".repeat(chosen as usize));
            }
            ViewUpdate::RatingClosed => {}
            ViewUpdate::Feedback(text) => println!("{}\n", text),
            ViewUpdate::ReconnectOffer { visible, label } => {
                if visible {
                    println!("[{}] /reconnect", label);
                }
            }
            ViewUpdate::Connecting { visible, text } => {
                if visible {
                    println!("{}", text);
                }
            }
        }
    }
}

/// Map `/contactar <tema>` to a contact topic
fn parse_contact(line: &str) -> Option<ContactTopic> {
    let rest = line.trim().strip_prefix("/contactar")?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let topic = match rest.trim() {
        "" | "banner" => ContactTopic::Banner,
        "servicios" => ContactTopic::Services,
        "club" => ContactTopic::Club,
        breed => ContactTopic::Breed(breed.to_string()),
    };
    Some(topic)
}

/// Map one input line to the events it stands for
fn parse_command(line: &str) -> Option<Vec<ChatEvent>> {
    let line = line.trim();
    if line == "/quit" {
        return None;
    }
    let events = if let Some(level) = line.strip_prefix("/rate") {
        match level.trim().parse::<u8>() {
            Ok(level) => vec![ChatEvent::SelectRating(level), ChatEvent::SubmitRating],
            Err(_) => {
                println!("Uso: /rate N");
                Vec::new()
            }
        }
    } else if line == "/reconnect" {
        vec![ChatEvent::Reconnect]
    } else if line == "/toggle" {
        vec![ChatEvent::Toggle]
    } else {
        vec![ChatEvent::Submit(line.to_string())]
    };
    Some(events)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ChatConfig::from_env();
    config.validate()?;
    info!(endpoint = %config.endpoint, "Starting console chat");

    let phone = config.whatsapp_phone.clone();
    let remote = RemoteClient::http(&config.endpoint, config.retry_delay);
    let handle = SessionController::spawn(config, remote, Arc::new(ConsoleView));
    handle.send(ChatEvent::Toggle);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(topic) = parse_contact(&line) {
            println!("[WhatsApp] {}\n", contact_link(&phone, &topic));
            continue;
        }
        let Some(events) = parse_command(&line) else {
            break;
        };
        for event in events {
            if !handle.send(event) {
                anyhow::bail!("chat controller stopped");
            }
        }
    }

    handle.send(ChatEvent::Shutdown);
    Ok(())
}
