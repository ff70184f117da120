//! Chat proxy handler
//!
//! `POST /api/chat` accepts `{ userMessage, context }` and answers
//! `{ reply }`, plus `__debug` outside production.

use crate::config::{Config, GeminiConfig};
use crate::error::{truncate_raw, AppError};
use crate::proxy::api_client::{build_prompt, call_gemini};
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Shared state of the proxy routes
#[derive(Debug, Clone)]
pub struct ProxyState {
    /// Shared HTTP client (connection pooling)
    pub http_client: reqwest::Client,
    /// Upstream settings
    pub gemini: GeminiConfig,
    /// Withhold `__debug` payloads
    pub production: bool,
}

impl ProxyState {
    /// Build state from configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.gemini.timeout_secs))
            .build()?;
        Ok(Self {
            http_client,
            gemini: config.gemini.clone(),
            production: config.is_production(),
        })
    }
}

/// Request body sent by the widget
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    /// Latest customer message
    #[serde(default)]
    pub user_message: Option<String>,
    /// Instructions for the model
    #[serde(default)]
    pub context: Option<String>,
}

/// Parse the raw body; an empty body counts as `{}`
pub fn parse_payload(body: &str) -> Result<ChatPayload, AppError> {
    if body.trim().is_empty() {
        return Ok(ChatPayload::default());
    }
    serde_json::from_str(body).map_err(|e| AppError::InvalidPayload(e.to_string()))
}

/// Forward one widget message to Gemini
pub async fn chat(
    State(state): State<Arc<ProxyState>>,
    body: String,
) -> Result<Json<Value>, AppError> {
    let payload = parse_payload(&body)?;
    let user_message = payload.user_message.unwrap_or_default();
    let context = payload.context.unwrap_or_default();

    info!(
        user_message_len = user_message.chars().count(),
        "Chat proxy invoked"
    );

    let api_key = state
        .gemini
        .api_key
        .as_deref()
        .ok_or(AppError::MissingApiKey)?;

    let result = call_gemini(
        &state.http_client,
        &state.gemini.base_url,
        api_key,
        &state.gemini.model,
        &build_prompt(&context, &user_message),
    )
    .await?;

    let mut response = json!({ "reply": result.reply });
    if !state.production {
        response["__debug"] = json!({ "raw": truncate_raw(&result.raw) });
    }
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payload() {
        let payload = parse_payload(r#"{"userMessage":"hola","context":"ctx"}"#).unwrap();
        assert_eq!(payload.user_message.as_deref(), Some("hola"));
        assert_eq!(payload.context.as_deref(), Some("ctx"));

        let empty = parse_payload("").unwrap();
        assert_eq!(empty.user_message, None);

        let nulls = parse_payload(r#"{"userMessage":null}"#).unwrap();
        assert_eq!(nulls.user_message, None);
    }

    #[test]
    fn test_parse_payload_rejects_garbage() {
        assert!(matches!(
            parse_payload("{not json"),
            Err(AppError::InvalidPayload(_))
        ));
        assert!(matches!(
            parse_payload("null"),
            Err(AppError::InvalidPayload(_))
        ));
    }
}
