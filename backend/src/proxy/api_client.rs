//! Gemini API client
//!
//! Direct HTTP client for the `generateContent` endpoint. The proxy turns
//! the widget's `{ userMessage, context }` into a single-part prompt.

use crate::error::AppError;
use crate::proxy::gemini_types::{GeminiApiRequest, GeminiApiResponse};

/// Reply used when neither a candidate nor a raw body is available
pub const EMPTY_REPLY: &str = "Lo siento, no hubo respuesta del modelo.";

/// Prompt sent upstream for one widget request
pub fn build_prompt(context: &str, user_message: &str) -> String {
    format!("{}\n\nPregunta del usuario: {}", context, user_message)
}

/// Successful upstream exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiReply {
    /// Text to show the customer
    pub reply: String,
    /// Raw upstream body
    pub raw: String,
}

/// Pick the reply text: candidate text, else raw body, else the apology
pub fn extract_reply(raw: &str) -> String {
    let candidate = serde_json::from_str::<GeminiApiResponse>(raw)
        .ok()
        .and_then(|parsed| parsed.first_text().map(str::to_string));

    match candidate {
        Some(text) => text,
        None if !raw.is_empty() => {
            tracing::warn!("Could not extract candidate text, replying with raw body");
            raw.to_string()
        }
        None => EMPTY_REPLY.to_string(),
    }
}

/// Call Gemini with a prompt
///
/// # Errors
/// * `AppError::Transport` if the request could not be sent or read
/// * `AppError::Upstream` if Gemini answered with a non-success status
pub async fn call_gemini(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    prompt: &str,
) -> Result<GeminiReply, AppError> {
    let url = format!("{}/models/{}:generateContent", base_url, model);

    tracing::debug!(
        model = %model,
        prompt_len = prompt.len(),
        "Calling Gemini API"
    );

    let response = client
        .post(&url)
        .query(&[("key", api_key)])
        .json(&GeminiApiRequest::from_prompt(prompt))
        .send()
        .await
        .map_err(|e| AppError::Transport(format!("Failed to reach Gemini API: {}", e)))?;

    let status = response.status();
    let raw = response
        .text()
        .await
        .map_err(|e| AppError::Transport(format!("Failed to read Gemini API response: {}", e)))?;

    if !status.is_success() {
        tracing::error!(
            status_code = status.as_u16(),
            error_body = %raw,
            "Gemini API returned error status"
        );
        return Err(AppError::Upstream {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            raw,
        });
    }

    let reply = extract_reply(&raw);
    tracing::debug!(
        response_len = reply.len(),
        "Received response from Gemini API"
    );

    Ok(GeminiReply { reply, raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[test]
    fn test_build_prompt() {
        assert_eq!(
            build_prompt("Eres Sofía", "¿Precio?"),
            "Eres Sofía\n\nPregunta del usuario: ¿Precio?"
        );
    }

    #[test]
    fn test_extract_reply_fallbacks() {
        assert_eq!(
            extract_reply(r#"{"candidates":[{"content":{"parts":[{"text":"Hola"}]}}]}"#),
            "Hola"
        );
        assert_eq!(extract_reply(r#"{"candidates":[]}"#), r#"{"candidates":[]}"#);
        assert_eq!(extract_reply("not json"), "not json");
        assert_eq!(extract_reply(""), EMPTY_REPLY);
    }

    #[tokio::test]
    async fn test_call_gemini_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "contents": [{"parts": [{"text": "ctx\n\nPregunta del usuario: hola"}]}]
            })))
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"¡Hola!"}],"role":"model"}}]}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let result = call_gemini(
            &client,
            &server.url(),
            "test-key",
            "gemini-2.5-flash",
            &build_prompt("ctx", "hola"),
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(result.reply, "¡Hola!");
        assert!(result.raw.contains("candidates"));
    }

    #[tokio::test]
    async fn test_call_gemini_error_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error": "Rate limit exceeded"}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let err = call_gemini(&client, &server.url(), "k", "gemini-2.5-flash", "p")
            .await
            .unwrap_err();

        mock.assert_async().await;
        match err {
            AppError::Upstream {
                status,
                status_text,
                raw,
            } => {
                assert_eq!(status, 429);
                assert_eq!(status_text, "Too Many Requests");
                assert!(raw.contains("Rate limit"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_call_gemini_unreachable() {
        let client = reqwest::Client::new();
        let err = call_gemini(&client, "http://127.0.0.1:1", "k", "m", "p")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }
}
