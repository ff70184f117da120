//! Remote client
//!
//! Sends one chat turn to the proxy endpoint and returns the model's reply.
//! The transport is a trait so the session can be driven without a network.

use crate::chat::models::Turn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Attempts made for a request hitting a transient channel failure
pub const MAX_ATTEMPTS: u32 = 2;

/// Errors returned by the remote client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Network failure or non-success HTTP status
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Body was empty, not JSON, or lacked a string `reply`
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The connection closed before the exchange completed
    #[error("Channel closed prematurely: {0}")]
    TransientChannelClosed(String),
}

impl ClientError {
    /// Whether the request may succeed if sent again
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::TransientChannelClosed(_))
    }
}

/// Body posted to the proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    /// Most recent user utterance
    pub user_message: String,
    /// System instructions for the model
    pub context: String,
}

impl ProxyRequest {
    /// Build a request from the context and the history's last turn
    pub fn from_history(context: &str, history: &[Turn]) -> Self {
        let user_message = history
            .last()
            .map(|turn| turn.text.clone())
            .unwrap_or_default();
        Self {
            user_message,
            context: context.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProxyReply {
    #[serde(default)]
    reply: Option<String>,
}

/// Parse the proxy's response body
pub fn parse_reply(raw: &str) -> Result<String, ClientError> {
    if raw.trim().is_empty() {
        return Err(ClientError::MalformedResponse(
            "empty response body".to_string(),
        ));
    }
    let parsed: ProxyReply = serde_json::from_str(raw).map_err(|e| {
        ClientError::MalformedResponse(format!("Failed to parse proxy response: {}", e))
    })?;
    parsed
        .reply
        .ok_or_else(|| ClientError::MalformedResponse("missing `reply` field".to_string()))
}

/// Transport for one proxy round trip
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post the request and return the reply text
    async fn post(&self, request: &ProxyRequest) -> Result<String, ClientError>;
}

/// HTTP transport posting JSON to the proxy endpoint
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport using a shared client (connection pooling)
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn post(&self, request: &ProxyRequest) -> Result<String, ClientError> {
        debug!(
            endpoint = %self.endpoint,
            message_len = request.user_message.len(),
            context_len = request.context.len(),
            "Posting chat turn to proxy"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "no body".to_string());
            error!(
                status_code = status.as_u16(),
                error_body = %body,
                "Proxy returned error status"
            );
            return Err(ClientError::RemoteUnavailable(format!(
                "Proxy returned error status {}",
                status.as_u16()
            )));
        }

        let raw = response.text().await.map_err(classify_reqwest_error)?;
        parse_reply(&raw)
    }
}

/// Map a reqwest failure to a client error by inspecting its source chain
fn classify_reqwest_error(err: reqwest::Error) -> ClientError {
    if !err.is_connect() && (err.is_body() || is_channel_closed(&err)) {
        ClientError::TransientChannelClosed(err.to_string())
    } else {
        ClientError::RemoteUnavailable(format!("Failed to reach proxy: {}", err))
    }
}

fn is_channel_closed(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(hyper_err) = e.downcast_ref::<hyper::Error>() {
            if hyper_err.is_incomplete_message() || hyper_err.is_closed() {
                return true;
            }
        }
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        current = e.source();
    }
    false
}

/// Client used by the session controller
///
/// Retries exactly once on [`ClientError::TransientChannelClosed`]; every
/// other error is returned as is.
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn ChatTransport>,
    retry_delay: Duration,
}

impl RemoteClient {
    /// Create a client over an arbitrary transport
    pub fn new(transport: Arc<dyn ChatTransport>, retry_delay: Duration) -> Self {
        Self {
            transport,
            retry_delay,
        }
    }

    /// Create an HTTP client posting to `endpoint`
    pub fn http(endpoint: &str, retry_delay: Duration) -> Self {
        Self::new(
            Arc::new(HttpTransport::new(reqwest::Client::new(), endpoint)),
            retry_delay,
        )
    }

    /// Send the context and the latest turn of `history`, return the reply
    pub async fn complete(&self, context: &str, history: &[Turn]) -> Result<String, ClientError> {
        let request = ProxyRequest::from_history(context, history);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.transport.post(&request).await {
                Ok(reply) => return Ok(reply),
                Err(ClientError::TransientChannelClosed(reason)) if attempt < MAX_ATTEMPTS => {
                    warn!(attempt, reason = %reason, "Channel closed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(ClientError::TransientChannelClosed(reason)) => {
                    error!(attempt, reason = %reason, "Channel closed, giving up");
                    return Err(ClientError::RemoteUnavailable(format!(
                        "channel closed after {} attempts: {}",
                        attempt, reason
                    )));
                }
                Err(e) => {
                    error!(attempt, error = %e, "Remote call failed");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<String, ClientError>>>,
        calls: Mutex<Vec<ProxyRequest>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<String, ClientError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn post(&self, request: &ProxyRequest) -> Result<String, ClientError> {
            self.calls.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ClientError::RemoteUnavailable("script empty".into())))
        }
    }

    fn closed() -> Result<String, ClientError> {
        Err(ClientError::TransientChannelClosed("connection reset".into()))
    }

    #[test]
    fn test_request_uses_last_turn() {
        let history = vec![Turn::model("bienvenida"), Turn::user("hola")];
        let request = ProxyRequest::from_history("ctx", &history);
        assert_eq!(request.user_message, "hola");

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""userMessage":"hola""#));
        assert!(json.contains(r#""context":"ctx""#));

        assert_eq!(ProxyRequest::from_history("ctx", &[]).user_message, "");
    }

    #[test]
    fn test_parse_reply() {
        assert_eq!(parse_reply(r#"{"reply":"hola"}"#), Ok("hola".to_string()));
        assert!(matches!(parse_reply(""), Err(ClientError::MalformedResponse(_))));
        assert!(matches!(parse_reply("nope"), Err(ClientError::MalformedResponse(_))));
        assert!(matches!(parse_reply("{}"), Err(ClientError::MalformedResponse(_))));
        assert!(matches!(
            parse_reply(r#"{"reply":42}"#),
            Err(ClientError::MalformedResponse(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_retried_once() {
        let transport = ScriptedTransport::new(vec![closed(), Ok("ok".to_string())]);
        let client = RemoteClient::new(transport.clone(), Duration::from_millis(350));

        let start = tokio::time::Instant::now();
        let reply = client.complete("ctx", &[Turn::user("hola")]).await;

        assert_eq!(reply, Ok("ok".to_string()));
        assert_eq!(transport.call_count(), 2);
        assert!(start.elapsed() >= Duration::from_millis(350));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_exhaustion_becomes_unavailable() {
        let transport = ScriptedTransport::new(vec![closed(), closed(), Ok("late".to_string())]);
        let client = RemoteClient::new(transport.clone(), Duration::from_millis(350));

        let result = client.complete("ctx", &[Turn::user("hola")]).await;

        assert!(matches!(result, Err(ClientError::RemoteUnavailable(_))));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        let transport = ScriptedTransport::new(vec![
            Err(ClientError::MalformedResponse("bad".into())),
            Ok("never".to_string()),
        ]);
        let client = RemoteClient::new(transport.clone(), Duration::from_millis(350));

        let result = client.complete("ctx", &[]).await;

        assert_eq!(result, Err(ClientError::MalformedResponse("bad".into())));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_http_transport_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "userMessage": "hola",
                "context": "ctx"
            })))
            .with_status(200)
            .with_body(r#"{"reply":"¡Hola!"}"#)
            .create_async()
            .await;

        let client = RemoteClient::http(&format!("{}/api/chat", server.url()), Duration::ZERO);
        let reply = client.complete("ctx", &[Turn::user("hola")]).await;

        mock.assert_async().await;
        assert_eq!(reply, Ok("¡Hola!".to_string()));
    }

    #[tokio::test]
    async fn test_http_transport_error_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .with_status(502)
            .with_body(r#"{"__error":"Gemini API returned 500","reply":"x"}"#)
            .create_async()
            .await;

        let client = RemoteClient::http(&format!("{}/api/chat", server.url()), Duration::ZERO);
        let result = client.complete("ctx", &[Turn::user("hola")]).await;

        mock.assert_async().await;
        let err = result.unwrap_err();
        assert!(matches!(err, ClientError::RemoteUnavailable(_)));
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn test_http_transport_missing_reply() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(r#"{"answer":"hola"}"#)
            .create_async()
            .await;

        let client = RemoteClient::http(&format!("{}/api/chat", server.url()), Duration::ZERO);
        let result = client.complete("ctx", &[Turn::user("hola")]).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(ClientError::MalformedResponse(_))));
    }

    /// Read one full request (headers plus `Content-Length` body)
    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Server that answers every request with `response` and then drops
    /// the socket; returns the endpoint and a connection counter
    async fn spawn_raw_server(response: &'static [u8]) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                read_request(&mut stream).await;
                let _ = stream.write_all(response).await;
                let _ = stream.shutdown().await;
            }
        });
        (format!("http://{}/api/chat", addr), connections)
    }

    fn request() -> ProxyRequest {
        ProxyRequest::from_history("ctx", &[Turn::user("hola")])
    }

    #[tokio::test]
    async fn test_http_transport_closed_before_response_is_transient() {
        let (endpoint, _) = spawn_raw_server(b"").await;
        let transport = HttpTransport::new(reqwest::Client::new(), endpoint);

        let result = transport.post(&request()).await;

        assert!(
            matches!(result, Err(ClientError::TransientChannelClosed(_))),
            "unexpected result: {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_http_transport_truncated_body_is_transient() {
        let (endpoint, _) = spawn_raw_server(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"reply\"",
        )
        .await;
        let transport = HttpTransport::new(reqwest::Client::new(), endpoint);

        let result = transport.post(&request()).await;

        assert!(
            matches!(result, Err(ClientError::TransientChannelClosed(_))),
            "unexpected result: {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_closed_connection_retried_once_over_http() {
        let (endpoint, connections) = spawn_raw_server(b"").await;
        let client = RemoteClient::http(&endpoint, Duration::from_millis(10));

        let result = client.complete("ctx", &[Turn::user("hola")]).await;

        assert!(matches!(result, Err(ClientError::RemoteUnavailable(_))));
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_http_transport_refused_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let transport = HttpTransport::new(
            reqwest::Client::new(),
            format!("http://{}/api/chat", addr),
        );

        let result = transport.post(&request()).await;

        assert!(
            matches!(result, Err(ClientError::RemoteUnavailable(_))),
            "unexpected result: {:?}",
            result
        );
    }
}
