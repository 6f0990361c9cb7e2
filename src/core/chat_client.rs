//! HTTP backend for OpenAI-compatible `chat/completions` endpoints.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::{ChatRequest, ChatResponse};
use crate::core::pipeline::{CompletionBackend, DispatchError};

/// Groq's OpenAI-compatible API root.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ChatClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn completions_url(&self) -> String {
        endpoint_url(&self.base_url, "chat/completions")
    }
}

#[async_trait]
impl CompletionBackend for ChatClient {
    async fn dispatch(&self, request: &ChatRequest) -> Result<ChatResponse, DispatchError> {
        let url = self.completions_url();
        debug!(%url, model = %request.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Completion request rejected");
            return Err(DispatchError::Api {
                status: status.as_u16(),
                message: format_api_error(&body),
            });
        }

        serde_json::from_str::<ChatResponse>(&body).map_err(|err| {
            warn!(error = %err, "Completion response did not decode");
            DispatchError::Decode(err.to_string())
        })
    }
}

/// Joins a base URL and an endpoint path without doubling slashes.
fn endpoint_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .get("error")
                .and_then(|v| v.as_str().map(str::to_owned))
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}

/// Condenses an error body into one readable line.
///
/// JSON bodies are reduced to their `error.message` (or `error`/`message`)
/// when present; anything else is collapsed onto a single line.
fn format_api_error(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty response body>".to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&value) {
            return summary;
        }
        return value.to_string();
    }

    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatMessage;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    type CapturedRequest = (String, Vec<(String, String)>, Vec<u8>);

    async fn read_http_request(
        stream: &mut tokio::net::TcpStream,
    ) -> Result<CapturedRequest, String> {
        let mut buffer = Vec::new();
        let mut header_end = None;
        while header_end.is_none() {
            let mut chunk = [0_u8; 1024];
            let read = stream
                .read(&mut chunk)
                .await
                .map_err(|err| err.to_string())?;
            if read == 0 {
                return Err("Unexpected EOF while reading HTTP headers".to_string());
            }
            buffer.extend_from_slice(&chunk[..read]);
            header_end = buffer
                .windows(4)
                .position(|window| window == b"\r\n\r\n")
                .map(|index| index + 4);
        }

        let header_end = header_end.expect("header end should exist");
        let header_text =
            std::str::from_utf8(&buffer[..header_end]).map_err(|err| err.to_string())?;
        let mut lines = header_text.split("\r\n").filter(|line| !line.is_empty());
        let request_line = lines
            .next()
            .ok_or_else(|| "Missing HTTP request line".to_string())?
            .to_string();

        let mut headers = Vec::new();
        let mut content_length = 0_usize;
        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().to_string();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse::<usize>().map_err(|err| err.to_string())?;
            }
            headers.push((name.to_string(), value));
        }

        let mut body = buffer[header_end..].to_vec();
        while body.len() < content_length {
            let mut chunk = vec![0_u8; content_length - body.len()];
            let read = stream
                .read(&mut chunk)
                .await
                .map_err(|err| err.to_string())?;
            if read == 0 {
                return Err("Unexpected EOF while reading HTTP body".to_string());
            }
            body.extend_from_slice(&chunk[..read]);
        }
        body.truncate(content_length);

        Ok((request_line, headers, body))
    }

    /// Serves one canned response and hands back what the client sent.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<Result<CapturedRequest, String>>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let addr = listener.local_addr().expect("local addr should resolve");

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.map_err(|err| err.to_string())?;
            let captured = read_http_request(&mut stream).await?;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream
                .write_all(response.as_bytes())
                .await
                .map_err(|err| err.to_string())?;
            Ok(captured)
        });

        (format!("http://{addr}/v1/"), server)
    }

    fn local_client(base_url: &str) -> ChatClient {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .expect("client should build");
        ChatClient::with_client(client, base_url, "test-key")
    }

    fn sample_request() -> ChatRequest {
        ChatRequest {
            model: "llama3-70b-8192".to_string(),
            messages: vec![ChatMessage::user("As a pirate, continue")],
        }
    }

    #[tokio::test]
    async fn dispatch_posts_request_and_decodes_choices() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Arr!"}}]}"#,
        )
        .await;

        let response = local_client(&base_url)
            .dispatch(&sample_request())
            .await
            .expect("dispatch should succeed");
        assert_eq!(response.choices[0].message.content.as_deref(), Some("Arr!"));

        let (request_line, headers, body) = server.await.unwrap().unwrap();
        assert_eq!(request_line, "POST /v1/chat/completions HTTP/1.1");
        let auth = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            .map(|(_, value)| value.as_str());
        assert_eq!(auth, Some("Bearer test-key"));

        let sent: ChatRequest = serde_json::from_slice(&body).unwrap();
        assert_eq!(sent, sample_request());
    }

    #[tokio::test]
    async fn dispatch_maps_error_status() {
        let (base_url, server) = serve_once(
            "401 Unauthorized",
            r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#,
        )
        .await;

        let err = local_client(&base_url)
            .dispatch(&sample_request())
            .await
            .unwrap_err();
        match err {
            DispatchError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API Key");
            }
            other => panic!("expected api error, got {other:?}"),
        }
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn dispatch_reports_undecodable_body() {
        let (base_url, server) = serve_once("200 OK", "<html>gateway</html>").await;

        let err = local_client(&base_url)
            .dispatch(&sample_request())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Decode(_)));
        server.await.unwrap().unwrap();
    }

    #[test]
    fn endpoint_url_handles_slashes() {
        assert_eq!(
            endpoint_url("https://api.groq.com/openai/v1", "chat/completions"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(
            endpoint_url("https://api.groq.com/openai/v1//", "/chat/completions"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn format_api_error_variants() {
        assert_eq!(
            format_api_error(r#"{"error":{"message":"model  overloaded\n now"}}"#),
            "model overloaded now"
        );
        assert_eq!(format_api_error(r#"{"error":"quota exceeded"}"#), "quota exceeded");
        assert_eq!(format_api_error(r#"{"message":"bad"}"#), "bad");
        assert_eq!(format_api_error(r#"{"status":"failed"}"#), r#"{"status":"failed"}"#);
        assert_eq!(format_api_error("  Bad\nGateway "), "Bad Gateway");
        assert_eq!(format_api_error(""), "<empty response body>");
    }

    #[test]
    fn debug_output_hides_api_key() {
        let client = ChatClient::with_client(reqwest::Client::new(), DEFAULT_BASE_URL, "sk-secret");
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
