//! HTTP generation endpoint client
//!
//! Sends `{"prompt": "..."}` to a single configured endpoint and extracts the
//! poem from `{"poem": "..."}` (or `{"text": "..."}`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{GenerateError, Generator};
use crate::config::GeneratorConfig;
use crate::tracker::GenerationRequest;

/// Longest error body kept in diagnostics
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Serialize)]
struct PromptPayload<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct PoemResponse {
    poem: Option<String>,
    text: Option<String>,
}

/// Generator backed by the remote HTTP endpoint
pub struct HttpGenerator {
    endpoint: String,
    http: Client,
    timeout: Duration,
}

impl HttpGenerator {
    /// Create a client for `endpoint`; every call is bounded by `timeout`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GenerateError> {
        let endpoint = endpoint.into();
        debug!(%endpoint, ?timeout, "HttpGenerator::new: called");
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint,
            http,
            timeout,
        })
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GenerateError> {
        Self::new(config.endpoint.clone(), Duration::from_millis(config.timeout_ms))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, err: reqwest::Error) -> GenerateError {
        if err.is_timeout() {
            debug!(?self.timeout, "transport_error: deadline exceeded");
            GenerateError::Timeout(self.timeout)
        } else {
            GenerateError::Network(err)
        }
    }

    /// Pull the poem out of a success body
    fn parse_response(body: &str) -> Result<String, GenerateError> {
        let parsed: PoemResponse = serde_json::from_str(body)?;
        parsed
            .poem
            .or(parsed.text)
            .ok_or_else(|| GenerateError::InvalidResponse("missing 'poem' field".to_string()))
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        debug!(id = %request.id, endpoint = %self.endpoint, "complete: called");
        let payload = PromptPayload {
            prompt: request.prompt(),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        debug!(%status, body_len = body.len(), "complete: response received");

        if !status.is_success() {
            let message: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(GenerateError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Self::parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::PromptComposer;
    use crate::generator::{ErrorKind, GenerationResult, generate};
    use crate::tracker::RequestId;
    use uuid::Uuid;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(text: &str, lines: Option<u8>) -> GenerationRequest {
        let mut composer = PromptComposer::new();
        text.chars().for_each(|c| composer.append_char(c));
        if let Some(n) = lines {
            composer.set_line_count(n).unwrap();
        }
        GenerationRequest::new(RequestId::new(Uuid::now_v7(), 1), composer.snapshot())
    }

    fn generator(server: &MockServer, timeout: Duration) -> HttpGenerator {
        HttpGenerator::new(format!("{}/generate_poem", server.uri()), timeout).unwrap()
    }

    #[test]
    fn test_parse_response_fields() {
        assert_eq!(HttpGenerator::parse_response(r#"{"poem":"a"}"#).unwrap(), "a");
        assert_eq!(HttpGenerator::parse_response(r#"{"text":"b"}"#).unwrap(), "b");
        assert!(matches!(
            HttpGenerator::parse_response(r#"{"other":"c"}"#),
            Err(GenerateError::InvalidResponse(_))
        ));
        assert!(matches!(
            HttpGenerator::parse_response(r#"{"poem":5}"#),
            Err(GenerateError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_sends_single_prompt_field() {
        let server = MockServer::start().await;
        let req = request("اشتياق للأم", Some(5));

        Mock::given(method("POST"))
            .and(path("/generate_poem"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({"prompt": req.prompt()})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"poem": "يا أم\r\nشوقي"})))
            .expect(1)
            .mount(&server)
            .await;

        let result = generate(&generator(&server, Duration::from_secs(5)), &req).await;

        assert_eq!(result, GenerationResult::success("يا أم\nشوقي"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_protocol() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let result = generate(&generator(&server, Duration::from_secs(5)), &request("ورد", None)).await;

        match result {
            GenerationResult::Failure { kind, message } => {
                assert_eq!(kind, ErrorKind::Protocol);
                assert!(message.contains("500"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_protocol() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let result = generate(&generator(&server, Duration::from_secs(5)), &request("ورد", None)).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::Protocol));
    }

    #[tokio::test]
    async fn test_slow_endpoint_is_network_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"poem": "late"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let result = generate(&generator(&server, Duration::from_millis(100)), &request("ليل", None)).await;

        match result {
            GenerationResult::Failure { kind, message } => {
                assert_eq!(kind, ErrorKind::Network);
                assert!(message.contains("Timeout"));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refused_connection_is_network() {
        // Bind then drop a listener so the port is very likely closed
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let generator =
            HttpGenerator::new(format!("http://127.0.0.1:{}/generate_poem", port), Duration::from_secs(2)).unwrap();

        let result = generate(&generator, &request("ريح", None)).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::Network));
    }

    #[tokio::test]
    async fn test_blank_prompt_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"poem": "x"})))
            .expect(0)
            .mount(&server)
            .await;

        let result = generate(&generator(&server, Duration::from_secs(5)), &request("", None)).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::Empty));
    }
}
