//! Implements the `VisionExtractor` trait against an OpenAI-compatible chat-completions endpoint.

use crate::api::VisionExtractor;
use crate::error::{ImportError, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

/// The path appended to the configured base URL.
const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// The request body sent to the extraction service.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub(crate) model: String,
    pub(crate) messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub(crate) role: String,
    pub(crate) content: Vec<ContentPart>,
}

/// One part of a multi-part message.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub(crate) url: String,
}

impl ChatRequest {
    /// A single user message made of `prompt` followed by the image at `data_url`.
    pub fn with_image(
        model: impl Into<String>,
        prompt: impl Into<String>,
        data_url: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage {
                role: String::from("user"),
                content: vec![
                    ContentPart::Text {
                        text: prompt.into(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url.into(),
                        },
                    },
                ],
            }],
        }
    }
}

/// The response body returned by the extraction service. Only the fields we read are modeled.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub(crate) choices: Vec<Choice>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub(crate) message: ChoiceMessage,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub(crate) content: String,
}

impl ChatResponse {
    /// A response with a single choice whose content is `content`.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: ChoiceMessage {
                    content: content.into(),
                },
            }],
        }
    }
}

/// Talks to the extraction service over HTTP.
pub(crate) struct VisionClient {
    endpoint: String,
    api_key: Secret,
    client: reqwest::Client,
}

impl VisionClient {
    /// # Errors
    /// - `ImportError::Config` if `base_url` is empty. No request is ever attempted in that case.
    pub(crate) fn new(
        base_url: &str,
        api_key: Secret,
        timeout: Duration,
    ) -> Result<Self, ImportError> {
        if base_url.trim().is_empty() {
            return Err(ImportError::Config(String::from(
                "vision API URL is required",
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImportError::Config(format!("unable to build HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint(base_url),
            api_key,
            client,
        })
    }
}

fn endpoint(base_url: &str) -> String {
    format!("{}{COMPLETIONS_PATH}", base_url.trim().trim_end_matches('/'))
}

#[async_trait::async_trait]
impl VisionExtractor for VisionClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ImportError> {
        debug!("Sending {} to {}", request.model, self.endpoint);
        let mut builder = self.client.post(&self.endpoint).json(request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(self.api_key.expose());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ImportError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ImportError::Transport(e.without_url().to_string()))?;
        trace!("Vision API responded with {status}: {body}");

        if !status.is_success() {
            return Err(ImportError::Service {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ImportError::Decode {
            reason: format!("failed to decode vision response: {e}"),
            raw: body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::FakeServer;

    fn request() -> ChatRequest {
        ChatRequest::with_image("gpt-4o", "extract", "data:image/jpeg;base64,AAAA")
    }

    #[test]
    fn test_request_wire_shape() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(
            serde_json::json!({
                "model": "gpt-4o",
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "extract"},
                        {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,AAAA"}}
                    ]
                }]
            }),
            json
        );
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            "http://localhost:1234/v1/chat/completions",
            endpoint("http://localhost:1234/")
        );
        assert_eq!(
            "https://vision.example/v1/chat/completions",
            endpoint("https://vision.example")
        );
    }

    #[test]
    fn test_missing_url_fails_fast() {
        let result = VisionClient::new("  ", Secret::default(), Duration::from_secs(1));
        assert!(matches!(result, Err(ImportError::Config(_))));
    }

    #[tokio::test]
    async fn test_complete_sends_bearer_and_decodes() {
        let reply = serde_json::to_string(&ChatResponse::with_content("[]")).unwrap();
        let server = FakeServer::start(200, reply).await;
        let client = VisionClient::new(
            &server.url(),
            Secret::new("test-key"),
            Duration::from_secs(5),
        )
        .unwrap();

        let response = client.complete(&request()).await.unwrap();
        assert_eq!("[]", response.choices[0].message.content);

        let seen = server.request().await;
        assert!(seen.starts_with("POST /v1/chat/completions "), "{seen}");
        assert!(seen.to_lowercase().contains("authorization: bearer test-key"));
        assert!(seen.contains("\"image_url\""));
    }

    #[tokio::test]
    async fn test_complete_omits_auth_without_key() {
        let reply = serde_json::to_string(&ChatResponse::default()).unwrap();
        let server = FakeServer::start(200, reply).await;
        let client =
            VisionClient::new(&server.url(), Secret::default(), Duration::from_secs(5)).unwrap();
        client.complete(&request()).await.unwrap();
        let seen = server.request().await;
        assert!(!seen.to_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_service_error() {
        let server = FakeServer::start(500, "model overloaded").await;
        let client =
            VisionClient::new(&server.url(), Secret::default(), Duration::from_secs(5)).unwrap();
        match client.complete(&request()).await {
            Err(ImportError::Service { status, body }) => {
                assert_eq!(500, status);
                assert_eq!("model overloaded", body);
            }
            other => panic!("expected a service error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_envelope_is_decode_error() {
        let server = FakeServer::start(200, "<html>").await;
        let client =
            VisionClient::new(&server.url(), Secret::default(), Duration::from_secs(5)).unwrap();
        match client.complete(&request()).await {
            Err(ImportError::Decode { raw, .. }) => assert_eq!("<html>", raw),
            other => panic!("expected a decode error, got {other:?}"),
        }
    }
}
