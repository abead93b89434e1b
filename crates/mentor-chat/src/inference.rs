//! Remote inference transport.
//!
//! Wire format: `POST {message, history, context}` answered by either
//! `{reply}` or `{error}`. Transport failures and payload errors surface the
//! same way so callers can treat them uniformly.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mentor_core::config::InferenceConfig;
use mentor_core::types::HistoryTurn;

use crate::error::ChatError;

/// Request body sent to the inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub message: String,
    pub history: Vec<HistoryTurn>,
    /// Socratic system instruction.
    pub context: String,
}

/// Response body from the inference service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InferenceResponse {
    /// Convert a payload-level error into `ChatError::Inference`.
    pub fn into_result(self) -> Result<Self, ChatError> {
        match self.error {
            Some(error) => Err(ChatError::Inference(error)),
            None => Ok(self),
        }
    }
}

/// An external text generation service.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Request one reply. Payload errors are returned as `Err`.
    async fn complete(&self, request: &InferenceRequest) -> Result<InferenceResponse, ChatError>;
}

/// JSON-over-HTTP inference client.
pub struct HttpInferenceClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpInferenceClient {
    pub fn new(config: &InferenceConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("socratic-mentor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatError::Inference(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn complete(&self, request: &InferenceRequest) -> Result<InferenceResponse, ChatError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::Inference(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Inference(format!("HTTP {}", status)));
        }

        let body: InferenceResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Inference(format!("Invalid response body: {}", e)))?;

        tracing::debug!(endpoint = %self.endpoint, "Inference response received");
        body.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn request() -> InferenceRequest {
        InferenceRequest {
            message: "¿Cómo dividimos el trabajo?".to_string(),
            history: vec![HistoryTurn {
                role: "assistant".to_string(),
                content: "¡Hola!".to_string(),
            }],
            context: "Eres un mentor".to_string(),
        }
    }

    /// Serve exactly one HTTP request with a fixed status and body.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&chunk[..n]);
                if request_complete(&received) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{}/api/mentor", addr)
    }

    fn request_complete(data: &[u8]) -> bool {
        let text = String::from_utf8_lossy(data);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        data.len() >= header_end + 4 + content_length
    }

    fn client_for(endpoint: String) -> HttpInferenceClient {
        HttpInferenceClient::new(&InferenceConfig {
            enabled: true,
            endpoint,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_request_wire_format() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["message"], "¿Cómo dividimos el trabajo?");
        assert_eq!(json["history"][0]["role"], "assistant");
        assert_eq!(json["context"], "Eres un mentor");
    }

    #[test]
    fn test_payload_error_is_inference_error() {
        let response: InferenceResponse =
            serde_json::from_str(r#"{"error":"model overloaded"}"#).unwrap();
        let err = response.into_result().unwrap_err();
        assert!(matches!(err, ChatError::Inference(ref m) if m == "model overloaded"));
    }

    #[tokio::test]
    async fn test_successful_reply() {
        let endpoint = serve_once("200 OK", r#"{"reply":"¿Qué tareas veis?"}"#).await;
        let response = client_for(endpoint).complete(&request()).await.unwrap();
        assert_eq!(response.reply.as_deref(), Some("¿Qué tareas veis?"));
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let endpoint = serve_once("503 Service Unavailable", "{}").await;
        let err = client_for(endpoint).complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let endpoint = serve_once("200 OK", "not json").await;
        let err = client_for(endpoint).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ChatError::Inference(_)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let client = client_for("http://127.0.0.1:1/api/mentor".to_string());
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, ChatError::Inference(_)));
    }
}
