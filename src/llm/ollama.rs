//! Ollama 客户端
//!
//! 调用本地 Ollama 的 /api/generate（stream=false），读取 response 与 prompt_eval_count / eval_count；
//! 回答中的多余空白折叠为单个空格。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::llm::{Completion, LlmClient, LlmError};

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.1";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}

/// Ollama 客户端：持有 HTTP Client、端点与模型名
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<&str>, model: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url
                .unwrap_or(OLLAMA_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(LlmError::Api(format!("HTTP {}", resp.status())));
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        let text = body.response.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut completion = Completion::text(text);
        if let (Some(p), Some(c)) = (body.prompt_eval_count, body.eval_count) {
            completion = completion.with_usage(p, c);
        }
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_collapses_whitespace() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3.1",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "  AI is   the study\n of agents. ",
                "prompt_eval_count": 12,
                "eval_count": 6
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(Some(&server.uri()), "llama3.1", 5);
        let out = client.complete("Explain AI in one sentence.").await.unwrap();
        assert_eq!(out.text, "AI is the study of agents.");
        assert_eq!(out.prompt_tokens, Some(12));
        assert_eq!(out.completion_tokens, Some(6));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = OllamaClient::new(Some(&server.uri()), "llama3.1", 5);
        let err = client.complete("hi").await.unwrap_err();
        assert!(matches!(err, LlmError::Api(_)));
    }
}
