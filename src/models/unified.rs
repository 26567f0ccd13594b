use anyhow::{Context as _, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::traits::Model;
use super::types::{ChatMessage, MessageRole, ModelConfig, ModelResponse, TokenUsage};
use crate::app::LiteLlmConfig;
use crate::constants::{HEALTH_CHECK_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS};

/// Model reached through a LiteLLM proxy.
///
/// Every provider speaks the OpenAI chat-completions format through the proxy,
/// so one client covers all of them.
pub struct UnifiedModel {
    client: Client,
    proxy_url: String,
    model_name: String,
    master_key: Option<String>,
}

impl UnifiedModel {
    pub fn new(model_name: &str, config: &LiteLlmConfig) -> Result<Self> {
        let proxy_url = std::env::var("LITELLM_PROXY_URL")
            .unwrap_or_else(|_| config.proxy_url.clone())
            .trim_end_matches('/')
            .to_string();

        // Priority: Environment variable > Config > None
        let master_key = std::env::var("LITELLM_MASTER_KEY")
            .ok()
            .or_else(|| config.master_key.clone());

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
                .build()?,
            proxy_url,
            model_name: model_name.to_string(),
            master_key,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.master_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }
}

#[async_trait]
impl Model for UnifiedModel {
    async fn chat(&self, messages: &[ChatMessage], config: &ModelConfig) -> Result<ModelResponse> {
        let json_messages: Vec<_> = messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                    MessageRole::System => "system",
                };
                json!({ "role": role, "content": msg.content })
            })
            .collect();

        let mut request_body = json!({
            "model": self.model_name,
            "messages": json_messages,
            "stream": false,
        });
        if let Some(temp) = config.temperature {
            request_body["temperature"] = json!(temp);
        }
        if let Some(max_tokens) = config.max_tokens {
            request_body["max_tokens"] = json!(max_tokens);
        }
        if let Some(top_p) = config.top_p {
            request_body["top_p"] = json!(top_p);
        }

        let url = format!("{}/v1/chat/completions", self.proxy_url);
        let response = self
            .authorized(self.client.post(&url).json(&request_body))
            .send()
            .await
            .with_context(|| format!("Failed to connect to LiteLLM proxy at {}", self.proxy_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("LiteLLM proxy error ({}): {}", status, error_text);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("Malformed chat completion response")?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("Chat completion contained no choices")?;

        Ok(ModelResponse {
            content,
            usage: completion.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model_name: self.model_name.clone(),
        })
    }

    fn name(&self) -> &str {
        &self.model_name
    }

    fn is_local(&self) -> bool {
        self.model_name.starts_with("ollama/") || self.model_name.starts_with("local/")
    }

    async fn validate_connection(&self) -> Result<bool> {
        let health_client = Client::builder()
            .timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS))
            .build()?;

        for endpoint in ["health", "models"] {
            let url = format!("{}/{}", self.proxy_url, endpoint);
            if let Ok(response) = self.authorized(health_client.get(&url)).send().await {
                return Ok(response.status().is_success());
            }
        }
        Ok(false)
    }
}

// Response structures for LiteLLM proxy (OpenAI format)

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}
