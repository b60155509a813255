//! OpenAI-compatible chat completion client (DeepSeek by default)

use super::ChatProvider;
use crate::config::AiConfig;
use crate::error::ZangliError;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Longest slice of an error body kept in error messages
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

pub struct DeepSeekProvider {
    client: ClientWithMiddleware,
    endpoint: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

fn completions_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

fn parse_reply(body: &[u8]) -> Result<String> {
    let response: ChatResponse =
        serde_json::from_slice(body).context("Failed to parse chat completion response")?;
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| anyhow!("Chat completion response contained no choices"))
}

impl DeepSeekProvider {
    /// Build a provider from the AI settings; requires an API key
    pub fn new(config: &AiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("No API key configured for the chat provider"))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            endpoint: completions_endpoint(&config.base_url),
            api_key,
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
        })
    }

    fn request_body(&self, prompt: &str) -> Result<Vec<u8>> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
        };
        Ok(serde_json::to_vec(&request)?)
    }
}

#[async_trait]
impl ChatProvider for DeepSeekProvider {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(name = "chat_completion", skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, ZangliError> {
        let start = Instant::now();
        let body = self.request_body(prompt)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!("Chat completion request failed: {e}");
                ZangliError::upstream(format!("调用API时出错: {e}"))
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ZangliError::upstream(format!("读取API响应时出错: {e}")))?;
        debug!(
            "Chat completion responded {} in {:.3}s",
            status,
            start.elapsed().as_secs_f64()
        );

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            warn!("Chat provider returned HTTP {}", status);
            return Err(ZangliError::upstream(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(&text)
            )));
        }

        let reply = parse_reply(&bytes).map_err(|e| {
            let text = String::from_utf8_lossy(&bytes);
            ZangliError::upstream(format!("解析API响应时出错: {e:#} - 响应内容: {}", truncate(&text)))
        })?;

        info!(
            "Chat completion finished in {:.3}s ({} chars)",
            start.elapsed().as_secs_f64(),
            reply.chars().count()
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: Option<&str>) -> AiConfig {
        AiConfig {
            api_key: key.map(str::to_string),
            ..AiConfig::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        assert!(DeepSeekProvider::new(&config(None)).is_err());
        assert!(DeepSeekProvider::new(&config(Some("  "))).is_err());
        assert!(DeepSeekProvider::new(&config(Some("sk-test"))).is_ok());
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            completions_endpoint("https://api.deepseek.com/"),
            "https://api.deepseek.com/chat/completions"
        );
        assert_eq!(
            completions_endpoint("http://localhost:8000/v1"),
            "http://localhost:8000/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body() {
        let provider = DeepSeekProvider::new(&config(Some("sk-test"))).unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(&provider.request_body("藏历新年").unwrap()).unwrap();

        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "藏历新年");
    }

    #[test]
    fn test_parse_reply() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"正月初一"}}]}"#;
        assert_eq!(parse_reply(body.as_bytes()).unwrap(), "正月初一");

        assert!(parse_reply(br#"{"choices":[]}"#).is_err());
        assert!(parse_reply(b"not json").is_err());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let long = "藏".repeat(ERROR_BODY_LIMIT + 10);
        assert_eq!(truncate(&long).chars().count(), ERROR_BODY_LIMIT);
        assert_eq!(truncate("short"), "short");
    }
}
