//! Retrieval-augmented question answering
//!
//! A question is matched against the knowledge base, the best chunks are
//! folded into a prompt and the prompt is sent to a [`ChatProvider`].
//! Answers are kept in the persistent cache when it is available.

pub mod deepseek;
pub mod knowledge;

pub use deepseek::DeepSeekProvider;
pub use knowledge::{KnowledgeBase, KnowledgeChunk, build_prompt, keywords};

use crate::cache;
use crate::config::ZangliConfig;
use crate::error::ZangliError;
use async_trait::async_trait;
use rand::RngExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// A chat model that turns a prompt into an answer
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Identifier used to separate cached answers per model
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, ZangliError>;
}

pub struct AssistantService {
    knowledge: Arc<KnowledgeBase>,
    provider: Option<Arc<dyn ChatProvider>>,
    top_k: usize,
    cache_ttl: Option<Duration>,
}

fn jittered(ttl: Duration) -> Duration {
    let jitter: f32 = rand::rng().random_range(0.9..1.1);
    ttl.mul_f32(jitter)
}

impl AssistantService {
    #[must_use]
    pub fn new(
        knowledge: Arc<KnowledgeBase>,
        provider: Option<Arc<dyn ChatProvider>>,
        top_k: usize,
    ) -> Self {
        Self {
            knowledge,
            provider,
            top_k,
            cache_ttl: None,
        }
    }

    /// Cache answers for roughly `ttl`
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Build the service from configuration
    ///
    /// A missing or unreadable knowledge base and a missing API key are not
    /// fatal: the service answers without context, or reports that it is not
    /// configured.
    #[must_use]
    pub fn from_config(config: &ZangliConfig) -> Self {
        let knowledge = match KnowledgeBase::load(&config.knowledge.path, config.knowledge.skip) {
            Ok(kb) => kb,
            Err(e) => {
                warn!("Knowledge base unavailable, answering without context: {e:#}");
                KnowledgeBase::default()
            }
        };

        let provider = match DeepSeekProvider::new(&config.ai) {
            Ok(provider) => {
                info!("Chat provider configured with model {}", config.ai.model);
                let provider: Arc<dyn ChatProvider> = Arc::new(provider);
                Some(provider)
            }
            Err(e) => {
                warn!("AI assistant disabled: {e:#}");
                None
            }
        };

        let service = Self::new(Arc::new(knowledge), provider, config.knowledge.top_k);
        if config.cache.enabled {
            service.with_cache_ttl(Duration::from_secs(u64::from(config.cache.ttl_hours) * 3600))
        } else {
            service
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    #[must_use]
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Answer a question using retrieved context
    #[instrument(skip(self, question), fields(question_len = question.chars().count()))]
    pub async fn answer(&self, question: &str) -> Result<String, ZangliError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| ZangliError::not_configured("DeepSeek API 密钥未配置"))?;

        let chunks = self.knowledge.retrieve(question, self.top_k);
        let prompt = build_prompt(question, &chunks);
        let cache_key = format!("answer:{}:{}", provider.name(), prompt);

        if let Some(answer) = self.cached(&cache_key).await {
            debug!("Answer served from cache");
            return Ok(answer);
        }

        let answer = provider.complete(&prompt).await?;
        self.store(&cache_key, &answer).await;
        Ok(answer)
    }

    async fn cached(&self, key: &str) -> Option<String> {
        if self.cache_ttl.is_none() || !cache::is_initialized() {
            return None;
        }
        match cache::get::<String>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read answer cache: {e:#}");
                None
            }
        }
    }

    async fn store(&self, key: &str, answer: &str) {
        let Some(ttl) = self.cache_ttl else {
            return;
        };
        if !cache::is_initialized() {
            return;
        }
        if let Err(e) = cache::put(key, answer.to_string(), jittered(ttl)).await {
            warn!("Failed to cache answer: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProvider {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, prompt: &str) -> Result<String, ZangliError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("答复".to_string())
        }
    }

    fn knowledge() -> Arc<KnowledgeBase> {
        Arc::new(KnowledgeBase::new(vec![KnowledgeChunk {
            content: "藏历新年是藏历正月初一。".to_string(),
        }]))
    }

    #[tokio::test]
    async fn test_answer_uses_context() {
        let provider = Arc::new(RecordingProvider::default());
        let shared: Arc<dyn ChatProvider> = provider.clone();
        let service = AssistantService::new(knowledge(), Some(shared), 3);

        let answer = service.answer("藏历新年是哪天").await.unwrap();
        assert_eq!(answer, "答复");

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("藏历新年是藏历正月初一。"));
        assert!(prompts[0].contains("问题: 藏历新年是哪天"));
    }

    #[tokio::test]
    async fn test_answer_without_context_sends_question() {
        let provider = Arc::new(RecordingProvider::default());
        let shared: Arc<dyn ChatProvider> = provider.clone();
        let service = AssistantService::new(knowledge(), Some(shared), 3);

        service.answer("hello").await.unwrap();
        assert_eq!(provider.prompts.lock().unwrap()[0], "hello");
    }

    #[tokio::test]
    async fn test_not_configured() {
        let service = AssistantService::new(knowledge(), None, 3);
        assert!(!service.is_configured());

        let err = service.answer("藏历").await.unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::AiNotConfigured);
    }

    #[test]
    fn test_jitter_bounds() {
        let ttl = Duration::from_secs(3600);
        for _ in 0..50 {
            let jittered = jittered(ttl);
            assert!(jittered >= Duration::from_secs(3239));
            assert!(jittered <= Duration::from_secs(3961));
        }
    }

    #[test]
    fn test_from_config_without_key() {
        let mut config = ZangliConfig::default();
        config.knowledge.path = "/nonexistent/knowledge.json".to_string();
        config.ai.api_key = None;

        let service = AssistantService::from_config(&config);
        assert!(!service.is_configured());
        assert!(service.knowledge().is_empty());
    }
}
