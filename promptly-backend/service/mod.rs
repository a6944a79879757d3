use std::sync::Arc;

use crate::cache::keys::{self, ENHANCE_TTL, LIST_TTL};
use crate::cache::{Cache, CachePayload};
use crate::enhance::{EnhanceError, Enhancer};
use crate::prompts::repository::PromptRepository;
use crate::prompts::{Prompt, SortOrder};

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Configuration(&'static str),

    #[error("upstream provider failed: {0}")]
    Upstream(#[from] EnhanceError),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Prompt operations over the store, the cache and the enhancement provider.
pub struct PromptService {
    repo: Arc<dyn PromptRepository>,
    cache: Arc<dyn Cache>,
    enhancer: Arc<dyn Enhancer>,
}

impl PromptService {
    pub fn new(
        repo: Arc<dyn PromptRepository>,
        cache: Arc<dyn Cache>,
        enhancer: Arc<dyn Enhancer>,
    ) -> Self {
        Self {
            repo,
            cache,
            enhancer,
        }
    }

    #[tracing::instrument(skip(self, content, tags))]
    pub async fn create(
        &self,
        owner_id: &str,
        content: &str,
        tags: Vec<String>,
    ) -> Result<Prompt, ServiceError> {
        if content.trim().is_empty() {
            return Err(ServiceError::Validation("Content is required"));
        }

        let prompt = self
            .repo
            .create(Prompt::new(owner_id, content.to_string(), tags))
            .await?;
        self.invalidate_lists(owner_id, &prompt.tags).await;

        tracing::info!(prompt_id = %prompt.id, tags = prompt.tags.len(), "created prompt");
        Ok(prompt)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        owner_id: &str,
        sort: SortOrder,
        tag: Option<&str>,
    ) -> Result<Vec<Prompt>, ServiceError> {
        let key = keys::list_key(owner_id, sort, tag);

        if let Some(value) = self.cache.get(&key).await.and_then(CachePayload::into_json) {
            match serde_json::from_value::<Vec<Prompt>>(value) {
                Ok(prompts) => {
                    tracing::debug!(%key, "prompt list cache hit");
                    return Ok(prompts);
                }
                Err(e) => tracing::warn!(%key, error = %e, "ignoring unreadable cached list"),
            }
        }

        let prompts = self.repo.find_by_owner(owner_id, sort, tag).await?;
        match serde_json::to_value(&prompts) {
            Ok(value) => {
                self.cache
                    .set(&key, CachePayload::Json(value), LIST_TTL)
                    .await
            }
            Err(e) => tracing::warn!(%key, error = %e, "failed to encode list for cache"),
        }
        Ok(prompts)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, owner_id: &str, prompt_id: &str) -> Result<(), ServiceError> {
        let removed = self
            .repo
            .delete_owned(owner_id, prompt_id)
            .await?
            .ok_or(ServiceError::NotFound("Prompt not found"))?;
        self.invalidate_lists(owner_id, &removed.tags).await;

        tracing::info!("deleted prompt");
        Ok(())
    }

    #[tracing::instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn enhance(&self, owner_id: &str, prompt: &str) -> Result<String, ServiceError> {
        if prompt.trim().is_empty() {
            return Err(ServiceError::Validation("Prompt is required"));
        }
        if !self.enhancer.is_configured() {
            return Err(ServiceError::Configuration("Groq API key is not configured"));
        }

        let key = keys::enhance_key(owner_id, prompt);
        if let Some(text) = self.cache.get(&key).await.and_then(CachePayload::into_text) {
            tracing::debug!("enhancement cache hit");
            return Ok(text);
        }

        let enhanced = self.enhancer.enhance(prompt).await?;
        self.cache
            .set(&key, CachePayload::Text(enhanced.clone()), ENHANCE_TTL)
            .await;
        Ok(enhanced)
    }

    /// Clear every cached list a mutation of a prompt with `tags` can change.
    async fn invalidate_lists(&self, owner_id: &str, tags: &[String]) {
        for key in keys::invalidation_keys(owner_id, tags) {
            self.cache.delete(&key).await;
        }
    }

    /// Release store resources. The cache and HTTP client close on drop.
    pub async fn shutdown(&self) {
        self.repo.close().await;
    }
}
