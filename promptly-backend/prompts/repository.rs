use anyhow::Result;
use async_trait::async_trait;

use super::{Prompt, SortOrder};

#[async_trait]
pub trait PromptRepository: Send + Sync {
    /// Persist a new prompt, stamping `updated_at`. Returns the stored record.
    async fn create(&self, prompt: Prompt) -> Result<Prompt>;
    /// All prompts owned by `owner_id`, optionally only those tagged `tag`,
    /// ordered by `created_at`.
    async fn find_by_owner(
        &self,
        owner_id: &str,
        sort: SortOrder,
        tag: Option<&str>,
    ) -> Result<Vec<Prompt>>;
    /// Delete `id` only if it belongs to `owner_id`. Returns the removed record.
    async fn delete_owned(&self, owner_id: &str, id: &str) -> Result<Option<Prompt>>;
    async fn load_all(&self) -> Result<()>;
    /// Release backend resources at shutdown.
    async fn close(&self) {}
}
