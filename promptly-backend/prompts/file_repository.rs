use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::repository::PromptRepository;
use super::{Prompt, SortOrder, sort_prompts};

/// JSON-file prompt store for local runs without MongoDB:
/// in-memory `RwLock<HashMap>` backed by files at `{base_dir}/prompts/`.
pub struct FilePromptRepository {
    base_dir: PathBuf,
    prompts: RwLock<HashMap<String, Prompt>>,
}

impl FilePromptRepository {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            prompts: RwLock::new(HashMap::new()),
        }
    }

    fn prompts_dir(&self) -> PathBuf {
        self.base_dir.join("prompts")
    }
}

#[async_trait]
impl PromptRepository for FilePromptRepository {
    async fn create(&self, mut prompt: Prompt) -> Result<Prompt> {
        let dir = self.prompts_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create prompts dir: {}", dir.display()))?;

        prompt.updated_at = Utc::now();
        let path = dir.join(format!("{}.json", prompt.id));
        let content = serde_json::to_string_pretty(&prompt)
            .context("failed to serialize prompt")?;
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write prompt file: {}", path.display()))?;

        self.prompts
            .write()
            .await
            .insert(prompt.id.clone(), prompt.clone());
        Ok(prompt)
    }

    async fn find_by_owner(
        &self,
        owner_id: &str,
        sort: SortOrder,
        tag: Option<&str>,
    ) -> Result<Vec<Prompt>> {
        let mut found: Vec<Prompt> = self
            .prompts
            .read()
            .await
            .values()
            .filter(|p| p.owner_id == owner_id)
            .filter(|p| tag.is_none_or(|tag| p.has_tag(tag)))
            .cloned()
            .collect();
        sort_prompts(&mut found, sort);
        Ok(found)
    }

    async fn delete_owned(&self, owner_id: &str, id: &str) -> Result<Option<Prompt>> {
        let mut prompts = self.prompts.write().await;
        if !prompts.get(id).is_some_and(|p| p.owner_id == owner_id) {
            return Ok(None);
        }

        // File first: a failed unlink leaves memory and disk in agreement.
        let path = self.prompts_dir().join(format!("{id}.json"));
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to delete prompt file: {}", path.display()))?;
        }

        Ok(prompts.remove(id))
    }

    async fn load_all(&self) -> Result<()> {
        let prompts_dir = self.prompts_dir();
        std::fs::create_dir_all(&prompts_dir)
            .with_context(|| format!("failed to create prompts dir: {}", prompts_dir.display()))?;

        let mut loaded_prompts = HashMap::new();
        let prompt_entries = std::fs::read_dir(&prompts_dir)
            .with_context(|| format!("failed to read prompts dir: {}", prompts_dir.display()))?;

        for entry in prompt_entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read prompt file: {}", path.display()))?;
            match serde_json::from_str::<Prompt>(&content) {
                Ok(prompt) => {
                    loaded_prompts.insert(prompt.id.clone(), prompt);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping invalid prompt file");
                }
            }
        }

        let prompt_count = loaded_prompts.len();
        if prompt_count > 0 {
            tracing::info!(count = prompt_count, "Loaded saved prompts");
        }
        *self.prompts.write().await = loaded_prompts;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    fn prompt_at(owner: &str, content: &str, tags: &[&str], age_secs: i64) -> Prompt {
        let mut p = Prompt::new(
            owner,
            content.to_string(),
            tags.iter().map(|t| t.to_string()).collect(),
        );
        p.created_at = Utc::now() - Duration::seconds(age_secs);
        p
    }

    #[tokio::test]
    async fn test_create_and_reload() {
        let dir = tempdir().unwrap();
        let repo = FilePromptRepository::new(dir.path());
        repo.load_all().await.unwrap();

        let created = repo
            .create(prompt_at("u1", "Write a poem", &["creative"], 0))
            .await
            .unwrap();
        assert!(created.updated_at >= created.created_at);

        let repo2 = FilePromptRepository::new(dir.path());
        repo2.load_all().await.unwrap();
        let loaded = repo2
            .find_by_owner("u1", SortOrder::Latest, None)
            .await
            .unwrap();
        assert_eq!(loaded, vec![created]);
    }

    #[tokio::test]
    async fn test_find_filters_owner_and_tag() {
        let dir = tempdir().unwrap();
        let repo = FilePromptRepository::new(dir.path());
        repo.load_all().await.unwrap();

        repo.create(prompt_at("u1", "a", &["x"], 30)).await.unwrap();
        repo.create(prompt_at("u1", "b", &["y"], 20)).await.unwrap();
        repo.create(prompt_at("u1", "c", &["x", "y"], 10)).await.unwrap();
        repo.create(prompt_at("u2", "d", &["x"], 0)).await.unwrap();

        let latest = repo
            .find_by_owner("u1", SortOrder::Latest, None)
            .await
            .unwrap();
        let contents: Vec<_> = latest.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, vec!["c", "b", "a"]);

        let tagged = repo
            .find_by_owner("u1", SortOrder::Oldest, Some("x"))
            .await
            .unwrap();
        let contents: Vec<_> = tagged.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_delete_requires_owner() {
        let dir = tempdir().unwrap();
        let repo = FilePromptRepository::new(dir.path());
        repo.load_all().await.unwrap();

        let p = repo.create(prompt_at("u1", "mine", &[], 0)).await.unwrap();
        let file = dir.path().join("prompts").join(format!("{}.json", p.id));
        assert!(file.exists());

        assert!(repo.delete_owned("u2", &p.id).await.unwrap().is_none());
        assert!(file.exists());

        let removed = repo.delete_owned("u1", &p.id).await.unwrap();
        assert_eq!(removed.map(|r| r.id), Some(p.id.clone()));
        assert!(!file.exists());
        assert!(repo.delete_owned("u1", &p.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_file_delete_keeps_record() {
        let dir = tempdir().unwrap();
        let repo = FilePromptRepository::new(dir.path());
        repo.load_all().await.unwrap();

        let p = repo.create(prompt_at("u1", "stuck", &[], 0)).await.unwrap();
        // A directory in place of the file makes the unlink fail.
        let file = dir.path().join("prompts").join(format!("{}.json", p.id));
        std::fs::remove_file(&file).unwrap();
        std::fs::create_dir(&file).unwrap();

        assert!(repo.delete_owned("u1", &p.id).await.is_err());
        let still_there = repo.find_by_owner("u1", SortOrder::Latest, None).await.unwrap();
        assert_eq!(still_there.len(), 1);
        assert_eq!(still_there[0].id, p.id);
    }

    #[tokio::test]
    async fn test_load_skips_invalid_files() {
        let dir = tempdir().unwrap();
        let prompts_dir = dir.path().join("prompts");
        std::fs::create_dir_all(&prompts_dir).unwrap();
        std::fs::write(prompts_dir.join("broken.json"), "{not json").unwrap();
        std::fs::write(prompts_dir.join("notes.txt"), "ignored").unwrap();

        let repo = FilePromptRepository::new(dir.path());
        repo.load_all().await.unwrap();
        assert!(
            repo.find_by_owner("u1", SortOrder::Latest, None)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
