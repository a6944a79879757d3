pub mod file_repository;
pub mod mongo_repository;
pub mod repository;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user-owned prompt. Only its owner may list or delete it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    /// Refreshed by the repository on every persisted write.
    pub updated_at: DateTime<Utc>,
}

impl Prompt {
    /// Build an unsaved prompt with a fresh id. Tags are trimmed but
    /// otherwise kept as given (order and duplicates preserved).
    pub fn new(owner_id: &str, content: String, tags: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            tags: tags.into_iter().map(|t| t.trim().to_string()).collect(),
            owner_id: owner_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// List order by `createdAt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Newest first.
    #[default]
    Latest,
    /// Oldest first.
    Oldest,
}

impl SortOrder {
    /// `latest` (or no value) sorts newest first; any other value sorts
    /// oldest first.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None | Some("latest") => SortOrder::Latest,
            Some(_) => SortOrder::Oldest,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Latest => "latest",
            SortOrder::Oldest => "oldest",
        }
    }
}

pub fn sort_prompts(prompts: &mut [Prompt], order: SortOrder) {
    match order {
        SortOrder::Latest => prompts.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::Oldest => prompts.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn sort_order_parse() {
        assert_eq!(SortOrder::parse(None), SortOrder::Latest);
        assert_eq!(SortOrder::parse(Some("latest")), SortOrder::Latest);
        assert_eq!(SortOrder::parse(Some("oldest")), SortOrder::Oldest);
        assert_eq!(SortOrder::parse(Some("newest")), SortOrder::Oldest);
    }

    #[test]
    fn new_prompt_trims_tags_and_keeps_duplicates() {
        let p = Prompt::new("u1", "hi".into(), vec![" a ".into(), "a".into()]);
        assert_eq!(p.tags, vec!["a", "a"]);
        assert_eq!(p.created_at, p.updated_at);
        assert!(p.has_tag("a"));
        assert!(!p.has_tag(" a "));
    }

    #[test]
    fn prompt_serializes_camel_case() {
        let p = Prompt::new("u1", "hi".into(), vec![]);
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["ownerId"], "u1");
        assert!(v.get("createdAt").is_some());
        assert!(v.get("updatedAt").is_some());
    }

    #[test]
    fn sort_prompts_both_orders() {
        let mut a = Prompt::new("u1", "a".into(), vec![]);
        let b = Prompt::new("u1", "b".into(), vec![]);
        a.created_at = b.created_at - Duration::seconds(5);
        let mut list = vec![a.clone(), b.clone()];

        sort_prompts(&mut list, SortOrder::Latest);
        assert_eq!(list[0].content, "b");

        sort_prompts(&mut list, SortOrder::Oldest);
        assert_eq!(list[0].content, "a");
    }
}
