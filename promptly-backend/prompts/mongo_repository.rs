use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc};
use mongodb::options::FindOptions;
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};

use super::repository::PromptRepository;
use super::{Prompt, SortOrder};

const COLLECTION: &str = "prompts";

/// Stored document layout. Field names match the `prompts` collection.
#[derive(Debug, Serialize, Deserialize)]
struct PromptDocument {
    #[serde(rename = "_id")]
    id: String,
    content: String,
    #[serde(default)]
    tags: Vec<String>,
    user: String,
    #[serde(rename = "createdAt")]
    created_at: bson::DateTime,
    #[serde(rename = "updatedAt")]
    updated_at: bson::DateTime,
}

fn to_bson_time(t: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(t.timestamp_millis())
}

fn from_bson_time(t: bson::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(t.timestamp_millis()).unwrap_or_default()
}

impl From<&Prompt> for PromptDocument {
    fn from(p: &Prompt) -> Self {
        Self {
            id: p.id.clone(),
            content: p.content.clone(),
            tags: p.tags.clone(),
            user: p.owner_id.clone(),
            created_at: to_bson_time(p.created_at),
            updated_at: to_bson_time(p.updated_at),
        }
    }
}

impl From<PromptDocument> for Prompt {
    fn from(d: PromptDocument) -> Self {
        Self {
            id: d.id,
            content: d.content,
            tags: d.tags,
            owner_id: d.user,
            created_at: from_bson_time(d.created_at),
            updated_at: from_bson_time(d.updated_at),
        }
    }
}

pub struct MongoPromptRepository {
    client: Client,
    prompts: Collection<PromptDocument>,
}

impl MongoPromptRepository {
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .context("failed to create MongoDB client")?;
        let prompts = client.database(database).collection(COLLECTION);
        Ok(Self { client, prompts })
    }
}

#[async_trait]
impl PromptRepository for MongoPromptRepository {
    async fn create(&self, mut prompt: Prompt) -> Result<Prompt> {
        prompt.updated_at = Utc::now();
        let document = PromptDocument::from(&prompt);
        self.prompts
            .insert_one(&document, None)
            .await
            .context("failed to insert prompt")?;
        // Round-trip through the stored precision so callers see what a later read returns.
        Ok(Prompt::from(document))
    }

    async fn find_by_owner(
        &self,
        owner_id: &str,
        sort: SortOrder,
        tag: Option<&str>,
    ) -> Result<Vec<Prompt>> {
        let mut filter = doc! { "user": owner_id };
        if let Some(tag) = tag {
            // Matches any array element equal to `tag`.
            filter.insert("tags", tag);
        }
        let direction = match sort {
            SortOrder::Latest => -1,
            SortOrder::Oldest => 1,
        };
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": direction })
            .build();

        let cursor = self
            .prompts
            .find(filter, options)
            .await
            .context("failed to query prompts")?;
        let documents: Vec<PromptDocument> = cursor
            .try_collect()
            .await
            .context("failed to read prompts cursor")?;
        Ok(documents.into_iter().map(Prompt::from).collect())
    }

    async fn delete_owned(&self, owner_id: &str, id: &str) -> Result<Option<Prompt>> {
        let removed = self
            .prompts
            .find_one_and_delete(doc! { "_id": id, "user": owner_id }, None)
            .await
            .context("failed to delete prompt")?;
        Ok(removed.map(Prompt::from))
    }

    async fn load_all(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "user": 1, "createdAt": -1 })
            .build();
        self.prompts
            .create_index(index, None)
            .await
            .context("failed to create prompts index")?;
        tracing::info!(collection = COLLECTION, "MongoDB prompt store ready");
        Ok(())
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
        tracing::info!("MongoDB client shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_round_trip_keeps_fields_at_millisecond_precision() {
        let prompt = Prompt::new("u1", "Write a poem".into(), vec!["creative".into()]);
        let back = Prompt::from(PromptDocument::from(&prompt));
        assert_eq!(back.id, prompt.id);
        assert_eq!(back.owner_id, "u1");
        assert_eq!(back.tags, vec!["creative"]);
        assert_eq!(
            back.created_at.timestamp_millis(),
            prompt.created_at.timestamp_millis()
        );
    }

    #[test]
    fn document_uses_collection_field_names() {
        let prompt = Prompt::new("u1", "hi".into(), vec![]);
        let document = bson::to_document(&PromptDocument::from(&prompt)).unwrap();
        assert_eq!(document.get_str("_id").unwrap(), prompt.id);
        assert_eq!(document.get_str("user").unwrap(), "u1");
        assert!(document.get_datetime("createdAt").is_ok());
        assert!(document.get_datetime("updatedAt").is_ok());
    }
}
