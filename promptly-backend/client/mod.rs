pub mod state;

use anyhow::Context;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::prompts::{Prompt, SortOrder};

use state::{Action, ClientState, Operation};

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("session expired or token invalid, sign in again")]
    Unauthorized,

    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    /// Message to surface in client state; `None` falls back to the per-operation default.
    fn server_message(&self) -> Option<String> {
        match self {
            ClientError::Api { message, .. } => Some(message.clone()),
            ClientError::Unauthorized => Some(self.to_string()),
            ClientError::Http(_) => None,
        }
    }
}

/// Thin HTTP client for the prompts API.
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(client: Client, base_url: &str, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }

    async fn read<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            let message = body["message"]
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| status.to_string());
            tracing::debug!(%status, error = %body, "API error");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }

    pub async fn list_prompts(
        &self,
        sort: SortOrder,
        tag: Option<&str>,
    ) -> Result<Vec<Prompt>, ClientError> {
        let mut query = vec![("sort", sort.as_str())];
        if let Some(tag) = tag {
            query.push(("tag", tag));
        }
        let resp = self
            .client
            .get(self.url("/prompts"))
            .query(&query)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::read(resp).await
    }

    pub async fn create_prompt(
        &self,
        content: &str,
        tags: &[String],
    ) -> Result<Prompt, ClientError> {
        let resp = self
            .client
            .post(self.url("/prompts"))
            .bearer_auth(&self.token)
            .json(&json!({ "content": content, "tags": tags }))
            .send()
            .await?;
        Self::read(resp).await
    }

    pub async fn delete_prompt(&self, id: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .delete(self.url(&format!("/prompts/{id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::read::<Value>(resp).await.map(|_| ())
    }

    pub async fn enhance_prompt(&self, prompt: &str) -> Result<String, ClientError> {
        let resp = self
            .client
            .post(self.url("/prompts/enhance"))
            .bearer_auth(&self.token)
            .json(&json!({ "prompt": prompt }))
            .send()
            .await?;
        let body: Value = Self::read(resp).await?;
        body["enhancedPrompt"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| ClientError::Api {
                status: 200,
                message: "response did not contain an enhanced prompt".to_string(),
            })
    }
}

/// An API client plus the state its responses feed.
pub struct ClientSession {
    api: ApiClient,
    pub state: ClientState,
}

impl ClientSession {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: ClientState::default(),
        }
    }

    fn settle<T>(
        &mut self,
        op: Operation,
        result: Result<T, ClientError>,
        on_ok: impl FnOnce(T) -> Action,
    ) -> Result<(), ClientError> {
        match result {
            Ok(value) => {
                self.state.apply(on_ok(value));
                Ok(())
            }
            Err(e) => {
                self.state.apply(Action::Rejected(op, e.server_message()));
                Err(e)
            }
        }
    }

    /// Full refetch. The server always returns newest first here; the view
    /// re-sorts on its own.
    pub async fn fetch(&mut self) -> Result<(), ClientError> {
        self.state.apply(Action::Pending);
        let result = self.api.list_prompts(SortOrder::Latest, None).await;
        self.settle(Operation::Fetch, result, Action::Fetched)
    }

    pub async fn create(&mut self, content: &str, tags: Vec<String>) -> Result<(), ClientError> {
        self.state.apply(Action::Pending);
        let result = self.api.create_prompt(content, &tags).await;
        self.settle(Operation::Create, result, Action::Created)
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), ClientError> {
        self.state.apply(Action::Pending);
        let result = self.api.delete_prompt(id).await.map(|_| id.to_string());
        self.settle(Operation::Delete, result, Action::Deleted)
    }

    pub async fn enhance(&mut self, prompt: &str) -> Result<(), ClientError> {
        self.state.apply(Action::ClearEnhanced);
        self.state.apply(Action::Pending);
        let result = self.api.enhance_prompt(prompt).await;
        self.settle(Operation::Enhance, result, Action::Enhanced)
    }
}

/// Build the HTTP client used by the command-line client.
pub fn http_client() -> anyhow::Result<Client> {
    Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .timeout(std::time::Duration::from_secs(90))
        .build()
        .context("failed to build HTTP client")
}
