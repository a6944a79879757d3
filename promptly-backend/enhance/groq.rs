use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{EnhanceError, Enhancer, render_instruction};

/// Groq's OpenAI-compatible chat completions client.
pub struct GroqEnhancer {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl GroqEnhancer {
    /// `client` should carry a request timeout; the provider call has no other bound.
    pub fn new(client: Client, api_key: Option<String>, model: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url,
        }
    }

    fn build_request(&self, prompt: &str) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: render_instruction(prompt),
            }],
            temperature: 0.5,
            max_tokens: 1024,
            top_p: 0.9,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

fn extract_content(body: &str) -> Result<String, EnhanceError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| EnhanceError::InvalidResponse(format!("unparseable body: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| EnhanceError::InvalidResponse("no completion content".to_string()))
}

#[async_trait]
impl Enhancer for GroqEnhancer {
    #[tracing::instrument(skip_all, fields(model = %self.model, prompt_len = prompt.len()))]
    async fn enhance(&self, prompt: &str) -> Result<String, EnhanceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(EnhanceError::MissingCredential)?;

        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.build_request(prompt))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            tracing::warn!(%status, "provider rejected enhancement request");
            return Err(EnhanceError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        extract_content(&body)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    fn enhancer(api_key: Option<&str>, base_url: &str) -> GroqEnhancer {
        GroqEnhancer::new(
            Client::new(),
            api_key.map(String::from),
            "llama-3.3-70b-versatile".into(),
            base_url.to_string(),
        )
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn request_uses_fixed_generation_parameters() {
        let e = enhancer(Some("k"), "http://unused");
        let body = serde_json::to_value(e.build_request("Write a poem")).unwrap();
        assert_eq!(body["model"], "llama-3.3-70b-versatile");
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["frequency_penalty"], 0.0);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(
            body["messages"][0]["content"]
                .as_str()
                .unwrap()
                .contains("Write a poem")
        );
    }

    #[test]
    fn extract_content_happy_path() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Compose a poem."}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "Compose a poem.");
    }

    #[test]
    fn extract_content_rejects_empty_and_malformed() {
        assert!(matches!(
            extract_content(r#"{"choices":[]}"#),
            Err(EnhanceError::InvalidResponse(_))
        ));
        assert!(matches!(
            extract_content(r#"{"choices":[{"message":{"content":"  "}}]}"#),
            Err(EnhanceError::InvalidResponse(_))
        ));
        assert!(matches!(
            extract_content("<html>bad gateway</html>"),
            Err(EnhanceError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        // Unroutable base URL: a request attempt would surface as Request, not MissingCredential.
        let e = enhancer(None, "http://127.0.0.1:1");
        assert!(!e.is_configured());
        assert!(matches!(
            e.enhance("hi").await,
            Err(EnhanceError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn enhance_against_local_provider() {
        let router = Router::new().route(
            "/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(
                    headers.get("authorization").unwrap().to_str().unwrap(),
                    "Bearer test-key"
                );
                let content = body["messages"][0]["content"].as_str().unwrap_or_default();
                assert!(content.contains("Write a poem"));
                Json(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "Compose a short poem." } }]
                }))
            }),
        );
        let base_url = serve(router).await;

        let e = enhancer(Some("test-key"), &base_url);
        assert_eq!(e.enhance("Write a poem").await.unwrap(), "Compose a short poem.");
    }

    #[tokio::test]
    async fn provider_error_body_is_forwarded() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    r#"{"error":{"message":"rate limited"}}"#,
                )
            }),
        );
        let base_url = serve(router).await;

        let err = enhancer(Some("k"), &base_url)
            .enhance("hi")
            .await
            .unwrap_err();
        match err {
            EnhanceError::Provider { status, ref body } => {
                assert_eq!(status, 429);
                assert!(body.contains("rate limited"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
