/// REST endpoints for a user's prompts. All routes require a bearer token.
///
/// POST   /api/prompts              create a prompt `{content, tags}`
/// GET    /api/prompts?sort=&tag=   list own prompts (sort `latest` | `oldest`)
/// DELETE /api/prompts/{id}         delete an own prompt
/// POST   /api/prompts/enhance      rewrite `{prompt}` via the LLM provider
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::AppState;
use crate::api::auth::AuthUser;
use crate::prompts::{Prompt, SortOrder};
use crate::service::ServiceError;

type ApiError = (StatusCode, Json<Value>);

/// Map a service error to a response. `context` names the failed operation
/// and is used as the message for server-side failures.
fn error_response(context: &'static str, err: ServiceError) -> ApiError {
    match err {
        ServiceError::Validation(message) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "message": message })))
        }
        ServiceError::NotFound(message) => {
            (StatusCode::NOT_FOUND, Json(json!({ "message": message })))
        }
        ServiceError::Configuration(message) => {
            tracing::error!(reason = message, "service misconfigured");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": message })),
            )
        }
        ServiceError::Upstream(e) => {
            tracing::error!(error = %e, "{context}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "message": context,
                    "error": e.to_string(),
                    "details": e.details().unwrap_or_else(|| "No additional details available".to_string()),
                })),
            )
        }
        ServiceError::Storage(e) => {
            tracing::error!(error = %e, "{context}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": context, "error": e.to_string() })),
            )
        }
    }
}

/// Unwrap a JSON body, turning any rejection (malformed JSON, wrong field
/// types, missing content type) into 400 `{message}`.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "rejected request body");
            Err((
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "message": "Invalid request body",
                    "error": rejection.body_text(),
                })),
            ))
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct CreatePromptRequest {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

pub(crate) async fn create_prompt(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<CreatePromptRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Prompt>), ApiError> {
    let body = json_body(body)?;
    let content = body.content.unwrap_or_default();
    let prompt = state
        .service
        .create(&user.user_id, &content, body.tags)
        .await
        .map_err(|e| error_response("Error creating prompt", e))?;
    Ok((StatusCode::CREATED, Json(prompt)))
}

#[derive(Deserialize)]
pub(crate) struct ListQuery {
    sort: Option<String>,
    tag: Option<String>,
}

pub(crate) async fn list_prompts(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Prompt>>, ApiError> {
    let sort = SortOrder::parse(query.sort.as_deref());
    let tag = query.tag.as_deref().filter(|t| !t.is_empty());
    let prompts = state
        .service
        .list(&user.user_id, sort, tag)
        .await
        .map_err(|e| error_response("Error fetching prompts", e))?;
    Ok(Json(prompts))
}

pub(crate) async fn delete_prompt(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .delete(&user.user_id, &id)
        .await
        .map_err(|e| error_response("Error deleting prompt", e))?;
    Ok(Json(json!({ "message": "Prompt deleted successfully" })))
}

#[derive(Deserialize)]
pub(crate) struct EnhanceRequest {
    #[serde(default)]
    prompt: Option<String>,
}

pub(crate) async fn enhance_prompt(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<EnhanceRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = json_body(body)?;
    let prompt = body.prompt.unwrap_or_default();
    let enhanced = state
        .service
        .enhance(&user.user_id, &prompt)
        .await
        .map_err(|e| error_response("Error enhancing prompt", e))?;
    Ok(Json(json!({ "enhancedPrompt": enhanced })))
}
