use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde_json::{Value, json};

use crate::api::AppState;

/// The authenticated caller, resolved from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match state.tokens.verify_header(header) {
            Ok(user_id) => Ok(AuthUser { user_id }),
            Err(e) => {
                tracing::debug!(error = %e, "rejected bearer token");
                Err((
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": e.to_string() })),
                ))
            }
        }
    }
}
