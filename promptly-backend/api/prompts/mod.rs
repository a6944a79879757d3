pub mod handlers;

use axum::routing::{delete, post};
use axum::Router;

use crate::api::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/prompts",
            post(handlers::create_prompt).get(handlers::list_prompts),
        )
        .route("/prompts/enhance", post(handlers::enhance_prompt))
        .route("/prompts/{id}", delete(handlers::delete_prompt))
}
