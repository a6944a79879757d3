pub mod auth;
pub mod middleware;
pub mod prompts;
mod routes;

use axum::Router;
use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::service::PromptService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PromptService>,
    pub tokens: Arc<TokenVerifier>,
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Arc<Vec<String>>,
}

pub fn create_app(state: AppState) -> Router {
    routes::build_router(state)
}
