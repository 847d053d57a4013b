pub mod config;
pub mod embeddings;
pub mod health;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::require_bearer;
use crate::classification::handlers::handle_classify;
use crate::lookup::handlers::handle_sic_lookup;
use crate::results::feedback::handle_feedback;
use crate::results::handlers::{handle_get_result, handle_store_result};
use crate::state::AppState;

pub const API_PREFIX: &str = "/v1/survey-assist";

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/config", get(config::handle_config))
        .route("/classify", post(handle_classify))
        .route("/sic-lookup", get(handle_sic_lookup))
        .route("/result", post(handle_store_result).get(handle_get_result))
        .route("/embeddings", get(embeddings::handle_embeddings))
        .route("/feedback", post(handle_feedback))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .nest(API_PREFIX, api)
        .with_state(state)
}
