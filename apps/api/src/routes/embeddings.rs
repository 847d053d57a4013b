use axum::{extract::State, Json};
use serde_json::Value;

use crate::errors::AppError;
use crate::state::AppState;

/// GET /v1/survey-assist/embeddings
/// Passes the SIC vector store status through unchanged.
pub async fn handle_embeddings(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let status = state.sic_vector_store.status().await?;
    Ok(Json(status))
}
