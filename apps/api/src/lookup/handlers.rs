use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::extract::ApiQuery;
use crate::lookup::sic_lookup::LookupResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub description: String,
    #[serde(default)]
    pub similarity: bool,
}

/// GET /v1/survey-assist/sic-lookup
pub async fn handle_sic_lookup(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LookupQuery>,
) -> Result<Json<LookupResult>, AppError> {
    if query.description.trim().is_empty() {
        return Err(AppError::Validation(
            "Description cannot be empty".to_string(),
        ));
    }

    let result = state.sic_lookup.lookup(&query.description, query.similarity);
    if result.is_empty() {
        warn!("No SIC code found for description: {}", query.description);
        return Err(AppError::NotFound(format!(
            "No SIC code found for description: {}",
            query.description
        )));
    }

    info!(
        "SIC lookup for '{}' (similarity={}): code={:?}",
        result.description, query.similarity, result.code
    );
    Ok(Json(result))
}
