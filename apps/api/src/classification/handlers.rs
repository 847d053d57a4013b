use axum::{extract::State, Json};
use tracing::info;

use crate::classification::classifier::classify;
use crate::classification::models::{
    ClassificationRequest, ClassificationResponse, ClassificationResult, Flavour,
};
use crate::errors::AppError;
use crate::extract::ApiJson;
use crate::state::AppState;

/// Rejects requests whose required free-text fields are blank.
pub fn validate_request(req: &ClassificationRequest) -> Result<(), AppError> {
    let blank: Vec<&str> = [
        ("job_title", req.job_title.as_str()),
        ("job_description", req.job_description.as_str()),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();

    if blank.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Fields must not be blank: {}",
            blank.join(", ")
        )))
    }
}

async fn classify_one(
    state: &AppState,
    flavour: Flavour,
    req: &ClassificationRequest,
) -> Result<ClassificationResult, AppError> {
    classify(
        flavour,
        req,
        state.vector_store(flavour),
        &state.llm,
        state.rephrase.table(flavour),
    )
    .await
}

/// POST /v1/survey-assist/classify
pub async fn handle_classify(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ClassificationRequest>,
) -> Result<Json<ClassificationResponse>, AppError> {
    validate_request(&req)?;
    info!(
        "Classification request: type={:?}, llm={}",
        req.classification_type, req.llm
    );

    let results = match req.classification_type.flavours() {
        [first, second] => {
            let (a, b) = tokio::try_join!(
                classify_one(&state, *first, &req),
                classify_one(&state, *second, &req),
            )?;
            vec![a, b]
        }
        flavours => {
            let mut results = Vec::with_capacity(flavours.len());
            for &flavour in flavours {
                results.push(classify_one(&state, flavour, &req).await?);
            }
            results
        }
    };

    Ok(Json(ClassificationResponse {
        requested_type: req.classification_type,
        results,
    }))
}
