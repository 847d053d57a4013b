use axum::{extract::State, Json};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::extract::{ApiJson, ApiQuery};
use crate::results::models::{ResultQuery, ResultResponse, SurveyAssistResult};
use crate::state::AppState;

/// True when an id would add or leave a level of the storage key tree.
pub fn escapes_result_tree(value: &str) -> bool {
    value.contains('/') || value.contains('\\') || value.contains("..")
}

/// Structural checks serde cannot express.
pub fn validate_result(result: &SurveyAssistResult) -> Result<(), AppError> {
    if result.survey_id.trim().is_empty() || result.case_id.trim().is_empty() {
        return Err(AppError::Validation(
            "survey_id and case_id cannot be empty".to_string(),
        ));
    }
    for (field, value) in [("survey_id", &result.survey_id), ("case_id", &result.case_id)] {
        if escapes_result_tree(value) {
            return Err(AppError::Validation(format!(
                "{field} must not contain '/', '\\' or '..'"
            )));
        }
    }
    if result.time_end < result.time_start {
        return Err(AppError::Validation(
            "time_end must not be before time_start".to_string(),
        ));
    }
    if result.responses.is_empty() {
        return Err(AppError::Validation(
            "At least one response is required".to_string(),
        ));
    }
    for response in &result.responses {
        if response.person_id.trim().is_empty() {
            return Err(AppError::Validation("person_id cannot be empty".to_string()));
        }
        if response.survey_assist_interactions.is_empty() {
            return Err(AppError::Validation(format!(
                "Response for person {} has no survey assist interactions",
                response.person_id
            )));
        }
    }
    Ok(())
}

/// Rejects ids that are blank or could address objects outside the result tree.
pub fn validate_result_id(result_id: &str) -> Result<&str, AppError> {
    let result_id = result_id.trim();
    if result_id.is_empty() {
        return Err(AppError::Validation("result_id cannot be empty".to_string()));
    }
    if result_id.starts_with('/')
        || result_id.contains('\\')
        || result_id.split('/').any(|segment| segment == "..")
    {
        return Err(AppError::Validation(format!("Invalid result_id: {result_id}")));
    }
    Ok(result_id)
}

/// POST /v1/survey-assist/result
pub async fn handle_store_result(
    State(state): State<AppState>,
    ApiJson(result): ApiJson<SurveyAssistResult>,
) -> Result<Json<ResultResponse>, AppError> {
    validate_result(&result)?;

    let key = result.storage_key();
    let body = serde_json::to_vec_pretty(&result).map_err(anyhow::Error::from)?;
    info!(
        "Storing result for survey {}, case {} ({} responses)",
        result.survey_id,
        result.case_id,
        result.responses.len()
    );
    state.results.put_json(&key, body.into()).await?;

    Ok(Json(ResultResponse {
        message: "Result stored successfully".to_string(),
        result_id: key,
    }))
}

/// GET /v1/survey-assist/result?result_id=...
pub async fn handle_get_result(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ResultQuery>,
) -> Result<Json<Value>, AppError> {
    let result_id = validate_result_id(&query.result_id)?;

    let bytes = state.results.get_json(result_id).await?.ok_or_else(|| {
        warn!("Result not found: {result_id}");
        AppError::NotFound(format!("Result not found: {result_id}"))
    })?;

    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| AppError::Storage(format!("Stored result {result_id} is not valid JSON: {e}")))?;
    Ok(Json(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::models::tests::sample_result;

    fn parsed(value: serde_json::Value) -> SurveyAssistResult {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_valid_result_passes() {
        assert!(validate_result(&parsed(sample_result())).is_ok());
    }

    #[test]
    fn test_blank_ids_rejected() {
        let mut value = sample_result();
        value["case_id"] = serde_json::json!("  ");
        assert!(matches!(
            validate_result(&parsed(value)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_path_characters_in_ids_rejected() {
        for (field, value) in [
            ("survey_id", "../other-survey"),
            ("survey_id", "a/b"),
            ("case_id", "case\\1"),
        ] {
            let mut result = sample_result();
            result[field] = serde_json::json!(value);
            assert!(
                matches!(validate_result(&parsed(result)), Err(AppError::Validation(_))),
                "{field}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_end_before_start_rejected() {
        let mut value = sample_result();
        value["time_end"] = serde_json::json!("2024-03-19T09:00:00Z");
        assert!(validate_result(&parsed(value)).is_err());
    }

    #[test]
    fn test_empty_interactions_rejected() {
        let mut value = sample_result();
        value["responses"][0]["survey_assist_interactions"] = serde_json::json!([]);
        assert!(validate_result(&parsed(value)).is_err());

        let mut value = sample_result();
        value["responses"] = serde_json::json!([]);
        assert!(validate_result(&parsed(value)).is_err());
    }

    #[test]
    fn test_result_id_rules() {
        assert_eq!(validate_result_id(" a/b/c.json ").unwrap(), "a/b/c.json");
        assert!(validate_result_id("").is_err());
        assert!(validate_result_id("a/../../secret.json").is_err());
        assert!(validate_result_id("/etc/passwd").is_err());
        assert!(validate_result_id("a\\b.json").is_err());
    }
}
