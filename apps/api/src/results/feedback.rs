use axum::{extract::State, Json};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::ApiJson;
use crate::results::handlers::escapes_result_tree;
use crate::results::models::{FeedbackResponse, FeedbackResult};
use crate::state::AppState;

pub fn validate_feedback(feedback: &FeedbackResult) -> Result<(), AppError> {
    if feedback.case_id.trim().is_empty() || feedback.person_id.trim().is_empty() {
        return Err(AppError::Validation(
            "case_id and person_id cannot be empty".to_string(),
        ));
    }
    if escapes_result_tree(&feedback.survey_id) || escapes_result_tree(&feedback.case_id) {
        return Err(AppError::Validation(
            "survey_id and case_id must not contain '/', '\\' or '..'".to_string(),
        ));
    }
    if feedback.questions.is_empty() {
        return Err(AppError::Validation(
            "At least one question is required".to_string(),
        ));
    }
    Ok(())
}

pub fn feedback_key(feedback: &FeedbackResult) -> String {
    format!(
        "feedback/{}/{}/{}.json",
        feedback.survey_id.trim(),
        feedback.case_id.trim(),
        Uuid::new_v4()
    )
}

/// POST /v1/survey-assist/feedback
pub async fn handle_feedback(
    State(state): State<AppState>,
    ApiJson(feedback): ApiJson<FeedbackResult>,
) -> Result<Json<FeedbackResponse>, AppError> {
    validate_feedback(&feedback)?;

    let key = feedback_key(&feedback);
    let body = serde_json::to_vec_pretty(&feedback).map_err(anyhow::Error::from)?;
    state.results.put_json(&key, body.into()).await?;
    info!(
        "Stored feedback for case {} ({} questions) at {key}",
        feedback.case_id,
        feedback.questions.len()
    );

    Ok(Json(FeedbackResponse {
        message: "Feedback received successfully".to_string(),
        feedback_id: key,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::models::FeedbackQuestion;

    fn feedback(person_id: &str, questions: usize) -> FeedbackResult {
        FeedbackResult {
            case_id: "case-1".to_string(),
            person_id: person_id.to_string(),
            survey_id: "survey-1".to_string(),
            wave_id: "wave-1".to_string(),
            questions: (0..questions)
                .map(|i| FeedbackQuestion {
                    response_name: format!("q{i}"),
                    response: "Yes".to_string(),
                    response_options: Some(vec!["Yes".into(), "No".into()]),
                })
                .collect(),
        }
    }

    #[test]
    fn test_feedback_validation() {
        assert!(validate_feedback(&feedback("person-1", 1)).is_ok());
        assert!(validate_feedback(&feedback(" ", 1)).is_err());
        assert!(validate_feedback(&feedback("person-1", 0)).is_err());

        let mut escaping = feedback("person-1", 1);
        escaping.survey_id = "../survey-1".to_string();
        assert!(validate_feedback(&escaping).is_err());
    }

    #[test]
    fn test_feedback_keys_are_unique_per_submission() {
        let fb = feedback("person-1", 1);
        let a = feedback_key(&fb);
        let b = feedback_key(&fb);
        assert!(a.starts_with("feedback/survey-1/case-1/"));
        assert!(a.ends_with(".json"));
        assert_ne!(a, b);
    }
}
