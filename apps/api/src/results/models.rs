use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classification::models::Flavour;

// ────────────────────────────────────────────────────────────────────────────
// Survey result
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionType {
    Classify,
    Lookup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Text,
    Select,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputField {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpQuestion {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_options: Option<Vec<String>>,
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUp {
    pub questions: Vec<FollowUpQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultCandidate {
    pub code: String,
    pub description: String,
    pub likelihood: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyInteractionResponse {
    pub classified: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub reasoning: String,
    pub candidates: Vec<ResultCandidate>,
    pub follow_up: FollowUp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotentialDivision {
    pub code: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotentialCode {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupInteractionResponse {
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_division: Option<String>,
    pub potential_codes_count: usize,
    pub potential_divisions: Vec<PotentialDivision>,
    pub potential_codes: Vec<PotentialCode>,
}

/// Payload recorded for an interaction; the shape identifies the kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InteractionResponse {
    Classification(ClassifyInteractionResponse),
    Lookup(LookupInteractionResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyAssistInteraction {
    #[serde(rename = "type")]
    pub interaction_type: InteractionType,
    pub flavour: Flavour,
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub input: Vec<InputField>,
    pub response: InteractionResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub person_id: String,
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub survey_assist_interactions: Vec<SurveyAssistInteraction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyAssistResult {
    pub survey_id: String,
    pub case_id: String,
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub responses: Vec<Response>,
}

impl SurveyAssistResult {
    /// Object key: `{survey_id}/{case_id}/{time_start}.json`, second resolution.
    pub fn storage_key(&self) -> String {
        format!(
            "{}/{}/{}.json",
            self.survey_id.trim(),
            self.case_id.trim(),
            self.time_start.format("%Y-%m-%d_%H-%M-%S")
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultResponse {
    pub message: String,
    pub result_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ResultQuery {
    pub result_id: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Feedback
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackQuestion {
    pub response_name: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResult {
    pub case_id: String,
    pub person_id: String,
    pub survey_id: String,
    pub wave_id: String,
    pub questions: Vec<FeedbackQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub message: String,
    pub feedback_id: String,
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use serde_json::{json, Value};

    /// A complete result with one classify and one lookup interaction.
    pub fn sample_result() -> Value {
        json!({
            "survey_id": "test-survey-123",
            "case_id": "test-case-456",
            "time_start": "2024-03-19T10:00:00Z",
            "time_end": "2024-03-19T10:05:00Z",
            "responses": [{
                "person_id": "test-person-789",
                "time_start": "2024-03-19T10:00:00Z",
                "time_end": "2024-03-19T10:05:00Z",
                "survey_assist_interactions": [
                    {
                        "type": "classify",
                        "flavour": "sic",
                        "time_start": "2024-03-19T10:00:00Z",
                        "time_end": "2024-03-19T10:01:00Z",
                        "input": [{"field": "job_title", "value": "Electrician"}],
                        "response": {
                            "classified": true,
                            "code": "43210",
                            "description": "Electrical installation",
                            "reasoning": "Based on job title and description",
                            "candidates": [
                                {"code": "43210", "description": "Electrical installation", "likelihood": 0.95}
                            ],
                            "follow_up": {
                                "questions": [{
                                    "id": "f1.1",
                                    "text": "Do you work on domestic or commercial sites?",
                                    "type": "select",
                                    "select_options": ["Domestic", "Commercial"],
                                    "response": "Domestic"
                                }]
                            }
                        }
                    },
                    {
                        "type": "lookup",
                        "flavour": "sic",
                        "time_start": "2024-03-19T10:02:00Z",
                        "time_end": "2024-03-19T10:03:00Z",
                        "input": [{"field": "org_description", "value": "electrical"}],
                        "response": {
                            "found": false,
                            "potential_codes_count": 1,
                            "potential_divisions": [{"code": "43", "title": "Specialised construction activities"}],
                            "potential_codes": [{"code": "43210", "description": "Electrical installation"}]
                        }
                    }
                ]
            }]
        })
    }

    #[test]
    fn test_result_parses_both_interaction_kinds() {
        let result: SurveyAssistResult = serde_json::from_value(sample_result()).unwrap();
        let interactions = &result.responses[0].survey_assist_interactions;
        assert!(matches!(
            interactions[0].response,
            InteractionResponse::Classification(_)
        ));
        assert!(matches!(interactions[1].response, InteractionResponse::Lookup(_)));
        assert_eq!(interactions[1].interaction_type, InteractionType::Lookup);
    }

    #[test]
    fn test_storage_key_uses_start_time() {
        let result: SurveyAssistResult = serde_json::from_value(sample_result()).unwrap();
        assert_eq!(
            result.storage_key(),
            "test-survey-123/test-case-456/2024-03-19_10-00-00.json"
        );
    }

    #[test]
    fn test_unknown_flavour_is_rejected() {
        let mut value = sample_result();
        value["responses"][0]["survey_assist_interactions"][0]["flavour"] = json!("isco");
        assert!(serde_json::from_value::<SurveyAssistResult>(value).is_err());
    }

    #[test]
    fn test_unknown_question_type_is_rejected() {
        let mut value = sample_result();
        value["responses"][0]["survey_assist_interactions"][0]["response"]["follow_up"]
            ["questions"][0]["type"] = json!("radio");
        assert!(serde_json::from_value::<SurveyAssistResult>(value).is_err());
    }
}
