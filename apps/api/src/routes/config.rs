use std::collections::HashMap;

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::warn;

use crate::classification::models::Flavour;
use crate::classification::prompts::{SIC_RAG_PROMPT_TEMPLATE, SOC_RAG_PROMPT_TEMPLATE};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PromptModel {
    pub name: &'static str,
    pub text: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ClassificationModel {
    #[serde(rename = "type")]
    pub flavour: Flavour,
    pub prompts: Vec<PromptModel>,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub llm_model: String,
    pub embedding_model: String,
    pub actual_prompt: &'static str,
    pub data_store: &'static str,
    pub bucket_name: String,
    pub v1v2: HashMap<&'static str, Vec<ClassificationModel>>,
    pub v3: HashMap<&'static str, Vec<ClassificationModel>>,
}

/// Prompts used by the single-shot RAG flow, per code system.
fn rag_prompts() -> Vec<ClassificationModel> {
    vec![
        ClassificationModel {
            flavour: Flavour::Sic,
            prompts: vec![PromptModel {
                name: "SA_SIC_PROMPT_RAG",
                text: SIC_RAG_PROMPT_TEMPLATE,
            }],
        },
        ClassificationModel {
            flavour: Flavour::Soc,
            prompts: vec![PromptModel {
                name: "SA_SOC_PROMPT_RAG",
                text: SOC_RAG_PROMPT_TEMPLATE,
            }],
        },
    ]
}

/// GET /v1/survey-assist/config
pub async fn handle_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let embedding_model = match state.sic_vector_store.status().await {
        Ok(status) => status
            .get("embedding_model")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown")
            .to_string(),
        Err(e) => {
            warn!("Could not read embedding model from vector store: {e}");
            "unknown".to_string()
        }
    };

    Json(ConfigResponse {
        llm_model: state.config.primary_llm_model().to_string(),
        embedding_model,
        actual_prompt: SIC_RAG_PROMPT_TEMPLATE,
        data_store: state.config.data_store_name(),
        bucket_name: state.config.bucket_name.clone(),
        v1v2: HashMap::from([("classification", rag_prompts())]),
        // Reranking flow is not served yet.
        v3: HashMap::from([("classification", Vec::new())]),
    })
}
