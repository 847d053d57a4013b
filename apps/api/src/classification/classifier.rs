//! RAG classification for one code system.
//!
//! Flow: vector store search → shortlist → prompt → LLM JSON answer →
//!       normalise into the generic envelope → optional rephrase.

use serde::Deserialize;
use tracing::{info, warn};

use crate::classification::models::{
    Candidate, ClassificationRequest, ClassificationResult, Flavour,
};
use crate::classification::prompts::{
    CLASSIFY_SYSTEM, EMPTY_SHORTLIST_FOLLOWUP, SIC_RAG_PROMPT_TEMPLATE, SOC_RAG_PROMPT_TEMPLATE,
};
use crate::classification::rephrase::RephraseTable;
use crate::errors::AppError;
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, SHORTLIST_ONLY_INSTRUCTION};
use crate::llm_client::LlmClient;
use crate::vector_store::{SearchResult, VectorStoreClient};

/// Max shortlist entries offered to the model.
pub const CANDIDATES_LIMIT: usize = 5;
/// Rendered shortlist size above which it is cut down to `SHORTENED_CANDIDATES`.
pub const CHARS_LIMIT: usize = 14_000;
const SHORTENED_CANDIDATES: usize = 3;

const NOT_APPLICABLE_CODE: &str = "N/A";

// ────────────────────────────────────────────────────────────────────────────
// Model output
// ────────────────────────────────────────────────────────────────────────────

/// Raw JSON answer requested by the RAG prompts. Everything is optional so a
/// partially filled answer still normalises.
#[derive(Debug, Deserialize)]
struct LlmClassification {
    #[serde(default)]
    classified: Option<bool>,
    #[serde(default)]
    followup: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    candidates: Vec<LlmCandidate>,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, Deserialize)]
struct LlmCandidate {
    code: String,
    #[serde(default)]
    descriptive: String,
    #[serde(default)]
    likelihood: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt building
// ────────────────────────────────────────────────────────────────────────────

/// Renders the vector store hits for the prompt, one per line.
///
/// Relevance is `1 - distance`. At most `candidates_limit`
/// hits are used; if the rendered list exceeds `chars_limit` it is cut to three.
pub fn format_shortlist(
    short_list: &[SearchResult],
    chars_limit: usize,
    candidates_limit: usize,
) -> String {
    let mut lines: Vec<String> = short_list
        .iter()
        .take(candidates_limit)
        .map(|r| {
            let relevance = 1.0 - r.distance;
            format!(
                "Code: {}, Title: {}, Relevance Score: {relevance:.2}",
                r.code, r.title
            )
        })
        .collect();

    let total_chars: usize = lines.iter().map(String::len).sum();
    if chars_limit > 0 && total_chars > chars_limit {
        warn!("Shortening list of candidates to fit character limit ({total_chars} > {chars_limit})");
        lines.truncate(SHORTENED_CANDIDATES);
    }

    lines.join("\n")
}

fn or_unknown(value: Option<&str>) -> &str {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("Unknown")
}

pub fn build_prompt(flavour: Flavour, request: &ClassificationRequest, shortlist: &str) -> String {
    let template = match flavour {
        Flavour::Sic => SIC_RAG_PROMPT_TEMPLATE,
        Flavour::Soc => SOC_RAG_PROMPT_TEMPLATE,
    };
    let prompt = template
        .replace("{job_title}", or_unknown(Some(request.job_title.as_str())))
        .replace("{job_description}", or_unknown(Some(request.job_description.as_str())))
        .replace("{industry_descr}", or_unknown(request.org_description()))
        .replace("{shortlist}", shortlist);
    format!("{prompt}\n{SHORTLIST_ONLY_INSTRUCTION}")
}

fn system_prompt(flavour: Flavour) -> String {
    let code_system = match flavour {
        Flavour::Sic => "UK Standard Industrial Classification (SIC)",
        Flavour::Soc => "UK Standard Occupational Classification (SOC)",
    };
    format!(
        "{} {JSON_ONLY_SYSTEM}",
        CLASSIFY_SYSTEM.replace("{code_system}", code_system)
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Normalisation
// ────────────────────────────────────────────────────────────────────────────

fn clean_code(code: Option<String>) -> Option<String> {
    code.map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && c != NOT_APPLICABLE_CODE)
}

/// Maps the model answer into the generic envelope.
/// `classified` holds only when the model says so and a usable code is present.
fn normalise(flavour: Flavour, answer: LlmClassification) -> ClassificationResult {
    let code = clean_code(answer.code);
    let classified = answer.classified.unwrap_or(true) && code.is_some();

    let candidates = answer
        .candidates
        .into_iter()
        .filter(|c| !c.code.trim().is_empty())
        .map(|c| Candidate {
            code: c.code.trim().to_string(),
            descriptive: c.descriptive,
            likelihood: c.likelihood.clamp(0.0, 1.0),
        })
        .collect();

    ClassificationResult {
        flavour,
        classified,
        followup: answer.followup.filter(|f| !f.trim().is_empty()),
        description: code.as_ref().and(answer.description),
        code,
        candidates,
        reasoning: answer.reasoning,
    }
}

fn unclassified(flavour: Flavour, followup: String, reasoning: String) -> ClassificationResult {
    ClassificationResult {
        flavour,
        classified: false,
        followup: Some(followup),
        code: None,
        description: None,
        candidates: vec![],
        reasoning,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs the full RAG classification for one flavour.
///
/// Vector store and LLM transport failures are errors (503). An empty shortlist or
/// an unusable model answer yields an unclassified result instead.
pub async fn classify(
    flavour: Flavour,
    request: &ClassificationRequest,
    vector_store: &VectorStoreClient,
    llm: &LlmClient,
    rephrase: Option<&RephraseTable>,
) -> Result<ClassificationResult, AppError> {
    let code_label = flavour.as_str().to_uppercase();

    let search_results = vector_store
        .search(
            request.org_description(),
            &request.job_title,
            &request.job_description,
        )
        .await?;

    if search_results.is_empty() {
        warn!("Empty short list provided for {code_label} classification");
        return Ok(unclassified(
            flavour,
            EMPTY_SHORTLIST_FOLLOWUP.replace("{CODE}", &code_label),
            format!("No relevant {code_label} codes found in vector store search."),
        ));
    }

    let shortlist = format_shortlist(&search_results, CHARS_LIMIT, CANDIDATES_LIMIT);
    let prompt = build_prompt(flavour, request, &shortlist);

    let mut result = match llm
        .call_json::<LlmClassification>(request.llm, &prompt, &system_prompt(flavour))
        .await
    {
        Ok(answer) => normalise(flavour, answer),
        Err(e) if e.is_output_error() => {
            warn!("Failed to parse {code_label} LLM response: {e}");
            unclassified(
                flavour,
                "Follow-up question not available due to parsing error.".to_string(),
                format!("ERROR parse_error=<{e}>"),
            )
        }
        Err(e) => return Err(AppError::Llm(e)),
    };

    if request.options.rephrased(flavour) {
        if let Some(table) = rephrase {
            let replaced = table.apply(&mut result);
            info!(
                "Applied {replaced} rephrased {code_label} descriptions ({} available)",
                table.len()
            );
        }
    }

    info!(
        "{code_label} classification finished: classified={}, code={:?}, candidates={}",
        result.classified,
        result.code,
        result.candidates.len()
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::models::ClassificationOptions;
    use crate::llm_client::LlmBackend;

    fn hit(code: &str, title: &str, distance: f64) -> SearchResult {
        SearchResult {
            code: code.to_string(),
            title: title.to_string(),
            distance,
        }
    }

    fn request(org: Option<&str>) -> ClassificationRequest {
        ClassificationRequest {
            llm: LlmBackend::Gemini,
            classification_type: crate::classification::models::ClassificationType::Sic,
            job_title: "Farm Hand".to_string(),
            job_description: "I tend crops that are sold to wholesalers".to_string(),
            org_description: org.map(String::from),
            options: ClassificationOptions::default(),
        }
    }

    fn answer(json: &str) -> LlmClassification {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_shortlist_uses_relevance_and_limit() {
        let hits: Vec<_> = (0..7)
            .map(|i| hit(&format!("0111{i}"), "Growing crops", 0.25))
            .collect();
        let rendered = format_shortlist(&hits, CHARS_LIMIT, CANDIDATES_LIMIT);
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Code: 01110, Title: Growing crops, Relevance Score: 0.75");
    }

    #[test]
    fn test_shortlist_relevance_is_one_minus_distance() {
        let rendered = format_shortlist(&[hit("43210", "Electrical", 1.7)], CHARS_LIMIT, 5);
        assert!(rendered.ends_with("Relevance Score: -0.70"));
    }

    #[test]
    fn test_shortlist_shortened_past_char_limit() {
        let hits: Vec<_> = (0..5).map(|i| hit(&i.to_string(), "x", 0.1)).collect();
        let rendered = format_shortlist(&hits, 10, CANDIDATES_LIMIT);
        assert_eq!(rendered.lines().count(), 3);
    }

    #[test]
    fn test_prompt_fills_respondent_data() {
        let prompt = build_prompt(Flavour::Sic, &request(None), "Code: 01110, Title: Crops");
        assert!(prompt.contains("- Job Title: Farm Hand"));
        assert!(prompt.contains("- Company's main activity: Unknown"));
        assert!(prompt.contains("Code: 01110, Title: Crops"));
        assert!(!prompt.contains("{shortlist}"));

        let prompt = build_prompt(Flavour::Soc, &request(Some("A farm")), "");
        assert!(prompt.contains("- Industry Description: A farm"));
        assert!(prompt.contains("UK SOC"));
    }

    #[test]
    fn test_system_prompt_names_code_system_and_demands_json() {
        let system = system_prompt(Flavour::Soc);
        assert!(system.contains("Standard Occupational Classification"));
        assert!(system.contains("valid JSON only"));
    }

    #[test]
    fn test_normalise_classified_answer() {
        let result = normalise(
            Flavour::Sic,
            answer(
                r#"{"classified": true, "code": "01110", "description": "Growing cereals",
                    "candidates": [{"code": "01110", "descriptive": "Growing cereals", "likelihood": 1.4},
                                   {"code": " ", "descriptive": "blank", "likelihood": 0.1}],
                    "reasoning": "Farm work"}"#,
            ),
        );
        assert!(result.classified);
        assert_eq!(result.code.as_deref(), Some("01110"));
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].likelihood, 1.0);
        assert_eq!(result.flavour, Flavour::Sic);
    }

    #[test]
    fn test_normalise_not_applicable_code_is_unclassified() {
        let result = normalise(
            Flavour::Sic,
            answer(r#"{"code": "N/A", "description": "n/a", "followup": "What crops?", "reasoning": "vague"}"#),
        );
        assert!(!result.classified);
        assert_eq!(result.code, None);
        assert_eq!(result.description, None);
        assert_eq!(result.followup.as_deref(), Some("What crops?"));
    }

    #[test]
    fn test_normalise_respects_model_classified_false() {
        let result = normalise(
            Flavour::Soc,
            answer(r#"{"classified": false, "code": "5241", "reasoning": "two options"}"#),
        );
        assert!(!result.classified);
        assert_eq!(result.code.as_deref(), Some("5241"));
    }

    #[test]
    fn test_unclassified_has_no_code() {
        let result = unclassified(Flavour::Soc, "More detail?".into(), "none".into());
        assert!(!result.classified);
        assert!(result.candidates.is_empty());
        assert_eq!(result.code, None);
    }
}
