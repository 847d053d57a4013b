// All LLM prompt constants for the Classification module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for RAG classification. Replace `{code_system}` before sending;
/// the JSON-only fragment is appended by the classifier.
pub const CLASSIFY_SYSTEM: &str =
    "You are an expert coder of UK survey responses into the {code_system}.";

/// SIC RAG prompt. Replace `{job_title}`, `{job_description}`, `{industry_descr}`
/// and `{shortlist}` before sending.
pub const SIC_RAG_PROMPT_TEMPLATE: &str = r#"Given the respondent's description of the main activity their company does, their job title and job description, your task is to determine the UK SIC (Standard Industrial Classification) code for this company if it can be determined.

The following will be provided to make your decision:
Respondent Data
Relevant subset of UK SIC codes (you must only use this list to classify)
Output Format (the output format MUST be valid JSON)

Only use the subset of UK SIC codes provided to determine if you can match the most likely SIC code, provide a confidence score between 0 and 1 where 0.1 is least likely and 0.9 is most likely.

You must return a subset list of possible SIC codes (UK SIC codes provided) that might match with a confidence score for each.

You must provide a follow up question that would help identify the exact coding based on the list you respond with.

===Respondent Data===
- Company's main activity: {industry_descr}
- Job Title: {job_title}
- Job Description: {job_description}

===Relevant subset of UK SIC codes===
{shortlist}

===Output Format===
Return a JSON object with this EXACT schema (no extra fields):
{
  "classified": true,
  "followup": "Optional follow-up question, or null",
  "code": "43210",
  "description": "Electrical installation",
  "candidates": [
    {"code": "43210", "descriptive": "Electrical installation", "likelihood": 0.9}
  ],
  "reasoning": "Why the code was chosen"
}

===Output===
"#;

/// SOC RAG prompt. Same placeholders as the SIC template.
pub const SOC_RAG_PROMPT_TEMPLATE: &str = r#"Given the respondent's job title, job description, and industry description, your task is to determine the most likely UK SOC (Standard Occupational Classification) codes for this job.

The following will be provided to make your decision:
Respondent Data
Relevant subset of UK SOC codes (you must only use this list to classify)
Output Format (the output format MUST be valid JSON)

Only use the subset of UK SOC codes provided to determine if you can match the most likely SOC codes, provide a confidence score between 0 and 1 where 0.1 is least likely and 0.9 is most likely.

You must return a subset list of possible SOC codes (UK SOC codes provided) that might match with a confidence score for each.

You must provide a follow up question that would help identify the exact coding based on the list you respond with.

===Respondent Data===
- Job Title: {job_title}
- Job Description: {job_description}
- Industry Description: {industry_descr}

===Relevant subset of UK SOC codes===
{shortlist}

===Output Format===
Return a JSON object with this EXACT schema (no extra fields):
{
  "classified": true,
  "followup": "Optional follow-up question, or null",
  "code": "5241",
  "description": "Electricians and electrical fitters",
  "candidates": [
    {"code": "5241", "descriptive": "Electricians and electrical fitters", "likelihood": 0.9}
  ],
  "reasoning": "Why the code was chosen"
}

===Output===
"#;

/// Follow-up used when the vector store returns nothing to choose from.
pub const EMPTY_SHORTLIST_FOLLOWUP: &str =
    "Unable to find relevant {CODE} codes. Please provide more specific job information.";
