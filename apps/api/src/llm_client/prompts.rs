// Shared prompt constants.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "\
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction that keeps the model inside the retrieved shortlist.
pub const SHORTLIST_ONLY_INSTRUCTION: &str = "\
    CRITICAL: Only use codes from the relevant subset provided. \
    Never invent a code that is not in the subset. \
    If no code in the subset fits, set \"classified\" to false, leave \"code\" null \
    and ask a follow-up question.";
