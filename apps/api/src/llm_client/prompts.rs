// Shared prompt fragments. Each service that needs LLM calls defines its own
// prompts.rs alongside it and composes these.

/// Instruction that enforces a bare JSON object as the whole response.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps extracted facts anchored to the supplied documents.
pub const GROUNDING_INSTRUCTION: &str = "\
    Only report facts that appear in the provided resume. \
    If a field cannot be determined from the resume, use an empty string, an empty array or null. \
    Do NOT invent employers, dates, degrees or contact details.";
