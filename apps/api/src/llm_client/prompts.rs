//! Shared prompt fragments. Each module that calls the LLM keeps its own prompts.rs
//! alongside it and composes these in.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Interview questions are spoken, not programmed.
pub const NO_CODE_INSTRUCTION: &str = "\
    CRITICAL: Never ask the candidate to write, complete or debug code, algorithms, scripts \
    or functions. Questions must ask for explanation, analysis, comparison, approach or \
    experience only.";

/// Shape of every expected answer.
pub const JUROR_ANSWER_INSTRUCTION: &str = "\
    The expected answer is read by the interview jury, not by the candidate. Write it in \
    the evaluator's voice: \"The candidate is expected to show [knowledge/experience] about \
    [topic]. [Details and examples].\" End it with an empty line followed by a single line \
    \"Keywords: k1, k2, k3, k4\" listing 4-5 keywords. Keywords stay inside expected_answer, \
    never in a separate field.";
