//! All LLM prompt constants for the Generation module.
//! Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for question generation and correction.
pub const QUESTION_SYSTEM: &str = "You are a human-resources specialist preparing structured \
    interview questions for a public-sector IT hiring process. Every question targets one \
    role, one question category and one seniority level, and can be scored by a jury.";

/// Batch generation prompt. Replace every `{placeholder}` before sending.
pub const QUESTION_BATCH_PROMPT_TEMPLATE: &str = r#"Announcement: {contract_title}
General requirements: {general_requirements}
Role: {role_name}
Open positions: {position_count}
Salary multiplier: {salary_multiplier}x ({difficulty_label})
Role requirements: {role_requirements}

Write {count} interview questions of the category "{type_name}" ({type_description}),
numbered {first_number} to {last_number} within this category, each with its expected answer.

Rules:
- {no_code}
- Each question focuses on ONE topic taken from the role requirements. Never reuse a topic
  within this batch; spread questions across different technologies of the role.
- Ask directly. Do not add phrases like "the candidate should explain" to the question;
  that belongs in the expected answer.
- Pick the knowledge layer of each question according to these weights:
{difficulty_layers}
- {juror_answer}

Return a JSON array with exactly {count} objects of this EXACT schema:
[
  {
    "question": "question text",
    "expected_answer": "The candidate is expected to ...\n\nKeywords: k1, k2, k3, k4",
    "difficulty": "{difficulty_label}"
  }
]"#;

/// Single-item correction prompt. Replace every `{placeholder}` before sending.
pub const CORRECTION_PROMPT_TEMPLATE: &str = r#"Announcement: {contract_title}
Role: {role_name} ({salary_multiplier}x, {difficulty_label})
Role requirements: {role_requirements}
Category: {type_name}

PREVIOUS QUESTION:
{previous_question}

PREVIOUS EXPECTED ANSWER:
{previous_answer}

CORRECTION INSTRUCTION:
{instruction}

Rewrite the question following the correction instruction. Keep the same format and
quality and change only what the instruction asks for. If the instruction names a topic,
focus on that topic; otherwise keep a single topic from the role requirements.

Rules:
- {no_code}
- {juror_answer}

Return ONE JSON object of this EXACT schema:
{"question": "new question", "expected_answer": "new answer\n\nKeywords: k1, k2, k3, k4"}"#;
