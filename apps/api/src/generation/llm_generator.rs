//! `ContentGenerator` backed by the Claude API.
//!
//! Each type of a role quota is requested in batches of at most `batch_size` questions.
//! Any failing batch fails the whole role; partial output is discarded by the caller.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::generation::collaborator::{
    ContentGenerator, CorrectedItem, CorrectionRequest, GeneratedQuestion, GenerationError,
    JobContext, RoleGenerationRequest,
};
use crate::generation::difficulty::DifficultyProfile;
use crate::generation::prompts::{
    CORRECTION_PROMPT_TEMPLATE, QUESTION_BATCH_PROMPT_TEMPLATE, QUESTION_SYSTEM,
};
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, JUROR_ANSWER_INSTRUCTION, NO_CODE_INSTRUCTION};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::QuestionTypeCatalog;

pub struct LlmContentGenerator {
    llm: LlmClient,
    catalog: QuestionTypeCatalog,
    batch_size: u32,
    timeout_secs: u64,
}

impl LlmContentGenerator {
    pub fn new(llm: LlmClient, catalog: QuestionTypeCatalog, batch_size: u32, timeout_secs: u64) -> Self {
        Self {
            llm,
            catalog,
            batch_size: batch_size.max(1),
            timeout_secs,
        }
    }

    fn system_prompt() -> String {
        format!("{QUESTION_SYSTEM} {JSON_ONLY_SYSTEM}")
    }

    fn map_error(&self, err: LlmError, type_code: &str) -> GenerationError {
        match err {
            LlmError::Timeout => GenerationError::Timeout(self.timeout_secs),
            LlmError::Parse(e) => GenerationError::Malformed(e.to_string()),
            LlmError::EmptyContent => GenerationError::Empty(type_code.to_string()),
            other => GenerationError::Backend(other.to_string()),
        }
    }
}

fn or_none(value: &Option<String>) -> &str {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("none")
}

pub fn build_batch_prompt(
    context: &JobContext,
    catalog: &QuestionTypeCatalog,
    type_code: &str,
    count: u32,
    first_number: u32,
) -> String {
    let profile = DifficultyProfile::for_tier(context.salary_tier);
    let description = catalog
        .types()
        .iter()
        .find(|t| t.code == type_code)
        .map(|t| t.description.as_str())
        .unwrap_or("as named");

    QUESTION_BATCH_PROMPT_TEMPLATE
        .replace("{contract_title}", &context.contract_title)
        .replace("{general_requirements}", or_none(&context.general_requirements))
        .replace("{role_name}", &context.role_name)
        .replace("{position_count}", &context.position_count.to_string())
        .replace("{salary_multiplier}", &context.salary_tier.multiplier().to_string())
        .replace("{difficulty_label}", profile.label)
        .replace("{role_requirements}", or_none(&context.role_requirements))
        .replace("{count}", &count.to_string())
        .replace("{type_name}", catalog.display_name(type_code))
        .replace("{type_description}", description)
        .replace("{first_number}", &first_number.to_string())
        .replace("{last_number}", &(first_number + count - 1).to_string())
        .replace("{difficulty_layers}", &profile.describe_layers())
        .replace("{no_code}", NO_CODE_INSTRUCTION)
        .replace("{juror_answer}", JUROR_ANSWER_INSTRUCTION)
}

pub fn build_correction_prompt(request: &CorrectionRequest, catalog: &QuestionTypeCatalog) -> String {
    let context = &request.context;
    let profile = DifficultyProfile::for_tier(context.salary_tier);

    CORRECTION_PROMPT_TEMPLATE
        .replace("{contract_title}", &context.contract_title)
        .replace("{role_name}", &context.role_name)
        .replace("{salary_multiplier}", &context.salary_tier.multiplier().to_string())
        .replace("{difficulty_label}", profile.label)
        .replace("{role_requirements}", or_none(&context.role_requirements))
        .replace("{type_name}", catalog.display_name(&request.item.type_code))
        .replace("{previous_question}", &request.item.question)
        .replace("{previous_answer}", &request.item.expected_answer)
        .replace("{instruction}", request.instruction.trim())
        .replace("{no_code}", NO_CODE_INSTRUCTION)
        .replace("{juror_answer}", JUROR_ANSWER_INSTRUCTION)
}

/// Checks one batch: exact count, no blank text, difficulty filled in.
fn normalize_batch(
    type_code: &str,
    expected: u32,
    batch: Vec<GeneratedQuestion>,
    default_difficulty: &str,
) -> Result<Vec<GeneratedQuestion>, GenerationError> {
    if batch.is_empty() {
        return Err(GenerationError::Empty(type_code.to_string()));
    }
    if batch.len() != expected as usize {
        return Err(GenerationError::CountMismatch {
            type_code: type_code.to_string(),
            expected,
            actual: batch.len() as u32,
        });
    }

    batch
        .into_iter()
        .map(|mut q| {
            if q.question.trim().is_empty() || q.expected_answer.trim().is_empty() {
                return Err(GenerationError::Malformed(format!(
                    "{type_code}: question or expected_answer is blank"
                )));
            }
            if q.difficulty.as_deref().map_or(true, |d| d.trim().is_empty()) {
                q.difficulty = Some(default_difficulty.to_string());
            }
            Ok(q)
        })
        .collect()
}

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    async fn generate_role(
        &self,
        request: &RoleGenerationRequest,
    ) -> Result<BTreeMap<String, Vec<GeneratedQuestion>>, GenerationError> {
        let profile = DifficultyProfile::for_tier(request.context.salary_tier);
        let system = Self::system_prompt();
        let mut output = BTreeMap::new();

        for type_quota in &request.quota.types {
            let mut questions: Vec<GeneratedQuestion> =
                Vec::with_capacity(type_quota.question_count as usize);

            while (questions.len() as u32) < type_quota.question_count {
                let done = questions.len() as u32;
                let count = (type_quota.question_count - done).min(self.batch_size);
                let prompt = build_batch_prompt(
                    &request.context,
                    &self.catalog,
                    &type_quota.type_code,
                    count,
                    done + 1,
                );

                debug!(
                    "Requesting {count} {} questions for role {}",
                    type_quota.type_code, request.quota.role_id
                );
                let batch: Vec<GeneratedQuestion> = self
                    .llm
                    .call_json(&prompt, &system)
                    .await
                    .map_err(|e| self.map_error(e, &type_quota.type_code))?;

                questions.extend(normalize_batch(
                    &type_quota.type_code,
                    count,
                    batch,
                    profile.label,
                )?);
            }

            output.insert(type_quota.type_code.clone(), questions);
        }

        info!(
            "LLM generated {} questions for role {}",
            output.values().map(Vec::len).sum::<usize>(),
            request.quota.role_id
        );
        Ok(output)
    }

    async fn correct_item(&self, request: &CorrectionRequest) -> Result<CorrectedItem, GenerationError> {
        let prompt = build_correction_prompt(request, &self.catalog);
        let corrected: CorrectedItem = self
            .llm
            .call_json(&prompt, &Self::system_prompt())
            .await
            .map_err(|e| self.map_error(e, &request.item.type_code))?;

        if corrected.question.trim().is_empty() || corrected.expected_answer.trim().is_empty() {
            return Err(GenerationError::Malformed(
                "corrected question or expected_answer is blank".to_string(),
            ));
        }
        Ok(corrected)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::{QuestionItem, SalaryTier};

    fn context() -> JobContext {
        JobContext {
            contract_title: "2026 IT Staff Intake".to_string(),
            general_requirements: None,
            role_name: "Mobile Developer".to_string(),
            role_requirements: Some("React Native, Git, REST/SOAP".to_string()),
            salary_tier: SalaryTier::Triple,
            position_count: 2,
        }
    }

    fn generated(n: usize) -> Vec<GeneratedQuestion> {
        (0..n)
            .map(|i| GeneratedQuestion {
                question: format!("Question {i}"),
                expected_answer: "The candidate is expected to ...\n\nKeywords: a, b, c, d".to_string(),
                difficulty: None,
            })
            .collect()
    }

    #[test]
    fn test_batch_prompt_fills_every_placeholder() {
        let catalog = QuestionTypeCatalog::default();
        let prompt = build_batch_prompt(&context(), &catalog, "theoretical_knowledge", 4, 11);

        for placeholder in [
            "{contract_title}",
            "{role_name}",
            "{count}",
            "{type_name}",
            "{difficulty_layers}",
            "{no_code}",
            "{juror_answer}",
            "{first_number}",
            "{last_number}",
        ] {
            assert!(!prompt.contains(placeholder), "{placeholder} left in prompt");
        }
        assert!(prompt.contains("numbered 11 to 14"));
        assert!(prompt.contains("Theoretical Knowledge"));
        assert!(prompt.contains("senior specialist"));
        assert!(prompt.contains("General requirements: none"));
    }

    #[test]
    fn test_correction_prompt_carries_previous_item_and_instruction() {
        let request = CorrectionRequest {
            item: QuestionItem {
                role_id: Uuid::nil(),
                type_code: "practical_application".to_string(),
                ordinal: 3,
                question: "How would you version a REST API?".to_string(),
                expected_answer: "The candidate is expected to ...".to_string(),
                difficulty: "senior specialist".to_string(),
                correcting: true,
            },
            instruction: "  Focus on Git branching instead  ".to_string(),
            context: context(),
        };
        let prompt = build_correction_prompt(&request, &QuestionTypeCatalog::default());

        assert!(prompt.contains("How would you version a REST API?"));
        assert!(prompt.contains("CORRECTION INSTRUCTION:\nFocus on Git branching instead\n"));
        assert!(prompt.contains("Category: Practical Application"));
    }

    #[test]
    fn test_normalize_batch_fills_default_difficulty() {
        let batch = normalize_batch("theory", 3, generated(3), "senior specialist").unwrap();
        assert!(batch
            .iter()
            .all(|q| q.difficulty.as_deref() == Some("senior specialist")));
    }

    #[test]
    fn test_normalize_batch_rejects_short_batch() {
        let err = normalize_batch("theory", 5, generated(3), "x").unwrap_err();
        assert_eq!(
            err,
            GenerationError::CountMismatch {
                type_code: "theory".to_string(),
                expected: 5,
                actual: 3
            }
        );
    }

    #[test]
    fn test_normalize_batch_rejects_empty_and_blank() {
        assert_eq!(
            normalize_batch("theory", 2, Vec::new(), "x").unwrap_err(),
            GenerationError::Empty("theory".to_string())
        );

        let mut batch = generated(2);
        batch[1].question = "   ".to_string();
        assert!(matches!(
            normalize_batch("theory", 2, batch, "x"),
            Err(GenerationError::Malformed(_))
        ));
    }
}
