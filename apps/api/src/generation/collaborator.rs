//! Boundary to the external content-generation backend.
//!
//! The backend is fallible, slow and non-deterministic: two calls with the same input may
//! return different questions. The orchestrator never retries on its own.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ContractRecord, QuestionItem, RoleDescriptor, SalaryTier};
use crate::quota::RoleQuota;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("timeout after {0}s")]
    Timeout(u64),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("empty result for {0}")]
    Empty(String),

    #[error("{type_code}: expected {expected} items, got {actual}")]
    CountMismatch {
        type_code: String,
        expected: u32,
        actual: u32,
    },

    #[error("backend error: {0}")]
    Backend(String),
}

/// What the backend knows about the hiring context of a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContext {
    pub contract_title: String,
    pub general_requirements: Option<String>,
    pub role_name: String,
    pub role_requirements: Option<String>,
    pub salary_tier: SalaryTier,
    pub position_count: u32,
}

impl JobContext {
    pub fn new(contract: &ContractRecord, role: &RoleDescriptor) -> Self {
        Self {
            contract_title: contract.title.clone(),
            general_requirements: contract.general_requirements.clone(),
            role_name: role.name.clone(),
            role_requirements: role.requirements.clone(),
            salary_tier: role.salary_tier,
            position_count: role.position_count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoleGenerationRequest {
    pub quota: RoleQuota,
    pub context: JobContext,
}

/// One question as returned by the backend, before it is placed in the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question: String,
    pub expected_answer: String,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CorrectionRequest {
    pub item: QuestionItem,
    pub instruction: String,
    pub context: JobContext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectedItem {
    pub question: String,
    pub expected_answer: String,
}

/// Content-generation collaborator.
///
/// Default: `LlmContentGenerator`. Tests inject a scripted fake.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Returns questions per type code for the whole role.
    async fn generate_role(
        &self,
        request: &RoleGenerationRequest,
    ) -> Result<BTreeMap<String, Vec<GeneratedQuestion>>, GenerationError>;

    /// Rewrites one existing item following a free-text instruction.
    async fn correct_item(&self, request: &CorrectionRequest) -> Result<CorrectedItem, GenerationError>;
}
