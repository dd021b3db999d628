//! Question generation: collaborator boundary, LLM-backed generator, difficulty profiles,
//! and the per-role orchestrator that fills the ContentPool.
//! All LLM calls go through llm_client; nothing here talks to the Anthropic API directly.

pub mod collaborator;
pub mod difficulty;
pub mod handlers;
pub mod llm_generator;
pub mod orchestrator;
pub mod prompts;

pub use collaborator::{ContentGenerator, JobContext, RoleGenerationRequest};
pub use orchestrator::{GenerationMode, GenerationOrchestrator, GenerationState};

use uuid::Uuid;

use crate::errors::AppError;
use crate::models::RoleDescriptor;
use crate::quota::{require_contract, require_role, role_quota};
use crate::store::ContractStore;

/// Loads everything the collaborator needs for one role: its current quota and job context.
pub async fn role_request(
    store: &dyn ContractStore,
    role_id: Uuid,
) -> Result<(RoleDescriptor, RoleGenerationRequest), AppError> {
    let role = require_role(store, role_id).await?;
    let contract = require_contract(store, role.contract_id).await?;
    let quota = role_quota(store, &role).await?;
    let context = JobContext::new(&contract, &role);
    Ok((role, RoleGenerationRequest { quota, context }))
}
