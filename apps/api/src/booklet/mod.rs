//! Booklet assembly and export: candidate booklets, juror answer keys, document bundles.

pub mod assembler;
pub mod assignment;
pub mod export;
pub mod handlers;
pub mod render;

pub use assembler::{assemble, AssembledRole};
pub use assignment::{AssignmentPolicy, RoundRobinAssignment};
pub use export::{BundleSink, ExportReceipt, InMemoryBundleSink, S3BundleSink};

use tracing::info;

use crate::errors::AppError;
use crate::models::{ContractRecord, RoleDescriptor};
use crate::quota::role_quota;
use crate::state::AppState;

/// Assembles one role from its `Ready` content, provided the content still matches its quota.
pub async fn assemble_role(state: &AppState, role: &RoleDescriptor) -> Result<AssembledRole, AppError> {
    let quota = role_quota(state.store.as_ref(), role).await?;
    let items = state.orchestrator.ready_content(&quota).await?;
    assemble(&quota, &items, &state.catalog, state.assignment.as_ref())
}

/// Assembles every role first and uploads only if all of them succeed.
pub async fn export_roles(
    state: &AppState,
    contract: &ContractRecord,
    roles: &[RoleDescriptor],
) -> Result<ExportReceipt, AppError> {
    if roles.is_empty() {
        return Err(AppError::Validation(format!(
            "Contract {} has no roles to export",
            contract.id
        )));
    }

    let mut assembled = Vec::with_capacity(roles.len());
    for role in roles {
        assembled.push((role.clone(), assemble_role(state, role).await?));
    }

    let bundle = export::build_bundle(contract, &assembled, &state.catalog, state.assignment.name())?;
    let receipt = state.bundles.store(&bundle).await?;

    info!(
        "Exported bundle {} for contract {} ({} roles, {} documents)",
        receipt.bundle_id,
        contract.id,
        roles.len(),
        receipt.documents.len()
    );
    Ok(receipt)
}
