//! Axum route handlers for exam configuration: policy, quotas, question types.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::QuestionType;
use crate::quota::{
    apply_policy, collect_warnings, contract_quotas, effective_policy, require_contract,
    require_role, role_quota, GlobalPolicy, QuotaWarning, RoleQuota,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SavePolicyRequest {
    pub policy: GlobalPolicy,
    /// Carry operator overrides into the re-resolved quotas.
    #[serde(default)]
    pub preserve_overrides: bool,
}

#[derive(Debug, Serialize)]
pub struct QuotasResponse {
    pub contract_id: Uuid,
    pub policy: GlobalPolicy,
    pub quotas: Vec<RoleQuota>,
    pub warnings: Vec<QuotaWarning>,
}

#[derive(Debug, Deserialize)]
pub struct OverrideQuotaRequest {
    pub question_count: u32,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/question-types
pub async fn handle_list_question_types(State(state): State<AppState>) -> Json<Vec<QuestionType>> {
    Json(state.catalog.types().to_vec())
}

/// GET /api/v1/contracts/:contract_id/policy
///
/// Returns the saved policy, or the default one if the contract has none yet.
pub async fn handle_get_policy(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<GlobalPolicy>, AppError> {
    require_contract(state.store.as_ref(), contract_id).await?;
    let policy = effective_policy(state.store.as_ref(), contract_id).await?;
    Ok(Json(policy))
}

/// PUT /api/v1/contracts/:contract_id/policy
///
/// Saves the policy and re-resolves every role quota of the contract.
/// Manual overrides are discarded unless `preserve_overrides` is true.
pub async fn handle_save_policy(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    Json(request): Json<SavePolicyRequest>,
) -> Result<Json<QuotasResponse>, AppError> {
    let (quotas, warnings) = apply_policy(
        state.store.as_ref(),
        contract_id,
        &request.policy,
        request.preserve_overrides,
    )
    .await?;

    Ok(Json(QuotasResponse {
        contract_id,
        policy: request.policy,
        quotas,
        warnings,
    }))
}

/// GET /api/v1/contracts/:contract_id/quotas
pub async fn handle_list_quotas(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<QuotasResponse>, AppError> {
    require_contract(state.store.as_ref(), contract_id).await?;
    let (policy, _roles, quotas) = contract_quotas(state.store.as_ref(), contract_id).await?;
    let warnings = collect_warnings(&policy, &quotas);

    Ok(Json(QuotasResponse {
        contract_id,
        policy,
        quotas,
        warnings,
    }))
}

/// PATCH /api/v1/roles/:role_id/quotas/:type_code
///
/// Overrides one role/type question count. The edit persists until the policy is
/// re-saved without `preserve_overrides`.
pub async fn handle_override_quota(
    State(state): State<AppState>,
    Path((role_id, type_code)): Path<(Uuid, String)>,
    Json(request): Json<OverrideQuotaRequest>,
) -> Result<Json<RoleQuota>, AppError> {
    let role = require_role(state.store.as_ref(), role_id).await?;
    let mut quota = role_quota(state.store.as_ref(), &role).await?;

    quota.override_count(&type_code, request.question_count)?;
    // A role never persisted before (added after the last policy save) must land with all of
    // its pairs, not only the edited one.
    for type_quota in &quota.types {
        state
            .store
            .upsert_type_quota(role_id, quota.candidate_count, type_quota)
            .await?;
    }

    info!(
        "Quota override for role {role_id}: {type_code} = {}",
        request.question_count
    );
    Ok(Json(quota))
}
