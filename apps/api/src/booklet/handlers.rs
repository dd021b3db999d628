//! Axum route handlers for booklet preview and export.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::booklet::{assemble_role, export_roles, AssembledRole, ExportReceipt};
use crate::errors::AppError;
use crate::quota::{require_contract, require_role};
use crate::state::AppState;

/// GET /api/v1/roles/:role_id/booklets
///
/// Assembled booklets and juror packet of a `Ready` role. Nothing is uploaded.
pub async fn handle_preview_booklets(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
) -> Result<Json<AssembledRole>, AppError> {
    let role = require_role(state.store.as_ref(), role_id).await?;
    let assembled = assemble_role(&state, &role).await?;
    Ok(Json(assembled))
}

/// POST /api/v1/roles/:role_id/export
pub async fn handle_export_role(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
) -> Result<Json<ExportReceipt>, AppError> {
    let role = require_role(state.store.as_ref(), role_id).await?;
    let contract = require_contract(state.store.as_ref(), role.contract_id).await?;
    let receipt = export_roles(&state, &contract, std::slice::from_ref(&role)).await?;
    Ok(Json(receipt))
}

/// POST /api/v1/contracts/:contract_id/export
///
/// Fails without uploading anything if any role is not ready.
pub async fn handle_export_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<ExportReceipt>, AppError> {
    let contract = require_contract(state.store.as_ref(), contract_id).await?;
    let roles = state.store.list_roles(contract_id).await?;
    let receipt = export_roles(&state, &contract, &roles).await?;
    Ok(Json(receipt))
}
