//! Axum route handlers for the Generation API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::orchestrator::RoleDispatch;
use crate::generation::{
    role_request, GenerationMode, GenerationState, JobContext, RoleGenerationRequest,
};
use crate::models::QuestionItem;
use crate::quota::{contract_quotas, require_contract, require_role};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegenerateRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct CorrectionBody {
    pub instruction: String,
}

#[derive(Debug, Serialize)]
pub struct GenerationStatusResponse {
    pub role_id: Uuid,
    #[serde(flatten)]
    pub state: GenerationState,
    pub item_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ContractGenerationResponse {
    pub contract_id: Uuid,
    pub roles: Vec<RoleDispatch>,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub role_id: Uuid,
    #[serde(flatten)]
    pub state: GenerationState,
    pub items: Vec<QuestionItem>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

async fn dispatch(
    state: &AppState,
    role_id: Uuid,
    mode: GenerationMode,
) -> Result<(StatusCode, Json<GenerationStatusResponse>), AppError> {
    let (_, request) = role_request(state.store.as_ref(), role_id).await?;
    state.orchestrator.spawn_generation(request, mode).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerationStatusResponse {
            role_id,
            state: GenerationState::Generating,
            item_count: 0,
        }),
    ))
}

/// POST /api/v1/roles/:role_id/generate
///
/// Starts generation in the background and returns 202. Poll the generation
/// endpoint for the terminal state.
pub async fn handle_generate_role(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
) -> Result<(StatusCode, Json<GenerationStatusResponse>), AppError> {
    dispatch(&state, role_id, GenerationMode::Initial).await
}

/// POST /api/v1/roles/:role_id/regenerate
///
/// Replaces all questions of the role. Requires `{"confirm": true}`.
pub async fn handle_regenerate_role(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
    Json(request): Json<RegenerateRequest>,
) -> Result<(StatusCode, Json<GenerationStatusResponse>), AppError> {
    if !request.confirm {
        return Err(AppError::Validation(
            "Regeneration replaces every question of the role; send {\"confirm\": true}".to_string(),
        ));
    }
    dispatch(&state, role_id, GenerationMode::Regenerate).await
}

/// POST /api/v1/contracts/:contract_id/generate
///
/// Fans out one generation task per role. Roles already generating or already
/// generated are reported as rejected; the others start.
pub async fn handle_generate_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ContractGenerationResponse>), AppError> {
    let contract = require_contract(state.store.as_ref(), contract_id).await?;
    let (_, roles, quotas) = contract_quotas(state.store.as_ref(), contract_id).await?;

    let requests = roles
        .iter()
        .zip(quotas)
        .map(|(role, quota)| RoleGenerationRequest {
            quota,
            context: JobContext::new(&contract, role),
        })
        .collect();

    let dispatches = state
        .orchestrator
        .spawn_for_roles(requests, GenerationMode::Initial)
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(ContractGenerationResponse {
            contract_id,
            roles: dispatches,
        }),
    ))
}

/// GET /api/v1/roles/:role_id/generation
pub async fn handle_generation_status(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
) -> Result<Json<GenerationStatusResponse>, AppError> {
    require_role(state.store.as_ref(), role_id).await?;
    let generation = state.orchestrator.state(role_id).await;
    let item_count = state
        .orchestrator
        .pool()
        .get(role_id)
        .await
        .map(|items| items.len())
        .unwrap_or(0);

    Ok(Json(GenerationStatusResponse {
        role_id,
        state: generation,
        item_count,
    }))
}

/// GET /api/v1/roles/:role_id/questions
///
/// Current pool content of the role, answers included. Empty before the first
/// successful generation.
pub async fn handle_list_questions(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
) -> Result<Json<QuestionsResponse>, AppError> {
    require_role(state.store.as_ref(), role_id).await?;
    let generation = state.orchestrator.state(role_id).await;
    let items = state
        .orchestrator
        .pool()
        .get(role_id)
        .await
        .unwrap_or_default();

    Ok(Json(QuestionsResponse {
        role_id,
        state: generation,
        items,
    }))
}

/// POST /api/v1/roles/:role_id/questions/:type_code/:ordinal/correct
///
/// Rewrites a single question following a free-text instruction. On failure the
/// previous question stays in place.
pub async fn handle_correct_question(
    State(state): State<AppState>,
    Path((role_id, type_code, ordinal)): Path<(Uuid, String, u32)>,
    Json(body): Json<CorrectionBody>,
) -> Result<Json<QuestionItem>, AppError> {
    let (_, request) = role_request(state.store.as_ref(), role_id).await?;

    let item = state
        .orchestrator
        .correct_single_item(role_id, &type_code, ordinal, &body.instruction, request.context)
        .await?;

    Ok(Json(item))
}
