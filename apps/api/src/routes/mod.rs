pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::booklet::handlers as booklet;
use crate::generation::handlers as generation;
use crate::quota::handlers as quota;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Exam configuration
        .route(
            "/api/v1/question-types",
            get(quota::handle_list_question_types),
        )
        .route(
            "/api/v1/contracts/:contract_id/policy",
            get(quota::handle_get_policy).put(quota::handle_save_policy),
        )
        .route(
            "/api/v1/contracts/:contract_id/quotas",
            get(quota::handle_list_quotas),
        )
        .route(
            "/api/v1/roles/:role_id/quotas/:type_code",
            patch(quota::handle_override_quota),
        )
        // Generation
        .route(
            "/api/v1/roles/:role_id/generate",
            post(generation::handle_generate_role),
        )
        .route(
            "/api/v1/roles/:role_id/regenerate",
            post(generation::handle_regenerate_role),
        )
        .route(
            "/api/v1/contracts/:contract_id/generate",
            post(generation::handle_generate_contract),
        )
        .route(
            "/api/v1/roles/:role_id/generation",
            get(generation::handle_generation_status),
        )
        .route(
            "/api/v1/roles/:role_id/questions",
            get(generation::handle_list_questions),
        )
        .route(
            "/api/v1/roles/:role_id/questions/:type_code/:ordinal/correct",
            post(generation::handle_correct_question),
        )
        // Booklets & export
        .route(
            "/api/v1/roles/:role_id/booklets",
            get(booklet::handle_preview_booklets),
        )
        .route(
            "/api/v1/roles/:role_id/export",
            post(booklet::handle_export_role),
        )
        .route(
            "/api/v1/contracts/:contract_id/export",
            post(booklet::handle_export_contract),
        )
        .with_state(state)
}
