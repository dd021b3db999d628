use std::sync::Arc;

use crate::booklet::{AssignmentPolicy, BundleSink};
use crate::generation::GenerationOrchestrator;
use crate::models::QuestionTypeCatalog;
use crate::store::ContractStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Contracts, roles, policy and quotas. Default: PgContractStore.
    pub store: Arc<dyn ContractStore>,
    /// Owns the ContentPool and per-role generation state for the process lifetime.
    pub orchestrator: Arc<GenerationOrchestrator>,
    /// Export destination. Default: S3BundleSink.
    pub bundles: Arc<dyn BundleSink>,
    /// Candidate → question assignment. Default: RoundRobinAssignment.
    pub assignment: Arc<dyn AssignmentPolicy>,
    pub catalog: QuestionTypeCatalog,
}
