//! Role/contract store: the read-mostly collaborator that owns contracts, roles,
//! the global exam policy and persisted per-role quotas.
//!
//! `AppState` holds an `Arc<dyn ContractStore>`: Postgres in production,
//! the in-memory store in tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ContractRecord, RoleDescriptor};
use crate::quota::{GlobalPolicy, RoleQuota, TypeQuota};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryContractStore;
pub use postgres::PgContractStore;

#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn get_contract(&self, contract_id: Uuid) -> Result<Option<ContractRecord>, AppError>;

    /// Roles of a contract in stable display order.
    async fn list_roles(&self, contract_id: Uuid) -> Result<Vec<RoleDescriptor>, AppError>;

    async fn get_role(&self, role_id: Uuid) -> Result<Option<RoleDescriptor>, AppError>;

    async fn get_policy(&self, contract_id: Uuid) -> Result<Option<GlobalPolicy>, AppError>;

    async fn save_policy(&self, contract_id: Uuid, policy: &GlobalPolicy) -> Result<(), AppError>;

    /// Persisted quotas of every role of the contract. Roles never resolved are absent.
    async fn load_quotas(&self, contract_id: Uuid) -> Result<Vec<RoleQuota>, AppError>;

    /// Supersedes every stored quota of the contract with `quotas`.
    async fn replace_quotas(&self, contract_id: Uuid, quotas: &[RoleQuota]) -> Result<(), AppError>;

    /// Incremental edit of one (role, type) pair.
    async fn upsert_type_quota(
        &self,
        role_id: Uuid,
        candidate_count: u32,
        quota: &TypeQuota,
    ) -> Result<(), AppError>;
}
