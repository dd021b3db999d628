pub mod handlers;
pub mod policy;
pub mod resolver;

pub use policy::{GlobalPolicy, QuotaWarning};
pub use resolver::{collect_warnings, resolve, resolve_preserving, RoleQuota, TypeQuota};

use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ContractRecord, RoleDescriptor};
use crate::store::ContractStore;

pub async fn require_contract(
    store: &dyn ContractStore,
    contract_id: Uuid,
) -> Result<ContractRecord, AppError> {
    store
        .get_contract(contract_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contract {contract_id} not found")))
}

pub async fn require_role(store: &dyn ContractStore, role_id: Uuid) -> Result<RoleDescriptor, AppError> {
    store
        .get_role(role_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Role {role_id} not found")))
}

/// Saved policy of the contract, or the default policy when none was saved yet.
pub async fn effective_policy(
    store: &dyn ContractStore,
    contract_id: Uuid,
) -> Result<GlobalPolicy, AppError> {
    Ok(store.get_policy(contract_id).await?.unwrap_or_default())
}

/// Current quotas of every role, in role order.
///
/// Persisted quotas win; roles added after the last policy save get a freshly derived quota.
pub async fn contract_quotas(
    store: &dyn ContractStore,
    contract_id: Uuid,
) -> Result<(GlobalPolicy, Vec<RoleDescriptor>, Vec<RoleQuota>), AppError> {
    let policy = effective_policy(store, contract_id).await?;
    let roles = store.list_roles(contract_id).await?;
    let stored = store.load_quotas(contract_id).await?;

    let quotas = roles
        .iter()
        .map(|role| {
            stored
                .iter()
                .find(|q| q.role_id == role.id)
                .cloned()
                .unwrap_or_else(|| derive_one(&policy, role))
        })
        .collect();

    Ok((policy, roles, quotas))
}

/// Current quota of a single role.
pub async fn role_quota(store: &dyn ContractStore, role: &RoleDescriptor) -> Result<RoleQuota, AppError> {
    let stored = store.load_quotas(role.contract_id).await?;
    if let Some(quota) = stored.into_iter().find(|q| q.role_id == role.id) {
        return Ok(quota);
    }
    let policy = effective_policy(store, role.contract_id).await?;
    Ok(derive_one(&policy, role))
}

/// Saves the policy and supersedes every role quota of the contract.
///
/// Destructive unless `preserve_overrides` is set, in which case overridden pairs of the
/// previously stored quotas are carried over.
pub async fn apply_policy(
    store: &dyn ContractStore,
    contract_id: Uuid,
    policy: &GlobalPolicy,
    preserve_overrides: bool,
) -> Result<(Vec<RoleQuota>, Vec<QuotaWarning>), AppError> {
    policy.validate_edit()?;
    require_contract(store, contract_id).await?;

    let roles = store.list_roles(contract_id).await?;
    let quotas = if preserve_overrides {
        let prior = store.load_quotas(contract_id).await?;
        resolve_preserving(policy, &roles, &prior)
    } else {
        resolve(policy, &roles)
    };

    store.save_policy(contract_id, policy).await?;
    store.replace_quotas(contract_id, &quotas).await?;

    let warnings = collect_warnings(policy, &quotas);
    info!(
        "Applied policy to contract {contract_id}: {} roles, {} warnings (preserve_overrides={preserve_overrides})",
        quotas.len(),
        warnings.len()
    );
    Ok((quotas, warnings))
}

fn derive_one(policy: &GlobalPolicy, role: &RoleDescriptor) -> RoleQuota {
    resolve(policy, std::slice::from_ref(role))
        .into_iter()
        .next()
        .unwrap_or_else(|| RoleQuota {
            role_id: role.id,
            candidate_count: 0,
            types: Vec::new(),
        })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::SalaryTier;
    use crate::store::InMemoryContractStore;

    async fn seeded() -> (InMemoryContractStore, Uuid, RoleDescriptor) {
        let store = InMemoryContractStore::new();
        let contract_id = Uuid::new_v4();
        store
            .insert_contract(ContractRecord {
                id: contract_id,
                title: "2026 Engineering Intake".to_string(),
                general_requirements: None,
                created_at: Utc::now(),
            })
            .await;
        let role = RoleDescriptor {
            id: Uuid::new_v4(),
            contract_id,
            name: "Backend Developer".to_string(),
            position_count: 2,
            salary_tier: SalaryTier::Double,
            requirements: None,
        };
        store.insert_role(role.clone()).await;
        (store, contract_id, role)
    }

    #[tokio::test]
    async fn test_unsaved_contract_uses_default_policy() {
        let (store, contract_id, _) = seeded().await;
        let (policy, roles, quotas) = contract_quotas(&store, contract_id).await.unwrap();
        assert_eq!(policy, GlobalPolicy::default());
        assert_eq!(roles.len(), 1);
        assert_eq!(quotas[0].candidate_count, 20);
        assert_eq!(quotas[0].total_questions(), 100);
    }

    #[tokio::test]
    async fn test_apply_policy_is_destructive_by_default() {
        let (store, contract_id, role) = seeded().await;
        let policy = GlobalPolicy::default();
        apply_policy(&store, contract_id, &policy, false).await.unwrap();

        let mut quota = role_quota(&store, &role).await.unwrap();
        let edited = quota.override_count("theoretical_knowledge", 7).unwrap().clone();
        store
            .upsert_type_quota(role.id, quota.candidate_count, &edited)
            .await
            .unwrap();

        apply_policy(&store, contract_id, &policy, true).await.unwrap();
        let kept = role_quota(&store, &role).await.unwrap();
        assert_eq!(kept.type_quota("theoretical_knowledge").unwrap().question_count, 7);

        apply_policy(&store, contract_id, &policy, false).await.unwrap();
        let reset = role_quota(&store, &role).await.unwrap();
        assert_eq!(reset.type_quota("theoretical_knowledge").unwrap().question_count, 40);
    }

    #[tokio::test]
    async fn test_apply_policy_rejects_invalid_multiplier() {
        let (store, contract_id, _) = seeded().await;
        let mut policy = GlobalPolicy::default();
        policy.candidate_multiplier = 25;
        let err = apply_policy(&store, contract_id, &policy, false).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.get_policy(contract_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_policy_unknown_contract() {
        let store = InMemoryContractStore::new();
        let err = apply_policy(&store, Uuid::new_v4(), &GlobalPolicy::default(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
