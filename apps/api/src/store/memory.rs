use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ContractRecord, RoleDescriptor};
use crate::quota::{GlobalPolicy, RoleQuota, TypeQuota};
use crate::store::ContractStore;

#[derive(Default)]
struct Tables {
    contracts: HashMap<Uuid, ContractRecord>,
    roles: Vec<RoleDescriptor>,
    policies: HashMap<Uuid, GlobalPolicy>,
    quotas: HashMap<Uuid, RoleQuota>,
}

/// Process-local store used by tests and local demos.
#[derive(Clone, Default)]
pub struct InMemoryContractStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryContractStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_contract(&self, contract: ContractRecord) {
        self.tables
            .write()
            .await
            .contracts
            .insert(contract.id, contract);
    }

    pub async fn insert_role(&self, role: RoleDescriptor) {
        let mut tables = self.tables.write().await;
        tables.roles.retain(|r| r.id != role.id);
        tables.roles.push(role);
    }
}

#[async_trait]
impl ContractStore for InMemoryContractStore {
    async fn get_contract(&self, contract_id: Uuid) -> Result<Option<ContractRecord>, AppError> {
        Ok(self.tables.read().await.contracts.get(&contract_id).cloned())
    }

    async fn list_roles(&self, contract_id: Uuid) -> Result<Vec<RoleDescriptor>, AppError> {
        let tables = self.tables.read().await;
        let mut roles: Vec<RoleDescriptor> = tables
            .roles
            .iter()
            .filter(|r| r.contract_id == contract_id)
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(roles)
    }

    async fn get_role(&self, role_id: Uuid) -> Result<Option<RoleDescriptor>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .roles
            .iter()
            .find(|r| r.id == role_id)
            .cloned())
    }

    async fn get_policy(&self, contract_id: Uuid) -> Result<Option<GlobalPolicy>, AppError> {
        Ok(self.tables.read().await.policies.get(&contract_id).cloned())
    }

    async fn save_policy(&self, contract_id: Uuid, policy: &GlobalPolicy) -> Result<(), AppError> {
        self.tables
            .write()
            .await
            .policies
            .insert(contract_id, policy.clone());
        Ok(())
    }

    async fn load_quotas(&self, contract_id: Uuid) -> Result<Vec<RoleQuota>, AppError> {
        let roles = self.list_roles(contract_id).await?;
        let tables = self.tables.read().await;
        Ok(roles
            .iter()
            .filter_map(|r| tables.quotas.get(&r.id).cloned())
            .collect())
    }

    async fn replace_quotas(&self, contract_id: Uuid, quotas: &[RoleQuota]) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let role_ids: Vec<Uuid> = tables
            .roles
            .iter()
            .filter(|r| r.contract_id == contract_id)
            .map(|r| r.id)
            .collect();
        for id in role_ids {
            tables.quotas.remove(&id);
        }
        for quota in quotas {
            tables.quotas.insert(quota.role_id, quota.clone());
        }
        Ok(())
    }

    async fn upsert_type_quota(
        &self,
        role_id: Uuid,
        candidate_count: u32,
        quota: &TypeQuota,
    ) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let entry = tables.quotas.entry(role_id).or_insert_with(|| RoleQuota {
            role_id,
            candidate_count,
            types: Vec::new(),
        });
        entry.candidate_count = candidate_count;
        match entry
            .types
            .iter_mut()
            .find(|t| t.type_code == quota.type_code)
        {
            Some(existing) => *existing = quota.clone(),
            None => {
                entry.types.push(quota.clone());
                entry.types.sort_by(|a, b| a.type_code.cmp(&b.type_code));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SalaryTier;

    fn role(contract_id: Uuid, name: &str) -> RoleDescriptor {
        RoleDescriptor {
            id: Uuid::new_v4(),
            contract_id,
            name: name.to_string(),
            position_count: 1,
            salary_tier: SalaryTier::Double,
            requirements: None,
        }
    }

    #[tokio::test]
    async fn test_list_roles_scoped_and_sorted() {
        let store = InMemoryContractStore::new();
        let contract = Uuid::new_v4();
        store.insert_role(role(contract, "Tester")).await;
        store.insert_role(role(contract, "Analyst")).await;
        store.insert_role(role(Uuid::new_v4(), "Other")).await;

        let names: Vec<String> = store
            .list_roles(contract)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Analyst", "Tester"]);
    }

    #[tokio::test]
    async fn test_upsert_type_quota_replaces_existing_pair() {
        let store = InMemoryContractStore::new();
        let contract = Uuid::new_v4();
        let r = role(contract, "Analyst");
        let role_id = r.id;
        store.insert_role(r).await;

        let mut quota = TypeQuota {
            type_code: "theoretical_knowledge".to_string(),
            per_candidate: 2,
            question_count: 20,
            overridden: false,
        };
        store.upsert_type_quota(role_id, 10, &quota).await.unwrap();
        quota.question_count = 35;
        quota.overridden = true;
        store.upsert_type_quota(role_id, 10, &quota).await.unwrap();

        let stored = store.load_quotas(contract).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].types.len(), 1);
        assert_eq!(stored[0].types[0].question_count, 35);
        assert!(stored[0].types[0].overridden);
    }
}
