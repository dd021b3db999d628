use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::contract::RoleRow;
use crate::models::{ContractRecord, RoleDescriptor};
use crate::quota::{GlobalPolicy, RoleQuota, TypeQuota};
use crate::store::ContractStore;

/// Postgres-backed store. Schema lives in `migrations/0001_exam_configuration.sql`.
#[derive(Clone)]
pub struct PgContractStore {
    pool: PgPool,
}

impl PgContractStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PolicyRow {
    candidate_multiplier: i32,
    questions_per_candidate: i32,
    distribution: serde_json::Value,
}

#[derive(Debug, FromRow)]
struct QuotaRow {
    role_id: Uuid,
    type_code: String,
    candidate_count: i32,
    per_candidate: i32,
    question_count: i32,
    overridden: bool,
}

fn db_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn from_db_int(value: i32) -> u32 {
    value.max(0) as u32
}

#[async_trait]
impl ContractStore for PgContractStore {
    async fn get_contract(&self, contract_id: Uuid) -> Result<Option<ContractRecord>, AppError> {
        Ok(sqlx::query_as::<_, ContractRecord>(
            "SELECT id, title, general_requirements, created_at FROM contracts WHERE id = $1",
        )
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_roles(&self, contract_id: Uuid) -> Result<Vec<RoleDescriptor>, AppError> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, contract_id, name, position_count, salary_multiplier, requirements
            FROM roles
            WHERE contract_id = $1
            ORDER BY name, id
            "#,
        )
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| RoleDescriptor::try_from(row).map_err(AppError::Validation))
            .collect()
    }

    async fn get_role(&self, role_id: Uuid) -> Result<Option<RoleDescriptor>, AppError> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, contract_id, name, position_count, salary_multiplier, requirements
            FROM roles
            WHERE id = $1
            "#,
        )
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| RoleDescriptor::try_from(r).map_err(AppError::Validation))
            .transpose()
    }

    async fn get_policy(&self, contract_id: Uuid) -> Result<Option<GlobalPolicy>, AppError> {
        let row = sqlx::query_as::<_, PolicyRow>(
            r#"
            SELECT candidate_multiplier, questions_per_candidate, distribution
            FROM global_policies
            WHERE contract_id = $1
            "#,
        )
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let distribution: BTreeMap<String, u32> = serde_json::from_value(row.distribution)
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!(
                    "Stored distribution for contract {contract_id} is malformed: {e}"
                ))
            })?;

        Ok(Some(GlobalPolicy {
            candidate_multiplier: from_db_int(row.candidate_multiplier),
            questions_per_candidate: from_db_int(row.questions_per_candidate),
            distribution,
        }))
    }

    async fn save_policy(&self, contract_id: Uuid, policy: &GlobalPolicy) -> Result<(), AppError> {
        let distribution = serde_json::to_value(&policy.distribution).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to serialize distribution: {e}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO global_policies
                (contract_id, candidate_multiplier, questions_per_candidate, distribution, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (contract_id) DO UPDATE SET
                candidate_multiplier = EXCLUDED.candidate_multiplier,
                questions_per_candidate = EXCLUDED.questions_per_candidate,
                distribution = EXCLUDED.distribution,
                updated_at = NOW()
            "#,
        )
        .bind(contract_id)
        .bind(db_int(policy.candidate_multiplier))
        .bind(db_int(policy.questions_per_candidate))
        .bind(distribution)
        .execute(&self.pool)
        .await?;

        info!("Saved global policy for contract {contract_id}");
        Ok(())
    }

    async fn load_quotas(&self, contract_id: Uuid) -> Result<Vec<RoleQuota>, AppError> {
        let rows = sqlx::query_as::<_, QuotaRow>(
            r#"
            SELECT q.role_id, q.type_code, q.candidate_count, q.per_candidate,
                   q.question_count, q.overridden
            FROM role_quotas q
            JOIN roles r ON r.id = q.role_id
            WHERE r.contract_id = $1
            ORDER BY r.name, r.id, q.type_code
            "#,
        )
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await?;

        let mut quotas: Vec<RoleQuota> = Vec::new();
        for row in rows {
            let type_quota = TypeQuota {
                type_code: row.type_code,
                per_candidate: from_db_int(row.per_candidate),
                question_count: from_db_int(row.question_count),
                overridden: row.overridden,
            };
            match quotas.last_mut() {
                Some(last) if last.role_id == row.role_id => last.types.push(type_quota),
                _ => quotas.push(RoleQuota {
                    role_id: row.role_id,
                    candidate_count: from_db_int(row.candidate_count),
                    types: vec![type_quota],
                }),
            }
        }
        Ok(quotas)
    }

    async fn replace_quotas(&self, contract_id: Uuid, quotas: &[RoleQuota]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM role_quotas WHERE role_id IN (SELECT id FROM roles WHERE contract_id = $1)",
        )
        .bind(contract_id)
        .execute(&mut *tx)
        .await?;

        for quota in quotas {
            for type_quota in &quota.types {
                sqlx::query(
                    r#"
                    INSERT INTO role_quotas
                        (role_id, type_code, candidate_count, per_candidate, question_count, overridden)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(quota.role_id)
                .bind(&type_quota.type_code)
                .bind(db_int(quota.candidate_count))
                .bind(db_int(type_quota.per_candidate))
                .bind(db_int(type_quota.question_count))
                .bind(type_quota.overridden)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        info!(
            "Replaced quotas for contract {contract_id} ({} roles)",
            quotas.len()
        );
        Ok(())
    }

    async fn upsert_type_quota(
        &self,
        role_id: Uuid,
        candidate_count: u32,
        quota: &TypeQuota,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO role_quotas
                (role_id, type_code, candidate_count, per_candidate, question_count, overridden)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (role_id, type_code) DO UPDATE SET
                candidate_count = EXCLUDED.candidate_count,
                per_candidate = EXCLUDED.per_candidate,
                question_count = EXCLUDED.question_count,
                overridden = EXCLUDED.overridden
            "#,
        )
        .bind(role_id)
        .bind(&quota.type_code)
        .bind(db_int(candidate_count))
        .bind(db_int(quota.per_candidate))
        .bind(db_int(quota.question_count))
        .bind(quota.overridden)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
