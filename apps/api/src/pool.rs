//! ContentPool: generated questions keyed by role.
//!
//! Each role owns its own `RwLock`, so roles never contend with each other, readers of a
//! role run concurrently, and at most one writer mutates a role at a time. Every
//! whole-role replace bumps the role's epoch; a single-item correction started against an
//! older epoch is refused on commit, so a role can never end up mixing two generations.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::QuestionItem;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("No generated content for role {0}")]
    RoleAbsent(Uuid),

    #[error("Role {role_id} has no {type_code} item #{ordinal}")]
    ItemAbsent {
        role_id: Uuid,
        type_code: String,
        ordinal: u32,
    },

    #[error("A correction of {type_code} item #{ordinal} is already in flight")]
    AlreadyCorrecting { type_code: String, ordinal: u32 },

    #[error("Role {0} was regenerated while the correction was in flight")]
    Superseded(Uuid),
}

impl From<PoolError> for AppError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::RoleAbsent(_) => AppError::IncompleteContent(err.to_string()),
            PoolError::ItemAbsent { .. } => AppError::NotFound(err.to_string()),
            PoolError::AlreadyCorrecting { .. } | PoolError::Superseded(_) => {
                AppError::Conflict(err.to_string())
            }
        }
    }
}

#[derive(Debug, Default)]
struct RoleBucket {
    epoch: u64,
    items: Vec<QuestionItem>,
}

impl RoleBucket {
    fn find_mut(&mut self, type_code: &str, ordinal: u32) -> Option<&mut QuestionItem> {
        self.items
            .iter_mut()
            .find(|i| i.type_code == type_code && i.ordinal == ordinal)
    }
}

#[derive(Clone, Default)]
pub struct ContentPool {
    roles: Arc<RwLock<HashMap<Uuid, Arc<RwLock<RoleBucket>>>>>,
}

impl ContentPool {
    pub fn new() -> Self {
        Self::default()
    }

    async fn bucket(&self, role_id: Uuid) -> Option<Arc<RwLock<RoleBucket>>> {
        self.roles.read().await.get(&role_id).cloned()
    }

    async fn bucket_or_insert(&self, role_id: Uuid) -> Arc<RwLock<RoleBucket>> {
        if let Some(bucket) = self.bucket(role_id).await {
            return bucket;
        }
        self.roles
            .write()
            .await
            .entry(role_id)
            .or_default()
            .clone()
    }

    /// All items of a role, ordered by type then ordinal. `None` if never generated.
    pub async fn get(&self, role_id: Uuid) -> Option<Vec<QuestionItem>> {
        let bucket = self.bucket(role_id).await?;
        let items = bucket.read().await.items.clone();
        Some(items)
    }

    /// Replaces the role's whole bucket. Returns the new epoch.
    pub async fn replace_role(&self, role_id: Uuid, mut items: Vec<QuestionItem>) -> u64 {
        items.sort_by(|a, b| a.type_code.cmp(&b.type_code).then(a.ordinal.cmp(&b.ordinal)));
        for item in &mut items {
            item.role_id = role_id;
            item.correcting = false;
        }

        let bucket = self.bucket_or_insert(role_id).await;
        let mut guard = bucket.write().await;
        guard.epoch += 1;
        guard.items = items;
        info!(
            "Content pool: role {role_id} replaced with {} items (epoch {})",
            guard.items.len(),
            guard.epoch
        );
        guard.epoch
    }

    /// Replaces one item in place, keeping its identity `(role, type, ordinal)`.
    pub async fn replace_item(
        &self,
        role_id: Uuid,
        type_code: &str,
        ordinal: u32,
        item: QuestionItem,
    ) -> Result<QuestionItem, PoolError> {
        let bucket = self
            .bucket(role_id)
            .await
            .ok_or(PoolError::RoleAbsent(role_id))?;
        let mut guard = bucket.write().await;
        let slot = guard
            .find_mut(type_code, ordinal)
            .ok_or_else(|| item_absent(role_id, type_code, ordinal))?;

        slot.question = item.question;
        slot.expected_answer = item.expected_answer;
        slot.difficulty = item.difficulty;
        slot.correcting = false;
        Ok(slot.clone())
    }

    /// Flags an item as being corrected and returns it with the epoch it belongs to.
    pub async fn begin_correction(
        &self,
        role_id: Uuid,
        type_code: &str,
        ordinal: u32,
    ) -> Result<(QuestionItem, u64), PoolError> {
        let bucket = self
            .bucket(role_id)
            .await
            .ok_or(PoolError::RoleAbsent(role_id))?;
        let mut guard = bucket.write().await;
        let epoch = guard.epoch;
        let slot = guard
            .find_mut(type_code, ordinal)
            .ok_or_else(|| item_absent(role_id, type_code, ordinal))?;

        if slot.correcting {
            return Err(PoolError::AlreadyCorrecting {
                type_code: type_code.to_string(),
                ordinal,
            });
        }
        slot.correcting = true;
        Ok((slot.clone(), epoch))
    }

    /// Writes a correction back, provided the role was not replaced since `begin_correction`.
    pub async fn commit_correction(
        &self,
        role_id: Uuid,
        epoch: u64,
        item: QuestionItem,
    ) -> Result<QuestionItem, PoolError> {
        let bucket = self
            .bucket(role_id)
            .await
            .ok_or(PoolError::RoleAbsent(role_id))?;
        let mut guard = bucket.write().await;
        if guard.epoch != epoch {
            return Err(PoolError::Superseded(role_id));
        }
        let slot = guard
            .find_mut(&item.type_code, item.ordinal)
            .ok_or_else(|| item_absent(role_id, &item.type_code, item.ordinal))?;

        slot.question = item.question;
        slot.expected_answer = item.expected_answer;
        slot.difficulty = item.difficulty;
        slot.correcting = false;
        Ok(slot.clone())
    }

    /// Clears the in-flight flag, leaving the item's content unchanged.
    pub async fn abort_correction(&self, role_id: Uuid, epoch: u64, type_code: &str, ordinal: u32) {
        let Some(bucket) = self.bucket(role_id).await else {
            return;
        };
        let mut guard = bucket.write().await;
        if guard.epoch != epoch {
            return;
        }
        if let Some(slot) = guard.find_mut(type_code, ordinal) {
            slot.correcting = false;
        }
    }
}

fn item_absent(role_id: Uuid, type_code: &str, ordinal: u32) -> PoolError {
    PoolError::ItemAbsent {
        role_id,
        type_code: type_code.to_string(),
        ordinal,
    }
}
