//! Global policy → per-role, per-type question quotas.
//!
//! Pure functions only: no I/O, no shared state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::RoleDescriptor;
use crate::quota::policy::{GlobalPolicy, QuotaWarning};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeQuota {
    pub type_code: String,
    /// Items of this type each candidate receives.
    pub per_candidate: u32,
    /// Items of this type to generate for the whole role.
    pub question_count: u32,
    /// Set when an operator edited `question_count` after derivation.
    #[serde(default)]
    pub overridden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleQuota {
    pub role_id: Uuid,
    pub candidate_count: u32,
    pub types: Vec<TypeQuota>,
}

impl RoleQuota {
    pub fn type_quota(&self, type_code: &str) -> Option<&TypeQuota> {
        self.types.iter().find(|t| t.type_code == type_code)
    }

    pub fn total_questions(&self) -> u32 {
        self.types
            .iter()
            .fold(0u32, |acc, t| acc.saturating_add(t.question_count))
    }

    /// Operator override of one pair. Survives until the policy is re-applied destructively.
    pub fn override_count(&mut self, type_code: &str, question_count: u32) -> Result<&TypeQuota, AppError> {
        let role_id = self.role_id;
        let entry = self
            .types
            .iter_mut()
            .find(|t| t.type_code == type_code)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Question type '{type_code}' is not part of the quota of role {role_id}"
                ))
            })?;
        entry.question_count = question_count;
        entry.overridden = true;
        Ok(entry)
    }
}

fn resolve_role(policy: &GlobalPolicy, role: &RoleDescriptor) -> RoleQuota {
    let candidate_count = role
        .position_count
        .saturating_mul(policy.candidate_multiplier);
    let active = policy.questions_per_candidate > 0;

    let types = policy
        .distribution
        .iter()
        .map(|(code, per_candidate)| {
            let per_candidate = if active { *per_candidate } else { 0 };
            TypeQuota {
                type_code: code.clone(),
                per_candidate,
                question_count: candidate_count.saturating_mul(per_candidate),
                overridden: false,
            }
        })
        .collect();

    RoleQuota {
        role_id: role.id,
        candidate_count,
        types,
    }
}

/// Destructive resolution: every role gets a freshly derived quota, in input order.
pub fn resolve(policy: &GlobalPolicy, roles: &[RoleDescriptor]) -> Vec<RoleQuota> {
    roles.iter().map(|role| resolve_role(policy, role)).collect()
}

/// Opt-in resolution that keeps operator overrides found in `prior`.
///
/// A prior pair is kept only when it is flagged `overridden` and its type is still in
/// the distribution. Everything else is recomputed from `policy`.
pub fn resolve_preserving(
    policy: &GlobalPolicy,
    roles: &[RoleDescriptor],
    prior: &[RoleQuota],
) -> Vec<RoleQuota> {
    let overrides: HashMap<(Uuid, &str), u32> = prior
        .iter()
        .flat_map(|q| {
            q.types
                .iter()
                .filter(|t| t.overridden)
                .map(move |t| ((q.role_id, t.type_code.as_str()), t.question_count))
        })
        .collect();

    roles
        .iter()
        .map(|role| {
            let mut quota = resolve_role(policy, role);
            for t in &mut quota.types {
                if let Some(count) = overrides.get(&(role.id, t.type_code.as_str())) {
                    t.question_count = *count;
                    t.overridden = true;
                }
            }
            quota
        })
        .collect()
}

pub fn collect_warnings(policy: &GlobalPolicy, quotas: &[RoleQuota]) -> Vec<QuotaWarning> {
    let mut warnings = Vec::new();

    let declared = policy.distribution_total();
    if declared != policy.questions_per_candidate {
        warnings.push(QuotaWarning::DistributionMismatch {
            declared,
            expected: policy.questions_per_candidate,
        });
    }

    warnings.extend(
        quotas
            .iter()
            .filter(|q| q.total_questions() == 0)
            .map(|q| QuotaWarning::EmptyQuota { role_id: q.role_id }),
    );

    warnings
}
