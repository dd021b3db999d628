use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

pub const MIN_CANDIDATE_MULTIPLIER: u32 = 1;
pub const MAX_CANDIDATE_MULTIPLIER: u32 = 20;

/// Cross-role exam configuration of one contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalPolicy {
    /// Candidates invited per open position.
    pub candidate_multiplier: u32,
    /// Total items each candidate receives.
    pub questions_per_candidate: u32,
    /// Question-type code → items of that type per candidate.
    pub distribution: BTreeMap<String, u32>,
}

impl Default for GlobalPolicy {
    fn default() -> Self {
        let distribution = BTreeMap::from([
            ("professional_experience".to_string(), 1),
            ("theoretical_knowledge".to_string(), 2),
            ("practical_application".to_string(), 2),
        ]);
        Self {
            candidate_multiplier: 10,
            questions_per_candidate: 5,
            distribution,
        }
    }
}

impl GlobalPolicy {
    pub fn distribution_total(&self) -> u32 {
        self.distribution
            .values()
            .fold(0u32, |acc, v| acc.saturating_add(*v))
    }

    /// Checks applied when an operator saves the policy.
    ///
    /// A distribution that does not sum to `questions_per_candidate` is accepted here;
    /// it is reported as a [`QuotaWarning`] instead.
    pub fn validate_edit(&self) -> Result<(), AppError> {
        if !(MIN_CANDIDATE_MULTIPLIER..=MAX_CANDIDATE_MULTIPLIER)
            .contains(&self.candidate_multiplier)
        {
            return Err(AppError::Validation(format!(
                "candidate_multiplier must be between {MIN_CANDIDATE_MULTIPLIER} and \
                 {MAX_CANDIDATE_MULTIPLIER} (got {})",
                self.candidate_multiplier
            )));
        }
        if self.questions_per_candidate == 0 {
            return Err(AppError::Validation(
                "questions_per_candidate must be at least 1".to_string(),
            ));
        }
        if self.distribution.keys().any(|k| k.trim().is_empty()) {
            return Err(AppError::Validation(
                "distribution contains an empty question type code".to_string(),
            ));
        }
        Ok(())
    }
}

/// Non-fatal findings about a policy and the quotas it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuotaWarning {
    /// The per-type distribution does not add up to `questions_per_candidate`.
    DistributionMismatch { declared: u32, expected: u32 },
    /// The role would receive no questions at all.
    EmptyQuota { role_id: Uuid },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_consistent() {
        let policy = GlobalPolicy::default();
        assert_eq!(policy.distribution_total(), policy.questions_per_candidate);
        assert!(policy.validate_edit().is_ok());
    }

    #[test]
    fn test_validate_edit_rejects_multiplier_out_of_range() {
        let mut policy = GlobalPolicy::default();
        policy.candidate_multiplier = 0;
        assert!(matches!(policy.validate_edit(), Err(AppError::Validation(_))));
        policy.candidate_multiplier = 21;
        assert!(matches!(policy.validate_edit(), Err(AppError::Validation(_))));
        policy.candidate_multiplier = 20;
        assert!(policy.validate_edit().is_ok());
    }

    #[test]
    fn test_validate_edit_accepts_mismatched_distribution() {
        let mut policy = GlobalPolicy::default();
        policy.questions_per_candidate = 7;
        assert!(policy.validate_edit().is_ok());
    }

    #[test]
    fn test_validate_edit_rejects_blank_type_code() {
        let mut policy = GlobalPolicy::default();
        policy.distribution.insert("  ".to_string(), 1);
        assert!(policy.validate_edit().is_err());
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let json = serde_json::to_value(QuotaWarning::DistributionMismatch {
            declared: 4,
            expected: 5,
        })
        .unwrap();
        assert_eq!(json["kind"], "distribution_mismatch");
        assert_eq!(json["declared"], 4);
    }
}
