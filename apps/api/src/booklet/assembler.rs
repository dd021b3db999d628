//! BookletAssembler: pool content + quota → candidate booklets and the juror answer key.
//!
//! Pure: reads a snapshot of one role's items, never touches the pool itself.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booklet::assignment::AssignmentPolicy;
use crate::errors::AppError;
use crate::models::{QuestionItem, QuestionTypeCatalog};
use crate::quota::RoleQuota;

/// A question as printed for a candidate. Carries no expected answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookletQuestion {
    pub type_code: String,
    pub ordinal: u32,
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booklet {
    pub role_id: Uuid,
    /// 1..=candidate_count
    pub candidate_index: u32,
    pub questions: Vec<BookletQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurorSection {
    pub type_code: String,
    pub items: Vec<QuestionItem>,
}

/// Answer key covering every item of the role, grouped by type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurorPacket {
    pub role_id: Uuid,
    pub sections: Vec<JurorSection>,
}

impl JurorPacket {
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssembledRole {
    pub booklets: Vec<Booklet>,
    pub juror_packet: JurorPacket,
}

/// Builds one booklet per candidate plus the juror packet.
///
/// Fails with `IncompleteContent` when any type has fewer items than its quota.
/// Booklet sections follow catalog order; within a type, items follow the assignment policy.
pub fn assemble(
    quota: &RoleQuota,
    items: &[QuestionItem],
    catalog: &QuestionTypeCatalog,
    policy: &dyn AssignmentPolicy,
) -> Result<AssembledRole, AppError> {
    let role_id = quota.role_id;

    let mut type_quotas: Vec<_> = quota.types.iter().collect();
    type_quotas.sort_by(|a, b| {
        catalog
            .sort_key(&a.type_code)
            .cmp(&catalog.sort_key(&b.type_code))
    });

    // Items of each quota type, ordered by ordinal, truncated to the quota.
    let mut buckets: Vec<(u32, Vec<&QuestionItem>)> = Vec::with_capacity(type_quotas.len());
    for type_quota in &type_quotas {
        let mut of_type: Vec<&QuestionItem> = items
            .iter()
            .filter(|i| i.role_id == role_id && i.type_code == type_quota.type_code)
            .collect();
        if (of_type.len() as u64) < type_quota.question_count as u64 {
            return Err(AppError::IncompleteContent(format!(
                "Role {role_id} has {} {} items, quota is {}",
                of_type.len(),
                type_quota.type_code,
                type_quota.question_count
            )));
        }
        of_type.sort_by_key(|i| i.ordinal);
        of_type.truncate(type_quota.question_count as usize);
        buckets.push((type_quota.per_candidate, of_type));
    }

    let booklets = (1..=quota.candidate_count)
        .map(|candidate_index| {
            let questions = buckets
                .iter()
                .flat_map(|(per_candidate, pool)| {
                    policy
                        .assign(candidate_index, *per_candidate, pool.len() as u32)
                        .into_iter()
                        .map(move |position| {
                            let item = pool[position as usize];
                            BookletQuestion {
                                type_code: item.type_code.clone(),
                                ordinal: item.ordinal,
                                question: item.question.clone(),
                            }
                        })
                })
                .collect();
            Booklet {
                role_id,
                candidate_index,
                questions,
            }
        })
        .collect();

    Ok(AssembledRole {
        booklets,
        juror_packet: juror_packet(role_id, items, catalog),
    })
}

fn juror_packet(role_id: Uuid, items: &[QuestionItem], catalog: &QuestionTypeCatalog) -> JurorPacket {
    let mut codes: Vec<&str> = items
        .iter()
        .filter(|i| i.role_id == role_id)
        .map(|i| i.type_code.as_str())
        .collect();
    codes.sort_by_key(|c| catalog.sort_key(*c));
    codes.dedup();

    let sections = codes
        .into_iter()
        .map(|code| {
            let mut section: Vec<QuestionItem> = items
                .iter()
                .filter(|i| i.role_id == role_id && i.type_code == code)
                .cloned()
                .collect();
            section.sort_by_key(|i| i.ordinal);
            JurorSection {
                type_code: code.to_string(),
                items: section,
            }
        })
        .collect();

    JurorPacket { role_id, sections }
}
