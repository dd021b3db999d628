//! Markdown rendering of booklets and juror packets, plus document naming.

use std::collections::BTreeMap;

use crate::booklet::assembler::{Booklet, JurorPacket};
use crate::models::{ContractRecord, QuestionTypeCatalog, RoleDescriptor};

/// ASCII-only file stem: Turkish letters transliterated, whitespace runs → `_`,
/// anything else outside `[A-Za-z0-9_.-]` dropped.
pub fn fold_ascii(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_gap = false;

    for ch in name.trim().chars() {
        let mapped = match ch {
            'ç' => 'c',
            'Ç' => 'C',
            'ğ' => 'g',
            'Ğ' => 'G',
            'ı' => 'i',
            'İ' => 'I',
            'ö' => 'o',
            'Ö' => 'O',
            'ş' => 's',
            'Ş' => 'S',
            'ü' => 'u',
            'Ü' => 'U',
            c if c.is_whitespace() => {
                pending_gap = true;
                continue;
            }
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') => c,
            _ => continue,
        };
        if pending_gap && !out.is_empty() {
            out.push('_');
        }
        pending_gap = false;
        out.push(mapped);
    }

    if out.is_empty() {
        "role".to_string()
    } else {
        out
    }
}

/// `{stem} {tier}x`, shared by the role folder and every document in it.
pub fn role_label(role: &RoleDescriptor) -> String {
    format!("{} {}x", fold_ascii(&role.name), role.salary_tier.multiplier())
}

/// Labels for the roles of one bundle, in input order. Roles whose labels collide (same
/// name and tier, or names folding to the same ASCII) get the first eight hex digits of
/// their id appended.
pub fn unique_role_labels(roles: &[&RoleDescriptor]) -> Vec<String> {
    let labels: Vec<String> = roles.iter().map(|r| role_label(r)).collect();
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    for label in &labels {
        *seen.entry(label.clone()).or_default() += 1;
    }

    roles
        .iter()
        .zip(labels)
        .map(|(role, label)| {
            if seen.get(&label).copied().unwrap_or(0) > 1 {
                let id = role.id.simple().to_string();
                format!("{label} {}", &id[..8])
            } else {
                label
            }
        })
        .collect()
}

pub fn booklet_file_name(label: &str, candidate_index: u32) -> String {
    format!("{label} S{candidate_index}.md")
}

pub fn juror_file_name(label: &str) -> String {
    format!("{label} C.md")
}

fn header(md: &mut String, contract: &ContractRecord, role: &RoleDescriptor) {
    md.push_str(&format!("# {}\n\n", contract.title));
    md.push_str(&format!("- **Role:** {}\n", role.name));
    md.push_str(&format!(
        "- **Salary multiplier:** {}x\n",
        role.salary_tier.multiplier()
    ));
}

/// Candidate booklet. Numbering runs across sections.
pub fn render_booklet_md(
    contract: &ContractRecord,
    role: &RoleDescriptor,
    booklet: &Booklet,
    catalog: &QuestionTypeCatalog,
) -> String {
    let mut md = String::new();
    header(&mut md, contract, role);
    md.push_str(&format!("- **Candidate:** S{}\n\n", booklet.candidate_index));

    let mut current_type: Option<&str> = None;
    for (n, q) in booklet.questions.iter().enumerate() {
        if current_type != Some(q.type_code.as_str()) {
            md.push_str(&format!("## {}\n\n", catalog.display_name(&q.type_code)));
            current_type = Some(q.type_code.as_str());
        }
        md.push_str(&format!("{}. {}\n\n", n + 1, q.question.trim()));
    }
    md
}

/// Juror answer key: every item of the role with its expected answer.
pub fn render_juror_md(
    contract: &ContractRecord,
    role: &RoleDescriptor,
    packet: &JurorPacket,
    catalog: &QuestionTypeCatalog,
) -> String {
    let mut md = String::new();
    header(&mut md, contract, role);
    md.push_str("- **Document:** Juror answer key\n\n");

    for section in &packet.sections {
        md.push_str(&format!("## {}\n\n", catalog.display_name(&section.type_code)));
        for item in &section.items {
            md.push_str(&format!("### Q{}. {}\n", item.ordinal + 1, item.question.trim()));
            md.push_str(&format!("- **Difficulty:** {}\n\n", item.difficulty));
            md.push_str(item.expected_answer.trim());
            md.push_str("\n\n");
        }
    }
    md
}
