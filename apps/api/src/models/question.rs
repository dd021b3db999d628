use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One generated interview question. Identity within a role is `(type_code, ordinal)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionItem {
    pub role_id: Uuid,
    pub type_code: String,
    /// Zero-based position inside the role+type bucket. Stable across corrections.
    pub ordinal: u32,
    pub question: String,
    pub expected_answer: String,
    pub difficulty: String,
    /// Set while a single-item correction for this item is in flight.
    #[serde(default)]
    pub correcting: bool,
}

impl QuestionItem {
    pub fn key(&self) -> (&str, u32) {
        (self.type_code.as_str(), self.ordinal)
    }
}

/// A question category shown to operators and used to order exported sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionType {
    pub code: String,
    pub name: String,
    pub description: String,
    pub order_index: u32,
}

/// Ordered set of known question types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionTypeCatalog {
    types: Vec<QuestionType>,
}

impl Default for QuestionTypeCatalog {
    fn default() -> Self {
        Self::new(vec![
            QuestionType {
                code: "professional_experience".to_string(),
                name: "Professional Experience".to_string(),
                description: "Questions assessing the candidate's experience and past projects"
                    .to_string(),
                order_index: 1,
            },
            QuestionType {
                code: "theoretical_knowledge".to_string(),
                name: "Theoretical Knowledge".to_string(),
                description: "Questions measuring technical concepts and theory".to_string(),
                order_index: 2,
            },
            QuestionType {
                code: "practical_application".to_string(),
                name: "Practical Application".to_string(),
                description: "Questions testing problem solving and applied skills".to_string(),
                order_index: 3,
            },
        ])
    }
}

impl QuestionTypeCatalog {
    pub fn new(mut types: Vec<QuestionType>) -> Self {
        types.sort_by_key(|t| t.order_index);
        Self { types }
    }

    pub fn types(&self) -> &[QuestionType] {
        &self.types
    }

    /// Display name for a code, falling back to the code itself for unknown types.
    pub fn display_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.types
            .iter()
            .find(|t| t.code == code)
            .map(|t| t.name.as_str())
            .unwrap_or(code)
    }

    /// Sort key placing catalog types first (in catalog order), unknown codes after, alphabetically.
    pub fn sort_key<'a>(&self, code: &'a str) -> (u32, &'a str) {
        let index = self
            .types
            .iter()
            .find(|t| t.code == code)
            .map(|t| t.order_index)
            .unwrap_or(u32::MAX);
        (index, code)
    }
}
