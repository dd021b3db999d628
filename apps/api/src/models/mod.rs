pub mod contract;
pub mod question;

pub use contract::{ContractRecord, RoleDescriptor, SalaryTier};
pub use question::{QuestionItem, QuestionType, QuestionTypeCatalog};
