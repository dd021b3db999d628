use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A hiring announcement. Owned by the CRUD layer; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContractRecord {
    pub id: Uuid,
    pub title: String,
    pub general_requirements: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Categorical salary multiplier of a role. Drives question difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SalaryTier {
    Double,
    Triple,
    Quadruple,
}

impl SalaryTier {
    pub fn multiplier(self) -> u8 {
        match self {
            SalaryTier::Double => 2,
            SalaryTier::Triple => 3,
            SalaryTier::Quadruple => 4,
        }
    }
}

impl TryFrom<u8> for SalaryTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(SalaryTier::Double),
            3 => Ok(SalaryTier::Triple),
            4 => Ok(SalaryTier::Quadruple),
            other => Err(format!("salary tier must be 2, 3 or 4 (got {other})")),
        }
    }
}

impl From<SalaryTier> for u8 {
    fn from(tier: SalaryTier) -> Self {
        tier.multiplier()
    }
}

/// A job position category inside a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDescriptor {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub name: String,
    /// Always >= 1.
    pub position_count: u32,
    pub salary_tier: SalaryTier,
    pub requirements: Option<String>,
}

/// Raw `roles` row as stored in Postgres.
#[derive(Debug, Clone, FromRow)]
pub struct RoleRow {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub name: String,
    pub position_count: i32,
    pub salary_multiplier: i16,
    pub requirements: Option<String>,
}

impl TryFrom<RoleRow> for RoleDescriptor {
    type Error = String;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        if row.position_count < 1 {
            return Err(format!(
                "role {} has position_count {} (must be >= 1)",
                row.id, row.position_count
            ));
        }
        let tier = u8::try_from(row.salary_multiplier)
            .map_err(|_| format!("role {} has salary multiplier {}", row.id, row.salary_multiplier))
            .and_then(SalaryTier::try_from)?;

        Ok(RoleDescriptor {
            id: row.id,
            contract_id: row.contract_id,
            name: row.name,
            position_count: row.position_count as u32,
            salary_tier: tier,
            requirements: row.requirements,
        })
    }
}
