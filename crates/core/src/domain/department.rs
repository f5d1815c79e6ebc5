use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepartmentId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub description: Option<String>,
    pub created_by: EmployeeId,
    pub updated_by: Option<EmployeeId>,
    pub created_at: DateTime<Utc>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Department {
    /// Department names are compared exactly, case-sensitive, after trimming.
    pub fn normalize_name(raw: &str) -> Result<String, DomainError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("department name must not be empty".to_owned()));
        }
        Ok(name.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::Department;
    use crate::errors::DomainError;

    #[test]
    fn normalize_name_trims_surrounding_whitespace() {
        let name = Department::normalize_name("  Finance  ").expect("name should be accepted");
        assert_eq!(name, "Finance");
    }

    #[test]
    fn normalize_name_preserves_case() {
        let name = Department::normalize_name("finance").expect("name should be accepted");
        assert_eq!(name, "finance");
    }

    #[test]
    fn normalize_name_rejects_blank_input() {
        let error = Department::normalize_name("   ").expect_err("blank name must be rejected");
        assert!(matches!(error, DomainError::Validation(_)));
    }
}
