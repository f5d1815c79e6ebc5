use serde::{Deserialize, Serialize};

use crate::domain::department::DepartmentId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

/// Read-only employee view as resolved by the directory. Identity fields are
/// owned by the employee service; this engine never mutates them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: EmployeeId,
    pub name: String,
    pub designation: String,
    pub department_id: Option<DepartmentId>,
    /// Seniority rank, 1 = lowest. Approvals route exactly one level up.
    pub hierarchy_level: u8,
}
