use sqlx::Row;

use vittalogic_core::directory::{DirectoryError, EmployeeDirectory};
use vittalogic_core::domain::department::DepartmentId;
use vittalogic_core::domain::employee::{EmployeeId, EmployeeRecord};

use crate::DbPool;

/// Directory view backed by the local `employee` table. In a split deployment
/// the same trait is implemented against the employee service instead.
pub struct SqlEmployeeDirectory {
    pool: DbPool,
}

impl SqlEmployeeDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl EmployeeDirectory for SqlEmployeeDirectory {
    async fn get_employee(&self, id: &EmployeeId) -> Result<EmployeeRecord, DirectoryError> {
        let row = sqlx::query(
            "SELECT employee_id, name, designation, department_id, hierarchy_level
             FROM employee WHERE employee_id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| DirectoryError::Unavailable(error.to_string()))?;

        let Some(row) = row else {
            return Err(DirectoryError::NotFound { employee_id: id.0.clone() });
        };

        let decode = |error: sqlx::Error| DirectoryError::Unavailable(error.to_string());
        let employee_id: String = row.try_get("employee_id").map_err(decode)?;
        let name: String = row.try_get("name").map_err(decode)?;
        let designation: String = row.try_get("designation").map_err(decode)?;
        let department_id: Option<String> = row.try_get("department_id").map_err(decode)?;
        let hierarchy_level: i64 = row.try_get("hierarchy_level").map_err(decode)?;

        let hierarchy_level = u8::try_from(hierarchy_level).map_err(|_| {
            DirectoryError::Unavailable(format!(
                "employee `{employee_id}` has out-of-range hierarchy level {hierarchy_level}"
            ))
        })?;

        Ok(EmployeeRecord {
            id: EmployeeId(employee_id),
            name,
            designation,
            department_id: department_id.map(DepartmentId),
            hierarchy_level,
        })
    }
}
