use sqlx::Row;

use vittalogic_core::domain::department::{Department, DepartmentId};
use vittalogic_core::domain::employee::EmployeeId;

use super::{map_constraint_error, parse_datetime, DepartmentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlDepartmentRepository {
    pool: DbPool,
}

impl SqlDepartmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "department_id, name, description, created_by, updated_by, created_at, last_updated";

fn row_to_department(row: &sqlx::sqlite::SqliteRow) -> Result<Department, RepositoryError> {
    let decode = |error: sqlx::Error| RepositoryError::Decode(error.to_string());

    let id: String = row.try_get("department_id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let description: Option<String> = row.try_get("description").map_err(decode)?;
    let created_by: String = row.try_get("created_by").map_err(decode)?;
    let updated_by: Option<String> = row.try_get("updated_by").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    let last_updated: Option<String> = row.try_get("last_updated").map_err(decode)?;

    Ok(Department {
        id: DepartmentId(id),
        name,
        description,
        created_by: EmployeeId(created_by),
        updated_by: updated_by.map(EmployeeId),
        created_at: parse_datetime("created_at", &created_at)?,
        last_updated: last_updated
            .map(|raw| parse_datetime("last_updated", &raw))
            .transpose()?,
    })
}

#[async_trait::async_trait]
impl DepartmentRepository for SqlDepartmentRepository {
    async fn insert(&self, department: Department) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO department (department_id, name, description, created_by, updated_by,
                                     created_at, last_updated)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&department.id.0)
        .bind(&department.name)
        .bind(&department.description)
        .bind(&department.created_by.0)
        .bind(department.updated_by.as_ref().map(|id| id.0.as_str()))
        .bind(department.created_at.to_rfc3339())
        .bind(department.last_updated.map(|at| at.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|error| map_constraint_error(error, "department.name"))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &DepartmentId) -> Result<Option<Department>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM department WHERE department_id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_department(row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Department>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM department WHERE name = ?"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_department(row)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, department: Department) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE department
             SET name = ?, description = ?, updated_by = ?, last_updated = ?
             WHERE department_id = ?",
        )
        .bind(&department.name)
        .bind(&department.description)
        .bind(department.updated_by.as_ref().map(|id| id.0.as_str()))
        .bind(department.last_updated.map(|at| at.to_rfc3339()))
        .bind(&department.id.0)
        .execute(&self.pool)
        .await
        .map_err(|error| map_constraint_error(error, "department.name"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use vittalogic_core::domain::department::{Department, DepartmentId};
    use vittalogic_core::domain::employee::EmployeeId;

    use super::SqlDepartmentRepository;
    use crate::repositories::{DepartmentRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_department(id: &str, name: &str) -> Department {
        Department {
            id: DepartmentId(id.to_string()),
            name: name.to_string(),
            description: Some("Accounting and treasury".to_string()),
            created_by: EmployeeId("EMP-3001".to_string()),
            updated_by: None,
            created_at: Utc::now(),
            last_updated: None,
        }
    }

    #[tokio::test]
    async fn insert_and_find_by_id_and_name() {
        let pool = setup().await;
        let repo = SqlDepartmentRepository::new(pool);

        repo.insert(sample_department("DEPT-001", "Finance")).await.expect("insert");

        let by_id = repo
            .find_by_id(&DepartmentId("DEPT-001".to_string()))
            .await
            .expect("find by id")
            .expect("should exist");
        assert_eq!(by_id.name, "Finance");

        let by_name = repo.find_by_name("Finance").await.expect("find by name");
        assert!(by_name.is_some());

        // Name comparison is exact, case-sensitive.
        let lowercased = repo.find_by_name("finance").await.expect("find by name");
        assert!(lowercased.is_none());
    }

    #[tokio::test]
    async fn duplicate_name_is_a_conflict() {
        let pool = setup().await;
        let repo = SqlDepartmentRepository::new(pool);

        repo.insert(sample_department("DEPT-001", "Finance")).await.expect("insert");
        let error = repo
            .insert(sample_department("DEPT-002", "Finance"))
            .await
            .expect_err("duplicate name must be rejected");
        assert!(matches!(error, RepositoryError::Conflict { constraint: "department.name" }));
    }

    #[tokio::test]
    async fn update_writes_audit_fields() {
        let pool = setup().await;
        let repo = SqlDepartmentRepository::new(pool);
        repo.insert(sample_department("DEPT-001", "Finance")).await.expect("insert");

        let mut department = repo
            .find_by_id(&DepartmentId("DEPT-001".to_string()))
            .await
            .expect("find")
            .expect("should exist");
        department.name = "Finance & Accounts".to_string();
        department.updated_by = Some(EmployeeId("EMP-3001".to_string()));
        department.last_updated = Some(Utc::now());
        repo.update(department).await.expect("update");

        let updated = repo
            .find_by_id(&DepartmentId("DEPT-001".to_string()))
            .await
            .expect("find")
            .expect("should exist");
        assert_eq!(updated.name, "Finance & Accounts");
        assert_eq!(updated.updated_by, Some(EmployeeId("EMP-3001".to_string())));
        assert!(updated.last_updated.is_some());
    }

    #[tokio::test]
    async fn renaming_to_an_existing_name_is_a_conflict() {
        let pool = setup().await;
        let repo = SqlDepartmentRepository::new(pool);
        repo.insert(sample_department("DEPT-001", "Finance")).await.expect("insert 1");
        repo.insert(sample_department("DEPT-002", "Operations")).await.expect("insert 2");

        let mut department = repo
            .find_by_id(&DepartmentId("DEPT-002".to_string()))
            .await
            .expect("find")
            .expect("should exist");
        department.name = "Finance".to_string();

        let error = repo.update(department).await.expect_err("rename onto existing name");
        assert!(matches!(error, RepositoryError::Conflict { constraint: "department.name" }));
    }
}
