use rust_decimal::Decimal;
use sqlx::Row;

use vittalogic_core::domain::approval::ApprovalId;
use vittalogic_core::domain::budget::{BudgetId, DepartmentBudget};
use vittalogic_core::domain::department::DepartmentId;
use vittalogic_core::domain::employee::EmployeeId;

use super::{
    map_constraint_error, parse_date, parse_datetime, parse_decimal, DepartmentBudgetRepository,
    RepositoryError,
};
use crate::DbPool;

pub struct SqlDepartmentBudgetRepository {
    pool: DbPool,
}

impl SqlDepartmentBudgetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "budget_id, department_id, approval_id, period_from, period_to, \
                              allocated_amount, used_amount, notes, created_by, created_at";

fn row_to_budget(row: &sqlx::sqlite::SqliteRow) -> Result<DepartmentBudget, RepositoryError> {
    let decode = |error: sqlx::Error| RepositoryError::Decode(error.to_string());

    let id: String = row.try_get("budget_id").map_err(decode)?;
    let department_id: String = row.try_get("department_id").map_err(decode)?;
    let approval_id: String = row.try_get("approval_id").map_err(decode)?;
    let period_from: String = row.try_get("period_from").map_err(decode)?;
    let period_to: String = row.try_get("period_to").map_err(decode)?;
    let allocated_amount: String = row.try_get("allocated_amount").map_err(decode)?;
    let used_amount: String = row.try_get("used_amount").map_err(decode)?;
    let notes: Option<String> = row.try_get("notes").map_err(decode)?;
    let created_by: String = row.try_get("created_by").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;

    Ok(DepartmentBudget {
        id: BudgetId(id),
        department_id: DepartmentId(department_id),
        approval_id: ApprovalId(approval_id),
        period_from: parse_date("period_from", &period_from)?,
        period_to: parse_date("period_to", &period_to)?,
        allocated_amount: parse_decimal("allocated_amount", &allocated_amount)?,
        used_amount: parse_decimal("used_amount", &used_amount)?,
        notes,
        created_by: EmployeeId(created_by),
        created_at: parse_datetime("created_at", &created_at)?,
    })
}

#[async_trait::async_trait]
impl DepartmentBudgetRepository for SqlDepartmentBudgetRepository {
    async fn insert(&self, budget: DepartmentBudget) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO department_budget (budget_id, department_id, approval_id, period_from,
                                            period_to, allocated_amount, used_amount, notes,
                                            created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&budget.id.0)
        .bind(&budget.department_id.0)
        .bind(&budget.approval_id.0)
        .bind(budget.period_from.to_string())
        .bind(budget.period_to.to_string())
        .bind(budget.allocated_amount.to_string())
        .bind(budget.used_amount.to_string())
        .bind(&budget.notes)
        .bind(&budget.created_by.0)
        .bind(budget.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|error| map_constraint_error(error, "department_budget.approval_id"))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &BudgetId) -> Result<Option<DepartmentBudget>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM department_budget WHERE budget_id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_budget(row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_approval_id(
        &self,
        id: &ApprovalId,
    ) -> Result<Option<DepartmentBudget>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM department_budget WHERE approval_id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_budget(row)?)),
            None => Ok(None),
        }
    }

    async fn list_for_department(
        &self,
        id: &DepartmentId,
    ) -> Result<Vec<DepartmentBudget>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM department_budget
             WHERE department_id = ? ORDER BY created_at DESC"
        ))
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_budget).collect::<Result<Vec<_>, _>>()
    }

    async fn try_apply_usage(
        &self,
        id: &BudgetId,
        expected_used: Decimal,
        new_used: Decimal,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE department_budget SET used_amount = ?
             WHERE budget_id = ? AND used_amount = ?",
        )
        .bind(new_used.to_string())
        .bind(&id.0)
        .bind(expected_used.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use vittalogic_core::domain::approval::{
        Approval, ApprovalCategory, ApprovalId, ApprovalPriority, ApprovalStatus,
    };
    use vittalogic_core::domain::budget::{BudgetId, DepartmentBudget};
    use vittalogic_core::domain::department::{Department, DepartmentId};
    use vittalogic_core::domain::employee::EmployeeId;

    use super::SqlDepartmentBudgetRepository;
    use crate::repositories::{
        ApprovalRepository, DepartmentBudgetRepository, DepartmentRepository, RepositoryError,
        SqlApprovalRepository, SqlDepartmentRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    /// Insert the parent department and approval so FK constraints hold.
    async fn insert_parents(pool: &sqlx::SqlitePool, department_id: &str, approval_id: &str) {
        let departments = SqlDepartmentRepository::new(pool.clone());
        departments
            .insert(Department {
                id: DepartmentId(department_id.to_string()),
                name: format!("Department {department_id}"),
                description: None,
                created_by: EmployeeId("EMP-3001".to_string()),
                updated_by: None,
                created_at: Utc::now(),
                last_updated: None,
            })
            .await
            .expect("insert parent department");

        let approvals = SqlApprovalRepository::new(pool.clone());
        approvals
            .insert(Approval {
                id: ApprovalId(approval_id.to_string()),
                sender_id: EmployeeId("EMP-2001".to_string()),
                approver_id: EmployeeId("EMP-3001".to_string()),
                category: ApprovalCategory::DepartmentBudget,
                reason: "Quarterly budget".to_string(),
                priority: ApprovalPriority::High,
                expense_min: Decimal::new(100_000, 0),
                expense_max: Decimal::new(150_000, 0),
                tentative_date: NaiveDate::from_ymd_opt(2024, 2, 1).expect("valid date"),
                status: ApprovalStatus::Approved,
                submitted_at: Utc::now(),
                action_by: Some(EmployeeId("EMP-3001".to_string())),
                action_at: Some(Utc::now()),
                action_note: None,
            })
            .await
            .expect("insert parent approval");
    }

    fn sample_budget(id: &str, department_id: &str, approval_id: &str) -> DepartmentBudget {
        DepartmentBudget {
            id: BudgetId(id.to_string()),
            department_id: DepartmentId(department_id.to_string()),
            approval_id: ApprovalId(approval_id.to_string()),
            period_from: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            period_to: NaiveDate::from_ymd_opt(2024, 3, 31).expect("valid date"),
            allocated_amount: Decimal::new(120_000, 0),
            used_amount: Decimal::ZERO,
            notes: Some("Q1 allocation".to_string()),
            created_by: EmployeeId("EMP-3001".to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_find_round_trips() {
        let pool = setup().await;
        insert_parents(&pool, "DEPT-001", "APR-001").await;
        let repo = SqlDepartmentBudgetRepository::new(pool);

        repo.insert(sample_budget("BUD-001", "DEPT-001", "APR-001")).await.expect("insert");

        let found = repo
            .find_by_id(&BudgetId("BUD-001".to_string()))
            .await
            .expect("find")
            .expect("should exist");
        assert_eq!(found.allocated_amount, Decimal::new(120_000, 0));
        assert_eq!(found.used_amount, Decimal::ZERO);

        let by_approval = repo
            .find_by_approval_id(&ApprovalId("APR-001".to_string()))
            .await
            .expect("find by approval");
        assert!(by_approval.is_some());
    }

    #[tokio::test]
    async fn second_budget_for_the_same_approval_is_a_conflict() {
        let pool = setup().await;
        insert_parents(&pool, "DEPT-001", "APR-001").await;
        let repo = SqlDepartmentBudgetRepository::new(pool);

        repo.insert(sample_budget("BUD-001", "DEPT-001", "APR-001")).await.expect("insert");
        let error = repo
            .insert(sample_budget("BUD-002", "DEPT-001", "APR-001"))
            .await
            .expect_err("second allocation for one approval must be rejected");
        assert!(matches!(
            error,
            RepositoryError::Conflict { constraint: "department_budget.approval_id" }
        ));
    }

    #[tokio::test]
    async fn list_for_department_returns_only_its_budgets() {
        let pool = setup().await;
        insert_parents(&pool, "DEPT-001", "APR-001").await;
        insert_parents(&pool, "DEPT-002", "APR-002").await;
        let repo = SqlDepartmentBudgetRepository::new(pool);

        repo.insert(sample_budget("BUD-001", "DEPT-001", "APR-001")).await.expect("insert 1");
        repo.insert(sample_budget("BUD-002", "DEPT-002", "APR-002")).await.expect("insert 2");

        let budgets = repo
            .list_for_department(&DepartmentId("DEPT-001".to_string()))
            .await
            .expect("list");
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0].id.0, "BUD-001");
    }

    #[tokio::test]
    async fn try_apply_usage_is_a_compare_and_set() {
        let pool = setup().await;
        insert_parents(&pool, "DEPT-001", "APR-001").await;
        let repo = SqlDepartmentBudgetRepository::new(pool);
        repo.insert(sample_budget("BUD-001", "DEPT-001", "APR-001")).await.expect("insert");

        let id = BudgetId("BUD-001".to_string());
        let won = repo
            .try_apply_usage(&id, Decimal::ZERO, Decimal::new(30_000, 0))
            .await
            .expect("first usage");
        assert!(won);

        // Stale expectation loses; the stored value already moved.
        let lost = repo
            .try_apply_usage(&id, Decimal::ZERO, Decimal::new(50_000, 0))
            .await
            .expect("stale usage");
        assert!(!lost);

        let found = repo.find_by_id(&id).await.expect("find").expect("should exist");
        assert_eq!(found.used_amount, Decimal::new(30_000, 0));
    }
}
