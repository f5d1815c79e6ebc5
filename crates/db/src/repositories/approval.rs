use sqlx::{QueryBuilder, Row};

use vittalogic_core::domain::approval::{Approval, ApprovalId, ApprovalStatus};
use vittalogic_core::domain::employee::EmployeeId;

use super::{
    parse_date, parse_datetime, parse_decimal, ApprovalFilter, ApprovalRepository, DecisionRecord,
    RepositoryError, SubmittedSort,
};
use crate::DbPool;

pub struct SqlApprovalRepository {
    pool: DbPool,
}

impl SqlApprovalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "approval_id, sender_id, approver_id, category, reason, priority, \
                              expense_min, expense_max, tentative_date, status, submitted_at, \
                              action_by, action_at, action_note";

fn row_to_approval(row: &sqlx::sqlite::SqliteRow) -> Result<Approval, RepositoryError> {
    let decode = |error: sqlx::Error| RepositoryError::Decode(error.to_string());

    let id: String = row.try_get("approval_id").map_err(decode)?;
    let sender_id: String = row.try_get("sender_id").map_err(decode)?;
    let approver_id: String = row.try_get("approver_id").map_err(decode)?;
    let category: String = row.try_get("category").map_err(decode)?;
    let reason: String = row.try_get("reason").map_err(decode)?;
    let priority: String = row.try_get("priority").map_err(decode)?;
    let expense_min: String = row.try_get("expense_min").map_err(decode)?;
    let expense_max: String = row.try_get("expense_max").map_err(decode)?;
    let tentative_date: String = row.try_get("tentative_date").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;
    let submitted_at: String = row.try_get("submitted_at").map_err(decode)?;
    let action_by: Option<String> = row.try_get("action_by").map_err(decode)?;
    let action_at: Option<String> = row.try_get("action_at").map_err(decode)?;
    let action_note: Option<String> = row.try_get("action_note").map_err(decode)?;

    Ok(Approval {
        id: ApprovalId(id),
        sender_id: EmployeeId(sender_id),
        approver_id: EmployeeId(approver_id),
        category: category
            .parse()
            .map_err(|error| RepositoryError::Decode(format!("category: {error}")))?,
        reason,
        priority: priority
            .parse()
            .map_err(|error| RepositoryError::Decode(format!("priority: {error}")))?,
        expense_min: parse_decimal("expense_min", &expense_min)?,
        expense_max: parse_decimal("expense_max", &expense_max)?,
        tentative_date: parse_date("tentative_date", &tentative_date)?,
        status: status
            .parse()
            .map_err(|error| RepositoryError::Decode(format!("status: {error}")))?,
        submitted_at: parse_datetime("submitted_at", &submitted_at)?,
        action_by: action_by.map(EmployeeId),
        action_at: action_at
            .map(|raw| parse_datetime("action_at", &raw))
            .transpose()?,
        action_note,
    })
}

#[async_trait::async_trait]
impl ApprovalRepository for SqlApprovalRepository {
    async fn insert(&self, approval: Approval) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO approval (approval_id, sender_id, approver_id, category, reason, priority,
                                   expense_min, expense_max, tentative_date, status, submitted_at,
                                   action_by, action_at, action_note)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&approval.id.0)
        .bind(&approval.sender_id.0)
        .bind(&approval.approver_id.0)
        .bind(approval.category.as_str())
        .bind(&approval.reason)
        .bind(approval.priority.as_str())
        .bind(approval.expense_min.to_string())
        .bind(approval.expense_max.to_string())
        .bind(approval.tentative_date.to_string())
        .bind(approval.status.as_str())
        .bind(approval.submitted_at.to_rfc3339())
        .bind(approval.action_by.as_ref().map(|id| id.0.as_str()))
        .bind(approval.action_at.map(|at| at.to_rfc3339()))
        .bind(&approval.action_note)
        .execute(&self.pool)
        .await
        .map_err(|error| super::map_constraint_error(error, "approval.approval_id"))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &ApprovalId) -> Result<Option<Approval>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM approval WHERE approval_id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_approval(row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &ApprovalFilter) -> Result<Vec<Approval>, RepositoryError> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {SELECT_COLUMNS} FROM approval WHERE 1 = 1"));

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(priority) = filter.priority {
            builder.push(" AND priority = ").push_bind(priority.as_str());
        }
        builder.push(match filter.sort {
            SubmittedSort::Ascending => " ORDER BY submitted_at ASC",
            SubmittedSort::Descending => " ORDER BY submitted_at DESC",
        });
        builder.push(" LIMIT ").push_bind(i64::from(filter.effective_limit()));

        let rows: Vec<sqlx::sqlite::SqliteRow> =
            builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_approval).collect::<Result<Vec<_>, _>>()
    }

    async fn apply_decision(
        &self,
        id: &ApprovalId,
        expected: ApprovalStatus,
        decision: &DecisionRecord,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE approval
             SET status = ?, action_by = ?, action_at = ?, action_note = ?
             WHERE approval_id = ? AND status = ?",
        )
        .bind(decision.to.as_str())
        .bind(&decision.action_by.0)
        .bind(decision.action_at.to_rfc3339())
        .bind(&decision.action_note)
        .bind(&id.0)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
