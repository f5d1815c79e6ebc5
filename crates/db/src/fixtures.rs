use serde::Serialize;
use sqlx::{Executor, Row};

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_EMPLOYEE_IDS: &[&str] =
    &["EMP-1001", "EMP-2001", "EMP-3001", "EMP-2002", "EMP-3002", "EMP-4001"];

const SEED_DEPARTMENT_IDS: &[&str] = &["DEPT-seed-finance", "DEPT-seed-operations"];

const SEED_APPROVAL_IDS: &[&str] =
    &["APR-seed-budget-approved", "APR-seed-vendor-pending", "APR-seed-salary-onhold"];

const SEED_BUDGET_IDS: &[&str] = &["BUD-seed-finance-q1"];

/// Deterministic demo dataset: an employee ladder, two departments, one
/// approval per lifecycle stage, and the budget allocated from the approved
/// one. Loading is idempotent.
pub struct WorkflowSeedDataset;

#[derive(Clone, Debug, Serialize)]
pub struct SeedResult {
    pub employees: usize,
    pub departments: usize,
    pub approvals: usize,
    pub budgets: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct VerificationResult {
    pub passed: bool,
    pub checks: Vec<SeedCheck>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SeedCheck {
    pub table: &'static str,
    pub expected: i64,
    pub found: i64,
}

impl WorkflowSeedDataset {
    pub const SQL: &'static str =
        include_str!("../../../config/fixtures/workflow_seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            employees: SEED_EMPLOYEE_IDS.len(),
            departments: SEED_DEPARTMENT_IDS.len(),
            approvals: SEED_APPROVAL_IDS.len(),
            budgets: SEED_BUDGET_IDS.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();
        checks.push(count_check(pool, "employee", "employee_id", SEED_EMPLOYEE_IDS).await?);
        checks.push(count_check(pool, "department", "department_id", SEED_DEPARTMENT_IDS).await?);
        checks.push(count_check(pool, "approval", "approval_id", SEED_APPROVAL_IDS).await?);
        checks.push(count_check(pool, "department_budget", "budget_id", SEED_BUDGET_IDS).await?);

        let passed = checks.iter().all(|check| check.expected == check.found);
        Ok(VerificationResult { passed, checks })
    }
}

async fn count_check(
    pool: &DbPool,
    table: &'static str,
    id_column: &'static str,
    ids: &[&str],
) -> Result<SeedCheck, RepositoryError> {
    let quoted =
        ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(", ");
    let found = sqlx::query(&format!(
        "SELECT COUNT(*) AS count FROM {table} WHERE {id_column} IN ({quoted})"
    ))
    .fetch_one(pool)
    .await?
    .get::<i64, _>("count");

    Ok(SeedCheck { table, expected: ids.len() as i64, found })
}
