use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use vittalogic_core::domain::approval::{
    Approval, ApprovalId, ApprovalPriority, ApprovalStatus,
};
use vittalogic_core::domain::budget::{BudgetId, DepartmentBudget};
use vittalogic_core::domain::department::{Department, DepartmentId};
use vittalogic_core::domain::employee::EmployeeId;

pub mod approval;
pub mod budget;
pub mod department;
pub mod memory;

pub use approval::SqlApprovalRepository;
pub use budget::SqlDepartmentBudgetRepository;
pub use department::SqlDepartmentRepository;
pub use memory::{
    InMemoryApprovalRepository, InMemoryDepartmentBudgetRepository, InMemoryDepartmentRepository,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("unique constraint `{constraint}` violated")]
    Conflict { constraint: &'static str },
}

/// Sort order over `submitted_at` for approval listings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubmittedSort {
    Ascending,
    #[default]
    Descending,
}

#[derive(Clone, Debug, Default)]
pub struct ApprovalFilter {
    pub status: Option<ApprovalStatus>,
    pub priority: Option<ApprovalPriority>,
    pub sort: SubmittedSort,
    pub limit: u32,
}

impl ApprovalFilter {
    pub fn effective_limit(&self) -> u32 {
        if self.limit == 0 {
            100
        } else {
            self.limit
        }
    }
}

/// The recorded outcome of a decision, written together with the status flip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionRecord {
    pub to: ApprovalStatus,
    pub action_by: EmployeeId,
    pub action_at: DateTime<Utc>,
    pub action_note: Option<String>,
}

#[async_trait]
pub trait ApprovalRepository: Send + Sync {
    async fn insert(&self, approval: Approval) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &ApprovalId) -> Result<Option<Approval>, RepositoryError>;
    async fn list(&self, filter: &ApprovalFilter) -> Result<Vec<Approval>, RepositoryError>;

    /// Conditional update: flips the status and writes the decision fields
    /// only when the stored status still equals `expected`. Returns whether
    /// the row was updated; a concurrent writer sees `false` and must treat
    /// the decision as lost.
    async fn apply_decision(
        &self,
        id: &ApprovalId,
        expected: ApprovalStatus,
        decision: &DecisionRecord,
    ) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    async fn insert(&self, department: Department) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &DepartmentId) -> Result<Option<Department>, RepositoryError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Department>, RepositoryError>;
    async fn update(&self, department: Department) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait DepartmentBudgetRepository: Send + Sync {
    async fn insert(&self, budget: DepartmentBudget) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &BudgetId) -> Result<Option<DepartmentBudget>, RepositoryError>;
    async fn find_by_approval_id(
        &self,
        id: &ApprovalId,
    ) -> Result<Option<DepartmentBudget>, RepositoryError>;
    async fn list_for_department(
        &self,
        id: &DepartmentId,
    ) -> Result<Vec<DepartmentBudget>, RepositoryError>;

    /// Compare-and-set on `used_amount`: applies `new_used` only when the
    /// stored value still equals `expected_used`. Callers loop on `false`.
    async fn try_apply_usage(
        &self,
        id: &BudgetId,
        expected_used: Decimal,
        new_used: Decimal,
    ) -> Result<bool, RepositoryError>;
}

pub(crate) fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("{field}: `{raw}` is not a decimal: {error}")))
}

pub(crate) fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("{field}: `{raw}` is not a date: {error}")))
}

pub(crate) fn parse_datetime(field: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| {
            RepositoryError::Decode(format!("{field}: `{raw}` is not an RFC 3339 timestamp: {error}"))
        })
}

pub(crate) fn map_constraint_error(
    error: sqlx::Error,
    constraint: &'static str,
) -> RepositoryError {
    match &error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            RepositoryError::Conflict { constraint }
        }
        _ => RepositoryError::Database(error),
    }
}
