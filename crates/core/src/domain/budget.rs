use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::approval::ApprovalId;
use crate::domain::department::DepartmentId;
use crate::domain::employee::EmployeeId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BudgetId(pub String);

/// A monetary allocation to a department for a date range. Created only from
/// an approved `department_budget` request; never deleted, only amended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentBudget {
    pub id: BudgetId,
    pub department_id: DepartmentId,
    pub approval_id: ApprovalId,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub allocated_amount: Decimal,
    pub used_amount: Decimal,
    pub notes: Option<String>,
    pub created_by: EmployeeId,
    pub created_at: DateTime<Utc>,
}

impl DepartmentBudget {
    pub fn remaining(&self) -> Decimal {
        self.allocated_amount - self.used_amount
    }

    pub fn validate_period(period_from: NaiveDate, period_to: NaiveDate) -> Result<(), DomainError> {
        if period_to <= period_from {
            return Err(DomainError::InvalidPeriod { period_from, period_to });
        }
        Ok(())
    }

    pub fn validate_allocation_amount(amount: Decimal) -> Result<(), DomainError> {
        if amount <= Decimal::ZERO {
            return Err(DomainError::Validation(format!(
                "allocated amount must be positive, got {amount}"
            )));
        }
        Ok(())
    }

    pub fn validate_usage_delta(delta: Decimal) -> Result<(), DomainError> {
        if delta <= Decimal::ZERO {
            return Err(DomainError::Validation(format!(
                "usage delta must be positive, got {delta}"
            )));
        }
        Ok(())
    }
}
