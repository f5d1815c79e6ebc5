use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::approval::ApprovalStatus;
use crate::workflow::states::DecisionAction;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(
        "approval must route exactly one level up: sender level {sender_level}, approver level {approver_level}"
    )]
    HierarchyViolation { sender_level: u8, approver_level: u8 },
    #[error("actor `{actor_id}` is not the designated approver for this request")]
    PermissionDenied { actor_id: String },
    #[error("cannot apply {action:?} to an approval in {status:?} state")]
    InvalidTransition { status: ApprovalStatus, action: DecisionAction },
    #[error("budget period must end after it starts: {period_from} .. {period_to}")]
    InvalidPeriod { period_from: NaiveDate, period_to: NaiveDate },
    #[error("approval `{approval_id}` does not authorize a department budget: {detail}")]
    InvalidApproval { approval_id: String, detail: String },
    #[error("department name `{name}` is already in use")]
    DuplicateName { name: String },
    #[error("approval `{approval_id}` already has a budget allocated against it")]
    DuplicateAllocation { approval_id: String },
    #[error("recording {requested} would exceed the allocated {allocated}")]
    OverBudget { allocated: Decimal, requested: Decimal },
}
