use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;
use crate::errors::DomainError;

pub const MAX_REASON_CHARS: usize = 500;
pub const MAX_ACTION_NOTE_CHARS: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    OnHold,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::OnHold => "on_hold",
        }
    }

    /// Approved and rejected are final. On-hold still awaits a re-decision.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "on_hold" => Ok(Self::OnHold),
            other => Err(DomainError::Validation(format!(
                "unsupported approval status `{other}` (expected pending|approved|rejected|on_hold)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalCategory {
    Asset,
    Liability,
    CustomerPayment,
    VendorPayment,
    Salary,
    DepartmentBudget,
    Service,
}

impl ApprovalCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::CustomerPayment => "customer_payment",
            Self::VendorPayment => "vendor_payment",
            Self::Salary => "salary",
            Self::DepartmentBudget => "department_budget",
            Self::Service => "service",
        }
    }

    /// Display name used by list views. Presentation only.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Asset => "Asset",
            Self::Liability => "Liability",
            Self::CustomerPayment => "Customer Payment",
            Self::VendorPayment => "Vendor Payment",
            Self::Salary => "Salary",
            Self::DepartmentBudget => "Department Budget",
            Self::Service => "Service",
        }
    }
}

impl std::str::FromStr for ApprovalCategory {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asset" => Ok(Self::Asset),
            "liability" => Ok(Self::Liability),
            "customer_payment" => Ok(Self::CustomerPayment),
            "vendor_payment" => Ok(Self::VendorPayment),
            "salary" => Ok(Self::Salary),
            "department_budget" => Ok(Self::DepartmentBudget),
            "service" => Ok(Self::Service),
            other => {
                Err(DomainError::Validation(format!("unsupported approval category `{other}`")))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPriority {
    Low,
    Medium,
    High,
}

impl ApprovalPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::str::FromStr for ApprovalPriority {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(DomainError::Validation(format!(
                "unsupported approval priority `{other}` (expected low|medium|high)"
            ))),
        }
    }
}

/// A request routed to a single designated higher-level employee for an
/// accept/reject/hold decision. `action_by`/`action_at` are append-only: they
/// are written once when the status leaves `pending` and never rewritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub id: ApprovalId,
    pub sender_id: EmployeeId,
    pub approver_id: EmployeeId,
    pub category: ApprovalCategory,
    pub reason: String,
    pub priority: ApprovalPriority,
    pub expense_min: Decimal,
    pub expense_max: Decimal,
    pub tentative_date: NaiveDate,
    pub status: ApprovalStatus,
    pub submitted_at: DateTime<Utc>,
    pub action_by: Option<EmployeeId>,
    pub action_at: Option<DateTime<Utc>>,
    pub action_note: Option<String>,
}

/// Submission input before an id and status are assigned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDraft {
    pub sender_id: EmployeeId,
    pub approver_id: EmployeeId,
    pub category: ApprovalCategory,
    pub reason: String,
    pub priority: ApprovalPriority,
    pub expense_min: Decimal,
    pub expense_max: Decimal,
    pub tentative_date: NaiveDate,
}

impl ApprovalDraft {
    pub fn validate(&self, submitted_on: NaiveDate) -> Result<(), DomainError> {
        let reason = self.reason.trim();
        if reason.is_empty() {
            return Err(DomainError::Validation("reason must not be empty".to_owned()));
        }
        if reason.chars().count() > MAX_REASON_CHARS {
            return Err(DomainError::Validation(format!(
                "reason must be at most {MAX_REASON_CHARS} characters"
            )));
        }
        if self.expense_min < Decimal::ZERO {
            return Err(DomainError::Validation(format!(
                "expense_min must not be negative, got {}",
                self.expense_min
            )));
        }
        if self.expense_max < self.expense_min {
            return Err(DomainError::Validation(format!(
                "expense_max {} must be at least expense_min {}",
                self.expense_max, self.expense_min
            )));
        }
        if self.tentative_date < submitted_on {
            return Err(DomainError::Validation(format!(
                "tentative date {} must not lie before the submission date {submitted_on}",
                self.tentative_date
            )));
        }
        Ok(())
    }
}

pub fn validate_action_note(note: Option<&str>) -> Result<(), DomainError> {
    if let Some(note) = note {
        if note.chars().count() > MAX_ACTION_NOTE_CHARS {
            return Err(DomainError::Validation(format!(
                "action note must be at most {MAX_ACTION_NOTE_CHARS} characters"
            )));
        }
    }
    Ok(())
}
