use serde::{Deserialize, Serialize};

use crate::domain::approval::{ApprovalCategory, ApprovalStatus};
use crate::domain::employee::EmployeeId;
use crate::errors::DomainError;

/// The three actions a designated approver can take on a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Approve,
    Reject,
    Hold,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Hold => "hold",
        }
    }
}

impl std::str::FromStr for DecisionAction {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "hold" => Ok(Self::Hold),
            other => Err(DomainError::Validation(format!(
                "unsupported decision action `{other}` (expected approve|reject|hold)"
            ))),
        }
    }
}

/// Everything a transition needs to know beyond the current status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionContext {
    pub actor_id: EmployeeId,
    pub designated_approver_id: EmployeeId,
    pub category: ApprovalCategory,
}

/// Work the caller owes after a successful transition. The engine never
/// performs side effects itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowUpAction {
    NotifySender,
    UnlockBudgetAllocation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub from: ApprovalStatus,
    pub to: ApprovalStatus,
    pub action: DecisionAction,
    pub follow_ups: Vec<FollowUpAction>,
}
