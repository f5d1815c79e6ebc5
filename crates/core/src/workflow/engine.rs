use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::approval::{ApprovalCategory, ApprovalStatus};
use crate::errors::DomainError;
use crate::workflow::states::{
    DecisionAction, DecisionContext, FollowUpAction, TransitionOutcome,
};

/// Routing rule for submission: a request always travels exactly one
/// hierarchy level up, and the lowest level has nobody above it to ask.
pub fn validate_submission(sender_level: u8, approver_level: u8) -> Result<(), DomainError> {
    if sender_level < 2 || u16::from(approver_level) != u16::from(sender_level) + 1 {
        return Err(DomainError::HierarchyViolation { sender_level, approver_level });
    }
    Ok(())
}

pub trait DecisionFlow {
    fn initial_status(&self) -> ApprovalStatus;
    fn transition(
        &self,
        current: &ApprovalStatus,
        action: &DecisionAction,
        context: &DecisionContext,
    ) -> Result<TransitionOutcome, DomainError>;
}

/// The single-approver decision flow: pending or on-hold requests accept any
/// action from the designated approver; approved and rejected are final.
#[derive(Clone, Debug, Default)]
pub struct StandardDecisionFlow;

impl DecisionFlow for StandardDecisionFlow {
    fn initial_status(&self) -> ApprovalStatus {
        ApprovalStatus::Pending
    }

    fn transition(
        &self,
        current: &ApprovalStatus,
        action: &DecisionAction,
        context: &DecisionContext,
    ) -> Result<TransitionOutcome, DomainError> {
        transition_standard(current, action, context)
    }
}

pub struct DecisionEngine<F> {
    flow: F,
}

impl<F> DecisionEngine<F>
where
    F: DecisionFlow,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_status(&self) -> ApprovalStatus {
        self.flow.initial_status()
    }

    pub fn apply(
        &self,
        current: &ApprovalStatus,
        action: &DecisionAction,
        context: &DecisionContext,
    ) -> Result<TransitionOutcome, DomainError> {
        self.flow.transition(current, action, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &ApprovalStatus,
        action: &DecisionAction,
        context: &DecisionContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, DomainError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, action, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit.approval_id.clone(),
                        audit.correlation_id.clone(),
                        "workflow.decision_applied",
                        AuditCategory::Workflow,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", outcome.from.as_str())
                    .with_metadata("to", outcome.to.as_str())
                    .with_metadata("action", outcome.action.as_str()),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.approval_id.clone(),
                        audit.correlation_id.clone(),
                        "workflow.decision_rejected",
                        AuditCategory::Workflow,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for DecisionEngine<StandardDecisionFlow> {
    fn default() -> Self {
        Self::new(StandardDecisionFlow)
    }
}

fn transition_standard(
    current: &ApprovalStatus,
    action: &DecisionAction,
    context: &DecisionContext,
) -> Result<TransitionOutcome, DomainError> {
    use ApprovalStatus::{Approved, OnHold, Pending, Rejected};
    use DecisionAction::{Approve, Hold, Reject};

    if context.actor_id != context.designated_approver_id {
        return Err(DomainError::PermissionDenied { actor_id: context.actor_id.0.clone() });
    }

    let (to, follow_ups) = match (current, action) {
        (Pending, Approve) | (OnHold, Approve) => (Approved, approve_follow_ups(context.category)),
        (Pending, Reject) | (OnHold, Reject) => (Rejected, vec![FollowUpAction::NotifySender]),
        (Pending, Hold) | (OnHold, Hold) => (OnHold, vec![FollowUpAction::NotifySender]),
        _ => {
            return Err(DomainError::InvalidTransition { status: *current, action: *action });
        }
    };

    Ok(TransitionOutcome { from: *current, to, action: *action, follow_ups })
}

fn approve_follow_ups(category: ApprovalCategory) -> Vec<FollowUpAction> {
    if category == ApprovalCategory::DepartmentBudget {
        vec![FollowUpAction::NotifySender, FollowUpAction::UnlockBudgetAllocation]
    } else {
        vec![FollowUpAction::NotifySender]
    }
}
