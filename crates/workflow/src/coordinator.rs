use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use vittalogic_core::audit::{AuditContext, AuditSink};
use vittalogic_core::directory::EmployeeDirectory;
use vittalogic_core::domain::approval::{
    validate_action_note, Approval, ApprovalDraft, ApprovalId, ApprovalStatus,
};
use vittalogic_core::domain::employee::EmployeeId;
use vittalogic_core::errors::DomainError;
use vittalogic_core::ident::{self, IdPrefix};
use vittalogic_core::notify::{NotificationChannel, NotificationEvent};
use vittalogic_core::workflow::{
    validate_submission, DecisionAction, DecisionContext, DecisionEngine, FollowUpAction,
    StandardDecisionFlow,
};
use vittalogic_db::{ApprovalFilter, ApprovalRepository, DecisionRecord};

use crate::error::WorkflowError;

/// Orchestrates approval submission and decisions. Owns no state beyond its
/// collaborators; every call carries the acting employee explicitly.
pub struct WorkflowCoordinator {
    engine: DecisionEngine<StandardDecisionFlow>,
    approvals: Arc<dyn ApprovalRepository>,
    directory: Arc<dyn EmployeeDirectory>,
    notifier: Arc<dyn NotificationChannel>,
    audit: Arc<dyn AuditSink>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionResponse {
    pub approval: Approval,
    pub follow_ups: Vec<FollowUpAction>,
}

impl WorkflowCoordinator {
    pub fn new(
        approvals: Arc<dyn ApprovalRepository>,
        directory: Arc<dyn EmployeeDirectory>,
        notifier: Arc<dyn NotificationChannel>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self { engine: DecisionEngine::default(), approvals, directory, notifier, audit }
    }

    pub async fn submit_approval(&self, draft: ApprovalDraft) -> Result<Approval, WorkflowError> {
        let submitted_at = Utc::now();
        draft.validate(submitted_at.date_naive())?;

        let sender = self.directory.get_employee(&draft.sender_id).await?;
        let approver = self.directory.get_employee(&draft.approver_id).await?;
        validate_submission(sender.hierarchy_level, approver.hierarchy_level)?;

        let approval = Approval {
            id: ApprovalId(ident::generate(IdPrefix::Approval)),
            sender_id: draft.sender_id,
            approver_id: draft.approver_id,
            category: draft.category,
            reason: draft.reason.trim().to_owned(),
            priority: draft.priority,
            expense_min: draft.expense_min,
            expense_max: draft.expense_max,
            tentative_date: draft.tentative_date,
            status: self.engine.initial_status(),
            submitted_at,
            action_by: None,
            action_at: None,
            action_note: None,
        };
        self.approvals.insert(approval.clone()).await?;

        tracing::info!(
            event_name = "workflow.approval_submitted",
            approval_id = %approval.id.0,
            sender_id = %approval.sender_id.0,
            approver_id = %approval.approver_id.0,
            category = approval.category.as_str(),
            "approval submitted for decision"
        );
        self.notify(
            &approval.approver_id,
            NotificationEvent::ApprovalSubmitted,
            json!({
                "approval_id": approval.id.0,
                "category": approval.category.as_str(),
                "priority": approval.priority.as_str(),
            }),
        )
        .await;

        Ok(approval)
    }

    pub async fn decide(
        &self,
        approval_id: &ApprovalId,
        actor_id: &EmployeeId,
        action: DecisionAction,
        note: Option<String>,
    ) -> Result<DecisionResponse, WorkflowError> {
        validate_action_note(note.as_deref())?;

        let approval = self
            .approvals
            .find_by_id(approval_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound {
                entity: "approval",
                id: approval_id.0.clone(),
            })?;

        let context = DecisionContext {
            actor_id: actor_id.clone(),
            designated_approver_id: approval.approver_id.clone(),
            category: approval.category,
        };
        let audit_context = AuditContext::new(
            Some(approval.id.clone()),
            Uuid::new_v4().to_string(),
            actor_id.0.clone(),
        );
        let outcome = self.engine.apply_with_audit(
            &approval.status,
            &action,
            &context,
            self.audit.as_ref(),
            &audit_context,
        )?;

        let decision = DecisionRecord {
            to: outcome.to,
            action_by: actor_id.clone(),
            action_at: Utc::now(),
            action_note: note,
        };
        let won = self.approvals.apply_decision(&approval.id, approval.status, &decision).await?;
        if !won {
            // Another decision landed between our read and the conditional
            // update. Report the state that beat us.
            let current = self
                .approvals
                .find_by_id(&approval.id)
                .await?
                .map(|approval| approval.status)
                .unwrap_or(approval.status);
            return Err(DomainError::InvalidTransition { status: current, action }.into());
        }

        let mut decided = approval;
        decided.status = decision.to;
        decided.action_by = Some(decision.action_by.clone());
        decided.action_at = Some(decision.action_at);
        decided.action_note = decision.action_note.clone();

        tracing::info!(
            event_name = "workflow.decision_recorded",
            approval_id = %decided.id.0,
            action = action.as_str(),
            status = decided.status.as_str(),
            action_by = %actor_id.0,
            "decision recorded"
        );
        if outcome.follow_ups.contains(&FollowUpAction::NotifySender) {
            self.notify(
                &decided.sender_id,
                notification_for(decided.status),
                json!({
                    "approval_id": decided.id.0,
                    "status": decided.status.as_str(),
                    "action_note": decided.action_note,
                }),
            )
            .await;
        }

        Ok(DecisionResponse { approval: decided, follow_ups: outcome.follow_ups })
    }

    pub async fn get_approval(&self, id: &ApprovalId) -> Result<Approval, WorkflowError> {
        self.approvals
            .find_by_id(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound { entity: "approval", id: id.0.clone() })
    }

    pub async fn list_approvals(
        &self,
        filter: &ApprovalFilter,
    ) -> Result<Vec<Approval>, WorkflowError> {
        Ok(self.approvals.list(filter).await?)
    }

    async fn notify(
        &self,
        recipient: &EmployeeId,
        event: NotificationEvent,
        payload: serde_json::Value,
    ) {
        // Delivery is fire-and-forget: a dead channel must never roll back a
        // recorded transition.
        if let Err(error) = self.notifier.notify(recipient, event, payload).await {
            tracing::warn!(
                event_name = "workflow.notification_failed",
                recipient = %recipient.0,
                notification = event.as_str(),
                error = %error,
                "notification delivery failed; continuing"
            );
        }
    }
}

fn notification_for(status: ApprovalStatus) -> NotificationEvent {
    match status {
        ApprovalStatus::Approved => NotificationEvent::ApprovalApproved,
        ApprovalStatus::Rejected => NotificationEvent::ApprovalRejected,
        _ => NotificationEvent::ApprovalOnHold,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use vittalogic_core::audit::InMemoryAuditSink;
    use vittalogic_core::directory::InMemoryEmployeeDirectory;
    use vittalogic_core::domain::approval::{
        ApprovalCategory, ApprovalDraft, ApprovalPriority, ApprovalStatus,
    };
    use vittalogic_core::domain::employee::{EmployeeId, EmployeeRecord};
    use vittalogic_core::errors::DomainError;
    use vittalogic_core::notify::{InMemoryNotificationChannel, NotificationEvent};
    use vittalogic_core::workflow::{DecisionAction, FollowUpAction};
    use vittalogic_db::InMemoryApprovalRepository;

    use super::WorkflowCoordinator;
    use crate::error::WorkflowError;

    fn employee(id: &str, level: u8) -> EmployeeRecord {
        EmployeeRecord {
            id: EmployeeId(id.to_owned()),
            name: format!("Employee {id}"),
            designation: "Manager".to_owned(),
            department_id: None,
            hierarchy_level: level,
        }
    }

    fn directory() -> InMemoryEmployeeDirectory {
        InMemoryEmployeeDirectory::new(vec![
            employee("EMP-1001", 1),
            employee("EMP-2001", 2),
            employee("EMP-3001", 3),
            employee("EMP-4001", 4),
        ])
    }

    fn draft(sender: &str, approver: &str) -> ApprovalDraft {
        ApprovalDraft {
            sender_id: EmployeeId(sender.to_owned()),
            approver_id: EmployeeId(approver.to_owned()),
            category: ApprovalCategory::DepartmentBudget,
            reason: "Q1 operating budget".to_owned(),
            priority: ApprovalPriority::High,
            expense_min: Decimal::new(100_000, 0),
            expense_max: Decimal::new(150_000, 0),
            tentative_date: (Utc::now() + Duration::days(14)).date_naive(),
        }
    }

    struct Harness {
        coordinator: WorkflowCoordinator,
        notifier: InMemoryNotificationChannel,
        audit: InMemoryAuditSink,
    }

    fn harness() -> Harness {
        harness_with_notifier(InMemoryNotificationChannel::default())
    }

    fn harness_with_notifier(notifier: InMemoryNotificationChannel) -> Harness {
        let audit = InMemoryAuditSink::default();
        let coordinator = WorkflowCoordinator::new(
            Arc::new(InMemoryApprovalRepository::default()),
            Arc::new(directory()),
            Arc::new(notifier.clone()),
            Arc::new(audit.clone()),
        );
        Harness { coordinator, notifier, audit }
    }

    #[tokio::test]
    async fn submission_one_level_up_lands_pending_and_notifies_the_approver() {
        let harness = harness();

        let approval = harness
            .coordinator
            .submit_approval(draft("EMP-2001", "EMP-3001"))
            .await
            .expect("submission should succeed");

        assert_eq!(approval.status, ApprovalStatus::Pending);
        assert!(approval.id.0.starts_with("APR-"));
        assert!(approval.action_by.is_none());

        let sent = harness.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient.0, "EMP-3001");
        assert_eq!(sent[0].event, NotificationEvent::ApprovalSubmitted);
    }

    #[tokio::test]
    async fn lowest_level_sender_cannot_submit() {
        let harness = harness();

        let error = harness
            .coordinator
            .submit_approval(draft("EMP-1001", "EMP-2001"))
            .await
            .expect_err("level 1 submissions must fail");
        assert!(matches!(
            error,
            WorkflowError::Domain(DomainError::HierarchyViolation {
                sender_level: 1,
                approver_level: 2
            })
        ));
    }

    #[tokio::test]
    async fn skipping_a_level_is_a_hierarchy_violation() {
        let harness = harness();

        let error = harness
            .coordinator
            .submit_approval(draft("EMP-2001", "EMP-4001"))
            .await
            .expect_err("two-level jump must fail");
        assert!(matches!(
            error,
            WorkflowError::Domain(DomainError::HierarchyViolation { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_sender_is_reported_via_the_directory() {
        let harness = harness();

        let error = harness
            .coordinator
            .submit_approval(draft("EMP-9999", "EMP-3001"))
            .await
            .expect_err("unknown sender must fail");
        assert!(matches!(error, WorkflowError::Directory(_)));
    }

    #[tokio::test]
    async fn approver_decision_approves_and_unlocks_budget_allocation() {
        let harness = harness();
        let approval = harness
            .coordinator
            .submit_approval(draft("EMP-2001", "EMP-3001"))
            .await
            .expect("submission");

        let response = harness
            .coordinator
            .decide(
                &approval.id,
                &EmployeeId("EMP-3001".to_owned()),
                DecisionAction::Approve,
                Some("Within envelope".to_owned()),
            )
            .await
            .expect("decision should succeed");

        assert_eq!(response.approval.status, ApprovalStatus::Approved);
        assert_eq!(response.approval.action_by, Some(EmployeeId("EMP-3001".to_owned())));
        assert!(response.approval.action_at.is_some());
        assert!(response.follow_ups.contains(&FollowUpAction::UnlockBudgetAllocation));

        // Submission notified the approver; the decision notified the sender.
        let sent = harness.notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].recipient.0, "EMP-2001");
        assert_eq!(sent[1].event, NotificationEvent::ApprovalApproved);

        let events = harness.audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "workflow.decision_applied");
    }

    #[tokio::test]
    async fn only_the_designated_approver_may_decide() {
        let harness = harness();
        let approval = harness
            .coordinator
            .submit_approval(draft("EMP-2001", "EMP-3001"))
            .await
            .expect("submission");

        let error = harness
            .coordinator
            .decide(
                &approval.id,
                &EmployeeId("EMP-4001".to_owned()),
                DecisionAction::Approve,
                None,
            )
            .await
            .expect_err("non-designated approver must be denied");
        assert!(matches!(
            error,
            WorkflowError::Domain(DomainError::PermissionDenied { .. })
        ));

        // The request is untouched.
        let unchanged =
            harness.coordinator.get_approval(&approval.id).await.expect("approval exists");
        assert_eq!(unchanged.status, ApprovalStatus::Pending);
        assert!(unchanged.action_by.is_none());
    }

    #[tokio::test]
    async fn decided_approvals_accept_no_further_action() {
        let harness = harness();
        let approval = harness
            .coordinator
            .submit_approval(draft("EMP-2001", "EMP-3001"))
            .await
            .expect("submission");
        let approver = EmployeeId("EMP-3001".to_owned());

        harness
            .coordinator
            .decide(&approval.id, &approver, DecisionAction::Reject, Some("No headroom".to_owned()))
            .await
            .expect("first decision");

        for action in [DecisionAction::Approve, DecisionAction::Reject, DecisionAction::Hold] {
            let error = harness
                .coordinator
                .decide(&approval.id, &approver, action, None)
                .await
                .expect_err("terminal approvals accept no action");
            assert!(matches!(
                error,
                WorkflowError::Domain(DomainError::InvalidTransition {
                    status: ApprovalStatus::Rejected,
                    ..
                })
            ));
        }

        let unchanged =
            harness.coordinator.get_approval(&approval.id).await.expect("approval exists");
        assert_eq!(unchanged.status, ApprovalStatus::Rejected);
        assert_eq!(unchanged.action_note.as_deref(), Some("No headroom"));
    }

    #[tokio::test]
    async fn on_hold_requests_can_be_re_decided() {
        let harness = harness();
        let approval = harness
            .coordinator
            .submit_approval(draft("EMP-2001", "EMP-3001"))
            .await
            .expect("submission");
        let approver = EmployeeId("EMP-3001".to_owned());

        harness
            .coordinator
            .decide(&approval.id, &approver, DecisionAction::Hold, Some("Need HR input".to_owned()))
            .await
            .expect("hold");

        let held = harness.coordinator.get_approval(&approval.id).await.expect("approval exists");
        assert_eq!(held.status, ApprovalStatus::OnHold);

        let response = harness
            .coordinator
            .decide(&approval.id, &approver, DecisionAction::Approve, None)
            .await
            .expect("on_hold -> approved");
        assert_eq!(response.approval.status, ApprovalStatus::Approved);
    }

    #[tokio::test]
    async fn notification_failure_does_not_roll_back_the_decision() {
        let harness =
            harness_with_notifier(InMemoryNotificationChannel::failing("webhook down"));
        let approval = harness
            .coordinator
            .submit_approval(draft("EMP-2001", "EMP-3001"))
            .await
            .expect("submission succeeds despite dead channel");

        let response = harness
            .coordinator
            .decide(&approval.id, &EmployeeId("EMP-3001".to_owned()), DecisionAction::Approve, None)
            .await
            .expect("decision succeeds despite dead channel");
        assert_eq!(response.approval.status, ApprovalStatus::Approved);
    }

    #[tokio::test]
    async fn oversized_action_note_is_rejected_before_any_write() {
        let harness = harness();
        let approval = harness
            .coordinator
            .submit_approval(draft("EMP-2001", "EMP-3001"))
            .await
            .expect("submission");

        let error = harness
            .coordinator
            .decide(
                &approval.id,
                &EmployeeId("EMP-3001".to_owned()),
                DecisionAction::Approve,
                Some("x".repeat(101)),
            )
            .await
            .expect_err("oversized note must fail");
        assert!(matches!(error, WorkflowError::Domain(DomainError::Validation(_))));

        let unchanged =
            harness.coordinator.get_approval(&approval.id).await.expect("approval exists");
        assert_eq!(unchanged.status, ApprovalStatus::Pending);
    }
}
