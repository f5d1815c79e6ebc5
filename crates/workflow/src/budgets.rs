use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use vittalogic_core::domain::approval::{ApprovalCategory, ApprovalId, ApprovalStatus};
use vittalogic_core::domain::budget::{BudgetId, DepartmentBudget};
use vittalogic_core::domain::department::DepartmentId;
use vittalogic_core::domain::employee::EmployeeId;
use vittalogic_core::errors::DomainError;
use vittalogic_core::ident::{self, IdPrefix};
use vittalogic_core::notify::{NotificationChannel, NotificationEvent};
use vittalogic_db::{
    ApprovalRepository, DepartmentBudgetRepository, DepartmentRepository, RepositoryError,
};

use crate::error::WorkflowError;

/// Usage postings retry this many times against concurrent writers before
/// giving up.
const MAX_USAGE_ATTEMPTS: u32 = 5;

pub struct BudgetService {
    budgets: Arc<dyn DepartmentBudgetRepository>,
    departments: Arc<dyn DepartmentRepository>,
    approvals: Arc<dyn ApprovalRepository>,
    notifier: Arc<dyn NotificationChannel>,
}

impl BudgetService {
    pub fn new(
        budgets: Arc<dyn DepartmentBudgetRepository>,
        departments: Arc<dyn DepartmentRepository>,
        approvals: Arc<dyn ApprovalRepository>,
        notifier: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self { budgets, departments, approvals, notifier }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn allocate_budget(
        &self,
        department_id: &DepartmentId,
        approval_id: &ApprovalId,
        period_from: NaiveDate,
        period_to: NaiveDate,
        amount: Decimal,
        notes: Option<String>,
        created_by: &EmployeeId,
    ) -> Result<DepartmentBudget, WorkflowError> {
        DepartmentBudget::validate_period(period_from, period_to)?;
        DepartmentBudget::validate_allocation_amount(amount)?;

        let department = self
            .departments
            .find_by_id(department_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound {
                entity: "department",
                id: department_id.0.clone(),
            })?;
        let approval = self
            .approvals
            .find_by_id(approval_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound {
                entity: "approval",
                id: approval_id.0.clone(),
            })?;

        if approval.category != ApprovalCategory::DepartmentBudget {
            return Err(DomainError::InvalidApproval {
                approval_id: approval.id.0.clone(),
                detail: format!("category is `{}`", approval.category.as_str()),
            }
            .into());
        }
        if approval.status != ApprovalStatus::Approved {
            return Err(DomainError::InvalidApproval {
                approval_id: approval.id.0.clone(),
                detail: format!("status is `{}`", approval.status.as_str()),
            }
            .into());
        }

        let budget = DepartmentBudget {
            id: BudgetId(ident::generate(IdPrefix::Budget)),
            department_id: department.id.clone(),
            approval_id: approval.id.clone(),
            period_from,
            period_to,
            allocated_amount: amount,
            used_amount: Decimal::ZERO,
            notes,
            created_by: created_by.clone(),
            created_at: Utc::now(),
        };

        match self.budgets.insert(budget.clone()).await {
            Ok(()) => {}
            // The unique index on approval_id turns a retried allocation into
            // a conflict instead of a second budget.
            Err(RepositoryError::Conflict { .. }) => {
                return Err(DomainError::DuplicateAllocation {
                    approval_id: approval.id.0.clone(),
                }
                .into());
            }
            Err(error) => return Err(error.into()),
        }

        tracing::info!(
            event_name = "budget.allocated",
            budget_id = %budget.id.0,
            department_id = %department.id.0,
            approval_id = %approval.id.0,
            allocated_amount = %budget.allocated_amount,
            "department budget allocated"
        );
        if let Err(error) = self
            .notifier
            .notify(
                &approval.sender_id,
                NotificationEvent::BudgetAllocated,
                json!({
                    "budget_id": budget.id.0,
                    "department_id": department.id.0,
                    "allocated_amount": budget.allocated_amount.to_string(),
                }),
            )
            .await
        {
            tracing::warn!(
                event_name = "budget.notification_failed",
                budget_id = %budget.id.0,
                error = %error,
                "notification delivery failed; continuing"
            );
        }

        Ok(budget)
    }

    pub async fn record_usage(
        &self,
        budget_id: &BudgetId,
        delta: Decimal,
    ) -> Result<DepartmentBudget, WorkflowError> {
        DepartmentBudget::validate_usage_delta(delta)?;

        for _ in 0..MAX_USAGE_ATTEMPTS {
            let budget = self
                .budgets
                .find_by_id(budget_id)
                .await?
                .ok_or_else(|| WorkflowError::NotFound {
                    entity: "budget",
                    id: budget_id.0.clone(),
                })?;

            let new_used = budget.used_amount + delta;
            if new_used > budget.allocated_amount {
                return Err(DomainError::OverBudget {
                    allocated: budget.allocated_amount,
                    requested: new_used,
                }
                .into());
            }

            if self.budgets.try_apply_usage(budget_id, budget.used_amount, new_used).await? {
                let mut updated = budget;
                updated.used_amount = new_used;
                return Ok(updated);
            }
            // Lost the compare-and-set; re-read and try again.
        }

        Err(WorkflowError::Contention { budget_id: budget_id.0.clone() })
    }

    pub async fn get_budget(&self, id: &BudgetId) -> Result<DepartmentBudget, WorkflowError> {
        self.budgets
            .find_by_id(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound { entity: "budget", id: id.0.clone() })
    }

    pub async fn list_for_department(
        &self,
        department_id: &DepartmentId,
    ) -> Result<Vec<DepartmentBudget>, WorkflowError> {
        self.departments
            .find_by_id(department_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound {
                entity: "department",
                id: department_id.0.clone(),
            })?;
        Ok(self.budgets.list_for_department(department_id).await?)
    }
}
