use std::collections::HashMap;

use rust_decimal::Decimal;
use tokio::sync::RwLock;

use vittalogic_core::domain::approval::{Approval, ApprovalId, ApprovalStatus};
use vittalogic_core::domain::budget::{BudgetId, DepartmentBudget};
use vittalogic_core::domain::department::{Department, DepartmentId};

use super::{
    ApprovalFilter, ApprovalRepository, DecisionRecord, DepartmentBudgetRepository,
    DepartmentRepository, RepositoryError, SubmittedSort,
};

#[derive(Default)]
pub struct InMemoryApprovalRepository {
    approvals: RwLock<HashMap<String, Approval>>,
}

#[async_trait::async_trait]
impl ApprovalRepository for InMemoryApprovalRepository {
    async fn insert(&self, approval: Approval) -> Result<(), RepositoryError> {
        let mut approvals = self.approvals.write().await;
        if approvals.contains_key(&approval.id.0) {
            return Err(RepositoryError::Conflict { constraint: "approval.approval_id" });
        }
        approvals.insert(approval.id.0.clone(), approval);
        Ok(())
    }

    async fn find_by_id(&self, id: &ApprovalId) -> Result<Option<Approval>, RepositoryError> {
        let approvals = self.approvals.read().await;
        Ok(approvals.get(&id.0).cloned())
    }

    async fn list(&self, filter: &ApprovalFilter) -> Result<Vec<Approval>, RepositoryError> {
        let approvals = self.approvals.read().await;
        let mut matched: Vec<Approval> = approvals
            .values()
            .filter(|approval| filter.status.map_or(true, |status| approval.status == status))
            .filter(|approval| {
                filter.priority.map_or(true, |priority| approval.priority == priority)
            })
            .cloned()
            .collect();

        matched.sort_by(|left, right| match filter.sort {
            SubmittedSort::Ascending => left.submitted_at.cmp(&right.submitted_at),
            SubmittedSort::Descending => right.submitted_at.cmp(&left.submitted_at),
        });
        matched.truncate(filter.effective_limit() as usize);
        Ok(matched)
    }

    async fn apply_decision(
        &self,
        id: &ApprovalId,
        expected: ApprovalStatus,
        decision: &DecisionRecord,
    ) -> Result<bool, RepositoryError> {
        let mut approvals = self.approvals.write().await;
        let Some(approval) = approvals.get_mut(&id.0) else {
            return Ok(false);
        };
        if approval.status != expected {
            return Ok(false);
        }

        approval.status = decision.to;
        approval.action_by = Some(decision.action_by.clone());
        approval.action_at = Some(decision.action_at);
        approval.action_note = decision.action_note.clone();
        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryDepartmentRepository {
    departments: RwLock<HashMap<String, Department>>,
}

impl InMemoryDepartmentRepository {
    fn name_taken(departments: &HashMap<String, Department>, name: &str, skip_id: &str) -> bool {
        departments
            .values()
            .any(|department| department.id.0 != skip_id && department.name == name)
    }
}

#[async_trait::async_trait]
impl DepartmentRepository for InMemoryDepartmentRepository {
    async fn insert(&self, department: Department) -> Result<(), RepositoryError> {
        let mut departments = self.departments.write().await;
        if Self::name_taken(&departments, &department.name, &department.id.0) {
            return Err(RepositoryError::Conflict { constraint: "department.name" });
        }
        departments.insert(department.id.0.clone(), department);
        Ok(())
    }

    async fn find_by_id(&self, id: &DepartmentId) -> Result<Option<Department>, RepositoryError> {
        let departments = self.departments.read().await;
        Ok(departments.get(&id.0).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Department>, RepositoryError> {
        let departments = self.departments.read().await;
        Ok(departments.values().find(|department| department.name == name).cloned())
    }

    async fn update(&self, department: Department) -> Result<(), RepositoryError> {
        let mut departments = self.departments.write().await;
        if Self::name_taken(&departments, &department.name, &department.id.0) {
            return Err(RepositoryError::Conflict { constraint: "department.name" });
        }
        departments.insert(department.id.0.clone(), department);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryDepartmentBudgetRepository {
    budgets: RwLock<HashMap<String, DepartmentBudget>>,
}

#[async_trait::async_trait]
impl DepartmentBudgetRepository for InMemoryDepartmentBudgetRepository {
    async fn insert(&self, budget: DepartmentBudget) -> Result<(), RepositoryError> {
        let mut budgets = self.budgets.write().await;
        let duplicate = budgets
            .values()
            .any(|existing| existing.approval_id == budget.approval_id);
        if duplicate {
            return Err(RepositoryError::Conflict {
                constraint: "department_budget.approval_id",
            });
        }
        budgets.insert(budget.id.0.clone(), budget);
        Ok(())
    }

    async fn find_by_id(&self, id: &BudgetId) -> Result<Option<DepartmentBudget>, RepositoryError> {
        let budgets = self.budgets.read().await;
        Ok(budgets.get(&id.0).cloned())
    }

    async fn find_by_approval_id(
        &self,
        id: &ApprovalId,
    ) -> Result<Option<DepartmentBudget>, RepositoryError> {
        let budgets = self.budgets.read().await;
        Ok(budgets.values().find(|budget| &budget.approval_id == id).cloned())
    }

    async fn list_for_department(
        &self,
        id: &DepartmentId,
    ) -> Result<Vec<DepartmentBudget>, RepositoryError> {
        let budgets = self.budgets.read().await;
        let mut matched: Vec<DepartmentBudget> =
            budgets.values().filter(|budget| &budget.department_id == id).cloned().collect();
        matched.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(matched)
    }

    async fn try_apply_usage(
        &self,
        id: &BudgetId,
        expected_used: Decimal,
        new_used: Decimal,
    ) -> Result<bool, RepositoryError> {
        let mut budgets = self.budgets.write().await;
        let Some(budget) = budgets.get_mut(&id.0) else {
            return Ok(false);
        };
        if budget.used_amount != expected_used {
            return Ok(false);
        }
        budget.used_amount = new_used;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use vittalogic_core::domain::approval::{
        Approval, ApprovalCategory, ApprovalId, ApprovalPriority, ApprovalStatus,
    };
    use vittalogic_core::domain::budget::{BudgetId, DepartmentBudget};
    use vittalogic_core::domain::department::{Department, DepartmentId};
    use vittalogic_core::domain::employee::EmployeeId;

    use crate::repositories::{
        ApprovalFilter, ApprovalRepository, DecisionRecord, DepartmentBudgetRepository,
        DepartmentRepository, InMemoryApprovalRepository, InMemoryDepartmentBudgetRepository,
        InMemoryDepartmentRepository, RepositoryError,
    };

    fn approval(id: &str, status: ApprovalStatus) -> Approval {
        Approval {
            id: ApprovalId(id.to_string()),
            sender_id: EmployeeId("EMP-2001".to_string()),
            approver_id: EmployeeId("EMP-3001".to_string()),
            category: ApprovalCategory::DepartmentBudget,
            reason: "Quarterly budget".to_string(),
            priority: ApprovalPriority::Medium,
            expense_min: Decimal::new(10_000, 0),
            expense_max: Decimal::new(20_000, 0),
            tentative_date: NaiveDate::from_ymd_opt(2024, 2, 1).expect("valid date"),
            status,
            submitted_at: Utc::now(),
            action_by: None,
            action_at: None,
            action_note: None,
        }
    }

    fn budget(id: &str, approval_id: &str) -> DepartmentBudget {
        DepartmentBudget {
            id: BudgetId(id.to_string()),
            department_id: DepartmentId("DEPT-001".to_string()),
            approval_id: ApprovalId(approval_id.to_string()),
            period_from: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            period_to: NaiveDate::from_ymd_opt(2024, 3, 31).expect("valid date"),
            allocated_amount: Decimal::new(120_000, 0),
            used_amount: Decimal::ZERO,
            notes: None,
            created_by: EmployeeId("EMP-3001".to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn approval_decision_cas_lets_exactly_one_writer_win() {
        let repo = InMemoryApprovalRepository::default();
        repo.insert(approval("APR-1", ApprovalStatus::Pending)).await.expect("insert");

        let decision = DecisionRecord {
            to: ApprovalStatus::Approved,
            action_by: EmployeeId("EMP-3001".to_string()),
            action_at: Utc::now(),
            action_note: None,
        };

        let id = ApprovalId("APR-1".to_string());
        assert!(repo
            .apply_decision(&id, ApprovalStatus::Pending, &decision)
            .await
            .expect("first decision"));
        assert!(!repo
            .apply_decision(&id, ApprovalStatus::Pending, &decision)
            .await
            .expect("second decision"));
    }

    #[tokio::test]
    async fn approval_list_honors_filter_and_order() {
        let repo = InMemoryApprovalRepository::default();
        let mut early = approval("APR-1", ApprovalStatus::Pending);
        early.submitted_at = Utc::now() - chrono::Duration::hours(1);
        repo.insert(early).await.expect("insert 1");
        repo.insert(approval("APR-2", ApprovalStatus::Approved)).await.expect("insert 2");
        repo.insert(approval("APR-3", ApprovalStatus::Pending)).await.expect("insert 3");

        let pending = repo
            .list(&ApprovalFilter {
                status: Some(ApprovalStatus::Pending),
                ..ApprovalFilter::default()
            })
            .await
            .expect("list");
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id.0, "APR-3");
    }

    #[tokio::test]
    async fn department_names_are_unique() {
        let repo = InMemoryDepartmentRepository::default();
        let department = Department {
            id: DepartmentId("DEPT-1".to_string()),
            name: "Finance".to_string(),
            description: None,
            created_by: EmployeeId("EMP-3001".to_string()),
            updated_by: None,
            created_at: Utc::now(),
            last_updated: None,
        };
        repo.insert(department.clone()).await.expect("insert");

        let mut second = department.clone();
        second.id = DepartmentId("DEPT-2".to_string());
        let error = repo.insert(second).await.expect_err("duplicate name");
        assert!(matches!(error, RepositoryError::Conflict { constraint: "department.name" }));

        // Updating a department without renaming it is not a conflict with itself.
        repo.update(department).await.expect("self-update");
    }

    #[tokio::test]
    async fn budget_allocation_is_unique_per_approval() {
        let repo = InMemoryDepartmentBudgetRepository::default();
        repo.insert(budget("BUD-1", "APR-1")).await.expect("insert");

        let error = repo.insert(budget("BUD-2", "APR-1")).await.expect_err("duplicate approval");
        assert!(matches!(
            error,
            RepositoryError::Conflict { constraint: "department_budget.approval_id" }
        ));
    }

    #[tokio::test]
    async fn usage_cas_rejects_stale_writers() {
        let repo = InMemoryDepartmentBudgetRepository::default();
        repo.insert(budget("BUD-1", "APR-1")).await.expect("insert");

        let id = BudgetId("BUD-1".to_string());
        assert!(repo
            .try_apply_usage(&id, Decimal::ZERO, Decimal::new(40_000, 0))
            .await
            .expect("first usage"));
        assert!(!repo
            .try_apply_usage(&id, Decimal::ZERO, Decimal::new(60_000, 0))
            .await
            .expect("stale usage"));
    }
}
