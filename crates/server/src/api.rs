//! JSON API routes for the approval workflow and department budgets.
//!
//! Endpoints:
//! - `POST /approval`                       — submit an approval request
//! - `PUT  /approval/{id}/decision`         — approve / reject / hold
//! - `GET  /approval?status=&priority=&sort=` — filtered, sorted listing
//! - `POST /department`                     — create a department
//! - `PUT  /department/{id}`                — update name / description
//! - `POST /department/{id}/budget`         — allocate a budget from an approval
//! - `GET  /department/{id}/budget`         — list a department's budgets
//! - `POST /budget/{id}/usage`              — post spend against a budget
//!
//! Every response is the `{success, data, message}` envelope.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vittalogic_core::directory::DirectoryError;
use vittalogic_core::domain::approval::{Approval, ApprovalDraft, ApprovalId};
use vittalogic_core::domain::budget::{BudgetId, DepartmentBudget};
use vittalogic_core::domain::department::{Department, DepartmentId};
use vittalogic_core::domain::employee::EmployeeId;
use vittalogic_core::errors::DomainError;
use vittalogic_core::workflow::FollowUpAction;
use vittalogic_db::{ApprovalFilter, SubmittedSort};
use vittalogic_workflow::{
    BudgetService, DepartmentService, DepartmentUpdate, WorkflowCoordinator, WorkflowError,
};

#[derive(Clone)]
pub struct ApiState {
    pub coordinator: Arc<WorkflowCoordinator>,
    pub departments: Arc<DepartmentService>,
    pub budgets: Arc<BudgetService>,
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    fn ok(data: T, message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (StatusCode::OK, Json(Self { success: true, data: Some(data), message: message.into() }))
    }

    fn created(data: T, message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::CREATED,
            Json(Self { success: true, data: Some(data), message: message.into() }),
        )
    }

    fn error(error: WorkflowError) -> (StatusCode, Json<Self>) {
        let status = status_for(&error);
        (status, Json(Self { success: false, data: None, message: error.to_string() }))
    }
}

fn status_for(error: &WorkflowError) -> StatusCode {
    match error {
        WorkflowError::Domain(domain) => match domain {
            DomainError::Validation(_)
            | DomainError::HierarchyViolation { .. }
            | DomainError::InvalidPeriod { .. }
            | DomainError::InvalidApproval { .. } => StatusCode::BAD_REQUEST,
            DomainError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            DomainError::InvalidTransition { .. }
            | DomainError::DuplicateName { .. }
            | DomainError::DuplicateAllocation { .. }
            | DomainError::OverBudget { .. } => StatusCode::CONFLICT,
        },
        WorkflowError::NotFound { .. }
        | WorkflowError::Directory(DirectoryError::NotFound { .. }) => StatusCode::NOT_FOUND,
        WorkflowError::Directory(DirectoryError::Unavailable(_))
        | WorkflowError::Repository(_)
        | WorkflowError::Contention { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitApprovalRequest {
    pub sender_id: String,
    pub approver_id: String,
    pub category: String,
    pub reason: String,
    pub priority: String,
    pub expense_min: Decimal,
    pub expense_max: Decimal,
    pub tentative_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub actor_id: String,
    pub action: String,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DecisionView {
    #[serde(flatten)]
    pub approval: ApprovalView,
    pub budget_allocation_unlocked: bool,
}

/// Approval plus the display label for its category. The label is a pure
/// presentation lookup; list views render it directly.
#[derive(Debug, Serialize)]
pub struct ApprovalView {
    #[serde(flatten)]
    pub approval: Approval,
    pub category_label: &'static str,
}

impl From<Approval> for ApprovalView {
    fn from(approval: Approval) -> Self {
        let category_label = approval.category.label();
        Self { approval, category_label }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ApprovalListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDepartmentRequest {
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDepartmentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub updated_by: String,
}

#[derive(Debug, Deserialize)]
pub struct AllocateBudgetRequest {
    pub approval_id: String,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub amount: Decimal,
    pub notes: Option<String>,
    pub created_by: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordUsageRequest {
    pub delta: Decimal,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/approval", post(submit_approval).get(list_approvals))
        .route("/approval/{id}/decision", put(decide_approval))
        .route("/department", post(create_department))
        .route("/department/{id}", put(update_department))
        .route("/department/{id}/budget", post(allocate_budget).get(list_budgets))
        .route("/budget/{id}/usage", post(record_usage))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn submit_approval(
    State(state): State<ApiState>,
    Json(request): Json<SubmitApprovalRequest>,
) -> (StatusCode, Json<ApiResponse<ApprovalView>>) {
    let draft = match parse_draft(request) {
        Ok(draft) => draft,
        Err(error) => return ApiResponse::error(error.into()),
    };

    match state.coordinator.submit_approval(draft).await {
        Ok(approval) => {
            ApiResponse::created(ApprovalView::from(approval), "approval submitted")
        }
        Err(error) => ApiResponse::error(error),
    }
}

fn parse_draft(request: SubmitApprovalRequest) -> Result<ApprovalDraft, DomainError> {
    Ok(ApprovalDraft {
        sender_id: EmployeeId(request.sender_id),
        approver_id: EmployeeId(request.approver_id),
        category: request.category.parse()?,
        reason: request.reason,
        priority: request.priority.parse()?,
        expense_min: request.expense_min,
        expense_max: request.expense_max,
        tentative_date: request.tentative_date,
    })
}

pub async fn decide_approval(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> (StatusCode, Json<ApiResponse<DecisionView>>) {
    let action = match request.action.parse() {
        Ok(action) => action,
        Err(error) => return ApiResponse::error(WorkflowError::Domain(error)),
    };

    let actor = EmployeeId(request.actor_id);
    match state
        .coordinator
        .decide(&ApprovalId(id), &actor, action, request.note)
        .await
    {
        Ok(response) => {
            let unlocked =
                response.follow_ups.contains(&FollowUpAction::UnlockBudgetAllocation);
            ApiResponse::ok(
                DecisionView {
                    approval: ApprovalView::from(response.approval),
                    budget_allocation_unlocked: unlocked,
                },
                "decision recorded",
            )
        }
        Err(error) => ApiResponse::error(error),
    }
}

pub async fn list_approvals(
    State(state): State<ApiState>,
    Query(query): Query<ApprovalListQuery>,
) -> (StatusCode, Json<ApiResponse<Vec<ApprovalView>>>) {
    let filter = match parse_filter(query) {
        Ok(filter) => filter,
        Err(error) => return ApiResponse::error(error.into()),
    };

    match state.coordinator.list_approvals(&filter).await {
        Ok(approvals) => {
            let views: Vec<ApprovalView> =
                approvals.into_iter().map(ApprovalView::from).collect();
            let message = format!("{} approvals", views.len());
            ApiResponse::ok(views, message)
        }
        Err(error) => ApiResponse::error(error),
    }
}

fn parse_filter(query: ApprovalListQuery) -> Result<ApprovalFilter, DomainError> {
    let status = query.status.as_deref().map(str::parse).transpose()?;
    let priority = query.priority.as_deref().map(str::parse).transpose()?;
    let sort = match query.sort.as_deref() {
        None => SubmittedSort::default(),
        Some("asc") => SubmittedSort::Ascending,
        Some("desc") => SubmittedSort::Descending,
        Some(other) => {
            return Err(DomainError::Validation(format!(
                "unsupported sort `{other}` (expected asc|desc)"
            )));
        }
    };

    Ok(ApprovalFilter { status, priority, sort, limit: query.limit.unwrap_or(0) })
}

pub async fn create_department(
    State(state): State<ApiState>,
    Json(request): Json<CreateDepartmentRequest>,
) -> (StatusCode, Json<ApiResponse<Department>>) {
    match state
        .departments
        .create_department(
            &request.name,
            request.description,
            &EmployeeId(request.created_by),
        )
        .await
    {
        Ok(department) => ApiResponse::created(department, "department created"),
        Err(error) => ApiResponse::error(error),
    }
}

pub async fn update_department(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateDepartmentRequest>,
) -> (StatusCode, Json<ApiResponse<Department>>) {
    let update = DepartmentUpdate { name: request.name, description: request.description };
    match state
        .departments
        .update_department(&DepartmentId(id), update, &EmployeeId(request.updated_by))
        .await
    {
        Ok(department) => ApiResponse::ok(department, "department updated"),
        Err(error) => ApiResponse::error(error),
    }
}

pub async fn allocate_budget(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<AllocateBudgetRequest>,
) -> (StatusCode, Json<ApiResponse<DepartmentBudget>>) {
    match state
        .budgets
        .allocate_budget(
            &DepartmentId(id),
            &ApprovalId(request.approval_id),
            request.period_from,
            request.period_to,
            request.amount,
            request.notes,
            &EmployeeId(request.created_by),
        )
        .await
    {
        Ok(budget) => ApiResponse::created(budget, "budget allocated"),
        Err(error) => ApiResponse::error(error),
    }
}

pub async fn list_budgets(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<ApiResponse<Vec<DepartmentBudget>>>) {
    match state.budgets.list_for_department(&DepartmentId(id)).await {
        Ok(budgets) => {
            let message = format!("{} budgets", budgets.len());
            ApiResponse::ok(budgets, message)
        }
        Err(error) => ApiResponse::error(error),
    }
}

pub async fn record_usage(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<RecordUsageRequest>,
) -> (StatusCode, Json<ApiResponse<DepartmentBudget>>) {
    match state.budgets.record_usage(&BudgetId(id), request.delta).await {
        Ok(budget) => ApiResponse::ok(budget, "usage recorded"),
        Err(error) => ApiResponse::error(error),
    }
}
