pub mod audit;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod ident;
pub mod notify;
pub mod workflow;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use directory::{DirectoryError, EmployeeDirectory, InMemoryEmployeeDirectory};
pub use domain::approval::{
    Approval, ApprovalCategory, ApprovalDraft, ApprovalId, ApprovalPriority, ApprovalStatus,
};
pub use domain::budget::{BudgetId, DepartmentBudget};
pub use domain::department::{Department, DepartmentId};
pub use domain::employee::{EmployeeId, EmployeeRecord};
pub use errors::DomainError;
pub use ident::IdPrefix;
pub use notify::{
    InMemoryNotificationChannel, NotificationChannel, NotificationEvent, NotifyError,
    SentNotification,
};
pub use workflow::{
    DecisionAction, DecisionContext, DecisionEngine, DecisionFlow, FollowUpAction,
    StandardDecisionFlow, TransitionOutcome,
};
