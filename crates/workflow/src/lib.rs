pub mod budgets;
pub mod coordinator;
pub mod departments;
pub mod error;
pub mod notifier;

pub use budgets::BudgetService;
pub use coordinator::{DecisionResponse, WorkflowCoordinator};
pub use departments::{DepartmentService, DepartmentUpdate};
pub use error::WorkflowError;
pub use notifier::LoggingNotificationChannel;
