pub mod connection;
pub mod directory;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use directory::SqlEmployeeDirectory;
pub use fixtures::{SeedResult, VerificationResult, WorkflowSeedDataset};
pub use repositories::{
    ApprovalFilter, ApprovalRepository, DecisionRecord, DepartmentBudgetRepository,
    DepartmentRepository, InMemoryApprovalRepository, InMemoryDepartmentBudgetRepository,
    InMemoryDepartmentRepository, RepositoryError, SqlApprovalRepository,
    SqlDepartmentBudgetRepository, SqlDepartmentRepository, SubmittedSort,
};
