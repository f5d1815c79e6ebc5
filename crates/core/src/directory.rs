use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::employee::{EmployeeId, EmployeeRecord};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("employee `{employee_id}` was not found")]
    NotFound { employee_id: String },
    #[error("employee directory unavailable: {0}")]
    Unavailable(String),
}

/// Resolves employee identity and hierarchy level. Supplied by the employee
/// service; this engine only reads from it.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn get_employee(&self, id: &EmployeeId) -> Result<EmployeeRecord, DirectoryError>;
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryEmployeeDirectory {
    employees: HashMap<String, EmployeeRecord>,
}

impl InMemoryEmployeeDirectory {
    pub fn new(employees: Vec<EmployeeRecord>) -> Self {
        let employees =
            employees.into_iter().map(|record| (record.id.0.clone(), record)).collect();
        Self { employees }
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryEmployeeDirectory {
    async fn get_employee(&self, id: &EmployeeId) -> Result<EmployeeRecord, DirectoryError> {
        self.employees
            .get(&id.0)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound { employee_id: id.0.clone() })
    }
}
