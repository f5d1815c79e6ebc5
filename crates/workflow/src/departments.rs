use std::sync::Arc;

use chrono::Utc;

use vittalogic_core::domain::department::{Department, DepartmentId};
use vittalogic_core::domain::employee::EmployeeId;
use vittalogic_core::errors::DomainError;
use vittalogic_core::ident::{self, IdPrefix};
use vittalogic_db::{DepartmentRepository, RepositoryError};

use crate::error::WorkflowError;

pub struct DepartmentService {
    departments: Arc<dyn DepartmentRepository>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Clone, Debug, Default)]
pub struct DepartmentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl DepartmentService {
    pub fn new(departments: Arc<dyn DepartmentRepository>) -> Self {
        Self { departments }
    }

    pub async fn create_department(
        &self,
        name: &str,
        description: Option<String>,
        created_by: &EmployeeId,
    ) -> Result<Department, WorkflowError> {
        let name = Department::normalize_name(name)?;
        if self.departments.find_by_name(&name).await?.is_some() {
            return Err(DomainError::DuplicateName { name }.into());
        }

        let department = Department {
            id: DepartmentId(ident::generate(IdPrefix::Department)),
            name: name.clone(),
            description,
            created_by: created_by.clone(),
            updated_by: None,
            created_at: Utc::now(),
            last_updated: None,
        };

        match self.departments.insert(department.clone()).await {
            Ok(()) => {
                tracing::info!(
                    event_name = "department.created",
                    department_id = %department.id.0,
                    name = %department.name,
                    created_by = %created_by.0,
                    "department created"
                );
                Ok(department)
            }
            // The pre-check raced with another writer; the constraint decides.
            Err(RepositoryError::Conflict { .. }) => {
                Err(DomainError::DuplicateName { name }.into())
            }
            Err(error) => Err(error.into()),
        }
    }

    pub async fn update_department(
        &self,
        id: &DepartmentId,
        update: DepartmentUpdate,
        updated_by: &EmployeeId,
    ) -> Result<Department, WorkflowError> {
        let mut department = self
            .departments
            .find_by_id(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound { entity: "department", id: id.0.clone() })?;

        if let Some(name) = update.name {
            department.name = Department::normalize_name(&name)?;
        }
        if let Some(description) = update.description {
            department.description = Some(description);
        }
        department.updated_by = Some(updated_by.clone());
        department.last_updated = Some(Utc::now());

        match self.departments.update(department.clone()).await {
            Ok(()) => Ok(department),
            Err(RepositoryError::Conflict { .. }) => {
                Err(DomainError::DuplicateName { name: department.name }.into())
            }
            Err(error) => Err(error.into()),
        }
    }

    pub async fn get_department(&self, id: &DepartmentId) -> Result<Department, WorkflowError> {
        self.departments
            .find_by_id(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound { entity: "department", id: id.0.clone() })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vittalogic_core::domain::department::DepartmentId;
    use vittalogic_core::domain::employee::EmployeeId;
    use vittalogic_core::errors::DomainError;
    use vittalogic_db::InMemoryDepartmentRepository;

    use super::{DepartmentService, DepartmentUpdate};
    use crate::error::WorkflowError;

    fn service() -> DepartmentService {
        DepartmentService::new(Arc::new(InMemoryDepartmentRepository::default()))
    }

    fn creator() -> EmployeeId {
        EmployeeId("EMP-3001".to_owned())
    }

    #[tokio::test]
    async fn create_assigns_id_and_audit_fields() {
        let service = service();

        let department = service
            .create_department("Finance", Some("Accounting".to_owned()), &creator())
            .await
            .expect("create should succeed");

        assert!(department.id.0.starts_with("DEPT-"));
        assert_eq!(department.name, "Finance");
        assert_eq!(department.created_by, creator());
        assert!(department.updated_by.is_none());
        assert!(department.last_updated.is_none());
    }

    #[tokio::test]
    async fn create_trims_and_rejects_blank_names() {
        let service = service();

        let department = service
            .create_department("  Operations  ", None, &creator())
            .await
            .expect("create should succeed");
        assert_eq!(department.name, "Operations");

        let error = service
            .create_department("   ", None, &creator())
            .await
            .expect_err("blank name must fail");
        assert!(matches!(error, WorkflowError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected_case_sensitively() {
        let service = service();
        service.create_department("Finance", None, &creator()).await.expect("create");

        let error = service
            .create_department("Finance", None, &creator())
            .await
            .expect_err("duplicate name must fail");
        assert!(matches!(
            error,
            WorkflowError::Domain(DomainError::DuplicateName { ref name }) if name == "Finance"
        ));

        // Different case is a different name.
        service
            .create_department("finance", None, &creator())
            .await
            .expect("lowercase variant is distinct");
    }

    #[tokio::test]
    async fn update_changes_fields_and_stamps_the_editor() {
        let service = service();
        let department =
            service.create_department("Finance", None, &creator()).await.expect("create");

        let editor = EmployeeId("EMP-4001".to_owned());
        let updated = service
            .update_department(
                &department.id,
                DepartmentUpdate {
                    name: Some("Finance & Accounts".to_owned()),
                    description: Some("Expanded remit".to_owned()),
                },
                &editor,
            )
            .await
            .expect("update should succeed");

        assert_eq!(updated.name, "Finance & Accounts");
        assert_eq!(updated.description.as_deref(), Some("Expanded remit"));
        assert_eq!(updated.updated_by, Some(editor));
        assert!(updated.last_updated.is_some());
        assert_eq!(updated.created_by, creator());
    }

    #[tokio::test]
    async fn update_of_unknown_department_is_not_found() {
        let service = service();

        let error = service
            .update_department(
                &DepartmentId("DEPT-404".to_owned()),
                DepartmentUpdate::default(),
                &creator(),
            )
            .await
            .expect_err("unknown id must fail");
        assert!(matches!(error, WorkflowError::NotFound { entity: "department", .. }));
    }

    #[tokio::test]
    async fn renaming_onto_an_existing_department_is_rejected() {
        let service = service();
        service.create_department("Finance", None, &creator()).await.expect("create 1");
        let operations =
            service.create_department("Operations", None, &creator()).await.expect("create 2");

        let error = service
            .update_department(
                &operations.id,
                DepartmentUpdate { name: Some("Finance".to_owned()), description: None },
                &creator(),
            )
            .await
            .expect_err("rename onto taken name must fail");
        assert!(matches!(error, WorkflowError::Domain(DomainError::DuplicateName { .. })));
    }
}
