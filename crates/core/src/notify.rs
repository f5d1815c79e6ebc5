use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::employee::EmployeeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    ApprovalSubmitted,
    ApprovalApproved,
    ApprovalRejected,
    ApprovalOnHold,
    BudgetAllocated,
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApprovalSubmitted => "approval.submitted",
            Self::ApprovalApproved => "approval.approved",
            Self::ApprovalRejected => "approval.rejected",
            Self::ApprovalOnHold => "approval.on_hold",
            Self::BudgetAllocated => "budget.allocated",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification channel failure: {0}")]
    Channel(String),
}

/// Fire-and-forget delivery. A failed notification never rolls back the
/// workflow transition that produced it; callers log and move on.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn notify(
        &self,
        recipient: &EmployeeId,
        event: NotificationEvent,
        payload: Value,
    ) -> Result<(), NotifyError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentNotification {
    pub recipient: EmployeeId,
    pub event: NotificationEvent,
    pub payload: Value,
}

#[derive(Clone, Default)]
pub struct InMemoryNotificationChannel {
    sent: Arc<Mutex<Vec<SentNotification>>>,
    fail_with: Option<String>,
}

impl InMemoryNotificationChannel {
    /// Channel that rejects every delivery, for exercising the swallow path.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { sent: Arc::default(), fail_with: Some(message.into()) }
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl NotificationChannel for InMemoryNotificationChannel {
    async fn notify(
        &self,
        recipient: &EmployeeId,
        event: NotificationEvent,
        payload: Value,
    ) -> Result<(), NotifyError> {
        if let Some(message) = &self.fail_with {
            return Err(NotifyError::Channel(message.clone()));
        }
        let notification =
            SentNotification { recipient: recipient.clone(), event, payload };
        match self.sent.lock() {
            Ok(mut sent) => sent.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
        Ok(())
    }
}
