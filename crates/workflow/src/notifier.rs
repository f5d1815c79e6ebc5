use async_trait::async_trait;
use serde_json::Value;

use vittalogic_core::domain::employee::EmployeeId;
use vittalogic_core::notify::{NotificationChannel, NotificationEvent, NotifyError};

/// Default channel: writes the notification to the log stream and reports
/// success. Real delivery transports implement the same trait.
#[derive(Clone, Debug, Default)]
pub struct LoggingNotificationChannel;

#[async_trait]
impl NotificationChannel for LoggingNotificationChannel {
    async fn notify(
        &self,
        recipient: &EmployeeId,
        event: NotificationEvent,
        payload: Value,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            event_name = "notify.dispatched",
            recipient = %recipient.0,
            notification = event.as_str(),
            payload = %payload,
            "notification dispatched"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use vittalogic_core::domain::employee::EmployeeId;
    use vittalogic_core::notify::{NotificationChannel, NotificationEvent};

    use super::LoggingNotificationChannel;

    #[tokio::test]
    async fn logging_channel_always_reports_success() {
        let channel = LoggingNotificationChannel;
        channel
            .notify(
                &EmployeeId("EMP-1".to_owned()),
                NotificationEvent::ApprovalSubmitted,
                json!({"approval_id": "APR-1"}),
            )
            .await
            .expect("logging channel never fails");
    }
}
