use reqflow_core::{Notification, NotificationDispatcher};
use tracing::info;

/// Notification hook that records dispatch intent in the structured log.
/// Actual delivery channels sit behind this interface and are out of
/// scope here; whatever happens downstream, the emitting transition has
/// already committed.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDispatcher;

impl NotificationDispatcher for TracingDispatcher {
    fn dispatch(&self, notification: Notification) {
        info!(
            event_name = %notification.event,
            request_id = %notification.request_id,
            request_code = %notification.request_code,
            recipients = ?notification.recipients,
            "notification dispatched"
        );
    }
}
