use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::domain::actor::{ActorId, Role};
use crate::domain::request::{PurchaseRequest, RequestId, RequestStatus};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    Actor(ActorId),
    Role(Role),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub request_id: RequestId,
    pub request_code: String,
    pub event: String,
    pub recipients: Vec<Recipient>,
}

/// Who should hear about a transition, derived from where the request
/// landed. The alternative-vendor self-loop notifies the requester, who
/// has to resubmit vendor details.
pub fn audience(event: &str, to: RequestStatus, request: &PurchaseRequest) -> Vec<Recipient> {
    if event == "workflow.alternative_vendor_requested" {
        return vec![Recipient::Actor(request.requester.id.clone())];
    }

    match to {
        RequestStatus::PendingApproval => {
            vec![Recipient::Actor(request.approving_manager_id.clone())]
        }
        RequestStatus::PendingProcurementReview => vec![Recipient::Role(Role::Procurement)],
        RequestStatus::PendingFinanceApproval
        | RequestStatus::PaymentInProgress
        | RequestStatus::AwaitingPaymentConfirmation => vec![Recipient::Role(Role::Finance)],
        RequestStatus::AwaitingDeliveryConfirmation => vec![Recipient::Role(Role::Operations)],
        RequestStatus::Completed | RequestStatus::Rejected | RequestStatus::Cancelled => {
            vec![Recipient::Actor(request.requester.id.clone())]
        }
    }
}

/// Best-effort outbound notification hook. Dispatch must not block the
/// transition that produced it: implementations queue or log internally
/// and absorb their own failures.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notification: Notification);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopDispatcher;

impl NotificationDispatcher for NoopDispatcher {
    fn dispatch(&self, _notification: Notification) {}
}

#[derive(Clone, Default)]
pub struct InMemoryDispatcher {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryDispatcher {
    pub fn sent(&self) -> Vec<Notification> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationDispatcher for InMemoryDispatcher {
    fn dispatch(&self, notification: Notification) {
        match self.sent.lock() {
            Ok(mut sent) => sent.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}
