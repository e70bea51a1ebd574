use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::actor::ActorId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical state-machine value of a purchase request. The coarser
/// display [`Stage`] is derived from it and never stored separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    PendingApproval,
    PendingProcurementReview,
    PendingFinanceApproval,
    PaymentInProgress,
    AwaitingPaymentConfirmation,
    AwaitingDeliveryConfirmation,
    Completed,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Cancelled)
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::PendingApproval => Stage::Approval,
            Self::PendingProcurementReview => Stage::ProcurementReview,
            Self::PendingFinanceApproval => Stage::FinanceApproval,
            Self::PaymentInProgress | Self::AwaitingPaymentConfirmation => Stage::Payment,
            Self::AwaitingDeliveryConfirmation => Stage::Delivery,
            Self::Completed | Self::Rejected | Self::Cancelled => Stage::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::PendingProcurementReview => "pending_procurement_review",
            Self::PendingFinanceApproval => "pending_finance_approval",
            Self::PaymentInProgress => "payment_in_progress",
            Self::AwaitingPaymentConfirmation => "awaiting_payment_confirmation",
            Self::AwaitingDeliveryConfirmation => "awaiting_delivery_confirmation",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending_approval" => Some(Self::PendingApproval),
            "pending_procurement_review" => Some(Self::PendingProcurementReview),
            "pending_finance_approval" => Some(Self::PendingFinanceApproval),
            "payment_in_progress" => Some(Self::PaymentInProgress),
            "awaiting_payment_confirmation" => Some(Self::AwaitingPaymentConfirmation),
            "awaiting_delivery_confirmation" => Some(Self::AwaitingDeliveryConfirmation),
            "completed" => Some(Self::Completed),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse workflow phase presented to users, derived from [`RequestStatus`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Approval,
    ProcurementReview,
    FinanceApproval,
    Payment,
    Delivery,
    Closed,
}

impl Stage {
    /// Inverse of [`RequestStatus::stage`]: the statuses presented under
    /// this stage.
    pub fn statuses(&self) -> &'static [RequestStatus] {
        match self {
            Self::Approval => &[RequestStatus::PendingApproval],
            Self::ProcurementReview => &[RequestStatus::PendingProcurementReview],
            Self::FinanceApproval => &[RequestStatus::PendingFinanceApproval],
            Self::Payment => {
                &[RequestStatus::PaymentInProgress, RequestStatus::AwaitingPaymentConfirmation]
            }
            Self::Delivery => &[RequestStatus::AwaitingDeliveryConfirmation],
            Self::Closed => {
                &[RequestStatus::Completed, RequestStatus::Rejected, RequestStatus::Cancelled]
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approval => "approval",
            Self::ProcurementReview => "procurement_review",
            Self::FinanceApproval => "finance_approval",
            Self::Payment => "payment",
            Self::Delivery => "delivery",
            Self::Closed => "closed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approval" => Some(Self::Approval),
            "procurement_review" => Some(Self::ProcurementReview),
            "finance_approval" => Some(Self::FinanceApproval),
            "payment" => Some(Self::Payment),
            "delivery" => Some(Self::Delivery),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub id: ActorId,
    pub name: String,
    pub email: String,
    pub department: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: RequestId,
    pub request_code: String,
    pub requester: Requester,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub vendor_name: String,
    pub vendor_bank_details: Option<String>,
    pub priority: Priority,
    pub approving_manager_id: ActorId,
    pub status: RequestStatus,
    pub document_ref: Option<String>,
    pub notes: Option<String>,
    /// Monotonic counter bumped on every committed transition; the
    /// persistence layer compares it on update so a stale writer fails
    /// instead of clobbering a concurrent transition.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PurchaseRequest {
    /// Display stage derived from the canonical status.
    pub fn stage(&self) -> Stage {
        self.status.stage()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::{RequestStatus, Stage};

    #[test]
    fn terminal_statuses_are_exactly_completed_rejected_cancelled() {
        let terminal: Vec<RequestStatus> = [
            RequestStatus::PendingApproval,
            RequestStatus::PendingProcurementReview,
            RequestStatus::PendingFinanceApproval,
            RequestStatus::PaymentInProgress,
            RequestStatus::AwaitingPaymentConfirmation,
            RequestStatus::AwaitingDeliveryConfirmation,
            RequestStatus::Completed,
            RequestStatus::Rejected,
            RequestStatus::Cancelled,
        ]
        .into_iter()
        .filter(RequestStatus::is_terminal)
        .collect();

        assert_eq!(
            terminal,
            vec![RequestStatus::Completed, RequestStatus::Rejected, RequestStatus::Cancelled]
        );
    }

    #[test]
    fn every_status_maps_to_one_stage() {
        assert_eq!(RequestStatus::PendingApproval.stage(), Stage::Approval);
        assert_eq!(RequestStatus::PendingProcurementReview.stage(), Stage::ProcurementReview);
        assert_eq!(RequestStatus::PendingFinanceApproval.stage(), Stage::FinanceApproval);
        assert_eq!(RequestStatus::PaymentInProgress.stage(), Stage::Payment);
        assert_eq!(RequestStatus::AwaitingPaymentConfirmation.stage(), Stage::Payment);
        assert_eq!(RequestStatus::AwaitingDeliveryConfirmation.stage(), Stage::Delivery);
        assert_eq!(RequestStatus::Completed.stage(), Stage::Closed);
        assert_eq!(RequestStatus::Rejected.stage(), Stage::Closed);
        assert_eq!(RequestStatus::Cancelled.stage(), Stage::Closed);
    }

    #[test]
    fn status_round_trips_through_string_form() {
        for status in [
            RequestStatus::PendingApproval,
            RequestStatus::PendingProcurementReview,
            RequestStatus::PendingFinanceApproval,
            RequestStatus::PaymentInProgress,
            RequestStatus::AwaitingPaymentConfirmation,
            RequestStatus::AwaitingDeliveryConfirmation,
            RequestStatus::Completed,
            RequestStatus::Rejected,
            RequestStatus::Cancelled,
        ] {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
    }
}
