use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::actor::{ActorId, Role};
use crate::domain::request::{RequestId, Stage};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub String);

/// Decision kind recorded for one committed transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Approve,
    Reject,
    RequestAlternativeVendor,
    SubmitPaymentLetter,
    ConfirmPayment,
    ConfirmDelivery,
    Cancel,
}

impl ApprovalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::RequestAlternativeVendor => "request_alternative_vendor",
            Self::SubmitPaymentLetter => "submit_payment_letter",
            Self::ConfirmPayment => "confirm_payment",
            Self::ConfirmDelivery => "confirm_delivery",
            Self::Cancel => "cancel",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            "request_alternative_vendor" => Some(Self::RequestAlternativeVendor),
            "submit_payment_letter" => Some(Self::SubmitPaymentLetter),
            "confirm_payment" => Some(Self::ConfirmPayment),
            "confirm_delivery" => Some(Self::ConfirmDelivery),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage-specific structured payload captured alongside a decision.
/// Serialized to JSON on the audit row; absent fields are omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_verification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letterhead_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routed_threshold: Option<String>,
}

impl ApprovalPayload {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn from_json(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }
}

/// Immutable record of one committed transition. Rows are append-only and
/// ordered; replaying them for a request reconstructs its full history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowApproval {
    pub id: ApprovalId,
    pub request_id: RequestId,
    pub stage: Stage,
    pub actor_id: ActorId,
    pub actor_role: Role,
    pub action: ApprovalAction,
    pub comments: Option<String>,
    pub payload: ApprovalPayload,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::{ApprovalAction, ApprovalPayload};

    #[test]
    fn action_round_trips_through_string_form() {
        for action in [
            ApprovalAction::Approve,
            ApprovalAction::Reject,
            ApprovalAction::RequestAlternativeVendor,
            ApprovalAction::SubmitPaymentLetter,
            ApprovalAction::ConfirmPayment,
            ApprovalAction::ConfirmDelivery,
            ApprovalAction::Cancel,
        ] {
            assert_eq!(ApprovalAction::parse(action.as_str()), Some(action));
        }
    }

    #[test]
    fn payload_json_omits_absent_fields() {
        let payload =
            ApprovalPayload { budget_code: Some("OPEX-2026-114".to_string()), ..Default::default() };
        let json = payload.to_json();

        assert!(json.contains("budget_code"));
        assert!(!json.contains("payment_reference"));
        assert_eq!(ApprovalPayload::from_json(&json), payload);
    }

    #[test]
    fn malformed_payload_json_decodes_to_empty() {
        assert!(ApprovalPayload::from_json("not json").is_empty());
    }
}
