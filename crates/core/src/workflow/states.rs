use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::approval::{ApprovalAction, ApprovalPayload};
use crate::domain::request::RequestStatus;

/// A transition operation together with its action-specific payload.
/// One variant per operation the engine exposes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowAction {
    ApproveManager {
        comments: Option<String>,
    },
    RejectManager {
        comments: String,
    },
    ApproveProcurement {
        comments: Option<String>,
        vendor_verification: String,
    },
    RejectProcurement {
        comments: String,
    },
    RequestAlternativeVendor {
        comments: Option<String>,
        alternative_vendor: String,
    },
    ApproveFinance {
        comments: Option<String>,
        budget_code: String,
        payment_method: String,
    },
    RejectFinance {
        comments: String,
    },
    SubmitPaymentLetter {
        letterhead_ref: String,
        document_template: Option<String>,
    },
    ConfirmPayment {
        payment_reference: String,
        transaction_id: Option<String>,
        payment_date: Option<DateTime<Utc>>,
        payment_method: Option<String>,
        comments: Option<String>,
    },
    ConfirmDelivery {
        comments: Option<String>,
    },
    Cancel {
        comments: Option<String>,
    },
}

impl WorkflowAction {
    /// Decision kind recorded on the audit row for this action.
    pub fn kind(&self) -> ApprovalAction {
        match self {
            Self::ApproveManager { .. }
            | Self::ApproveProcurement { .. }
            | Self::ApproveFinance { .. } => ApprovalAction::Approve,
            Self::RejectManager { .. }
            | Self::RejectProcurement { .. }
            | Self::RejectFinance { .. } => ApprovalAction::Reject,
            Self::RequestAlternativeVendor { .. } => ApprovalAction::RequestAlternativeVendor,
            Self::SubmitPaymentLetter { .. } => ApprovalAction::SubmitPaymentLetter,
            Self::ConfirmPayment { .. } => ApprovalAction::ConfirmPayment,
            Self::ConfirmDelivery { .. } => ApprovalAction::ConfirmDelivery,
            Self::Cancel { .. } => ApprovalAction::Cancel,
        }
    }

    pub fn comments(&self) -> Option<&str> {
        match self {
            Self::ApproveManager { comments }
            | Self::ApproveProcurement { comments, .. }
            | Self::RequestAlternativeVendor { comments, .. }
            | Self::ApproveFinance { comments, .. }
            | Self::ConfirmPayment { comments, .. }
            | Self::ConfirmDelivery { comments }
            | Self::Cancel { comments } => comments.as_deref(),
            Self::RejectManager { comments }
            | Self::RejectProcurement { comments }
            | Self::RejectFinance { comments } => Some(comments.as_str()),
            Self::SubmitPaymentLetter { .. } => None,
        }
    }

    /// Structured payload persisted on the audit row.
    pub fn payload(&self) -> ApprovalPayload {
        match self {
            Self::ApproveProcurement { vendor_verification, .. } => ApprovalPayload {
                vendor_verification: Some(vendor_verification.clone()),
                ..Default::default()
            },
            Self::RequestAlternativeVendor { alternative_vendor, .. } => ApprovalPayload {
                alternative_vendor: Some(alternative_vendor.clone()),
                ..Default::default()
            },
            Self::ApproveFinance { budget_code, payment_method, .. } => ApprovalPayload {
                budget_code: Some(budget_code.clone()),
                payment_method: Some(payment_method.clone()),
                ..Default::default()
            },
            Self::SubmitPaymentLetter { letterhead_ref, document_template } => ApprovalPayload {
                letterhead_ref: Some(letterhead_ref.clone()),
                document_template: Some(
                    document_template.clone().unwrap_or_else(|| "standard".to_string()),
                ),
                ..Default::default()
            },
            Self::ConfirmPayment {
                payment_reference,
                transaction_id,
                payment_date,
                payment_method,
                ..
            } => ApprovalPayload {
                payment_reference: Some(payment_reference.clone()),
                transaction_id: transaction_id.clone(),
                payment_date: *payment_date,
                payment_method: payment_method.clone(),
                ..Default::default()
            },
            Self::ApproveManager { .. }
            | Self::RejectManager { .. }
            | Self::RejectProcurement { .. }
            | Self::RejectFinance { .. }
            | Self::ConfirmDelivery { .. }
            | Self::Cancel { .. } => ApprovalPayload::default(),
        }
    }
}

/// Result of a validated transition, ready to be committed and announced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub action: ApprovalAction,
    pub payload: ApprovalPayload,
    pub comments: Option<String>,
    /// Event name announced to the notification dispatcher.
    pub event: &'static str,
}
