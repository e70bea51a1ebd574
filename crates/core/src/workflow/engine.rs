use rust_decimal::Decimal;

use crate::domain::actor::{Actor, Role};
use crate::domain::request::{PurchaseRequest, RequestStatus};
use crate::errors::{not_assigned_manager, role_required, WorkflowError};
use crate::workflow::states::{TransitionOutcome, WorkflowAction};

/// Routing rule applied once, at manager-approval time: amounts at or above
/// the threshold take the procurement detour, smaller ones go straight to
/// finance. Never re-evaluated after the approval commits.
pub fn route_after_manager_approval(amount: Decimal, threshold: Decimal) -> RequestStatus {
    if amount >= threshold {
        RequestStatus::PendingProcurementReview
    } else {
        RequestStatus::PendingFinanceApproval
    }
}

/// Validate and resolve one transition without touching storage.
///
/// Preconditions are checked in a fixed order: state compatibility first
/// (terminal requests and wrong-stage actions fail with `InvalidState`),
/// then actor authorization, then payload validation. The returned outcome
/// carries everything the caller needs to commit and announce the change.
pub fn apply_transition(
    request: &PurchaseRequest,
    actor: &Actor,
    action: &WorkflowAction,
    threshold: Decimal,
) -> Result<TransitionOutcome, WorkflowError> {
    use RequestStatus::{
        AwaitingDeliveryConfirmation, AwaitingPaymentConfirmation, PaymentInProgress,
        PendingApproval, PendingFinanceApproval, PendingProcurementReview,
    };

    let status = request.status;
    if status.is_terminal() {
        return Err(invalid_state(request, action, "the request is in a terminal state"));
    }

    let (to, event) = match (status, action) {
        (PendingApproval, WorkflowAction::ApproveManager { .. }) => {
            authorize_assigned_manager(actor, request)?;
            if request.amount <= Decimal::ZERO {
                return Err(WorkflowError::validation("amount", "must be greater than zero"));
            }
            (route_after_manager_approval(request.amount, threshold), "workflow.manager_approved")
        }
        (PendingApproval, WorkflowAction::RejectManager { comments }) => {
            authorize_assigned_manager(actor, request)?;
            require_comment("comments", comments)?;
            (RequestStatus::Rejected, "workflow.manager_rejected")
        }
        (PendingProcurementReview, WorkflowAction::ApproveProcurement { vendor_verification, .. }) => {
            authorize_role(actor, Role::Procurement)?;
            require_nonempty("vendor_verification", vendor_verification)?;
            (PendingFinanceApproval, "workflow.procurement_approved")
        }
        (PendingProcurementReview, WorkflowAction::RejectProcurement { comments }) => {
            authorize_role(actor, Role::Procurement)?;
            require_comment("comments", comments)?;
            (RequestStatus::Rejected, "workflow.procurement_rejected")
        }
        (
            PendingProcurementReview,
            WorkflowAction::RequestAlternativeVendor { alternative_vendor, .. },
        ) => {
            authorize_role(actor, Role::Procurement)?;
            require_nonempty("alternative_vendor", alternative_vendor)?;
            // Self-loop: the request stays in review while the requester
            // resubmits vendor details; the audit row records the ask.
            (PendingProcurementReview, "workflow.alternative_vendor_requested")
        }
        (PendingFinanceApproval, WorkflowAction::ApproveFinance { budget_code, payment_method, .. }) => {
            authorize_role(actor, Role::Finance)?;
            require_nonempty("budget_code", budget_code)?;
            require_nonempty("payment_method", payment_method)?;
            (PaymentInProgress, "workflow.finance_approved")
        }
        (PendingFinanceApproval, WorkflowAction::RejectFinance { comments }) => {
            authorize_role(actor, Role::Finance)?;
            require_comment("comments", comments)?;
            (RequestStatus::Rejected, "workflow.finance_rejected")
        }
        (PaymentInProgress, WorkflowAction::SubmitPaymentLetter { letterhead_ref, .. }) => {
            authorize_role(actor, Role::Finance)?;
            require_nonempty("letterhead_ref", letterhead_ref)?;
            (AwaitingPaymentConfirmation, "workflow.payment_letter_submitted")
        }
        (AwaitingPaymentConfirmation, WorkflowAction::ConfirmPayment { payment_reference, .. }) => {
            authorize_role(actor, Role::Finance)?;
            require_nonempty("payment_reference", payment_reference)?;
            (AwaitingDeliveryConfirmation, "workflow.payment_confirmed")
        }
        (AwaitingDeliveryConfirmation, WorkflowAction::ConfirmDelivery { .. }) => {
            authorize_role(actor, Role::Operations)?;
            (RequestStatus::Completed, "workflow.delivery_confirmed")
        }
        (_, WorkflowAction::Cancel { .. }) => {
            authorize_cancel(actor, request)?;
            (RequestStatus::Cancelled, "workflow.cancelled")
        }
        _ => {
            return Err(invalid_state(
                request,
                action,
                "the action does not apply to the request's current stage",
            ));
        }
    };

    let mut payload = action.payload();
    if matches!(action, WorkflowAction::ApproveManager { .. }) {
        payload.routed_threshold = Some(threshold.to_string());
    }

    Ok(TransitionOutcome {
        from: status,
        to,
        action: action.kind(),
        payload,
        comments: action.comments().map(str::to_string),
        event,
    })
}

fn invalid_state(
    request: &PurchaseRequest,
    action: &WorkflowAction,
    detail: &str,
) -> WorkflowError {
    WorkflowError::InvalidState {
        status: request.status,
        action: action.kind(),
        detail: detail.to_string(),
    }
}

fn authorize_assigned_manager(actor: &Actor, request: &PurchaseRequest) -> Result<(), WorkflowError> {
    if actor.id == request.approving_manager_id {
        Ok(())
    } else {
        Err(not_assigned_manager(&actor.id.0))
    }
}

fn authorize_role(actor: &Actor, required: Role) -> Result<(), WorkflowError> {
    if actor.role == required {
        Ok(())
    } else {
        Err(role_required(&actor.id.0, required))
    }
}

fn authorize_cancel(actor: &Actor, request: &PurchaseRequest) -> Result<(), WorkflowError> {
    if actor.id == request.requester.id || actor.role == Role::Admin {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized {
            actor_id: actor.id.0.clone(),
            reason: "only the requester or an administrator may cancel a request".to_string(),
        })
    }
}

fn require_comment(field: &str, value: &str) -> Result<(), WorkflowError> {
    require_nonempty(field, value)
}

fn require_nonempty(field: &str, value: &str) -> Result<(), WorkflowError> {
    if value.trim().is_empty() {
        Err(WorkflowError::validation(field, "must not be empty"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::actor::{Actor, ActorId, Role};
    use crate::domain::approval::ApprovalAction;
    use crate::domain::request::{
        Priority, PurchaseRequest, RequestId, RequestStatus, Requester,
    };
    use crate::errors::WorkflowError;
    use crate::workflow::engine::{apply_transition, route_after_manager_approval};
    use crate::workflow::states::WorkflowAction;

    fn request_with(status: RequestStatus, amount: Decimal) -> PurchaseRequest {
        let now = Utc::now();
        PurchaseRequest {
            id: RequestId("PR-1001".to_string()),
            request_code: "PR-2026-1001".to_string(),
            requester: Requester {
                id: ActorId("u-asha".to_string()),
                name: "Asha Okafor".to_string(),
                email: "asha@example.test".to_string(),
                department: "engineering".to_string(),
            },
            description: "Fifteen ergonomic chairs".to_string(),
            amount,
            currency: "IDR".to_string(),
            vendor_name: "Mebel Jaya".to_string(),
            vendor_bank_details: Some("BCA 123-456".to_string()),
            priority: Priority::Medium,
            approving_manager_id: ActorId("u-manager".to_string()),
            status,
            document_ref: None,
            notes: None,
            version: 1,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    fn manager() -> Actor {
        Actor::new("u-manager", "Dian Wahyudi", Role::Manager)
    }

    fn procurement() -> Actor {
        Actor::new("u-proc", "Rini Kusuma", Role::Procurement)
    }

    fn finance() -> Actor {
        Actor::new("u-fin", "Bram Santoso", Role::Finance)
    }

    fn operations() -> Actor {
        Actor::new("u-ops", "Lia Hartati", Role::Operations)
    }

    fn threshold() -> Decimal {
        Decimal::from(1_000_000)
    }

    fn all_actions() -> Vec<WorkflowAction> {
        vec![
            WorkflowAction::ApproveManager { comments: None },
            WorkflowAction::RejectManager { comments: "no budget".to_string() },
            WorkflowAction::ApproveProcurement {
                comments: None,
                vendor_verification: "verified".to_string(),
            },
            WorkflowAction::RejectProcurement { comments: "vendor unverified".to_string() },
            WorkflowAction::RequestAlternativeVendor {
                comments: None,
                alternative_vendor: "Kursi Prima".to_string(),
            },
            WorkflowAction::ApproveFinance {
                comments: None,
                budget_code: "OPEX-114".to_string(),
                payment_method: "bank_transfer".to_string(),
            },
            WorkflowAction::RejectFinance { comments: "over budget".to_string() },
            WorkflowAction::SubmitPaymentLetter {
                letterhead_ref: "letters/2026/0042.pdf".to_string(),
                document_template: None,
            },
            WorkflowAction::ConfirmPayment {
                payment_reference: "TRX-889".to_string(),
                transaction_id: None,
                payment_date: None,
                payment_method: None,
                comments: None,
            },
            WorkflowAction::ConfirmDelivery { comments: None },
            WorkflowAction::Cancel { comments: None },
        ]
    }

    #[test]
    fn amount_at_or_above_threshold_routes_to_procurement() {
        // Quantified over a grid of amounts and thresholds rather than a
        // single pair, so the boundary itself is exercised.
        for threshold_units in [1u64, 500, 1_000_000, 25_000_000] {
            let threshold = Decimal::from(threshold_units);
            for offset in [-2i64, -1, 0, 1, 2] {
                let amount = Decimal::from(threshold_units as i64 + offset);
                if amount <= Decimal::ZERO {
                    continue;
                }
                let routed = route_after_manager_approval(amount, threshold);
                if amount >= threshold {
                    assert_eq!(routed, RequestStatus::PendingProcurementReview);
                } else {
                    assert_eq!(routed, RequestStatus::PendingFinanceApproval);
                }
            }
        }
    }

    #[test]
    fn small_request_skips_procurement_review() {
        let request = request_with(RequestStatus::PendingApproval, Decimal::from(500_000));
        let outcome = apply_transition(
            &request,
            &manager(),
            &WorkflowAction::ApproveManager { comments: None },
            threshold(),
        )
        .expect("manager approval");

        assert_eq!(outcome.to, RequestStatus::PendingFinanceApproval);
        assert_eq!(outcome.payload.routed_threshold.as_deref(), Some("1000000"));
    }

    #[test]
    fn large_request_requires_procurement_review() {
        let request = request_with(RequestStatus::PendingApproval, Decimal::from(2_000_000));
        let outcome = apply_transition(
            &request,
            &manager(),
            &WorkflowAction::ApproveManager { comments: None },
            threshold(),
        )
        .expect("manager approval");

        assert_eq!(outcome.to, RequestStatus::PendingProcurementReview);
    }

    #[test]
    fn no_action_leaves_a_terminal_state() {
        for status in [RequestStatus::Completed, RequestStatus::Rejected, RequestStatus::Cancelled]
        {
            let request = request_with(status, Decimal::from(500_000));
            for action in all_actions() {
                let error = apply_transition(&request, &manager(), &action, threshold())
                    .expect_err("terminal state must not transition");
                assert!(
                    matches!(error, WorkflowError::InvalidState { .. }),
                    "expected InvalidState for {action:?} in {status:?}, got {error:?}"
                );
            }
        }
    }

    #[test]
    fn only_the_assigned_manager_may_approve_or_reject() {
        let request = request_with(RequestStatus::PendingApproval, Decimal::from(500_000));
        let impostor = Actor::new("u-other-manager", "Eko Putra", Role::Manager);

        for action in [
            WorkflowAction::ApproveManager { comments: None },
            WorkflowAction::RejectManager { comments: "valid comment".to_string() },
        ] {
            let error = apply_transition(&request, &impostor, &action, threshold())
                .expect_err("non-assigned manager must be refused");
            assert!(matches!(error, WorkflowError::Unauthorized { .. }));
        }
    }

    #[test]
    fn role_stages_refuse_wrong_roles() {
        let review = request_with(RequestStatus::PendingProcurementReview, Decimal::from(2_000_000));
        let error = apply_transition(
            &review,
            &finance(),
            &WorkflowAction::RejectProcurement { comments: "not ours to reject".to_string() },
            threshold(),
        )
        .expect_err("finance cannot act at procurement stage");
        assert!(matches!(error, WorkflowError::Unauthorized { .. }));

        let delivery =
            request_with(RequestStatus::AwaitingDeliveryConfirmation, Decimal::from(500_000));
        let error = apply_transition(
            &delivery,
            &finance(),
            &WorkflowAction::ConfirmDelivery { comments: None },
            threshold(),
        )
        .expect_err("finance cannot confirm delivery");
        assert!(matches!(error, WorkflowError::Unauthorized { .. }));
    }

    #[test]
    fn state_check_precedes_authorization() {
        // A wrong-stage action from an unauthorized actor reports the state
        // problem, matching the documented precondition order.
        let request = request_with(RequestStatus::PendingFinanceApproval, Decimal::from(500_000));
        let error = apply_transition(
            &request,
            &operations(),
            &WorkflowAction::ApproveProcurement {
                comments: None,
                vendor_verification: "verified".to_string(),
            },
            threshold(),
        )
        .expect_err("wrong stage");
        assert!(matches!(error, WorkflowError::InvalidState { .. }));
    }

    #[test]
    fn reject_requires_non_empty_comments() {
        let request = request_with(RequestStatus::PendingApproval, Decimal::from(500_000));
        let error = apply_transition(
            &request,
            &manager(),
            &WorkflowAction::RejectManager { comments: "   ".to_string() },
            threshold(),
        )
        .expect_err("blank comments");
        assert_eq!(error, WorkflowError::validation("comments", "must not be empty"));
    }

    #[test]
    fn finance_approval_requires_budget_code() {
        let request = request_with(RequestStatus::PendingFinanceApproval, Decimal::from(500_000));
        let error = apply_transition(
            &request,
            &finance(),
            &WorkflowAction::ApproveFinance {
                comments: None,
                budget_code: "".to_string(),
                payment_method: "bank_transfer".to_string(),
            },
            threshold(),
        )
        .expect_err("missing budget code");
        assert_eq!(error, WorkflowError::validation("budget_code", "must not be empty"));
    }

    #[test]
    fn confirm_payment_requires_payment_reference() {
        let request =
            request_with(RequestStatus::AwaitingPaymentConfirmation, Decimal::from(500_000));
        let error = apply_transition(
            &request,
            &finance(),
            &WorkflowAction::ConfirmPayment {
                payment_reference: " ".to_string(),
                transaction_id: Some("TRX-1".to_string()),
                payment_date: None,
                payment_method: None,
                comments: None,
            },
            threshold(),
        )
        .expect_err("missing payment reference");
        assert_eq!(error, WorkflowError::validation("payment_reference", "must not be empty"));
    }

    #[test]
    fn alternative_vendor_request_stays_in_review() {
        let request =
            request_with(RequestStatus::PendingProcurementReview, Decimal::from(2_000_000));
        let outcome = apply_transition(
            &request,
            &procurement(),
            &WorkflowAction::RequestAlternativeVendor {
                comments: Some("vendor flagged by compliance".to_string()),
                alternative_vendor: "Kursi Prima".to_string(),
            },
            threshold(),
        )
        .expect("self-loop transition");

        assert_eq!(outcome.from, RequestStatus::PendingProcurementReview);
        assert_eq!(outcome.to, RequestStatus::PendingProcurementReview);
        assert_eq!(outcome.payload.alternative_vendor.as_deref(), Some("Kursi Prima"));
    }

    #[test]
    fn procurement_rejection_records_reject_action() {
        let request =
            request_with(RequestStatus::PendingProcurementReview, Decimal::from(2_000_000));
        let outcome = apply_transition(
            &request,
            &procurement(),
            &WorkflowAction::RejectProcurement { comments: "vendor unverified".to_string() },
            threshold(),
        )
        .expect("procurement reject");

        assert_eq!(outcome.to, RequestStatus::Rejected);
        assert_eq!(outcome.action, ApprovalAction::Reject);
        assert_eq!(outcome.comments.as_deref(), Some("vendor unverified"));
    }

    #[test]
    fn requester_may_cancel_from_any_open_state() {
        let requester = Actor::new("u-asha", "Asha Okafor", Role::Requester);
        for status in [
            RequestStatus::PendingApproval,
            RequestStatus::PendingProcurementReview,
            RequestStatus::PendingFinanceApproval,
            RequestStatus::PaymentInProgress,
            RequestStatus::AwaitingPaymentConfirmation,
            RequestStatus::AwaitingDeliveryConfirmation,
        ] {
            let request = request_with(status, Decimal::from(500_000));
            let outcome = apply_transition(
                &request,
                &requester,
                &WorkflowAction::Cancel { comments: Some("no longer needed".to_string()) },
                threshold(),
            )
            .expect("requester cancellation");
            assert_eq!(outcome.to, RequestStatus::Cancelled);
        }
    }

    #[test]
    fn unrelated_actor_cannot_cancel() {
        let request = request_with(RequestStatus::PendingApproval, Decimal::from(500_000));
        let error = apply_transition(
            &request,
            &operations(),
            &WorkflowAction::Cancel { comments: None },
            threshold(),
        )
        .expect_err("operations staff is neither requester nor admin");
        assert!(matches!(error, WorkflowError::Unauthorized { .. }));
    }

    #[test]
    fn admin_may_cancel_on_behalf_of_requester() {
        let admin = Actor::new("u-admin", "Sari Dewi", Role::Admin);
        let request = request_with(RequestStatus::PaymentInProgress, Decimal::from(500_000));
        let outcome = apply_transition(
            &request,
            &admin,
            &WorkflowAction::Cancel { comments: Some("duplicate of PR-2026-0999".to_string()) },
            threshold(),
        )
        .expect("admin cancellation");
        assert_eq!(outcome.to, RequestStatus::Cancelled);
    }

    #[test]
    fn full_procurement_path_reaches_completion() {
        let mut request = request_with(RequestStatus::PendingApproval, Decimal::from(2_000_000));
        let steps: Vec<(Actor, WorkflowAction)> = vec![
            (manager(), WorkflowAction::ApproveManager { comments: None }),
            (
                procurement(),
                WorkflowAction::ApproveProcurement {
                    comments: None,
                    vendor_verification: "verified".to_string(),
                },
            ),
            (
                finance(),
                WorkflowAction::ApproveFinance {
                    comments: None,
                    budget_code: "CAPEX-7".to_string(),
                    payment_method: "bank_transfer".to_string(),
                },
            ),
            (
                finance(),
                WorkflowAction::SubmitPaymentLetter {
                    letterhead_ref: "letters/2026/0101.pdf".to_string(),
                    document_template: None,
                },
            ),
            (
                finance(),
                WorkflowAction::ConfirmPayment {
                    payment_reference: "TRX-445".to_string(),
                    transaction_id: Some("MUT-9".to_string()),
                    payment_date: Some(Utc::now()),
                    payment_method: Some("bank_transfer".to_string()),
                    comments: None,
                },
            ),
            (operations(), WorkflowAction::ConfirmDelivery { comments: None }),
        ];

        for (actor, action) in steps {
            let outcome =
                apply_transition(&request, &actor, &action, threshold()).expect("valid step");
            request.status = outcome.to;
        }

        assert_eq!(request.status, RequestStatus::Completed);
    }
}
