use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::directory::ManagerDirectory;
use crate::domain::actor::{Actor, ActorId};
use crate::domain::approval::{ApprovalId, WorkflowApproval};
use crate::domain::request::{
    Priority, PurchaseRequest, RequestId, RequestStatus, Requester,
};
use crate::errors::WorkflowError;
use crate::notify::{audience, Notification, NotificationDispatcher};
use crate::policy::{default_threshold, ThresholdPolicy};
use crate::store::{CommitError, WorkflowStore};
use crate::workflow::engine::apply_transition;
use crate::workflow::states::WorkflowAction;

/// Input for request creation; everything else on the entity is derived.
#[derive(Clone, Debug)]
pub struct NewRequest {
    pub requester: Requester,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub vendor_name: String,
    pub vendor_bank_details: Option<String>,
    pub priority: Priority,
    pub approving_manager_id: ActorId,
    pub document_ref: Option<String>,
    pub notes: Option<String>,
}

/// The sole writer of purchase-request state. Every transition runs the
/// pure engine, then commits the new state and its audit row as one
/// conditional write, then hands a notification to the dispatcher without
/// letting dispatch outcome touch the transition result.
pub struct WorkflowService<S, T, M, N> {
    store: S,
    threshold: T,
    directory: M,
    notifier: N,
}

impl<S, T, M, N> WorkflowService<S, T, M, N>
where
    S: WorkflowStore,
    T: ThresholdPolicy,
    M: ManagerDirectory,
    N: NotificationDispatcher,
{
    pub fn new(store: S, threshold: T, directory: M, notifier: N) -> Self {
        Self { store, threshold, directory, notifier }
    }

    pub async fn create(&self, new: NewRequest) -> Result<PurchaseRequest, WorkflowError> {
        if new.amount <= Decimal::ZERO {
            return Err(WorkflowError::validation("amount", "must be greater than zero"));
        }
        require_field("requester.name", &new.requester.name)?;
        require_field("requester.email", &new.requester.email)?;
        require_field("requester.department", &new.requester.department)?;
        require_field("description", &new.description)?;
        require_field("currency", &new.currency)?;
        require_field("vendor_name", &new.vendor_name)?;

        let manager = self
            .directory
            .resolve_manager(&new.approving_manager_id)
            .await
            .map_err(|error| WorkflowError::Storage(error.0))?;
        if manager.is_none() {
            return Err(WorkflowError::validation(
                "approving_manager_id",
                "does not resolve to an active approving manager",
            ));
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        let request = PurchaseRequest {
            id: RequestId(id.to_string()),
            request_code: request_code(id, now),
            requester: new.requester,
            description: new.description,
            amount: new.amount,
            currency: new.currency,
            vendor_name: new.vendor_name,
            vendor_bank_details: new.vendor_bank_details,
            priority: new.priority,
            approving_manager_id: new.approving_manager_id,
            status: RequestStatus::PendingApproval,
            document_ref: new.document_ref,
            notes: new.notes,
            version: 1,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        self.store.insert(&request).await.map_err(|error| WorkflowError::Storage(error.0))?;

        let event = "workflow.request_submitted";
        self.notifier.dispatch(Notification {
            request_id: request.id.clone(),
            request_code: request.request_code.clone(),
            event: event.to_string(),
            recipients: audience(event, request.status, &request),
        });

        Ok(request)
    }

    pub async fn get(&self, request_id: &RequestId) -> Result<PurchaseRequest, WorkflowError> {
        self.store
            .fetch(request_id)
            .await
            .map_err(|error| WorkflowError::Storage(error.0))?
            .ok_or_else(|| WorkflowError::NotFound(request_id.clone()))
    }

    pub async fn history(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<WorkflowApproval>, WorkflowError> {
        self.get(request_id).await?;
        self.store.history(request_id).await.map_err(|error| WorkflowError::Storage(error.0))
    }

    pub async fn approve_manager_stage(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        comments: Option<String>,
    ) -> Result<PurchaseRequest, WorkflowError> {
        self.execute(request_id, actor, WorkflowAction::ApproveManager { comments }).await
    }

    pub async fn reject_manager_stage(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        comments: String,
    ) -> Result<PurchaseRequest, WorkflowError> {
        self.execute(request_id, actor, WorkflowAction::RejectManager { comments }).await
    }

    pub async fn approve_procurement(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        comments: Option<String>,
        vendor_verification: String,
    ) -> Result<PurchaseRequest, WorkflowError> {
        self.execute(
            request_id,
            actor,
            WorkflowAction::ApproveProcurement { comments, vendor_verification },
        )
        .await
    }

    pub async fn reject_procurement(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        comments: String,
    ) -> Result<PurchaseRequest, WorkflowError> {
        self.execute(request_id, actor, WorkflowAction::RejectProcurement { comments }).await
    }

    pub async fn request_alternative_vendor(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        comments: Option<String>,
        alternative_vendor: String,
    ) -> Result<PurchaseRequest, WorkflowError> {
        self.execute(
            request_id,
            actor,
            WorkflowAction::RequestAlternativeVendor { comments, alternative_vendor },
        )
        .await
    }

    pub async fn approve_finance(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        comments: Option<String>,
        budget_code: String,
        payment_method: String,
    ) -> Result<PurchaseRequest, WorkflowError> {
        self.execute(
            request_id,
            actor,
            WorkflowAction::ApproveFinance { comments, budget_code, payment_method },
        )
        .await
    }

    pub async fn reject_finance(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        comments: String,
    ) -> Result<PurchaseRequest, WorkflowError> {
        self.execute(request_id, actor, WorkflowAction::RejectFinance { comments }).await
    }

    pub async fn submit_payment_letter(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        letterhead_ref: String,
        document_template: Option<String>,
    ) -> Result<PurchaseRequest, WorkflowError> {
        self.execute(
            request_id,
            actor,
            WorkflowAction::SubmitPaymentLetter { letterhead_ref, document_template },
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn confirm_payment(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        payment_reference: String,
        transaction_id: Option<String>,
        payment_date: Option<DateTime<Utc>>,
        payment_method: Option<String>,
        comments: Option<String>,
    ) -> Result<PurchaseRequest, WorkflowError> {
        self.execute(
            request_id,
            actor,
            WorkflowAction::ConfirmPayment {
                payment_reference,
                transaction_id,
                payment_date,
                payment_method,
                comments,
            },
        )
        .await
    }

    pub async fn confirm_delivery(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        comments: Option<String>,
    ) -> Result<PurchaseRequest, WorkflowError> {
        self.execute(request_id, actor, WorkflowAction::ConfirmDelivery { comments }).await
    }

    pub async fn cancel(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        comments: Option<String>,
    ) -> Result<PurchaseRequest, WorkflowError> {
        self.execute(request_id, actor, WorkflowAction::Cancel { comments }).await
    }

    async fn execute(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        action: WorkflowAction,
    ) -> Result<PurchaseRequest, WorkflowError> {
        let request = self.get(request_id).await?;

        // The engine consults the threshold only when routing a manager
        // approval; other transitions skip the policy read entirely.
        let threshold = match &action {
            WorkflowAction::ApproveManager { .. } => self
                .threshold
                .current_threshold()
                .await
                .map_err(|error| WorkflowError::Storage(error.0))?,
            _ => default_threshold(),
        };

        let outcome = apply_transition(&request, actor, &action, threshold)?;

        let now = Utc::now();
        let mut updated = request.clone();
        updated.status = outcome.to;
        updated.version = request.version + 1;
        updated.updated_at = now;
        if outcome.to == RequestStatus::Completed {
            updated.completed_at = Some(now);
        }

        let approval = WorkflowApproval {
            id: ApprovalId(Uuid::new_v4().to_string()),
            request_id: request.id.clone(),
            stage: outcome.from.stage(),
            actor_id: actor.id.clone(),
            actor_role: actor.role,
            action: outcome.action,
            comments: outcome.comments.clone(),
            payload: outcome.payload.clone(),
            created_at: now,
        };

        match self.store.commit_transition(&updated, request.version, &approval).await {
            Ok(()) => {}
            Err(CommitError::VersionConflict) => {
                return Err(WorkflowError::InvalidState {
                    status: request.status,
                    action: outcome.action,
                    detail: "the request was modified concurrently; re-fetch its current state"
                        .to_string(),
                });
            }
            Err(CommitError::Storage(error)) => return Err(WorkflowError::Storage(error.0)),
        }

        self.notifier.dispatch(Notification {
            request_id: updated.id.clone(),
            request_code: updated.request_code.clone(),
            event: outcome.event.to_string(),
            recipients: audience(outcome.event, outcome.to, &updated),
        });

        Ok(updated)
    }
}

fn request_code(id: Uuid, created_at: DateTime<Utc>) -> String {
    use chrono::Datelike;
    let hex = id.simple().to_string();
    format!("PR-{}-{}", created_at.year(), hex[..8].to_ascii_uppercase())
}

fn require_field(field: &str, value: &str) -> Result<(), WorkflowError> {
    if value.trim().is_empty() {
        Err(WorkflowError::validation(field, "must not be empty"))
    } else {
        Ok(())
    }
}
