use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use reqflow_core::store::RequestQueries;
use reqflow_core::{
    Actor, ActorId, InterfaceError, NewRequest, Priority, PurchaseRequest, RequestId, Requester,
    Role, Stage, StageFilters, WorkflowApproval, WorkflowError, WorkflowService,
};
use reqflow_db::{SqlManagerDirectory, SqlRequestQueries, SqlThresholdPolicy, SqlWorkflowStore};

use crate::notify::TracingDispatcher;

pub type AppService =
    WorkflowService<SqlWorkflowStore, SqlThresholdPolicy, SqlManagerDirectory, TracingDispatcher>;

pub struct AppState {
    pub service: AppService,
    pub queries: SqlRequestQueries,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/requests", post(create_request).get(list_requests))
        .route("/requests/{id}", get(get_request))
        .route("/requests/{id}/history", get(get_history))
        .route("/requests/{id}/manager/approve", post(manager_approve))
        .route("/requests/{id}/manager/reject", post(manager_reject))
        .route("/requests/{id}/procurement/approve", post(procurement_approve))
        .route("/requests/{id}/procurement/reject", post(procurement_reject))
        .route("/requests/{id}/procurement/request-alternative", post(request_alternative))
        .route("/requests/{id}/finance/approve", post(finance_approve))
        .route("/requests/{id}/finance/reject", post(finance_reject))
        .route("/requests/{id}/payment/letter", post(submit_payment_letter))
        .route("/requests/{id}/payment/confirm", post(confirm_payment))
        .route("/requests/{id}/delivery/confirm", post(confirm_delivery))
        .route("/requests/{id}/cancel", post(cancel_request))
        .route("/dashboard", get(dashboard))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct RequesterBody {
    id: String,
    name: String,
    email: String,
    department: String,
}

#[derive(Debug, Deserialize)]
struct CreateRequestBody {
    requester: RequesterBody,
    description: String,
    amount: Decimal,
    currency: String,
    vendor_name: String,
    vendor_bank_details: Option<String>,
    priority: String,
    approving_manager_id: String,
    document_ref: Option<String>,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActorBody {
    actor_id: String,
    actor_name: Option<String>,
    role: String,
}

impl ActorBody {
    fn to_actor(&self) -> Result<Actor, WorkflowError> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| WorkflowError::validation("role", "unknown workflow role"))?;
        Ok(Actor::new(
            self.actor_id.clone(),
            self.actor_name.clone().unwrap_or_default(),
            role,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct CommentBody {
    #[serde(flatten)]
    actor: ActorBody,
    comments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RejectBody {
    #[serde(flatten)]
    actor: ActorBody,
    comments: String,
}

#[derive(Debug, Deserialize)]
struct ProcurementApproveBody {
    #[serde(flatten)]
    actor: ActorBody,
    comments: Option<String>,
    vendor_verification: String,
}

#[derive(Debug, Deserialize)]
struct AlternativeVendorBody {
    #[serde(flatten)]
    actor: ActorBody,
    comments: Option<String>,
    alternative_vendor: String,
}

#[derive(Debug, Deserialize)]
struct FinanceApproveBody {
    #[serde(flatten)]
    actor: ActorBody,
    comments: Option<String>,
    budget_code: String,
    payment_method: String,
}

#[derive(Debug, Deserialize)]
struct PaymentLetterBody {
    #[serde(flatten)]
    actor: ActorBody,
    letterhead_ref: String,
    document_template: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfirmPaymentBody {
    #[serde(flatten)]
    actor: ActorBody,
    payment_reference: String,
    transaction_id: Option<String>,
    payment_date: Option<DateTime<Utc>>,
    payment_method: Option<String>,
    comments: Option<String>,
}

#[derive(Debug, Serialize)]
struct RequesterView {
    id: String,
    name: String,
    email: String,
    department: String,
}

#[derive(Debug, Serialize)]
struct RequestView {
    id: String,
    request_code: String,
    status: &'static str,
    stage: &'static str,
    priority: &'static str,
    amount: String,
    currency: String,
    description: String,
    vendor_name: String,
    vendor_bank_details: Option<String>,
    requester: RequesterView,
    approving_manager_id: String,
    document_ref: Option<String>,
    notes: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl RequestView {
    fn from_domain(request: &PurchaseRequest) -> Self {
        Self {
            id: request.id.0.clone(),
            request_code: request.request_code.clone(),
            status: request.status.as_str(),
            stage: request.stage().as_str(),
            priority: request.priority.as_str(),
            amount: request.amount.to_string(),
            currency: request.currency.clone(),
            description: request.description.clone(),
            vendor_name: request.vendor_name.clone(),
            vendor_bank_details: request.vendor_bank_details.clone(),
            requester: RequesterView {
                id: request.requester.id.0.clone(),
                name: request.requester.name.clone(),
                email: request.requester.email.clone(),
                department: request.requester.department.clone(),
            },
            approving_manager_id: request.approving_manager_id.0.clone(),
            document_ref: request.document_ref.clone(),
            notes: request.notes.clone(),
            version: request.version,
            created_at: request.created_at.to_rfc3339(),
            updated_at: request.updated_at.to_rfc3339(),
            completed_at: request.completed_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ApprovalView {
    approval_id: String,
    stage: &'static str,
    actor_id: String,
    actor_role: &'static str,
    action: &'static str,
    comments: Option<String>,
    payload: serde_json::Value,
    created_at: String,
}

impl ApprovalView {
    fn from_domain(approval: &WorkflowApproval) -> Self {
        Self {
            approval_id: approval.id.0.clone(),
            stage: approval.stage.as_str(),
            actor_id: approval.actor_id.0.clone(),
            actor_role: approval.actor_role.as_str(),
            action: approval.action.as_str(),
            comments: approval.comments.clone(),
            payload: serde_json::from_str(&approval.payload.to_json())
                .unwrap_or(serde_json::Value::Null),
            created_at: approval.created_at.to_rfc3339(),
        }
    }
}

fn error_response(error: WorkflowError) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    warn!(
        event_name = "api.workflow_operation_failed",
        correlation_id = %correlation_id,
        error = %error,
        "workflow operation rejected"
    );

    let interface = error.into_interface(correlation_id);
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
    };

    let body = serde_json::json!({
        "error": status.canonical_reason().unwrap_or("error"),
        "message": interface.user_message(),
        "correlation_id": interface.correlation_id(),
    });
    (status, Json(body)).into_response()
}

fn request_response(status: StatusCode, request: &PurchaseRequest) -> Response {
    (status, Json(RequestView::from_domain(request))).into_response()
}

fn transition_result(result: Result<PurchaseRequest, WorkflowError>) -> Response {
    match result {
        Ok(request) => request_response(StatusCode::OK, &request),
        Err(error) => error_response(error),
    }
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRequestBody>,
) -> Response {
    let Some(priority) = Priority::parse(&body.priority) else {
        return error_response(WorkflowError::validation(
            "priority",
            "expected low|medium|high|urgent",
        ));
    };

    let result = state
        .service
        .create(NewRequest {
            requester: Requester {
                id: ActorId(body.requester.id),
                name: body.requester.name,
                email: body.requester.email,
                department: body.requester.department,
            },
            description: body.description,
            amount: body.amount,
            currency: body.currency,
            vendor_name: body.vendor_name,
            vendor_bank_details: body.vendor_bank_details,
            priority,
            approving_manager_id: ActorId(body.approving_manager_id),
            document_ref: body.document_ref,
            notes: body.notes,
        })
        .await;

    match result {
        Ok(request) => request_response(StatusCode::CREATED, &request),
        Err(error) => error_response(error),
    }
}

async fn get_request(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    transition_result(state.service.get(&RequestId(id)).await)
}

async fn get_history(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.service.history(&RequestId(id)).await {
        Ok(history) => {
            let views: Vec<ApprovalView> = history.iter().map(ApprovalView::from_domain).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    stage: Option<String>,
    role: Option<String>,
    requester: Option<String>,
    priority: Option<String>,
    department: Option<String>,
}

async fn list_requests(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Response {
    let result = if let Some(role_str) = &query.role {
        match Role::parse(role_str) {
            Some(role) => state.queries.find_pending_for_role(role).await,
            None => {
                return error_response(WorkflowError::validation("role", "unknown workflow role"))
            }
        }
    } else if let Some(stage_str) = &query.stage {
        let Some(stage) = Stage::parse(stage_str) else {
            return error_response(WorkflowError::validation("stage", "unknown workflow stage"));
        };
        let priority = match &query.priority {
            Some(raw) => match Priority::parse(raw) {
                Some(priority) => Some(priority),
                None => {
                    return error_response(WorkflowError::validation(
                        "priority",
                        "expected low|medium|high|urgent",
                    ))
                }
            },
            None => None,
        };
        state
            .queries
            .find_by_stage(stage, StageFilters { priority, department: query.department.clone() })
            .await
    } else if let Some(requester) = &query.requester {
        state.queries.find_by_requester(&ActorId(requester.clone())).await
    } else {
        return error_response(WorkflowError::validation(
            "query",
            "one of `stage`, `role`, or `requester` is required",
        ));
    };

    match result {
        Ok(requests) => {
            let views: Vec<RequestView> = requests.iter().map(RequestView::from_domain).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => error_response(WorkflowError::Storage(error.0)),
    }
}

async fn dashboard(State(state): State<Arc<AppState>>) -> Response {
    match state.queries.dashboard_stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(error) => error_response(WorkflowError::Storage(error.0)),
    }
}

async fn manager_approve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CommentBody>,
) -> Response {
    let actor = match body.actor.to_actor() {
        Ok(actor) => actor,
        Err(error) => return error_response(error),
    };
    transition_result(
        state.service.approve_manager_stage(&RequestId(id), &actor, body.comments).await,
    )
}

async fn manager_reject(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RejectBody>,
) -> Response {
    let actor = match body.actor.to_actor() {
        Ok(actor) => actor,
        Err(error) => return error_response(error),
    };
    transition_result(
        state.service.reject_manager_stage(&RequestId(id), &actor, body.comments).await,
    )
}

async fn procurement_approve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ProcurementApproveBody>,
) -> Response {
    let actor = match body.actor.to_actor() {
        Ok(actor) => actor,
        Err(error) => return error_response(error),
    };
    transition_result(
        state
            .service
            .approve_procurement(&RequestId(id), &actor, body.comments, body.vendor_verification)
            .await,
    )
}

async fn procurement_reject(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RejectBody>,
) -> Response {
    let actor = match body.actor.to_actor() {
        Ok(actor) => actor,
        Err(error) => return error_response(error),
    };
    transition_result(state.service.reject_procurement(&RequestId(id), &actor, body.comments).await)
}

async fn request_alternative(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AlternativeVendorBody>,
) -> Response {
    let actor = match body.actor.to_actor() {
        Ok(actor) => actor,
        Err(error) => return error_response(error),
    };
    transition_result(
        state
            .service
            .request_alternative_vendor(
                &RequestId(id),
                &actor,
                body.comments,
                body.alternative_vendor,
            )
            .await,
    )
}

async fn finance_approve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<FinanceApproveBody>,
) -> Response {
    let actor = match body.actor.to_actor() {
        Ok(actor) => actor,
        Err(error) => return error_response(error),
    };
    transition_result(
        state
            .service
            .approve_finance(
                &RequestId(id),
                &actor,
                body.comments,
                body.budget_code,
                body.payment_method,
            )
            .await,
    )
}

async fn finance_reject(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RejectBody>,
) -> Response {
    let actor = match body.actor.to_actor() {
        Ok(actor) => actor,
        Err(error) => return error_response(error),
    };
    transition_result(state.service.reject_finance(&RequestId(id), &actor, body.comments).await)
}

async fn submit_payment_letter(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<PaymentLetterBody>,
) -> Response {
    let actor = match body.actor.to_actor() {
        Ok(actor) => actor,
        Err(error) => return error_response(error),
    };
    transition_result(
        state
            .service
            .submit_payment_letter(&RequestId(id), &actor, body.letterhead_ref, body.document_template)
            .await,
    )
}

async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ConfirmPaymentBody>,
) -> Response {
    let actor = match body.actor.to_actor() {
        Ok(actor) => actor,
        Err(error) => return error_response(error),
    };
    transition_result(
        state
            .service
            .confirm_payment(
                &RequestId(id),
                &actor,
                body.payment_reference,
                body.transaction_id,
                body.payment_date,
                body.payment_method,
                body.comments,
            )
            .await,
    )
}

async fn confirm_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CommentBody>,
) -> Response {
    let actor = match body.actor.to_actor() {
        Ok(actor) => actor,
        Err(error) => return error_response(error),
    };
    transition_result(state.service.confirm_delivery(&RequestId(id), &actor, body.comments).await)
}

async fn cancel_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CommentBody>,
) -> Response {
    let actor = match body.actor.to_actor() {
        Ok(actor) => actor,
        Err(error) => return error_response(error),
    };
    transition_result(state.service.cancel(&RequestId(id), &actor, body.comments).await)
}
