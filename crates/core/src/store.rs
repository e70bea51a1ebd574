use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::actor::{ActorId, Role};
use crate::domain::approval::WorkflowApproval;
use crate::domain::request::{Priority, PurchaseRequest, RequestId, RequestStatus, Stage};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("storage failure: {0}")]
pub struct StorageError(pub String);

impl StorageError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

/// Failure modes of the atomic transition commit. A version conflict means
/// the precondition read went stale before the write; the caller treats it
/// like any other invalid-state outcome and re-fetches.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommitError {
    #[error("the request was modified concurrently")]
    VersionConflict,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Persistence port for the workflow engine. `commit_transition` is the
/// only write path after creation: it persists the new request state and
/// appends the audit row together, or not at all.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn fetch(&self, id: &RequestId) -> Result<Option<PurchaseRequest>, StorageError>;

    async fn insert(&self, request: &PurchaseRequest) -> Result<(), StorageError>;

    /// Conditional write keyed on `expected_version`: succeeds only if the
    /// stored request still carries that version, bumping it alongside the
    /// state change and the audit append.
    async fn commit_transition(
        &self,
        request: &PurchaseRequest,
        expected_version: i64,
        approval: &WorkflowApproval,
    ) -> Result<(), CommitError>;

    /// Ordered, replayable audit history for one request.
    async fn history(&self, id: &RequestId) -> Result<Vec<WorkflowApproval>, StorageError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFilters {
    pub priority: Option<Priority>,
    pub department: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_requests: i64,
    pub by_status: BTreeMap<String, i64>,
    pub open_amount: Decimal,
    pub completed_amount: Decimal,
}

/// Statuses a role's work queue is built from. Requesters and admins have
/// no queue of their own; they follow their requests directly.
pub fn statuses_awaiting(role: Role) -> &'static [RequestStatus] {
    match role {
        Role::Manager => &[RequestStatus::PendingApproval],
        Role::Procurement => &[RequestStatus::PendingProcurementReview],
        Role::Finance => &[
            RequestStatus::PendingFinanceApproval,
            RequestStatus::PaymentInProgress,
            RequestStatus::AwaitingPaymentConfirmation,
        ],
        Role::Operations => &[RequestStatus::AwaitingDeliveryConfirmation],
        Role::Requester | Role::Admin => &[],
    }
}

/// Read-side projections over committed request state.
#[async_trait]
pub trait RequestQueries: Send + Sync {
    async fn find_by_stage(
        &self,
        stage: Stage,
        filters: StageFilters,
    ) -> Result<Vec<PurchaseRequest>, StorageError>;

    async fn find_pending_for_role(&self, role: Role)
        -> Result<Vec<PurchaseRequest>, StorageError>;

    async fn find_by_requester(
        &self,
        requester_id: &ActorId,
    ) -> Result<Vec<PurchaseRequest>, StorageError>;

    async fn dashboard_stats(&self) -> Result<DashboardStats, StorageError>;
}

#[derive(Debug, Default)]
struct InMemoryState {
    requests: BTreeMap<String, PurchaseRequest>,
    approvals: Vec<WorkflowApproval>,
}

/// Mutex-serialized store used by engine and service tests. The single
/// lock gives the same first-writer-wins behavior the SQL store gets
/// from its conditional UPDATE.
#[derive(Clone, Default)]
pub struct InMemoryWorkflowStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn approvals(&self) -> Vec<WorkflowApproval> {
        self.lock().approvals.clone()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn fetch(&self, id: &RequestId) -> Result<Option<PurchaseRequest>, StorageError> {
        Ok(self.lock().requests.get(&id.0).cloned())
    }

    async fn insert(&self, request: &PurchaseRequest) -> Result<(), StorageError> {
        let mut state = self.lock();
        if state.requests.contains_key(&request.id.0) {
            return Err(StorageError::new(format!("request `{}` already exists", request.id)));
        }
        state.requests.insert(request.id.0.clone(), request.clone());
        Ok(())
    }

    async fn commit_transition(
        &self,
        request: &PurchaseRequest,
        expected_version: i64,
        approval: &WorkflowApproval,
    ) -> Result<(), CommitError> {
        let mut state = self.lock();
        let stored = state
            .requests
            .get(&request.id.0)
            .ok_or_else(|| StorageError::new(format!("request `{}` vanished", request.id)))?;
        if stored.version != expected_version {
            return Err(CommitError::VersionConflict);
        }
        state.requests.insert(request.id.0.clone(), request.clone());
        state.approvals.push(approval.clone());
        Ok(())
    }

    async fn history(&self, id: &RequestId) -> Result<Vec<WorkflowApproval>, StorageError> {
        let state = self.lock();
        Ok(state
            .approvals
            .iter()
            .filter(|approval| approval.request_id == *id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RequestQueries for InMemoryWorkflowStore {
    async fn find_by_stage(
        &self,
        stage: Stage,
        filters: StageFilters,
    ) -> Result<Vec<PurchaseRequest>, StorageError> {
        let state = self.lock();
        Ok(state
            .requests
            .values()
            .filter(|request| request.stage() == stage)
            .filter(|request| {
                filters.priority.map_or(true, |priority| request.priority == priority)
            })
            .filter(|request| {
                filters
                    .department
                    .as_deref()
                    .map_or(true, |department| request.requester.department == department)
            })
            .cloned()
            .collect())
    }

    async fn find_pending_for_role(
        &self,
        role: Role,
    ) -> Result<Vec<PurchaseRequest>, StorageError> {
        let wanted = statuses_awaiting(role);
        let state = self.lock();
        Ok(state
            .requests
            .values()
            .filter(|request| wanted.contains(&request.status))
            .cloned()
            .collect())
    }

    async fn find_by_requester(
        &self,
        requester_id: &ActorId,
    ) -> Result<Vec<PurchaseRequest>, StorageError> {
        let state = self.lock();
        Ok(state
            .requests
            .values()
            .filter(|request| request.requester.id == *requester_id)
            .cloned()
            .collect())
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, StorageError> {
        let state = self.lock();
        let mut by_status: BTreeMap<String, i64> = BTreeMap::new();
        let mut open_amount = Decimal::ZERO;
        let mut completed_amount = Decimal::ZERO;

        for request in state.requests.values() {
            *by_status.entry(request.status.as_str().to_string()).or_insert(0) += 1;
            match request.status {
                RequestStatus::Completed => completed_amount += request.amount,
                status if !status.is_terminal() => open_amount += request.amount,
                _ => {}
            }
        }

        Ok(DashboardStats {
            total_requests: state.requests.len() as i64,
            by_status,
            open_amount,
            completed_amount,
        })
    }
}
