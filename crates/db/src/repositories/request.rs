use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use reqflow_core::domain::actor::{ActorId, Role};
use reqflow_core::domain::approval::{ApprovalAction, ApprovalId, ApprovalPayload, WorkflowApproval};
use reqflow_core::domain::request::{
    Priority, PurchaseRequest, RequestId, RequestStatus, Requester, Stage,
};
use reqflow_core::store::{CommitError, StorageError, WorkflowStore};

use super::RepositoryError;
use crate::DbPool;

pub(crate) const REQUEST_COLUMNS: &str = "id, request_code, requester_id, requester_name, \
     requester_email, requester_department, description, amount, currency, vendor_name, \
     vendor_bank_details, priority, approving_manager_id, status, document_ref, notes, version, \
     created_at, updated_at, completed_at";

pub struct SqlWorkflowStore {
    pool: DbPool,
}

impl SqlWorkflowStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_amount(raw: &str) -> Result<Decimal, RepositoryError> {
    raw.parse::<Decimal>()
        .map_err(|error| RepositoryError::Decode(format!("invalid amount `{raw}`: {error}")))
}

pub(crate) fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<PurchaseRequest, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_code: String =
        row.try_get("request_code").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_id: String =
        row.try_get("requester_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_name: String =
        row.try_get("requester_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_email: String =
        row.try_get("requester_email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_department: String =
        row.try_get("requester_department").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let amount_str: String =
        row.try_get("amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let currency: String =
        row.try_get("currency").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let vendor_name: String =
        row.try_get("vendor_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let vendor_bank_details: Option<String> =
        row.try_get("vendor_bank_details").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let priority_str: String =
        row.try_get("priority").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approving_manager_id: String =
        row.try_get("approving_manager_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let document_ref: Option<String> =
        row.try_get("document_ref").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let notes: Option<String> =
        row.try_get("notes").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let version: i64 =
        row.try_get("version").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let completed_at_str: Option<String> =
        row.try_get("completed_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let status = RequestStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown status `{status_str}`")))?;
    let priority = Priority::parse(&priority_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown priority `{priority_str}`")))?;

    Ok(PurchaseRequest {
        id: RequestId(id),
        request_code,
        requester: Requester {
            id: ActorId(requester_id),
            name: requester_name,
            email: requester_email,
            department: requester_department,
        },
        description,
        amount: parse_amount(&amount_str)?,
        currency,
        vendor_name,
        vendor_bank_details,
        priority,
        approving_manager_id: ActorId(approving_manager_id),
        status,
        document_ref,
        notes,
        version,
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
        completed_at: completed_at_str.as_deref().map(parse_timestamp),
    })
}

fn row_to_approval(row: &sqlx::sqlite::SqliteRow) -> Result<WorkflowApproval, RepositoryError> {
    let approval_id: String =
        row.try_get("approval_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_id: String =
        row.try_get("request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let stage_str: String =
        row.try_get("stage").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let actor_id: String =
        row.try_get("actor_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let actor_role_str: String =
        row.try_get("actor_role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let action_str: String =
        row.try_get("action").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comments: Option<String> =
        row.try_get("comments").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let payload_json: String =
        row.try_get("payload_json").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let stage = Stage::parse(&stage_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown stage `{stage_str}`")))?;
    let actor_role = Role::parse(&actor_role_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown role `{actor_role_str}`")))?;
    let action = ApprovalAction::parse(&action_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown action `{action_str}`")))?;

    Ok(WorkflowApproval {
        id: ApprovalId(approval_id),
        request_id: RequestId(request_id),
        stage,
        actor_id: ActorId(actor_id),
        actor_role,
        action,
        comments,
        payload: ApprovalPayload::from_json(&payload_json),
        created_at: parse_timestamp(&created_at_str),
    })
}

#[async_trait]
impl WorkflowStore for SqlWorkflowStore {
    async fn fetch(&self, id: &RequestId) -> Result<Option<PurchaseRequest>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM purchase_requests WHERE id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::Database)?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, request: &PurchaseRequest) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO purchase_requests (id, request_code, requester_id, requester_name,
                 requester_email, requester_department, description, amount, currency,
                 vendor_name, vendor_bank_details, priority, approving_manager_id, status,
                 document_ref, notes, version, created_at, updated_at, completed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.request_code)
        .bind(&request.requester.id.0)
        .bind(&request.requester.name)
        .bind(&request.requester.email)
        .bind(&request.requester.department)
        .bind(&request.description)
        .bind(request.amount.to_string())
        .bind(&request.currency)
        .bind(&request.vendor_name)
        .bind(&request.vendor_bank_details)
        .bind(request.priority.as_str())
        .bind(&request.approving_manager_id.0)
        .bind(request.status.as_str())
        .bind(&request.document_ref)
        .bind(&request.notes)
        .bind(request.version)
        .bind(request.created_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .bind(request.completed_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::Database)?;

        Ok(())
    }

    async fn commit_transition(
        &self,
        request: &PurchaseRequest,
        expected_version: i64,
        approval: &WorkflowApproval,
    ) -> Result<(), CommitError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|error| StorageError::new(error.to_string()))?;

        // Conditional write: only the writer holding the version it read
        // gets to move the request. A stale writer touches zero rows and
        // the whole transaction is abandoned, audit row included.
        let updated = sqlx::query(
            "UPDATE purchase_requests
             SET status = ?, version = ?, updated_at = ?, completed_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(request.status.as_str())
        .bind(request.version)
        .bind(request.updated_at.to_rfc3339())
        .bind(request.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(&request.id.0)
        .bind(expected_version)
        .execute(&mut *tx)
        .await
        .map_err(|error| StorageError::new(error.to_string()))?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(|error| StorageError::new(error.to_string()))?;
            return Err(CommitError::VersionConflict);
        }

        sqlx::query(
            "INSERT INTO workflow_approvals (approval_id, request_id, stage, actor_id,
                 actor_role, action, comments, payload_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&approval.id.0)
        .bind(&approval.request_id.0)
        .bind(approval.stage.as_str())
        .bind(&approval.actor_id.0)
        .bind(approval.actor_role.as_str())
        .bind(approval.action.as_str())
        .bind(&approval.comments)
        .bind(approval.payload.to_json())
        .bind(approval.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|error| StorageError::new(error.to_string()))?;

        tx.commit().await.map_err(|error| StorageError::new(error.to_string()))?;
        Ok(())
    }

    async fn history(&self, id: &RequestId) -> Result<Vec<WorkflowApproval>, StorageError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT approval_id, request_id, stage, actor_id, actor_role, action, comments,
                    payload_json, created_at
             FROM workflow_approvals WHERE request_id = ? ORDER BY id ASC",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::Database)?;

        rows.iter()
            .map(|row| row_to_approval(row).map_err(StorageError::from))
            .collect::<Result<Vec<_>, _>>()
    }
}
