use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::Row;

use reqflow_core::domain::actor::{ActorId, Role};
use reqflow_core::domain::request::{PurchaseRequest, RequestStatus, Stage};
use reqflow_core::store::{
    statuses_awaiting, DashboardStats, RequestQueries, StageFilters, StorageError,
};

use super::request::{row_to_request, REQUEST_COLUMNS};
use super::RepositoryError;
use crate::DbPool;

/// Read-side projections over committed purchase-request rows.
pub struct SqlRequestQueries {
    pool: DbPool,
}

impl SqlRequestQueries {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn by_statuses(
        &self,
        statuses: &[RequestStatus],
        filters: &StageFilters,
        order: &str,
    ) -> Result<Vec<PurchaseRequest>, StorageError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let mut sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM purchase_requests WHERE status IN ({placeholders})"
        );
        if filters.priority.is_some() {
            sql.push_str(" AND priority = ?");
        }
        if filters.department.is_some() {
            sql.push_str(" AND requester_department = ?");
        }
        sql.push_str(order);

        let mut query = sqlx::query(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        if let Some(priority) = filters.priority {
            query = query.bind(priority.as_str());
        }
        if let Some(department) = &filters.department {
            query = query.bind(department.clone());
        }

        let rows = query.fetch_all(&self.pool).await.map_err(RepositoryError::Database)?;
        rows.iter()
            .map(|row| row_to_request(row).map_err(StorageError::from))
            .collect::<Result<Vec<_>, _>>()
    }
}

#[async_trait]
impl RequestQueries for SqlRequestQueries {
    async fn find_by_stage(
        &self,
        stage: Stage,
        filters: StageFilters,
    ) -> Result<Vec<PurchaseRequest>, StorageError> {
        self.by_statuses(stage.statuses(), &filters, " ORDER BY created_at ASC").await
    }

    async fn find_pending_for_role(
        &self,
        role: Role,
    ) -> Result<Vec<PurchaseRequest>, StorageError> {
        self.by_statuses(statuses_awaiting(role), &StageFilters::default(), " ORDER BY created_at ASC")
            .await
    }

    async fn find_by_requester(
        &self,
        requester_id: &ActorId,
    ) -> Result<Vec<PurchaseRequest>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM purchase_requests
             WHERE requester_id = ? ORDER BY created_at DESC"
        ))
        .bind(&requester_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::Database)?;

        rows.iter()
            .map(|row| row_to_request(row).map_err(StorageError::from))
            .collect::<Result<Vec<_>, _>>()
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, StorageError> {
        let rows = sqlx::query("SELECT status, amount FROM purchase_requests")
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::Database)?;

        let mut by_status: BTreeMap<String, i64> = BTreeMap::new();
        let mut open_amount = Decimal::ZERO;
        let mut completed_amount = Decimal::ZERO;

        for row in &rows {
            let status_str: String =
                row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let amount_str: String =
                row.try_get("amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let status = RequestStatus::parse(&status_str).ok_or_else(|| {
                StorageError::from(RepositoryError::Decode(format!(
                    "unknown status `{status_str}`"
                )))
            })?;
            let amount: Decimal = amount_str.parse().map_err(|_| {
                StorageError::from(RepositoryError::Decode(format!(
                    "invalid amount `{amount_str}`"
                )))
            })?;

            *by_status.entry(status.as_str().to_string()).or_insert(0) += 1;
            match status {
                RequestStatus::Completed => completed_amount += amount,
                status if !status.is_terminal() => open_amount += amount,
                _ => {}
            }
        }

        Ok(DashboardStats {
            total_requests: rows.len() as i64,
            by_status,
            open_amount,
            completed_amount,
        })
    }
}
