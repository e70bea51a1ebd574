use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Row;

use reqflow_core::directory::{ManagerAssignment, ManagerDirectory};
use reqflow_core::domain::actor::ActorId;
use reqflow_core::policy::{default_threshold, ThresholdPolicy};
use reqflow_core::store::StorageError;

use super::RepositoryError;
use crate::DbPool;

/// Threshold read from the singleton configuration row, falling back to
/// the built-in default until an administrator stores one.
pub struct SqlThresholdPolicy {
    pool: DbPool,
}

impl SqlThresholdPolicy {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Administrative write path; not part of the engine surface.
    pub async fn set(&self, amount: Decimal) -> Result<(), RepositoryError> {
        if amount <= Decimal::ZERO {
            return Err(RepositoryError::Decode(format!(
                "threshold must be positive, got `{amount}`"
            )));
        }
        sqlx::query(
            "INSERT INTO approval_thresholds (id, amount, updated_at) VALUES (1, ?, ?)
             ON CONFLICT(id) DO UPDATE SET amount = excluded.amount,
                                           updated_at = excluded.updated_at",
        )
        .bind(amount.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ThresholdPolicy for SqlThresholdPolicy {
    async fn current_threshold(&self) -> Result<Decimal, StorageError> {
        let row = sqlx::query("SELECT amount FROM approval_thresholds WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::Database)?;

        let Some(row) = row else {
            return Ok(default_threshold());
        };

        let raw: String =
            row.try_get("amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        raw.parse::<Decimal>().map_err(|error| {
            StorageError::from(RepositoryError::Decode(format!(
                "invalid stored threshold `{raw}`: {error}"
            )))
        })
    }
}

pub struct SqlManagerDirectory {
    pool: DbPool,
}

impl SqlManagerDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Directory-management write path; not part of the engine surface.
    pub async fn upsert(&self, assignment: &ManagerAssignment) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO manager_assignments (manager_id, name, department, active, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(manager_id) DO UPDATE SET
                 name = excluded.name,
                 department = excluded.department,
                 active = excluded.active,
                 updated_at = excluded.updated_at",
        )
        .bind(&assignment.manager_id.0)
        .bind(&assignment.name)
        .bind(&assignment.department)
        .bind(i64::from(assignment.active))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ManagerDirectory for SqlManagerDirectory {
    async fn resolve_manager(
        &self,
        manager_id: &ActorId,
    ) -> Result<Option<ManagerAssignment>, StorageError> {
        let row = sqlx::query(
            "SELECT manager_id, name, department, active
             FROM manager_assignments WHERE manager_id = ? AND active = 1",
        )
        .bind(&manager_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let manager_id: String =
            row.try_get("manager_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let name: String =
            row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let department: String =
            row.try_get("department").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let active: i64 =
            row.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        Ok(Some(ManagerAssignment {
            manager_id: ActorId(manager_id),
            name,
            department,
            active: active != 0,
        }))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use reqflow_core::directory::{ManagerAssignment, ManagerDirectory};
    use reqflow_core::domain::actor::ActorId;
    use reqflow_core::policy::{default_threshold, ThresholdPolicy};

    use super::{SqlManagerDirectory, SqlThresholdPolicy};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn threshold_defaults_until_configured() {
        let pool = setup().await;
        let policy = SqlThresholdPolicy::new(pool);

        assert_eq!(policy.current_threshold().await.expect("read"), default_threshold());

        policy.set(Decimal::from(750_000u64)).await.expect("set");
        assert_eq!(
            policy.current_threshold().await.expect("read"),
            Decimal::from(750_000u64)
        );

        // Second write overwrites the singleton row.
        policy.set(Decimal::from(1_250_000u64)).await.expect("set again");
        assert_eq!(
            policy.current_threshold().await.expect("read"),
            Decimal::from(1_250_000u64)
        );
    }

    #[tokio::test]
    async fn non_positive_threshold_is_refused() {
        let pool = setup().await;
        let policy = SqlThresholdPolicy::new(pool);
        assert!(policy.set(Decimal::ZERO).await.is_err());
    }

    #[tokio::test]
    async fn directory_resolves_only_active_managers() {
        let pool = setup().await;
        let directory = SqlManagerDirectory::new(pool);

        directory
            .upsert(&ManagerAssignment {
                manager_id: ActorId("u-manager".to_string()),
                name: "Dian Wahyudi".to_string(),
                department: "engineering".to_string(),
                active: true,
            })
            .await
            .expect("upsert");

        let found = directory
            .resolve_manager(&ActorId("u-manager".to_string()))
            .await
            .expect("lookup");
        assert!(found.is_some());

        directory
            .upsert(&ManagerAssignment {
                manager_id: ActorId("u-manager".to_string()),
                name: "Dian Wahyudi".to_string(),
                department: "engineering".to_string(),
                active: false,
            })
            .await
            .expect("deactivate");

        let gone = directory
            .resolve_manager(&ActorId("u-manager".to_string()))
            .await
            .expect("lookup");
        assert!(gone.is_none());
    }
}
