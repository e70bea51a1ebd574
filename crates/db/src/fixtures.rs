use sqlx::Row;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Expected end-state of one seeded request, used to verify a seeded
/// database matches the fixture contract.
struct SeedRequestContract {
    request_id: &'static str,
    status: &'static str,
    version: i64,
    approval_count: i64,
    description: &'static str,
}

const SEED_REQUESTS: &[SeedRequestContract] = &[
    SeedRequestContract {
        request_id: "seed-req-001",
        status: "pending_approval",
        version: 1,
        approval_count: 0,
        description: "Fresh submission awaiting the assigned manager",
    },
    SeedRequestContract {
        request_id: "seed-req-002",
        status: "pending_procurement_review",
        version: 2,
        approval_count: 1,
        description: "Above-threshold request routed to procurement",
    },
    SeedRequestContract {
        request_id: "seed-req-003",
        status: "pending_finance_approval",
        version: 2,
        approval_count: 1,
        description: "Below-threshold request that skipped procurement",
    },
    SeedRequestContract {
        request_id: "seed-req-004",
        status: "completed",
        version: 7,
        approval_count: 6,
        description: "Fully traversed request with complete audit history",
    },
];

const SEED_MANAGER_IDS: &[&str] = &["mgr-dian", "mgr-eko", "mgr-sari"];

const SEED_SQL: &str = r#"
INSERT INTO manager_assignments (manager_id, name, department, active, updated_at) VALUES
    ('mgr-dian', 'Dian Wahyudi', 'engineering', 1, '2026-01-05T08:00:00+00:00'),
    ('mgr-eko', 'Eko Putra', 'operations', 1, '2026-01-05T08:00:00+00:00'),
    ('mgr-sari', 'Sari Dewi', 'finance', 1, '2026-01-05T08:00:00+00:00');

INSERT INTO approval_thresholds (id, amount, updated_at)
    VALUES (1, '1000000', '2026-01-05T08:00:00+00:00');

INSERT INTO purchase_requests (id, request_code, requester_id, requester_name, requester_email,
    requester_department, description, amount, currency, vendor_name, vendor_bank_details,
    priority, approving_manager_id, status, document_ref, notes, version, created_at,
    updated_at, completed_at) VALUES
    ('seed-req-001', 'PR-2026-SEED0001', 'u-asha', 'Asha Okafor', 'asha@example.test',
     'engineering', 'Fifteen ergonomic chairs', '450000', 'IDR', 'Mebel Jaya',
     'BCA 123-456', 'medium', 'mgr-dian', 'pending_approval', NULL, NULL, 1,
     '2026-01-10T09:00:00+00:00', '2026-01-10T09:00:00+00:00', NULL),
    ('seed-req-002', 'PR-2026-SEED0002', 'u-badu', 'Badu Santoso', 'badu@example.test',
     'operations', 'Forklift maintenance contract', '2500000', 'IDR', 'TechLift Service',
     NULL, 'high', 'mgr-eko', 'pending_procurement_review', NULL, NULL, 2,
     '2026-01-11T10:00:00+00:00', '2026-01-11T11:30:00+00:00', NULL),
    ('seed-req-003', 'PR-2026-SEED0003', 'u-citra', 'Citra Lestari', 'citra@example.test',
     'finance', 'Accounting software licenses', '300000', 'IDR', 'SoftHouse',
     NULL, 'low', 'mgr-sari', 'pending_finance_approval', NULL, NULL, 2,
     '2026-01-12T08:15:00+00:00', '2026-01-12T09:00:00+00:00', NULL),
    ('seed-req-004', 'PR-2026-SEED0004', 'u-asha', 'Asha Okafor', 'asha@example.test',
     'engineering', 'Workstation replacements', '1800000', 'IDR', 'Laptop World',
     'Mandiri 987-654', 'urgent', 'mgr-dian', 'completed', 'docs/quotes/seed-004.pdf',
     NULL, 7, '2026-01-02T08:00:00+00:00', '2026-01-20T16:00:00+00:00',
     '2026-01-20T16:00:00+00:00');

INSERT INTO workflow_approvals (approval_id, request_id, stage, actor_id, actor_role, action,
    comments, payload_json, created_at) VALUES
    ('seed-apr-002-1', 'seed-req-002', 'approval', 'mgr-eko', 'manager', 'approve',
     NULL, '{"routed_threshold":"1000000"}', '2026-01-11T11:30:00+00:00'),
    ('seed-apr-003-1', 'seed-req-003', 'approval', 'mgr-sari', 'manager', 'approve',
     NULL, '{"routed_threshold":"1000000"}', '2026-01-12T09:00:00+00:00'),
    ('seed-apr-004-1', 'seed-req-004', 'approval', 'mgr-dian', 'manager', 'approve',
     'urgent replacement', '{"routed_threshold":"1000000"}', '2026-01-03T09:00:00+00:00'),
    ('seed-apr-004-2', 'seed-req-004', 'procurement_review', 'u-proc', 'procurement', 'approve',
     NULL, '{"vendor_verification":"verified"}', '2026-01-05T10:00:00+00:00'),
    ('seed-apr-004-3', 'seed-req-004', 'finance_approval', 'u-fin', 'finance', 'approve',
     NULL, '{"budget_code":"CAPEX-2026-07","payment_method":"bank_transfer"}',
     '2026-01-08T14:00:00+00:00'),
    ('seed-apr-004-4', 'seed-req-004', 'payment', 'u-fin', 'finance', 'submit_payment_letter',
     NULL, '{"letterhead_ref":"letters/2026/0042.pdf","document_template":"standard"}',
     '2026-01-10T10:00:00+00:00'),
    ('seed-apr-004-5', 'seed-req-004', 'payment', 'u-fin', 'finance', 'confirm_payment',
     NULL, '{"payment_reference":"TRX-2026-0889","transaction_id":"MUT-3321"}',
     '2026-01-15T09:30:00+00:00'),
    ('seed-apr-004-6', 'seed-req-004', 'delivery', 'u-ops', 'operations', 'confirm_delivery',
     'all units received', '{}', '2026-01-20T16:00:00+00:00');
"#;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub managers_inserted: i64,
    pub requests_inserted: i64,
    pub approvals_inserted: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub passed: bool,
    pub failures: Vec<String>,
}

/// Deterministic demo dataset: three managers, the default threshold, and
/// four requests spanning the workflow from fresh submission to completed.
pub struct SeedDataset;

impl SeedDataset {
    /// Load the dataset. Existing seed rows are removed first so the load
    /// is repeatable against the same database.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM workflow_approvals WHERE request_id LIKE 'seed-req-%'")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM purchase_requests WHERE id LIKE 'seed-req-%'")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM manager_assignments WHERE manager_id LIKE 'mgr-%'")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM approval_thresholds WHERE id = 1").execute(&mut *tx).await?;

        for statement in SEED_SQL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        tx.commit().await?;

        Ok(SeedResult {
            managers_inserted: SEED_MANAGER_IDS.len() as i64,
            requests_inserted: SEED_REQUESTS.len() as i64,
            approvals_inserted: SEED_REQUESTS.iter().map(|c| c.approval_count).sum(),
        })
    }

    /// Check a seeded database against the fixture contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut failures = Vec::new();

        for contract in SEED_REQUESTS {
            let row = sqlx::query(
                "SELECT status, version,
                        (SELECT COUNT(*) FROM workflow_approvals
                         WHERE request_id = purchase_requests.id) AS approval_count
                 FROM purchase_requests WHERE id = ?",
            )
            .bind(contract.request_id)
            .fetch_optional(pool)
            .await?;

            let Some(row) = row else {
                failures.push(format!(
                    "{}: missing ({})",
                    contract.request_id, contract.description
                ));
                continue;
            };

            let status: String =
                row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let version: i64 =
                row.try_get("version").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let approval_count: i64 = row
                .try_get("approval_count")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?;

            if status != contract.status {
                failures.push(format!(
                    "{}: expected status `{}`, found `{status}`",
                    contract.request_id, contract.status
                ));
            }
            if version != contract.version {
                failures.push(format!(
                    "{}: expected version {}, found {version}",
                    contract.request_id, contract.version
                ));
            }
            if approval_count != contract.approval_count {
                failures.push(format!(
                    "{}: expected {} audit rows, found {approval_count}",
                    contract.request_id, contract.approval_count
                ));
            }
        }

        let threshold: Option<String> =
            sqlx::query("SELECT amount FROM approval_thresholds WHERE id = 1")
                .fetch_optional(pool)
                .await?
                .map(|row| row.try_get("amount"))
                .transpose()
                .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        if threshold.as_deref() != Some("1000000") {
            failures.push(format!("approval_thresholds: expected 1000000, found {threshold:?}"));
        }

        Ok(VerificationResult { passed: failures.is_empty(), failures })
    }
}

#[cfg(test)]
mod tests {
    use reqflow_core::domain::actor::ActorId;
    use reqflow_core::domain::request::{RequestId, RequestStatus};
    use reqflow_core::store::WorkflowStore;

    use super::SeedDataset;
    use crate::repositories::SqlWorkflowStore;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn seed_loads_and_verifies() {
        let pool = setup().await;
        let result = SeedDataset::load(&pool).await.expect("seed");
        assert_eq!(result.requests_inserted, 4);
        assert_eq!(result.approvals_inserted, 8);

        let verification = SeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.passed, "failures: {:?}", verification.failures);
    }

    #[tokio::test]
    async fn seed_is_repeatable() {
        let pool = setup().await;
        SeedDataset::load(&pool).await.expect("first load");
        SeedDataset::load(&pool).await.expect("second load");

        let verification = SeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.passed, "failures: {:?}", verification.failures);
    }

    #[tokio::test]
    async fn seeded_rows_decode_through_the_store() {
        let pool = setup().await;
        SeedDataset::load(&pool).await.expect("seed");

        let store = SqlWorkflowStore::new(pool);
        let completed = store
            .fetch(&RequestId("seed-req-004".to_string()))
            .await
            .expect("fetch")
            .expect("exists");

        assert_eq!(completed.status, RequestStatus::Completed);
        assert_eq!(completed.approving_manager_id, ActorId("mgr-dian".to_string()));
        assert!(completed.completed_at.is_some());

        let history =
            store.history(&RequestId("seed-req-004".to_string())).await.expect("history");
        assert_eq!(history.len(), 6);
    }
}
