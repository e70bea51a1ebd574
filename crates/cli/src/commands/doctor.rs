use serde::Serialize;

use crate::commands::{current_thread_runtime, CommandResult};
use reqflow_core::config::{AppConfig, LoadOptions};
use reqflow_core::policy::ThresholdPolicy;
use reqflow_db::{connect_pool, migrations, SqlThresholdPolicy};

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: &'static str,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    command: &'static str,
    status: &'static str,
    checks: Vec<DoctorCheck>,
}

pub fn run(json: bool) -> CommandResult {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config",
                status: "ok",
                detail: format!("database url `{}`", config.database.url),
            });
            Some(config)
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config",
                status: "failed",
                detail: error.to_string(),
            });
            None
        }
    };

    if let Some(config) = config {
        match current_thread_runtime() {
            Ok(runtime) => runtime.block_on(async {
                match connect_pool(&config.database).await {
                    Ok(pool) => {
                        checks.push(DoctorCheck {
                            name: "db_connectivity",
                            status: "ok",
                            detail: "connection pool established".to_string(),
                        });

                        match migrations::schema_ready(&pool).await {
                            Ok(true) => {
                                checks.push(DoctorCheck {
                                    name: "schema",
                                    status: "ok",
                                    detail: "workflow tables present".to_string(),
                                });

                                let policy = SqlThresholdPolicy::new(pool.clone());
                                match policy.current_threshold().await {
                                    Ok(threshold) => checks.push(DoctorCheck {
                                        name: "approval_threshold",
                                        status: "ok",
                                        detail: format!("effective threshold {threshold}"),
                                    }),
                                    Err(error) => checks.push(DoctorCheck {
                                        name: "approval_threshold",
                                        status: "failed",
                                        detail: error.to_string(),
                                    }),
                                }
                            }
                            Ok(false) => checks.push(DoctorCheck {
                                name: "schema",
                                status: "failed",
                                detail: "workflow tables missing; run `reqflow migrate`"
                                    .to_string(),
                            }),
                            Err(error) => checks.push(DoctorCheck {
                                name: "schema",
                                status: "failed",
                                detail: error.to_string(),
                            }),
                        }

                        pool.close().await;
                    }
                    Err(error) => checks.push(DoctorCheck {
                        name: "db_connectivity",
                        status: "failed",
                        detail: error.to_string(),
                    }),
                }
            }),
            Err(error) => checks.push(DoctorCheck {
                name: "runtime",
                status: "failed",
                detail: error.to_string(),
            }),
        }
    }

    let all_ok = checks.iter().all(|check| check.status == "ok");
    let report = DoctorReport {
        command: "doctor",
        status: if all_ok { "ok" } else { "error" },
        checks,
    };

    let output = if json {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| error.to_string())
    } else {
        let mut lines = vec![format!("doctor: {}", report.status)];
        for check in &report.checks {
            lines.push(format!("  {:<20} {:<7} {}", check.name, check.status, check.detail));
        }
        lines.join("\n")
    };

    CommandResult { exit_code: if all_ok { 0 } else { 1 }, output }
}
