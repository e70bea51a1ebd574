use crate::commands::{current_thread_runtime, CommandResult};
use reqflow_core::config::{AppConfig, LoadOptions};
use reqflow_db::{connect_pool, migrations, SeedDataset};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_pool(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let loaded = SeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_load", error.to_string(), 6u8))?;
        let verification = SeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verify", error.to_string(), 6u8))?;
        pool.close().await;

        if !verification.passed {
            return Err((
                "seed_contract",
                format!("seed contract violated: {}", verification.failures.join("; ")),
                7u8,
            ));
        }

        Ok::<_, (&'static str, String, u8)>(loaded)
    });

    match result {
        Ok(loaded) => CommandResult::success(
            "seed",
            format!(
                "loaded {} managers, {} requests, {} audit rows",
                loaded.managers_inserted, loaded.requests_inserted, loaded.approvals_inserted
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}
