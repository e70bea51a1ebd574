use reqflow_core::config::{AppConfig, LoadOptions, LogFormat};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return serde_json::json!({
                "command": "config",
                "status": "error",
                "error_class": "config_validation",
                "message": error.to_string(),
            })
            .to_string();
        }
    };

    serde_json::json!({
        "command": "config",
        "status": "ok",
        "effective": {
            "database": {
                "url": config.database.url,
                "max_connections": config.database.max_connections,
                "timeout_secs": config.database.timeout_secs,
            },
            "server": {
                "bind_address": config.server.bind_address,
                "port": config.server.port,
                "health_check_port": config.server.health_check_port,
                "graceful_shutdown_secs": config.server.graceful_shutdown_secs,
            },
            "workflow": {
                "approval_threshold": config.workflow.approval_threshold,
                "currency": config.workflow.currency,
            },
            "logging": {
                "level": config.logging.level,
                "format": match config.logging.format {
                    LogFormat::Compact => "compact",
                    LogFormat::Pretty => "pretty",
                    LogFormat::Json => "json",
                },
            },
        },
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    #[test]
    fn config_output_is_valid_json_with_workflow_section() {
        let output = super::run();
        let parsed: serde_json::Value = serde_json::from_str(&output).expect("valid json");
        if parsed["status"] == "ok" {
            assert!(parsed["effective"]["workflow"]["approval_threshold"].is_number());
        }
    }
}
