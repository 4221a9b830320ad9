//! CLI module for devxp-health
//!
//! サーバー起動、単発チェック、サービス登録を提供する。

pub mod check;
pub mod register;
pub mod serve;

use clap::{Parser, Subcommand};

/// DevXP Portal health monitor - probes registered services and streams system health
#[derive(Parser, Debug)]
#[command(name = "devxp-health")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    DEVXP_HOST                          Bind address (default: 0.0.0.0)
    DEVXP_PORT                          Listen port (default: 4000)
    DEVXP_DATABASE_URL                  SQLite URL (default: sqlite://devxp-health.db?mode=rwc)
    DEVXP_ENV                           development / production / test
    DEVXP_LOG_LEVEL                     Log level (default: info)
    DEVXP_LOG_DIR                       Also write daily rotated log files here
    DEVXP_HEALTH_CHECK_TIMEOUT_MS       Probe timeout in milliseconds (default: 3000)
    DEVXP_HEALTH_CHECK_INTERVAL_MINUTES Periodic check interval (default: 5)
    DEVXP_HEALTH_CHECKS_ENABLED         Enable periodic checks (default: true)
    DEVXP_API_TOKEN                     Require this bearer token on the API
    DEVXP_WS_HEARTBEAT_SECS             WebSocket ping period (default: 30)
    DEVXP_SUBSCRIBER_BUFFER             Per-subscriber queue size (default: 32)
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the health monitoring server
    Serve(serve::ServeArgs),
    /// Run one health check cycle and print the system snapshot
    Check(check::CheckArgs),
    /// Register a service to be monitored
    Register(register::RegisterArgs),
}
