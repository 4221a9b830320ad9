//! DevXP health monitor entry point

use std::sync::Arc;

use clap::Parser;
use devxp_health::cli::serve::ServeArgs;
use devxp_health::cli::{Cli, Commands};
use devxp_health::config::{
    self, get_env_with_fallback_parse, HealthCheckConfig, LiveUpdateConfig,
};
use devxp_health::health::HttpProber;
use devxp_health::{db, logging, server, AppState};
use tracing::{error, info};

#[derive(Clone)]
struct ServerConfig {
    host: String,
    port: u16,
}

impl ServerConfig {
    fn from_env() -> Self {
        let host = std::env::var("DEVXP_HOST")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let port = get_env_with_fallback_parse("DEVXP_PORT", "PORT", 4000);
        Self { host, port }
    }

    fn from_args(args: ServeArgs) -> Self {
        let defaults = Self::from_env();
        Self {
            host: args.host.unwrap_or(defaults.host),
            port: args.port.unwrap_or(defaults.port),
        }
    }

    fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _log_guard = match logging::init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Check(args)) => match devxp_health::cli::check::execute(&args).await {
            Ok(snapshot) if snapshot.is_down() => std::process::exit(1),
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Some(Commands::Register(args)) => {
            if let Err(e) = devxp_health::cli::register::execute(&args).await {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve(args)) => run_server(ServerConfig::from_args(args)).await,
        // No subcommand - default to serve
        None => run_server(ServerConfig::from_env()).await,
    }
}

async fn run_server(cfg: ServerConfig) {
    if let Err(e) = try_run_server(cfg).await {
        error!("Server terminated: {:#}", e);
        std::process::exit(1);
    }
}

async fn try_run_server(cfg: ServerConfig) -> anyhow::Result<()> {
    let health = HealthCheckConfig::from_env();
    let live_updates = LiveUpdateConfig::from_env();

    info!(
        env = health.env.as_str(),
        probe_timeout_ms = health.probe_timeout.as_millis() as u64,
        interval_secs = health.interval.as_secs(),
        "Starting DevXP health monitor"
    );

    let database_url = config::database_url();
    let pool = db::create_pool(&database_url).await?;
    // 定期チェックはストア疎通を確認してから開始する
    db::ping(&pool).await?;
    info!("Status store reachable");

    let prober = HttpProber::new(health.probe_timeout)?;
    let state = AppState::new(
        Arc::new(pool.clone()),
        Arc::new(prober),
        health,
        live_updates,
        config::api_token(),
    );

    if state.api_token.is_some() {
        info!("Identity gate enabled");
    }

    let scheduler = if health.periodic_enabled() {
        Some(state.scheduler.clone().start())
    } else {
        info!(
            env = health.env.as_str(),
            enabled = health.enabled,
            "Periodic health checks disabled"
        );
        None
    };

    let result = server::run(state, &cfg.bind_addr()).await;

    if let Some(handle) = scheduler {
        handle.stop().await;
    }
    pool.close().await;

    result
}
