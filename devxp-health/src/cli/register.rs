//! register サブコマンド
//!
//! 監視対象サービスをStatus Storeに登録する。

use clap::Args;
use sqlx::SqlitePool;
use tracing::info;

use crate::common::error::{HealthError, HealthResult};
use crate::config;
use crate::db;
use crate::types::service::{Metadata, Service};

/// register サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct RegisterArgs {
    /// Display name
    #[arg(long)]
    pub name: String,

    /// URL probed with GET
    #[arg(long)]
    pub url: String,

    /// Service type (e.g. payment, core-banking)
    #[arg(long = "type")]
    pub service_type: Option<String>,

    /// Mark as critical (a critical outage marks the whole system down)
    #[arg(long, default_value_t = false)]
    pub critical: bool,

    /// Metadata as a JSON object
    #[arg(long)]
    pub metadata: Option<String>,

    /// Database URL (defaults to DEVXP_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,
}

impl RegisterArgs {
    /// 引数を検証してサービスを組み立てる
    pub fn to_service(&self) -> HealthResult<Service> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(HealthError::Validation("name must not be empty".into()));
        }

        let url = reqwest::Url::parse(&self.url)
            .map_err(|e| HealthError::Validation(format!("invalid url '{}': {}", self.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(HealthError::Validation(format!(
                "unsupported url scheme: {}",
                url.scheme()
            )));
        }

        let mut service = Service::new(name, self.url.clone()).critical(self.critical);
        if let Some(service_type) = &self.service_type {
            service = service.with_type(service_type.clone());
        }
        if let Some(raw) = &self.metadata {
            service.metadata = serde_json::from_str::<Metadata>(raw).map_err(|e| {
                HealthError::Validation(format!("metadata must be a JSON object: {}", e))
            })?;
        }

        Ok(service)
    }
}

/// サービスを登録
pub async fn register(pool: &SqlitePool, args: &RegisterArgs) -> HealthResult<Service> {
    let service = args.to_service()?;
    db::services::create_service(pool, &service).await?;
    info!(
        service_id = %service.id,
        service_name = %service.name,
        is_critical = service.is_critical,
        "Service registered"
    );
    Ok(service)
}

/// Execute the register command
pub async fn execute(args: &RegisterArgs) -> anyhow::Result<Service> {
    let database_url = args.database_url.clone().unwrap_or_else(config::database_url);
    let pool = db::create_pool(&database_url).await?;
    let service = register(&pool, args).await?;
    println!("{}", serde_json::to_string_pretty(&service)?);
    Ok(service)
}
