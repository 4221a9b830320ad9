//! check サブコマンド
//!
//! 1サイクル実行してスナップショットをJSONで出力する。

use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use crate::config::{self, HealthCheckConfig};
use crate::db;
use crate::events::UpdateBroadcaster;
use crate::health::{HealthAggregator, HealthScheduler, HttpProber};
use crate::types::snapshot::SystemHealthSnapshot;

/// check サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Database URL (defaults to DEVXP_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Probe timeout in milliseconds (defaults to DEVXP_HEALTH_CHECK_TIMEOUT_MS)
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// Execute the check command
///
/// 戻り値のスナップショットが`down`なら呼び出し側で終了コード1にする。
pub async fn execute(args: &CheckArgs) -> anyhow::Result<SystemHealthSnapshot> {
    let database_url = args.database_url.clone().unwrap_or_else(config::database_url);
    let mut health = HealthCheckConfig::from_env();
    if let Some(timeout_ms) = args.timeout_ms.filter(|ms| *ms > 0) {
        health.probe_timeout = Duration::from_millis(timeout_ms);
    }

    let pool = db::create_pool(&database_url).await?;
    let prober = HttpProber::new(health.probe_timeout)?;
    let aggregator = HealthAggregator::new(Arc::new(pool), Arc::new(prober));
    let scheduler = HealthScheduler::new(aggregator, UpdateBroadcaster::default(), health.interval);

    let snapshot = scheduler.run_cycle().await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(snapshot)
}
