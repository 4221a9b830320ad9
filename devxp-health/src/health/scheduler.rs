//! ヘルスチェックスケジューラー
//!
//! 定期実行（タイマー）とオンデマンド実行（リクエスト）の2つの起点から
//! アグリゲーターを呼び出し、結果をブロードキャスターへ渡す。
//! 2つの起点は独立しており、オンデマンド実行でタイマーはリセットされない。

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::aggregator::HealthAggregator;
use crate::common::error::HealthResult;
use crate::config::bounded_check_interval;
use crate::events::{HealthEvent, UpdateBroadcaster};
use crate::shutdown::ShutdownController;
use crate::types::service::HealthCheckResult;
use crate::types::snapshot::SystemHealthSnapshot;

/// ヘルスチェックスケジューラー
#[derive(Clone)]
pub struct HealthScheduler {
    aggregator: HealthAggregator,
    broadcaster: UpdateBroadcaster,
    interval: Duration,
}

impl HealthScheduler {
    /// 新しいスケジューラーを作成
    ///
    /// 間隔はゼロならデフォルト、上限超過なら上限に丸める。
    pub fn new(
        aggregator: HealthAggregator,
        broadcaster: UpdateBroadcaster,
        interval: Duration,
    ) -> Self {
        Self {
            aggregator,
            broadcaster,
            interval: bounded_check_interval(interval),
        }
    }

    /// 1サイクル実行: 全サービスをチェックし、スナップショットを配信する
    pub async fn run_cycle(&self) -> HealthResult<SystemHealthSnapshot> {
        self.trigger().await.map(|(_, snapshot)| snapshot)
    }

    /// オンデマンド実行
    ///
    /// チェック結果と、保存後に計算したスナップショットを返す。
    pub async fn trigger(&self) -> HealthResult<(Vec<HealthCheckResult>, SystemHealthSnapshot)> {
        let results = self.aggregator.check_all().await?;
        let snapshot = self.aggregator.current_snapshot().await?;

        let report = self.broadcaster.publish_snapshot(&snapshot);
        info!(
            status = %snapshot.status,
            services = snapshot.summary.total,
            delivered = report.delivered,
            "Health check cycle completed"
        );

        Ok((results, snapshot))
    }

    /// 1サービスだけチェックし、`health-update`として配信
    pub async fn trigger_service(&self, service_id: Uuid) -> HealthResult<HealthCheckResult> {
        let result = self.aggregator.check_service(service_id).await?;
        self.broadcaster.publish(&HealthEvent::HealthUpdate {
            service_id: result.service.id,
            status: result.status,
        });
        Ok(result)
    }

    /// 定期チェックをバックグラウンドで開始
    ///
    /// 最初のサイクルは1間隔後。サイクルの失敗はログに残し、ループは継続する。
    pub fn start(self) -> SchedulerHandle {
        let shutdown = ShutdownController::new();
        let stop_signal = shutdown.clone();

        let task = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + self.interval, self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(
                interval_secs = self.interval.as_secs(),
                "Periodic health checks started"
            );

            loop {
                tokio::select! {
                    _ = stop_signal.wait() => break,
                    _ = timer.tick() => {}
                }

                if let Err(e) = self.run_cycle().await {
                    error!("Periodic health check failed: {}", e);
                }
            }

            info!("Periodic health checks stopped");
        });

        SchedulerHandle { shutdown, task }
    }
}

/// 定期チェックのハンドル
pub struct SchedulerHandle {
    shutdown: ShutdownController,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// ループが動作中か
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// 停止を要求し、実行中のサイクルの完了を待つ
    pub async fn stop(self) {
        self.shutdown.request_shutdown();
        if let Err(e) = self.task.await {
            warn!("Periodic health check task ended abnormally: {}", e);
        }
    }
}
