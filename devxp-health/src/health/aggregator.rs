//! ヘルスアグリゲーター
//!
//! 全サービスを並列にプローブして結果を永続化し、
//! 最新ステータスからシステム全体の判定を計算する。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::prober::ServiceProber;
use crate::common::error::{HealthError, HealthResult};
use crate::db::SharedStatusStore;
use crate::types::service::{HealthCheckResult, Service, ServiceStatus, StatusRecord};
use crate::types::snapshot::{compute_snapshot, SystemHealthSnapshot};

/// 履歴取得のデフォルト件数
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// 履歴取得の上限件数
pub const MAX_HISTORY_LIMIT: u32 = 1000;

/// ヘルスアグリゲーター
///
/// Clone は同じストア・プローバー・サービスロックを共有する。
#[derive(Clone)]
pub struct HealthAggregator {
    store: SharedStatusStore,
    prober: Arc<dyn ServiceProber>,
    /// サービスごとのチェック直列化用ロック
    service_locks: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl HealthAggregator {
    /// 新しいアグリゲーターを作成
    pub fn new(store: SharedStatusStore, prober: Arc<dyn ServiceProber>) -> Self {
        Self {
            store,
            prober,
            service_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 全サービスをチェック
    ///
    /// サービス一覧の取得に失敗した場合のみエラーを返す。
    /// 各サービスのチェックと保存は独立しており、1件の失敗が他に影響しない。
    /// 結果はサービス一覧と同じ順序で返す。
    pub async fn check_all(&self) -> HealthResult<Vec<HealthCheckResult>> {
        let services = self.store.list_services().await?;
        self.prune_service_locks(&services);

        if services.is_empty() {
            debug!("No services to check");
            return Ok(Vec::new());
        }

        debug!(count = services.len(), "Starting parallel health check");

        let mut handles = Vec::with_capacity(services.len());
        for service in services {
            let aggregator = self.clone();
            let task_service = service.clone();
            let handle =
                tokio::spawn(async move { aggregator.check_and_save(&task_service).await });
            handles.push((service, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (service, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!(
                        service_id = %service.id,
                        service_name = %service.name,
                        "Health check task failed: {}",
                        e
                    );
                    let result = HealthCheckResult {
                        service,
                        status: ServiceStatus::Down,
                        response_time_ms: None,
                        error_message: Some(format!("Health check task failed: {}", e)),
                        checked_at: Some(Utc::now()),
                    };
                    self.persist(&result).await;
                    results.push(result);
                }
            }
        }

        let up = results
            .iter()
            .filter(|r| r.status == ServiceStatus::Up)
            .count();
        info!(
            total = results.len(),
            up,
            unhealthy = results.len() - up,
            "Parallel health check completed"
        );

        Ok(results)
    }

    /// IDを指定して1サービスをチェック
    pub async fn check_service(&self, service_id: Uuid) -> HealthResult<HealthCheckResult> {
        let service = self
            .store
            .get_service(service_id)
            .await?
            .ok_or(HealthError::ServiceNotFound(service_id))?;

        Ok(self.check_and_save(&service).await)
    }

    /// プローブして結果を保存
    ///
    /// 同じサービスのチェックは直列化し、`checked_at`の順に履歴へ書き込まれるようにする。
    /// 保存失敗はログに残すだけで、結果には影響しない。
    async fn check_and_save(&self, service: &Service) -> HealthCheckResult {
        let lock = self.service_lock(service.id);
        let _guard = lock.lock().await;

        let mut result = self.prober.probe(service).await;
        // 書き込み順と時刻を一致させる
        result.checked_at = Some(Utc::now());
        self.persist(&result).await;

        result
    }

    /// 結果を履歴に追記（失敗はログのみ）
    async fn persist(&self, result: &HealthCheckResult) {
        let record = result.to_record(Utc::now());
        if let Err(e) = self.save_status(&record).await {
            error!(
                service_id = %result.service.id,
                service_name = %result.service.name,
                status = %record.status,
                "Failed to save service status: {}",
                e
            );
        }
    }

    async fn save_status(&self, record: &StatusRecord) -> HealthResult<()> {
        self.store.append_status(record).await
    }

    fn locks(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<AsyncMutex<()>>>> {
        self.service_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// レジストリから消えたサービスのロックを破棄
    fn prune_service_locks(&self, services: &[Service]) {
        let listed: HashSet<Uuid> = services.iter().map(|s| s.id).collect();
        self.locks().retain(|id, _| listed.contains(id));
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks().len()
    }

    fn service_lock(&self, service_id: Uuid) -> Arc<AsyncMutex<()>> {
        self.locks()
            .entry(service_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// サービスごとの最新結果（未チェックは`unknown`）
    pub async fn latest_results(&self) -> HealthResult<Vec<HealthCheckResult>> {
        self.store.latest_status_per_service().await
    }

    /// 現在のシステムヘルスを計算
    ///
    /// 読み取りのみ。間にチェックがなければ同じ結果を返す。
    pub async fn current_snapshot(&self) -> HealthResult<SystemHealthSnapshot> {
        let latest = self.latest_results().await?;
        Ok(compute_snapshot(latest))
    }

    /// サービスのステータス履歴（新しい順）
    ///
    /// `limit`が0の場合は`DEFAULT_HISTORY_LIMIT`、上限は`MAX_HISTORY_LIMIT`。
    pub async fn history(&self, service_id: Uuid, limit: u32) -> HealthResult<Vec<StatusRecord>> {
        if self.store.get_service(service_id).await?.is_none() {
            return Err(HealthError::ServiceNotFound(service_id));
        }
        self.store
            .history_for(service_id, normalize_history_limit(limit))
            .await
    }
}

/// 履歴件数を正規化
pub fn normalize_history_limit(limit: u32) -> u32 {
    match limit {
        0 => DEFAULT_HISTORY_LIMIT,
        n => n.min(MAX_HISTORY_LIMIT),
    }
}
