//! インメモリStatus Store
//!
//! プロセス内で完結するストア。一時実行モードやテストで使用する。

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use super::traits::StatusStore;
use crate::common::error::{HealthError, HealthResult};
use crate::types::service::{HealthCheckResult, Service, StatusRecord};

/// インメモリStatus Store
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    services: RwLock<Vec<Service>>,
    history: RwLock<HashMap<Uuid, Vec<StatusRecord>>>,
}

impl InMemoryStatusStore {
    /// 空のストアを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// サービス一覧を指定して作成
    pub fn with_services(services: Vec<Service>) -> Self {
        let store = Self::new();
        for service in services {
            store.register_service(service);
        }
        store
    }

    /// サービスを登録
    pub fn register_service(&self, service: Service) {
        if let Ok(mut services) = self.services.write() {
            services.push(service);
            services.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        }
    }

    /// サービスを削除（履歴も削除する）
    pub fn remove_service(&self, service_id: Uuid) -> bool {
        let removed = self
            .services
            .write()
            .map(|mut services| {
                let before = services.len();
                services.retain(|s| s.id != service_id);
                services.len() != before
            })
            .unwrap_or(false);
        if let Ok(mut history) = self.history.write() {
            history.remove(&service_id);
        }
        removed
    }

    /// 記録済みレコード数
    pub fn record_count(&self, service_id: Uuid) -> usize {
        self.history
            .read()
            .map(|h| h.get(&service_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

fn poisoned() -> HealthError {
    HealthError::Database("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn list_services(&self) -> HealthResult<Vec<Service>> {
        Ok(self.services.read().map_err(|_| poisoned())?.clone())
    }

    async fn get_service(&self, id: Uuid) -> HealthResult<Option<Service>> {
        let services = self.services.read().map_err(|_| poisoned())?;
        Ok(services.iter().find(|s| s.id == id).cloned())
    }

    async fn append_status(&self, record: &StatusRecord) -> HealthResult<()> {
        let known = self
            .services
            .read()
            .map_err(|_| poisoned())?
            .iter()
            .any(|s| s.id == record.service_id);
        if !known {
            return Err(HealthError::Database(format!(
                "unknown service_id {}",
                record.service_id
            )));
        }

        let mut history = self.history.write().map_err(|_| poisoned())?;
        let entries = history.entry(record.service_id).or_default();
        // checked_at順を維持（同時刻は挿入順）
        let pos = entries.partition_point(|r| r.checked_at <= record.checked_at);
        entries.insert(pos, record.clone());
        Ok(())
    }

    async fn latest_status_per_service(&self) -> HealthResult<Vec<HealthCheckResult>> {
        let services = self.services.read().map_err(|_| poisoned())?.clone();
        let history = self.history.read().map_err(|_| poisoned())?;

        Ok(services
            .into_iter()
            .map(|service| match history.get(&service.id).and_then(|h| h.last()) {
                Some(record) => HealthCheckResult::from_record(service, record.clone()),
                None => HealthCheckResult::unknown(service),
            })
            .collect())
    }

    async fn history_for(&self, service_id: Uuid, limit: u32) -> HealthResult<Vec<StatusRecord>> {
        let history = self.history.read().map_err(|_| poisoned())?;
        Ok(history
            .get(&service_id)
            .map(|entries| {
                entries
                    .iter()
                    .rev()
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn ping(&self) -> HealthResult<()> {
        Ok(())
    }
}
