//! Status Store trait
//!
//! ストア操作を抽象化し、ヘルス集計ロジックを具体的なDBから切り離す。
//! SQLite実装は既存のフリー関数に委譲する。

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::common::error::HealthResult;
use crate::types::service::{HealthCheckResult, Service, StatusRecord};

/// サービスレジストリとステータス履歴へのアクセス
///
/// 実装は異なるサービスへの同時書き込みに対して安全でなければならない。
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// 登録済みサービス一覧を取得
    async fn list_services(&self) -> HealthResult<Vec<Service>>;
    /// IDでサービスを取得
    async fn get_service(&self, id: Uuid) -> HealthResult<Option<Service>>;
    /// ステータスレコードを追記
    async fn append_status(&self, record: &StatusRecord) -> HealthResult<()>;
    /// サービスごとの最新ステータス（未チェックは`unknown`）
    async fn latest_status_per_service(&self) -> HealthResult<Vec<HealthCheckResult>>;
    /// サービスの履歴（新しい順、最大`limit`件）
    async fn history_for(&self, service_id: Uuid, limit: u32) -> HealthResult<Vec<StatusRecord>>;
    /// ストアの疎通確認
    async fn ping(&self) -> HealthResult<()>;
}

/// Arc でラップされたStatus Store
pub type SharedStatusStore = Arc<dyn StatusStore>;

#[async_trait]
impl StatusStore for SqlitePool {
    async fn list_services(&self) -> HealthResult<Vec<Service>> {
        Ok(super::services::list_services(self).await?)
    }

    async fn get_service(&self, id: Uuid) -> HealthResult<Option<Service>> {
        Ok(super::services::get_service(self, id).await?)
    }

    async fn append_status(&self, record: &StatusRecord) -> HealthResult<()> {
        Ok(super::service_status::insert_status(self, record).await?)
    }

    async fn latest_status_per_service(&self) -> HealthResult<Vec<HealthCheckResult>> {
        Ok(super::service_status::latest_status_per_service(self).await?)
    }

    async fn history_for(&self, service_id: Uuid, limit: u32) -> HealthResult<Vec<StatusRecord>> {
        Ok(super::service_status::list_history(self, service_id, limit).await?)
    }

    async fn ping(&self) -> HealthResult<()> {
        super::ping(self).await
    }
}
