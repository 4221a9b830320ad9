//! サービスレジストリのデータベース操作
//!
//! レジストリの管理（作成・更新）は本来カタログ側の責務。
//! ここでは読み出しと、運用者向けの登録のみを提供する。

use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp};
use crate::types::service::{Metadata, Service};

/// サービスを登録
pub async fn create_service(pool: &SqlitePool, service: &Service) -> Result<(), sqlx::Error> {
    let metadata = serde_json::to_string(&service.metadata).unwrap_or_else(|_| "{}".to_string());

    sqlx::query(
        r#"
        INSERT INTO services (
            id, name, service_type, url, is_critical, metadata, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(service.id.to_string())
    .bind(&service.name)
    .bind(&service.service_type)
    .bind(&service.url)
    .bind(service.is_critical)
    .bind(&metadata)
    .bind(format_timestamp(&service.created_at))
    .bind(format_timestamp(&service.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// サービス一覧を取得（名前順）
pub async fn list_services(pool: &SqlitePool) -> Result<Vec<Service>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ServiceRow>(
        r#"
        SELECT id, name, service_type, url, is_critical, metadata, created_at, updated_at
        FROM services
        ORDER BY name, id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Service::from).collect())
}

/// IDでサービスを取得
pub async fn get_service(pool: &SqlitePool, id: Uuid) -> Result<Option<Service>, sqlx::Error> {
    let row = sqlx::query_as::<_, ServiceRow>(
        r#"
        SELECT id, name, service_type, url, is_critical, metadata, created_at, updated_at
        FROM services
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Service::from))
}

#[derive(sqlx::FromRow)]
pub(super) struct ServiceRow {
    pub(super) id: String,
    pub(super) name: String,
    pub(super) service_type: Option<String>,
    pub(super) url: String,
    pub(super) is_critical: bool,
    pub(super) metadata: String,
    pub(super) created_at: String,
    pub(super) updated_at: String,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Service {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            name: row.name,
            service_type: row.service_type,
            url: row.url,
            is_critical: row.is_critical,
            metadata: serde_json::from_str::<Metadata>(&row.metadata).unwrap_or_default(),
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}
