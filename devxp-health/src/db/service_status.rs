//! ステータス履歴のデータベース操作
//!
//! 追記のみ。更新・削除は行わない（保持期間はストア側の責務）。

use sqlx::SqlitePool;
use uuid::Uuid;

use super::services::ServiceRow;
use super::{format_timestamp, parse_timestamp};
use crate::types::service::{HealthCheckResult, Service, StatusRecord};

/// ステータスレコードを追記
pub async fn insert_status(pool: &SqlitePool, record: &StatusRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO service_status (
            id, service_id, status, response_time_ms, error_message, checked_at
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.service_id.to_string())
    .bind(record.status.as_str())
    .bind(record.response_time_ms.map(|v| v as i64))
    .bind(&record.error_message)
    .bind(format_timestamp(&record.checked_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// サービスごとの最新ステータスを取得
///
/// チェック履歴のないサービスは`unknown`として返す。
pub async fn latest_status_per_service(
    pool: &SqlitePool,
) -> Result<Vec<HealthCheckResult>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LatestStatusRow>(
        r#"
        SELECT s.id, s.name, s.service_type, s.url, s.is_critical, s.metadata,
               s.created_at, s.updated_at,
               ss.id AS status_id, ss.status, ss.response_time_ms,
               ss.error_message, ss.checked_at
        FROM services s
        LEFT JOIN service_status ss ON ss.id = (
            SELECT latest.id FROM service_status latest
            WHERE latest.service_id = s.id
            ORDER BY latest.checked_at DESC, latest.rowid DESC
            LIMIT 1
        )
        ORDER BY s.name, s.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(HealthCheckResult::from).collect())
}

/// サービスのステータス履歴を取得（新しい順）
pub async fn list_history(
    pool: &SqlitePool,
    service_id: Uuid,
    limit: u32,
) -> Result<Vec<StatusRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, StatusRow>(
        r#"
        SELECT id, service_id, status, response_time_ms, error_message, checked_at
        FROM service_status
        WHERE service_id = ?
        ORDER BY checked_at DESC, rowid DESC
        LIMIT ?
        "#,
    )
    .bind(service_id.to_string())
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(StatusRecord::from).collect())
}

// --- Internal Row Types ---

#[derive(sqlx::FromRow)]
struct StatusRow {
    id: String,
    service_id: String,
    status: String,
    response_time_ms: Option<i64>,
    error_message: Option<String>,
    checked_at: String,
}

impl From<StatusRow> for StatusRecord {
    fn from(row: StatusRow) -> Self {
        StatusRecord {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            service_id: Uuid::parse_str(&row.service_id).unwrap_or_default(),
            status: row.status.parse().unwrap_or_default(),
            response_time_ms: row.response_time_ms.map(|v| v.max(0) as u64),
            error_message: row.error_message,
            checked_at: parse_timestamp(&row.checked_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct LatestStatusRow {
    #[sqlx(flatten)]
    service: ServiceRow,
    status_id: Option<String>,
    status: Option<String>,
    response_time_ms: Option<i64>,
    error_message: Option<String>,
    checked_at: Option<String>,
}

impl From<LatestStatusRow> for HealthCheckResult {
    fn from(row: LatestStatusRow) -> Self {
        let service = Service::from(row.service);
        match (row.status_id, row.status, row.checked_at) {
            (Some(id), Some(status), Some(checked_at)) => {
                let record = StatusRow {
                    id,
                    service_id: service.id.to_string(),
                    status,
                    response_time_ms: row.response_time_ms,
                    error_message: row.error_message,
                    checked_at,
                };
                HealthCheckResult::from_record(service, record.into())
            }
            _ => HealthCheckResult::unknown(service),
        }
    }
}
