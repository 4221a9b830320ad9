//! データベースアクセス層
//!
//! SQLiteベースのStatus Store

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::common::error::{HealthError, HealthResult};

/// サービスレジストリ
pub mod services;

/// ステータス履歴
pub mod service_status;

/// Status Store trait
pub mod traits;

/// インメモリStatus Store（テスト・一時実行用）
pub mod memory;

pub use memory::InMemoryStatusStore;
pub use traits::{SharedStatusStore, StatusStore};

/// データベース接続プールを作成し、マイグレーションを実行
pub async fn create_pool(database_url: &str) -> HealthResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| HealthError::Config(format!("Invalid database URL: {}", e)))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// 疎通確認（`SELECT 1`）
pub async fn ping(pool: &SqlitePool) -> HealthResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// 日時を固定幅のRFC3339文字列に変換
///
/// 文字列比較で時系列順になるよう、マイクロ秒固定・UTC(`Z`)で出力する。
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool_with_invalid_url() {
        let result = create_pool("sqlite:///nonexistent-dir/devxp/health.db").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ping() {
        let pool = test_utils::test_db_pool().await;
        ping(&pool).await.unwrap();
        pool.close().await;
        assert!(matches!(ping(&pool).await, Err(HealthError::Database(_))));
    }

    #[test]
    fn test_timestamp_format_is_sortable() {
        let a = DateTime::parse_from_rfc3339("2025-01-01T00:00:00.5Z")
            .unwrap()
            .with_timezone(&Utc);
        let b = DateTime::parse_from_rfc3339("2025-01-01T00:00:00.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let (fa, fb) = (format_timestamp(&a), format_timestamp(&b));
        assert_eq!(fa.len(), fb.len());
        assert!(fb < fa);
        assert_eq!(parse_timestamp(&fa), a);
    }
}
