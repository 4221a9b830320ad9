//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! `HealthError`は`status_code()`と`external_message()`を提供し、
//! APIレイヤーはこれを使って外部向けレスポンスを生成する。
//! プローブ失敗はエラーではなく`ServiceStatus::Down`として表現されるため、
//! ここには含まれない。

use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

/// ヘルスモニタリングのエラー型
#[derive(Debug, Error)]
pub enum HealthError {
    /// Service not found
    #[error("Service not found: {0}")]
    ServiceNotFound(Uuid),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Status store error (unreachable, query failure, migration failure)
    #[error("Database error: {0}")]
    Database(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Identity gate rejected the request
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for HealthError {
    fn from(err: sqlx::Error) -> Self {
        HealthError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for HealthError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        HealthError::Database(format!("Migration failed: {}", err))
    }
}

impl HealthError {
    /// Returns a safe error message for external clients.
    ///
    /// Full error details (SQL errors, upstream addresses) only go to the
    /// server logs via the `Display` implementation.
    pub fn external_message(&self) -> &'static str {
        match self {
            Self::ServiceNotFound(_) => "Service not found",
            Self::NotFound(_) => "Not found",
            Self::Validation(_) => "Validation error",
            Self::Database(_) => "Status store unavailable",
            Self::Http(_) => "Upstream request failed",
            Self::Unauthorized(_) => "Unauthorized",
            Self::Config(_) => "Internal server error",
            Self::Serialization(_) => "Internal server error",
            Self::Internal(_) => "Internal server error",
        }
    }

    /// Returns the HTTP status code for this error.
    ///
    /// ストア到達不能は500で返す。503はシステム全体が`down`であることを示すため、
    /// 「判定できない」と「不健全」を区別する。
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ServiceNotFound(_) => StatusCode::NOT_FOUND,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Http(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 対象が存在しないことを示すエラーか
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ServiceNotFound(_) | Self::NotFound(_))
    }
}

/// Result alias used across the crate
pub type HealthResult<T> = Result<T, HealthError>;
