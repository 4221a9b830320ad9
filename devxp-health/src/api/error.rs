//! APIエラーレスポンス型

use axum::{response::IntoResponse, Json};
use serde_json::json;
use tracing::{debug, error};

use crate::common::error::HealthError;

/// Axum用のエラーレスポンス型
#[derive(Debug)]
pub struct AppError(pub HealthError);

impl From<HealthError> for AppError {
    fn from(err: HealthError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();

        // 詳細はログのみ。入力エラーは利用者が直せるよう内容を返す
        let message = match &self.0 {
            HealthError::Validation(detail) => detail.clone(),
            other => other.external_message().to_string(),
        };

        if self.0.is_not_found() {
            debug!(status = status.as_u16(), "{}", self.0);
        } else if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", self.0);
        } else {
            debug!(status = status.as_u16(), "Request rejected: {}", self.0);
        }

        let payload = json!({
            "success": false,
            "message": message,
        });

        (status, Json(payload)).into_response()
    }
}
