//! HTTP API
//!
//! - `GET  /api/health` liveness（identity gate 対象外）
//! - `GET  /api/health/system` システムヘルス
//! - `GET  /api/health/services` 最新ステータス一覧
//! - `POST /api/health/services/check` 全サービス即時チェック
//! - `GET  /api/health/services/:id` 1サービス即時チェック
//! - `GET  /api/health/services/:id/history` ステータス履歴
//! - `GET  /ws` ライブ更新

pub mod auth;
pub mod error;
pub mod health;
pub mod ws;

use axum::{
    http::Uri,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::common::error::HealthError;
use crate::AppState;
use error::AppError;

/// ルーターを構築
pub fn create_app(state: AppState) -> Router {
    let gated = Router::new()
        .route("/api/health/system", get(health::system_health))
        .route("/api/health/services", get(health::list_services))
        .route("/api/health/services/check", post(health::check_all))
        .route("/api/health/services/:id", get(health::check_service))
        .route(
            "/api/health/services/:id/history",
            get(health::service_history),
        )
        .route("/ws", get(ws::ws_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::identity_gate,
        ));

    Router::new()
        .route("/api/health", get(health::liveness))
        .merge(gated)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError(HealthError::NotFound(uri.path().to_string()))
}
