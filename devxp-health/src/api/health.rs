//! ヘルスAPIハンドラー
//!
//! レスポンスは `{success, message?, data}` 形式。

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use super::error::AppError;
use crate::common::error::HealthError;
use crate::types::service::{HealthCheckResult, StatusRecord};
use crate::AppState;

/// 共通レスポンスエンベロープ
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// 成否
    pub success: bool,
    /// 補足メッセージ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 本体
    pub data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// 履歴取得クエリ
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// 取得件数（未指定・0・不正値はデフォルト）
    pub limit: Option<String>,
}

impl HistoryQuery {
    fn limit(&self) -> u32 {
        self.limit
            .as_deref()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0)
    }
}

fn parse_service_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw)
        .map_err(|_| AppError(HealthError::Validation(format!("Invalid service id: {}", raw))))
}

/// GET /api/health
///
/// プロセスとStatus Storeの生存確認。
pub async fn liveness(State(state): State<AppState>) -> Response {
    let timestamp = Utc::now();
    match state.store.ping().await {
        Ok(()) => Json(json!({
            "status": "up",
            "timestamp": timestamp,
            "uptime_secs": state.started_at.elapsed().as_secs(),
            "environment": state.env.as_str(),
        }))
        .into_response(),
        Err(e) => {
            warn!("Liveness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "down",
                    "timestamp": timestamp,
                    "message": e.external_message(),
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/health/system
///
/// `down`の場合は503を返し、本文を読まずに失敗と判別できるようにする。
pub async fn system_health(State(state): State<AppState>) -> Result<Response, AppError> {
    let snapshot = state.aggregator.current_snapshot().await?;

    if snapshot.is_down() {
        let body = ApiResponse {
            success: false,
            message: Some("System is down".to_string()),
            data: snapshot,
        };
        return Ok((StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response());
    }

    Ok(Json(ApiResponse::ok(snapshot)).into_response())
}

/// GET /api/health/services
pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<HealthCheckResult>>>, AppError> {
    let results = state.aggregator.latest_results().await?;
    Ok(Json(ApiResponse::ok(results)))
}

/// POST /api/health/services/check
///
/// 全サービスを即時チェックし、結果を返す。購読者にはスナップショットを配信する。
pub async fn check_all(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<HealthCheckResult>>>, AppError> {
    let (results, _) = state.scheduler.trigger().await?;
    Ok(Json(
        ApiResponse::ok(results).with_message("Health check completed"),
    ))
}

/// GET /api/health/services/:id
///
/// 1サービスを即時チェックする。
pub async fn check_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<HealthCheckResult>>, AppError> {
    let service_id = parse_service_id(&id)?;
    let result = state.scheduler.trigger_service(service_id).await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// GET /api/health/services/:id/history?limit=N
pub async fn service_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<StatusRecord>>>, AppError> {
    let service_id = parse_service_id(&id)?;
    let history = state.aggregator.history(service_id, query.limit()).await?;
    Ok(Json(ApiResponse::ok(history)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HealthCheckConfig, LiveUpdateConfig};
    use crate::db::{InMemoryStatusStore, StatusStore};
    use crate::health::aggregator::test_support::{StaticProber, UnreachableStore};
    use crate::types::service::{Service, ServiceStatus};
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_state(
        store: Arc<dyn StatusStore>,
        statuses: HashMap<Uuid, ServiceStatus>,
    ) -> AppState {
        AppState::new(
            store,
            Arc::new(StaticProber::new(statuses)),
            HealthCheckConfig::default(),
            LiveUpdateConfig::default(),
            None,
        )
    }

    fn app(state: AppState) -> Router {
        crate::api::create_app(state)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.oneshot(request).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn test_history_query_limit() {
        let q = |v: Option<&str>| HistoryQuery {
            limit: v.map(str::to_string),
        };
        assert_eq!(q(None).limit(), 0);
        assert_eq!(q(Some("25")).limit(), 25);
        assert_eq!(q(Some("abc")).limit(), 0);
        assert_eq!(q(Some("-5")).limit(), 0);
    }

    #[tokio::test]
    async fn test_liveness_up() {
        let state = create_test_state(Arc::new(InMemoryStatusStore::new()), HashMap::new());
        let (status, body) = get(app(state), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "up");
        assert_eq!(body["environment"], "development");
    }

    #[tokio::test]
    async fn test_liveness_store_down() {
        let state = create_test_state(Arc::new(UnreachableStore), HashMap::new());
        let (status, body) = get(app(state), "/api/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "down");
    }

    #[tokio::test]
    async fn test_system_health_down_is_503() {
        let critical = Service::new("core", "http://localhost").critical(true);
        let store = Arc::new(InMemoryStatusStore::with_services(vec![critical.clone()]));
        let state = create_test_state(store, HashMap::from([(critical.id, ServiceStatus::Down)]));
        state.scheduler.trigger().await.unwrap();

        let (status, body) = get(app(state), "/api/health/system").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["status"], "down");
        assert_eq!(body["data"]["summary"]["critical_down"], 1);
    }

    #[tokio::test]
    async fn test_system_health_store_unreachable_is_500() {
        let state = create_test_state(Arc::new(UnreachableStore), HashMap::new());
        let (status, body) = get(app(state), "/api/health/system").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Status store unavailable");
    }

    #[tokio::test]
    async fn test_list_services_unknown_before_check() {
        let store = Arc::new(InMemoryStatusStore::with_services(vec![Service::new(
            "fresh",
            "http://localhost",
        )]));
        let state = create_test_state(store, HashMap::new());

        let (status, body) = get(app(state), "/api/health/services").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["status"], "unknown");
        assert!(body["data"][0]["checked_at"].is_null());
    }

    #[tokio::test]
    async fn test_check_all_returns_fresh_results() {
        let services = vec![
            Service::new("a", "http://localhost"),
            Service::new("b", "http://localhost"),
        ];
        let store = Arc::new(InMemoryStatusStore::with_services(services.clone()));
        let state = create_test_state(
            store.clone(),
            HashMap::from([(services[1].id, ServiceStatus::Degraded)]),
        );

        let request = Request::builder()
            .method("POST")
            .uri("/api/health/services/check")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(state), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Health check completed");
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"][1]["status"], "degraded");
        assert_eq!(store.record_count(services[0].id), 1);
    }

    #[tokio::test]
    async fn test_check_service_invalid_id() {
        let state = create_test_state(Arc::new(InMemoryStatusStore::new()), HashMap::new());
        let (status, body) = get(app(state), "/api/health/services/not-a-uuid").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_check_service_unknown_id() {
        let state = create_test_state(Arc::new(InMemoryStatusStore::new()), HashMap::new());
        let uri = format!("/api/health/services/{}", Uuid::new_v4());
        let (status, body) = get(app(state), &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Service not found");
    }

    #[tokio::test]
    async fn test_history_limit_and_order() {
        let service = Service::new("hist", "http://localhost");
        let store = Arc::new(InMemoryStatusStore::with_services(vec![service.clone()]));
        let state = create_test_state(store, HashMap::new());
        for _ in 0..3 {
            state.aggregator.check_service(service.id).await.unwrap();
        }

        let uri = format!("/api/health/services/{}/history?limit=2", service.id);
        let (status, body) = get(app(state), &uri).await;
        assert_eq!(status, StatusCode::OK);
        let records: Vec<StatusRecord> = serde_json::from_value(body["data"].clone()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].checked_at >= records[1].checked_at);
    }

    #[tokio::test]
    async fn test_identity_gate() {
        let mut state = create_test_state(Arc::new(InMemoryStatusStore::new()), HashMap::new());
        state.api_token = Some(Arc::from("s3cret"));

        let (status, _) = get(app(state.clone()), "/api/health/services").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/health/services")
            .header("Authorization", "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = get(app(state.clone()), "/api/health/services?token=wrong").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // liveness は対象外
        let (status, _) = get(app(state), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let state = create_test_state(Arc::new(InMemoryStatusStore::new()), HashMap::new());
        let (status, body) = get(app(state), "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
