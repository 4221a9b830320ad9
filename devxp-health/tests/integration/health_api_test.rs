//! Integration Test: ヘルスAPI
//!
//! サービス登録 → 即時チェック → システム判定 / 履歴の取得

use devxp_health::types::Service;
use reqwest::StatusCode;
use serde_json::Value;

use crate::support::health::{mock_service, register, spawn_monitor, temp_pool};

#[tokio::test]
async fn check_then_system_reports_critical_outage() {
    let healthy = mock_service(200).await;
    let missing = mock_service(404).await;
    let broken = mock_service(503).await;

    let pool = temp_pool().await;
    let api = register(&pool, Service::new("api", healthy.uri())).await;
    let docs = register(&pool, Service::new("docs", missing.uri())).await;
    let ledger = register(&pool, Service::new("ledger", broken.uri()).critical(true)).await;

    let monitor = spawn_monitor(pool, None).await;
    let client = reqwest::Client::new();

    let res = client
        .post(monitor.server.url("/api/health/services/check"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 3);

    let by_id = |id: uuid::Uuid| {
        results
            .iter()
            .find(|r| r["service"]["id"] == id.to_string())
            .unwrap()
            .clone()
    };
    assert_eq!(by_id(api.id)["status"], "up");
    assert_eq!(by_id(docs.id)["status"], "degraded");
    assert!(by_id(docs.id)["error_message"].is_null());
    assert_eq!(by_id(ledger.id)["status"], "down");
    assert_eq!(by_id(ledger.id)["error_message"], "HTTP 503");

    let res = client
        .get(monitor.server.url("/api/health/system"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["status"], "down");
    assert_eq!(body["data"]["summary"]["total"], 3);
    assert_eq!(body["data"]["summary"]["up"], 1);
    assert_eq!(body["data"]["summary"]["degraded"], 1);
    assert_eq!(body["data"]["summary"]["down"], 1);
    assert_eq!(body["data"]["summary"]["critical_down"], 1);

    monitor.server.stop().await;
}

#[tokio::test]
async fn degraded_without_critical_outage_is_200() {
    let healthy = mock_service(200).await;
    let broken = mock_service(500).await;

    let pool = temp_pool().await;
    register(&pool, Service::new("api", healthy.uri()).critical(true)).await;
    register(&pool, Service::new("batch", broken.uri())).await;

    let monitor = spawn_monitor(pool, None).await;
    let client = reqwest::Client::new();

    client
        .post(monitor.server.url("/api/health/services/check"))
        .send()
        .await
        .unwrap();

    let res = client
        .get(monitor.server.url("/api/health/system"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["status"], "degraded");

    monitor.server.stop().await;
}

#[tokio::test]
async fn services_list_and_history() {
    let healthy = mock_service(200).await;
    let pool = temp_pool().await;
    let api = register(&pool, Service::new("api", healthy.uri())).await;
    let idle = register(&pool, Service::new("idle", "http://127.0.0.1:1/")).await;

    let monitor = spawn_monitor(pool, None).await;
    let client = reqwest::Client::new();

    // 未チェック
    let body: Value = client
        .get(monitor.server.url("/api/health/services"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["status"] == "unknown" && r["checked_at"].is_null()));

    for _ in 0..3 {
        let res = client
            .get(monitor.server.url(&format!("/api/health/services/{}", api.id)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let body: Value = client
        .get(monitor.server.url(&format!(
            "/api/health/services/{}/history?limit=2",
            api.id
        )))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r["service_id"] == api.id.to_string()));

    let body: Value = client
        .get(monitor.server.url(&format!(
            "/api/health/services/{}/history",
            idle.id
        )))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());

    monitor.server.stop().await;
}

#[tokio::test]
async fn unknown_and_invalid_service_ids() {
    let monitor = spawn_monitor(temp_pool().await, None).await;
    let client = reqwest::Client::new();

    let res = client
        .get(monitor.server.url(&format!(
            "/api/health/services/{}/history",
            uuid::Uuid::new_v4()
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(monitor.server.url("/api/health/services/12345"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    monitor.server.stop().await;
}

#[tokio::test]
async fn identity_gate_requires_token() {
    let monitor = spawn_monitor(temp_pool().await, Some("it-token")).await;
    let client = reqwest::Client::new();

    let res = client
        .get(monitor.server.url("/api/health/system"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(monitor.server.url("/api/health/system"))
        .bearer_auth("it-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(monitor.server.url("/api/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "up");
    assert_eq!(body["environment"], "test");

    monitor.server.stop().await;
}
