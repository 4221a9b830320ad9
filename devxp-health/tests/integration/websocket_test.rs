//! Integration Test: ライブ更新
//!
//! WebSocket接続 → connected 受信 → チェック実行 → 更新の受信

use std::time::Duration;

use devxp_health::config::LiveUpdateConfig;
use devxp_health::types::Service;
use futures::StreamExt;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};

use crate::support::health::{
    mock_service, register, spawn_monitor, spawn_monitor_with, temp_pool,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 次のテキストメッセージをJSONとして受信（ping等は読み飛ばす）
async fn next_json(socket: &mut Socket) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("socket ended: {:?}", other),
            }
        }
    })
    .await
    .expect("timed out waiting for message")
}

async fn wait_for_subscribers(state: &devxp_health::AppState, expected: usize) {
    for _ in 0..100 {
        if state.broadcaster.subscriber_count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "expected {} subscribers, found {}",
        expected,
        state.broadcaster.subscriber_count()
    );
}

#[tokio::test]
async fn connected_then_system_health_update() {
    let healthy = mock_service(200).await;
    let pool = temp_pool().await;
    register(&pool, Service::new("api", healthy.uri()).critical(true)).await;

    let monitor = spawn_monitor(pool, None).await;
    let (mut socket, _) = connect_async(monitor.server.ws_url("/ws")).await.unwrap();

    let hello = next_json(&mut socket).await;
    assert_eq!(hello["type"], "connected");
    assert!(hello["timestamp"].is_string());

    reqwest::Client::new()
        .post(monitor.server.url("/api/health/services/check"))
        .send()
        .await
        .unwrap();

    let update = next_json(&mut socket).await;
    assert_eq!(update["type"], "system-health-update");
    assert_eq!(update["data"]["status"], "healthy");
    assert_eq!(update["data"]["summary"]["up"], 1);
    assert!(update["timestamp"].is_string());

    monitor.server.stop().await;
}

#[tokio::test]
async fn single_service_check_pushes_health_update() {
    let broken = mock_service(500).await;
    let pool = temp_pool().await;
    let service = register(&pool, Service::new("batch", broken.uri())).await;

    let monitor = spawn_monitor(pool, None).await;
    let (mut socket, _) = connect_async(monitor.server.ws_url("/ws")).await.unwrap();
    next_json(&mut socket).await;

    reqwest::Client::new()
        .get(monitor.server.url(&format!("/api/health/services/{}", service.id)))
        .send()
        .await
        .unwrap();

    let update = next_json(&mut socket).await;
    assert_eq!(update["type"], "health-update");
    assert_eq!(update["data"]["service_id"], service.id.to_string());
    assert_eq!(update["data"]["status"], "down");

    monitor.server.stop().await;
}

#[tokio::test]
async fn closed_client_is_dropped_others_still_receive() {
    let healthy = mock_service(200).await;
    let pool = temp_pool().await;
    register(&pool, Service::new("api", healthy.uri())).await;

    let monitor = spawn_monitor(pool, None).await;
    let (mut first, _) = connect_async(monitor.server.ws_url("/ws")).await.unwrap();
    let (mut second, _) = connect_async(monitor.server.ws_url("/ws")).await.unwrap();
    next_json(&mut first).await;
    next_json(&mut second).await;
    wait_for_subscribers(&monitor.state, 2).await;

    first.close(None).await.unwrap();
    wait_for_subscribers(&monitor.state, 1).await;

    let snapshot = monitor.state.scheduler.run_cycle().await.unwrap();
    assert_eq!(snapshot.summary.total, 1);

    let update = next_json(&mut second).await;
    assert_eq!(update["type"], "system-health-update");

    monitor.server.stop().await;
}

#[tokio::test]
async fn websocket_requires_token_when_gate_enabled() {
    let monitor = spawn_monitor(temp_pool().await, Some("ws-token")).await;

    assert!(connect_async(monitor.server.ws_url("/ws")).await.is_err());

    let (mut socket, _) = connect_async(monitor.server.ws_url("/ws?token=ws-token"))
        .await
        .unwrap();
    let hello = next_json(&mut socket).await;
    assert_eq!(hello["type"], "connected");

    monitor.server.stop().await;
}

#[tokio::test]
async fn out_of_range_heartbeat_keeps_socket_alive() {
    for heartbeat in [Duration::ZERO, Duration::MAX] {
        let healthy = mock_service(200).await;
        let pool = temp_pool().await;
        register(&pool, Service::new("api", healthy.uri())).await;

        let monitor = spawn_monitor_with(
            pool,
            None,
            LiveUpdateConfig {
                heartbeat,
                subscriber_buffer: 16,
            },
        )
        .await;
        let (mut socket, _) = connect_async(monitor.server.ws_url("/ws")).await.unwrap();

        let hello = next_json(&mut socket).await;
        assert_eq!(hello["type"], "connected");
        wait_for_subscribers(&monitor.state, 1).await;

        reqwest::Client::new()
            .post(monitor.server.url("/api/health/services/check"))
            .send()
            .await
            .unwrap();

        let update = next_json(&mut socket).await;
        assert_eq!(update["type"], "system-health-update");
        assert_eq!(monitor.state.broadcaster.subscriber_count(), 1);

        monitor.server.stop().await;
    }
}
