//! ライブ更新 WebSocket エンドポイント
//!
//! `/ws` に接続するとまず`connected`メッセージを受け取り、以降はサイクル完了ごとに
//! `system-health-update`、個別チェックごとに`health-update`が届く。

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::bounded_heartbeat;
use crate::events::UpdateBroadcaster;
use crate::shutdown::ShutdownController;
use crate::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let broadcaster = state.broadcaster.clone();
    let heartbeat = state.live_updates.heartbeat;
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster, heartbeat, shutdown))
}

async fn handle_socket(
    socket: WebSocket,
    broadcaster: UpdateBroadcaster,
    heartbeat: Duration,
    shutdown: ShutdownController,
) {
    let (mut sender, mut receiver) = socket.split();
    let mut subscription = broadcaster.subscribe();
    let subscriber_id = subscription.id();

    info!(
        subscriber_id,
        subscribers = broadcaster.subscriber_count(),
        "WebSocket client connected"
    );

    // クライアントからの受信は切断検知のみ（ping/pongはaxumが応答する）
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    debug!("WebSocket receive error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    let heartbeat = bounded_heartbeat(heartbeat);
    let mut heartbeat_timer = interval_at(Instant::now() + heartbeat, heartbeat);
    heartbeat_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut recv_task => {
                debug!(subscriber_id, "WebSocket client closed the connection");
                break;
            }
            _ = shutdown.wait() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            message = subscription.recv() => {
                let Some(message) = message else { break };
                if let Err(e) = sender.send(Message::Text(message.to_string())).await {
                    debug!(subscriber_id, "Failed to send update: {}", e);
                    break;
                }
            }
            _ = heartbeat_timer.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    recv_task.abort();
    broadcaster.unsubscribe(subscriber_id);
    info!(subscriber_id, "WebSocket client disconnected");
}
