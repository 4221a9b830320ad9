//! ライブ更新ブロードキャスター
//!
//! 接続中の購読者を管理し、システムヘルスのスナップショットを配信する。
//!
//! 配信はベストエフォート（購読者ごと最大1回）。送信キューは購読者ごとに
//! 有界で、満杯の購読者はその回の配信をスキップする。切断済みの購読者は
//! 配信時に検出してレジストリから取り除く。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::DEFAULT_SUBSCRIBER_BUFFER;
use crate::types::{ServiceStatus, SystemHealthSnapshot};

/// 購読者ID
pub type SubscriberId = u64;

/// 配信メッセージ（シリアライズ済みJSON）
pub type OutboundMessage = Arc<str>;

/// 配信イベント
///
/// `type`タグは購読者側の分岐に使われるため、値を変えないこと。
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum HealthEvent {
    /// 接続確認（購読直後に1回だけ送信）
    Connected {
        /// メッセージ
        message: String,
        /// 購読者ID
        subscriber_id: SubscriberId,
    },
    /// システムヘルス更新（サイクル完了ごと）
    SystemHealthUpdate(SystemHealthSnapshot),
    /// 単一サービスの更新（個別チェック時）
    HealthUpdate {
        /// サービスID
        service_id: Uuid,
        /// 判定結果
        status: ServiceStatus,
    },
}

impl HealthEvent {
    /// `type`タグの値
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::SystemHealthUpdate(_) => "system-health-update",
            Self::HealthUpdate { .. } => "health-update",
        }
    }
}

/// 送信エンベロープ `{type, data, timestamp}`
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope<'a> {
    #[serde(flatten)]
    event: &'a HealthEvent,
    timestamp: DateTime<Utc>,
}

impl<'a> EventEnvelope<'a> {
    /// 現在時刻でエンベロープを作成
    pub fn new(event: &'a HealthEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }

    /// JSON文字列に変換
    pub fn to_message(&self) -> Result<OutboundMessage, serde_json::Error> {
        serde_json::to_string(self).map(OutboundMessage::from)
    }
}

/// 1回の配信結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// 配信できた購読者数
    pub delivered: usize,
    /// キュー満杯でスキップした購読者数
    pub skipped: usize,
    /// 切断済みとして削除した購読者数
    pub removed: usize,
}

/// 購読ハンドル
///
/// 接続レイヤーは`receiver`から取り出したメッセージをソケットに流す。
/// ハンドルを破棄すると、次回の配信時にレジストリから取り除かれる。
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<OutboundMessage>,
}

impl Subscription {
    /// 購読者ID
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// 次のメッセージを待つ（登録解除済みなら`None`）
    pub async fn recv(&mut self) -> Option<OutboundMessage> {
        self.receiver.recv().await
    }

    /// 待機せずにメッセージを取り出す
    pub fn try_recv(&mut self) -> Option<OutboundMessage> {
        self.receiver.try_recv().ok()
    }
}

/// 購読者レジストリとファンアウト
#[derive(Clone)]
pub struct UpdateBroadcaster {
    inner: Arc<Inner>,
}

struct Inner {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<OutboundMessage>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl Default for UpdateBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

impl UpdateBroadcaster {
    /// 購読者ごとの送信キュー容量を指定して作成
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
            }),
        }
    }

    /// 購読を開始
    ///
    /// 返却前に`connected`メッセージをキューに積むため、
    /// 呼び出し側は最初の受信で接続確認を受け取れる。
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.inner.buffer);

        let hello = HealthEvent::Connected {
            message: "WebSocket connected".to_string(),
            subscriber_id: id,
        };
        match EventEnvelope::new(&hello).to_message() {
            Ok(message) => {
                // 新規チャネルは空なので失敗しない
                let _ = sender.try_send(message);
            }
            Err(e) => warn!("Failed to serialize hello message: {}", e),
        }

        self.write_subscribers().insert(id, sender);
        debug!(subscriber_id = id, "Subscriber registered");

        Subscription { id, receiver }
    }

    /// 購読を解除
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.write_subscribers().remove(&id).is_some();
        if removed {
            debug!(subscriber_id = id, "Subscriber unregistered");
        }
        removed
    }

    /// イベントを全購読者に配信
    ///
    /// シリアライズは1回だけ行う。購読者への送信はブロックしない。
    pub fn publish(&self, event: &HealthEvent) -> PublishReport {
        let message = match EventEnvelope::new(event).to_message() {
            Ok(message) => message,
            Err(e) => {
                warn!(event_type = event.type_tag(), "Failed to serialize event: {}", e);
                return PublishReport::default();
            }
        };

        // ロックを保持したまま送信しない（同時の登録・解除を妨げない）
        let targets: Vec<(SubscriberId, mpsc::Sender<OutboundMessage>)> = self
            .read_subscribers()
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        let mut report = PublishReport::default();
        let mut closed = Vec::new();

        for (id, sender) in targets {
            match sender.try_send(message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(subscriber_id = id, "Subscriber queue full, skipping update");
                    report.skipped += 1;
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        if !closed.is_empty() {
            let mut subscribers = self.write_subscribers();
            for id in &closed {
                if subscribers.remove(id).is_some() {
                    report.removed += 1;
                }
            }
        }

        debug!(
            event_type = event.type_tag(),
            delivered = report.delivered,
            skipped = report.skipped,
            removed = report.removed,
            "Broadcast completed"
        );

        report
    }

    /// スナップショットを`system-health-update`として配信
    pub fn publish_snapshot(&self, snapshot: &SystemHealthSnapshot) -> PublishReport {
        self.publish(&HealthEvent::SystemHealthUpdate(snapshot.clone()))
    }

    /// 現在の購読者数
    pub fn subscriber_count(&self) -> usize {
        self.read_subscribers().len()
    }

    fn read_subscribers(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<SubscriberId, mpsc::Sender<OutboundMessage>>> {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_subscribers(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<SubscriberId, mpsc::Sender<OutboundMessage>>> {
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
