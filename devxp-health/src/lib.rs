//! DevXP Portal health monitoring
//!
//! 登録済みサービスを並列にプローブし、結果を保存してシステム全体の判定を計算し、
//! 接続中のクライアントへライブ配信する。

#![warn(missing_docs)]

/// 共通エラー型
pub mod common;

/// REST API / WebSocket ハンドラー
pub mod api;

/// CLIインターフェース
pub mod cli;

/// 設定管理（環境変数ヘルパー）
pub mod config;

/// Status Store（SQLite / インメモリ）
pub mod db;

/// ライブ更新ブロードキャスター
pub mod events;

/// ヘルスチェック（プローブ・集約・スケジューリング）
pub mod health;

/// ロギング初期化ユーティリティ
pub mod logging;

/// サーバー起動・シャットダウン
pub mod server;

/// 協調的シャットダウン
pub mod shutdown;

/// ドメイン型
pub mod types;

use std::sync::Arc;
use std::time::Instant;

use config::{AppEnv, HealthCheckConfig, LiveUpdateConfig};
use db::SharedStatusStore;
use events::UpdateBroadcaster;
use health::{HealthAggregator, HealthScheduler, ServiceProber};

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    /// Status Store
    pub store: SharedStatusStore,
    /// ヘルスアグリゲーター
    pub aggregator: HealthAggregator,
    /// スケジューラー（オンデマンド実行に使用）
    pub scheduler: HealthScheduler,
    /// ライブ更新ブロードキャスター
    pub broadcaster: UpdateBroadcaster,
    /// ライブ更新チャネル設定
    pub live_updates: LiveUpdateConfig,
    /// Identity gate のトークン（`None`なら無効）
    pub api_token: Option<Arc<str>>,
    /// 実行環境
    pub env: AppEnv,
    /// Cooperative shutdown controller
    pub shutdown: shutdown::ShutdownController,
    /// 起動時刻
    pub started_at: Instant,
}

impl AppState {
    /// 依存コンポーネントを組み立てて状態を作成
    pub fn new(
        store: SharedStatusStore,
        prober: Arc<dyn ServiceProber>,
        health: HealthCheckConfig,
        live_updates: LiveUpdateConfig,
        api_token: Option<String>,
    ) -> Self {
        let aggregator = HealthAggregator::new(store.clone(), prober);
        let broadcaster = UpdateBroadcaster::new(live_updates.subscriber_buffer);
        let scheduler = HealthScheduler::new(aggregator.clone(), broadcaster.clone(), health.interval);

        Self {
            store,
            aggregator,
            scheduler,
            broadcaster,
            live_updates,
            api_token: api_token.map(Arc::from),
            env: health.env,
            shutdown: shutdown::ShutdownController::new(),
            started_at: Instant::now(),
        }
    }
}
