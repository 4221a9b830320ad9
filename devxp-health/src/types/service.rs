//! サービス型定義
//!
//! 監視対象サービスとそのヘルスチェック結果

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// メタデータ（任意のキー・値）
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// サービスの稼働状態
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// 稼働中
    Up,
    /// 停止中（5xx、タイムアウト、接続失敗）
    Down,
    /// 到達可能だが4xxを返している
    Degraded,
    /// まだ一度もチェックされていない
    #[default]
    Unknown,
}

impl ServiceStatus {
    /// ServiceStatusを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Degraded => "degraded",
            Self::Unknown => "unknown",
        }
    }
}

impl FromStr for ServiceStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "up" => Self::Up,
            "down" => Self::Down,
            "degraded" => Self::Degraded,
            _ => Self::Unknown,
        })
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 監視対象サービス
///
/// レジストリは外部で管理される。ヘルスサイクル中は不変として扱う。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    /// サービスID
    pub id: Uuid,
    /// 表示名
    pub name: String,
    /// 種別（"payment", "core-banking" など）
    #[serde(rename = "type", default)]
    pub service_type: Option<String>,
    /// プローブ先URL
    pub url: String,
    /// クリティカルサービスか（停止時にシステム全体をdownにする）
    #[serde(default)]
    pub is_critical: bool,
    /// 任意メタデータ
    #[serde(default)]
    pub metadata: Metadata,
    /// 登録日時
    pub created_at: DateTime<Utc>,
    /// 更新日時
    pub updated_at: DateTime<Utc>,
}

impl Service {
    /// 新しいサービスを作成
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            service_type: None,
            url: url.into(),
            is_critical: false,
            metadata: Metadata::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// クリティカルフラグを設定
    pub fn critical(mut self, is_critical: bool) -> Self {
        self.is_critical = is_critical;
        self
    }

    /// 種別を設定
    pub fn with_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = Some(service_type.into());
        self
    }
}

/// ステータス履歴レコード
///
/// プローブ1回につき1件作成され、永続化後は変更されない。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusRecord {
    /// レコードID
    pub id: Uuid,
    /// 対象サービスID
    pub service_id: Uuid,
    /// 判定結果
    pub status: ServiceStatus,
    /// 応答時間（ミリ秒）
    pub response_time_ms: Option<u64>,
    /// エラーメッセージ
    pub error_message: Option<String>,
    /// チェック日時
    pub checked_at: DateTime<Utc>,
}

/// 1回のプローブ結果（メモリ上のみ）
///
/// サービスのスナップショットとステータス情報を持つ。
/// `checked_at`が`None`の場合、そのサービスはまだ一度もチェックされていない。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthCheckResult {
    /// 対象サービス
    pub service: Service,
    /// 判定結果
    pub status: ServiceStatus,
    /// 応答時間（ミリ秒）
    pub response_time_ms: Option<u64>,
    /// エラーメッセージ
    pub error_message: Option<String>,
    /// チェック日時
    pub checked_at: Option<DateTime<Utc>>,
}

impl HealthCheckResult {
    /// チェック履歴がないサービスの結果
    pub fn unknown(service: Service) -> Self {
        Self {
            service,
            status: ServiceStatus::Unknown,
            response_time_ms: None,
            error_message: None,
            checked_at: None,
        }
    }

    /// 最新レコードとサービスから結果を組み立てる
    pub fn from_record(service: Service, record: StatusRecord) -> Self {
        Self {
            service,
            status: record.status,
            response_time_ms: record.response_time_ms,
            error_message: record.error_message,
            checked_at: Some(record.checked_at),
        }
    }

    /// 永続化用のレコードに変換
    ///
    /// `checked_at`が未設定の場合は`now`を使う。
    pub fn to_record(&self, now: DateTime<Utc>) -> StatusRecord {
        StatusRecord {
            id: Uuid::new_v4(),
            service_id: self.service.id,
            status: self.status,
            response_time_ms: self.response_time_ms,
            error_message: self.error_message.clone(),
            checked_at: self.checked_at.unwrap_or(now),
        }
    }
}
