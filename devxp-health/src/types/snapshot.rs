//! システムヘルス集計
//!
//! サービスごとの最新ステータスからシステム全体の判定を導出する。

use serde::{Deserialize, Serialize};

use super::service::{HealthCheckResult, ServiceStatus};

/// システム全体の状態
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    /// すべて稼働中（またはサービス未登録）
    #[default]
    Healthy,
    /// 一部サービスが停止または劣化
    Degraded,
    /// クリティカルサービスが停止
    Down,
}

impl SystemStatus {
    /// SystemStatusを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Down => "down",
        }
    }
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// ステータス別の件数
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HealthSummary {
    /// サービス総数
    pub total: usize,
    /// up件数
    pub up: usize,
    /// down件数
    pub down: usize,
    /// degraded件数
    pub degraded: usize,
    /// unknown件数
    pub unknown: usize,
    /// 停止中のクリティカルサービス数
    pub critical_down: usize,
}

impl HealthSummary {
    /// 件数からシステム状態を決定
    ///
    /// クリティカル停止 > 停止/劣化 > 正常 の優先順位。
    pub fn system_status(&self) -> SystemStatus {
        if self.critical_down > 0 {
            SystemStatus::Down
        } else if self.down > 0 || self.degraded > 0 {
            SystemStatus::Degraded
        } else {
            SystemStatus::Healthy
        }
    }
}

/// システムヘルスのスナップショット
///
/// サイクルごとに新しく計算され、永続化されない。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemHealthSnapshot {
    /// システム全体の状態
    pub status: SystemStatus,
    /// サービスごとの最新結果
    pub services: Vec<HealthCheckResult>,
    /// 集計
    pub summary: HealthSummary,
}

impl SystemHealthSnapshot {
    /// `down`かどうか（API層で503にマップする）
    pub fn is_down(&self) -> bool {
        self.status == SystemStatus::Down
    }
}

/// サービスごとの最新結果からスナップショットを計算
pub fn compute_snapshot(services: Vec<HealthCheckResult>) -> SystemHealthSnapshot {
    let mut summary = HealthSummary {
        total: services.len(),
        ..HealthSummary::default()
    };

    for result in &services {
        match result.status {
            ServiceStatus::Up => summary.up += 1,
            ServiceStatus::Down => {
                summary.down += 1;
                if result.service.is_critical {
                    summary.critical_down += 1;
                }
            }
            ServiceStatus::Degraded => summary.degraded += 1,
            ServiceStatus::Unknown => summary.unknown += 1,
        }
    }

    SystemHealthSnapshot {
        status: summary.system_status(),
        services,
        summary,
    }
}
