//! 型定義
//!
//! サービス・ステータス履歴・システムヘルスのデータモデル

pub mod service;
pub mod snapshot;

pub use service::{HealthCheckResult, Service, ServiceStatus, StatusRecord};
pub use snapshot::{compute_snapshot, HealthSummary, SystemHealthSnapshot, SystemStatus};
