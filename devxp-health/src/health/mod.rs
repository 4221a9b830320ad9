//! ヘルスチェック
//!
//! - [`prober`]: 単一サービスへのHTTPプローブ
//! - [`aggregator`]: 並列チェックとシステム判定
//! - [`scheduler`]: 定期・オンデマンド実行

pub mod aggregator;
pub mod prober;
pub mod scheduler;

pub use aggregator::HealthAggregator;
pub use prober::{HttpProber, ServiceProber};
pub use scheduler::{HealthScheduler, SchedulerHandle};
