//! サービスプローバー
//!
//! 1サービスに対して1回のHTTPリクエストを送り、結果を分類する。
//! 失敗はすべて`ServiceStatus::Down`の結果として返し、エラーにはしない。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::common::error::{HealthError, HealthResult};
use crate::config::DEFAULT_PROBE_TIMEOUT_MS;
use crate::types::service::{HealthCheckResult, Service, ServiceStatus};

/// プローブの抽象
///
/// 実装は失敗を値として返し、パニックしてはならない。
#[async_trait]
pub trait ServiceProber: Send + Sync {
    /// 1サービスをプローブする
    async fn probe(&self, service: &Service) -> HealthCheckResult;
}

/// HTTPステータスコードを分類
///
/// - 400未満 → up
/// - 400..500 → degraded（到達はできている）
/// - 500以上 → down
pub fn classify_status(status: StatusCode) -> ServiceStatus {
    match status.as_u16() {
        0..=399 => ServiceStatus::Up,
        400..=499 => ServiceStatus::Degraded,
        _ => ServiceStatus::Down,
    }
}

/// HTTP GETによるプローバー
#[derive(Clone)]
pub struct HttpProber {
    client: Client,
    timeout: Duration,
}

impl HttpProber {
    /// タイムアウトを指定して作成
    pub fn new(timeout: Duration) -> HealthResult<Self> {
        let timeout = positive_timeout(timeout);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HealthError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, timeout })
    }

    /// タイムアウト
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn describe_error(&self, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!("Request timed out after {}ms", self.timeout.as_millis())
        } else if err.is_connect() {
            format!("Connection failed: {}", err)
        } else if err.is_builder() {
            format!("Invalid URL: {}", err)
        } else {
            err.to_string()
        }
    }
}

fn positive_timeout(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS)
    } else {
        timeout
    }
}

#[async_trait]
impl ServiceProber for HttpProber {
    async fn probe(&self, service: &Service) -> HealthCheckResult {
        let start = Instant::now();

        let outcome = self
            .client
            .get(&service.url)
            .timeout(self.timeout)
            .send()
            .await;

        let response_time_ms = start.elapsed().as_millis() as u64;

        let (status, error_message) = match outcome {
            Ok(response) => {
                let code = response.status();
                match classify_status(code) {
                    ServiceStatus::Down => {
                        (ServiceStatus::Down, Some(format!("HTTP {}", code.as_u16())))
                    }
                    other => (other, None),
                }
            }
            Err(e) => (ServiceStatus::Down, Some(self.describe_error(&e))),
        };

        match status {
            ServiceStatus::Up => debug!(
                service_id = %service.id,
                service_name = %service.name,
                response_time_ms,
                "Service health check succeeded"
            ),
            _ => warn!(
                service_id = %service.id,
                service_name = %service.name,
                status = %status,
                response_time_ms,
                error = ?error_message,
                "Service health check reported unhealthy"
            ),
        }

        HealthCheckResult {
            service: service.clone(),
            status,
            response_time_ms: Some(response_time_ms),
            error_message,
            checked_at: Some(Utc::now()),
        }
    }
}
