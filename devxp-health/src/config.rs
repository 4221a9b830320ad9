//! Configuration management via environment variables
//!
//! Provides helper functions for reading environment variables with fallback
//! to deprecated (legacy) variable names with warning logs, and the typed
//! configuration consumed by the health monitor.

use std::time::Duration;

/// Default probe timeout in milliseconds
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3_000;

/// Default periodic check interval in minutes
pub const DEFAULT_CHECK_INTERVAL_MINUTES: u64 = 5;

/// Default WebSocket heartbeat period in seconds
pub const DEFAULT_WS_HEARTBEAT_SECS: u64 = 30;

/// Upper bound for the probe timeout in milliseconds (10 minutes)
pub const MAX_PROBE_TIMEOUT_MS: u64 = 10 * 60 * 1_000;

/// Upper bound for the periodic check interval in minutes (7 days)
pub const MAX_CHECK_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Upper bound for the WebSocket heartbeat period in seconds (1 hour)
pub const MAX_WS_HEARTBEAT_SECS: u64 = 60 * 60;

/// Default per-subscriber outbound queue capacity
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 32;

/// Get an environment variable with fallback to a deprecated name
///
/// If the new variable name is set, returns its value.
/// If only the old (deprecated) variable name is set, returns its value
/// and logs a deprecation warning.
///
/// # Example
/// ```
/// use devxp_health::config::get_env_with_fallback;
///
/// let port = get_env_with_fallback("DEVXP_PORT", "PORT");
/// ```
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback and default value
pub fn get_env_with_fallback_or(new_name: &str, old_name: &str, default: &str) -> String {
    get_env_with_fallback(new_name, old_name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable with fallback, parsing to a specific type
///
/// Returns `default` if neither is set or parsing fails.
pub fn get_env_with_fallback_parse<T: std::str::FromStr>(
    new_name: &str,
    old_name: &str,
    default: T,
) -> T {
    get_env_with_fallback(new_name, old_name)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a boolean flag (`true/1/yes/on` → true, `false/0/no/off` → false)
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// 実行環境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    /// 開発
    #[default]
    Development,
    /// 本番
    Production,
    /// テスト（定期チェック無効）
    Test,
}

impl AppEnv {
    /// 環境変数 `DEVXP_ENV`（旧: `APP_ENV`）から取得
    pub fn from_env() -> Self {
        get_env_with_fallback("DEVXP_ENV", "APP_ENV")
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }

    /// 文字列から変換（不明な値はdevelopment）
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "test" => Self::Test,
            _ => Self::Development,
        }
    }

    /// AppEnvを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// ヘルスチェック設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheckConfig {
    /// プローブ1回あたりのタイムアウト
    pub probe_timeout: Duration,
    /// 定期チェック間隔
    pub interval: Duration,
    /// 定期チェックの有効/無効
    pub enabled: bool,
    /// 実行環境
    pub env: AppEnv,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_MINUTES * 60),
            enabled: true,
            env: AppEnv::Development,
        }
    }
}

impl HealthCheckConfig {
    /// Load health check configuration from environment variables.
    ///
    /// Zero or unparseable durations fall back to the defaults and oversized
    /// ones are clamped, so the probe timeout and the interval are always
    /// positive and bounded.
    pub fn from_env() -> Self {
        let timeout_ms = get_env_with_fallback_parse(
            "DEVXP_HEALTH_CHECK_TIMEOUT_MS",
            "HEALTH_CHECK_TIMEOUT",
            DEFAULT_PROBE_TIMEOUT_MS,
        );
        let interval_minutes = get_env_with_fallback_parse(
            "DEVXP_HEALTH_CHECK_INTERVAL_MINUTES",
            "HEALTH_CHECK_INTERVAL",
            DEFAULT_CHECK_INTERVAL_MINUTES,
        );
        let enabled = std::env::var("DEVXP_HEALTH_CHECKS_ENABLED")
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(true);

        Self {
            probe_timeout: Duration::from_millis(bounded_or(
                "probe timeout (ms)",
                timeout_ms,
                DEFAULT_PROBE_TIMEOUT_MS,
                MAX_PROBE_TIMEOUT_MS,
            )),
            interval: Duration::from_secs(
                bounded_or(
                    "check interval (minutes)",
                    interval_minutes,
                    DEFAULT_CHECK_INTERVAL_MINUTES,
                    MAX_CHECK_INTERVAL_MINUTES,
                )
                .saturating_mul(60),
            ),
            enabled,
            env: AppEnv::from_env(),
        }
    }

    /// 定期チェックを起動すべきか
    ///
    /// テスト環境では常に無効。
    pub fn periodic_enabled(&self) -> bool {
        self.enabled && self.env != AppEnv::Test
    }
}

fn bounded_or(name: &str, value: u64, default: u64, max: u64) -> u64 {
    if value == 0 {
        tracing::warn!(setting = name, default, "Zero duration configured, using default");
        default
    } else if value > max {
        tracing::warn!(setting = name, value, max, "Duration too large, clamping");
        max
    } else {
        value
    }
}

/// 定期チェック間隔を `(0, MAX_CHECK_INTERVAL_MINUTES]` に収める
///
/// ゼロはデフォルト、上限超過は上限に置き換える。
pub fn bounded_check_interval(interval: Duration) -> Duration {
    bounded_duration(
        "check interval",
        interval,
        Duration::from_secs(DEFAULT_CHECK_INTERVAL_MINUTES * 60),
        Duration::from_secs(MAX_CHECK_INTERVAL_MINUTES * 60),
    )
}

/// WebSocket ping 間隔を `(0, MAX_WS_HEARTBEAT_SECS]` に収める
pub fn bounded_heartbeat(heartbeat: Duration) -> Duration {
    bounded_duration(
        "heartbeat",
        heartbeat,
        Duration::from_secs(DEFAULT_WS_HEARTBEAT_SECS),
        Duration::from_secs(MAX_WS_HEARTBEAT_SECS),
    )
}

fn bounded_duration(name: &str, value: Duration, default: Duration, max: Duration) -> Duration {
    if value.is_zero() {
        tracing::warn!(setting = name, ?default, "Zero duration configured, using default");
        default
    } else if value > max {
        tracing::warn!(setting = name, ?value, ?max, "Duration too large, clamping");
        max
    } else {
        value
    }
}

/// ライブ更新チャネル設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveUpdateConfig {
    /// WebSocket ping 間隔
    pub heartbeat: Duration,
    /// 購読者ごとの送信キュー容量
    pub subscriber_buffer: usize,
}

impl Default for LiveUpdateConfig {
    fn default() -> Self {
        Self {
            heartbeat: Duration::from_secs(DEFAULT_WS_HEARTBEAT_SECS),
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

impl LiveUpdateConfig {
    /// Load live update configuration from environment variables.
    pub fn from_env() -> Self {
        let heartbeat_secs = get_env_with_fallback_parse(
            "DEVXP_WS_HEARTBEAT_SECS",
            "WS_HEARTBEAT_SECS",
            DEFAULT_WS_HEARTBEAT_SECS,
        );
        let subscriber_buffer = get_env_with_fallback_parse(
            "DEVXP_SUBSCRIBER_BUFFER",
            "SUBSCRIBER_BUFFER",
            DEFAULT_SUBSCRIBER_BUFFER,
        );
        Self {
            heartbeat: Duration::from_secs(bounded_or(
                "heartbeat (secs)",
                heartbeat_secs,
                DEFAULT_WS_HEARTBEAT_SECS,
                MAX_WS_HEARTBEAT_SECS,
            )),
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }
}

/// データベースURLを取得
///
/// 環境変数 `DEVXP_DATABASE_URL`（旧: `DATABASE_URL`）。未設定時はカレントディレクトリのSQLite。
pub fn database_url() -> String {
    get_env_with_fallback_or(
        "DEVXP_DATABASE_URL",
        "DATABASE_URL",
        "sqlite://devxp-health.db?mode=rwc",
    )
}

/// Identity gate のAPIトークンを取得
///
/// 環境変数 `DEVXP_API_TOKEN` が空でなければ有効化する。
pub fn api_token() -> Option<String> {
    std::env::var("DEVXP_API_TOKEN")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
