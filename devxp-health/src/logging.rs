//! ロギング初期化
//!
//! 標準エラー出力に加え、ログディレクトリが設定されていれば日次ローテーションの
//! ファイルにも出力する。

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{get_env_with_fallback, get_env_with_fallback_or};

/// デフォルトのログレベル
const DEFAULT_LOG_LEVEL: &str = "info";

/// デフォルトのログファイル名
const DEFAULT_LOG_FILE: &str = "devxp-health.log";

/// ロギング設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// フィルタ式（`info`, `devxp_health=debug,tower_http=info` など）
    pub filter: String,
    /// ファイル出力先ディレクトリ（未設定なら標準エラーのみ）
    pub directory: Option<PathBuf>,
    /// ファイル名
    pub file_name: String,
}

impl LoggingConfig {
    /// Load logging configuration from environment variables.
    ///
    /// `DEVXP_LOG_LEVEL`（旧: `LOG_LEVEL`）が未設定なら `RUST_LOG` を使う。
    pub fn from_env() -> Self {
        let filter = get_env_with_fallback("DEVXP_LOG_LEVEL", "LOG_LEVEL")
            .or_else(|| std::env::var("RUST_LOG").ok())
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let directory = get_env_with_fallback("DEVXP_LOG_DIR", "LOG_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let file_name = get_env_with_fallback_or("DEVXP_LOG_FILE", "LOG_FILE", DEFAULT_LOG_FILE);

        Self {
            filter,
            directory,
            file_name,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|e| {
            eprintln!(
                "Invalid log filter '{}': {}, falling back to '{}'",
                self.filter, e, DEFAULT_LOG_LEVEL
            );
            EnvFilter::new(DEFAULT_LOG_LEVEL)
        })
    }
}

/// 環境変数からロギングを初期化
///
/// ファイル出力を有効にした場合、返された [`WorkerGuard`] をプロセス終了まで保持すること。
pub fn init() -> anyhow::Result<Option<WorkerGuard>> {
    init_with(&LoggingConfig::from_env())
}

/// 設定を指定してロギングを初期化
pub fn init_with(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let stderr_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let appender = tracing_appender::rolling::daily(directory, &config.file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer);

            tracing_subscriber::registry()
                .with(config.env_filter())
                .with(stderr_layer)
                .with(file_layer)
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(config.env_filter())
                .with(stderr_layer)
                .try_init()?;
            Ok(None)
        }
    }
}
