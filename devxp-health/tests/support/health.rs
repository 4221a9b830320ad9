//! ヘルスモニター組み立てヘルパー

use std::sync::Arc;
use std::time::Duration;

use devxp_health::config::{AppEnv, HealthCheckConfig, LiveUpdateConfig};
use devxp_health::db;
use devxp_health::health::HttpProber;
use devxp_health::types::Service;
use devxp_health::AppState;
use sqlx::SqlitePool;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::http::{spawn_app, TestServer};

/// 起動済みのテスト環境
#[allow(dead_code)]
pub struct TestMonitor {
    pub state: AppState,
    pub pool: SqlitePool,
    pub server: TestServer,
}

/// 一時ファイルのSQLiteでプールを作成
pub async fn temp_pool() -> SqlitePool {
    let path = std::env::temp_dir().join(format!(
        "devxp-health-it-{}-{}.db",
        std::process::id(),
        uuid::Uuid::new_v4()
    ));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    db::create_pool(&url).await.expect("create test pool")
}

/// 指定したステータスコードを返すモックサービス
pub async fn mock_service(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

/// サービスを登録
pub async fn register(pool: &SqlitePool, service: Service) -> Service {
    db::services::create_service(pool, &service)
        .await
        .expect("register service");
    service
}

/// モニターを起動（定期チェックは起動しない）
pub async fn spawn_monitor(pool: SqlitePool, api_token: Option<&str>) -> TestMonitor {
    let live_updates = LiveUpdateConfig {
        heartbeat: Duration::from_secs(30),
        subscriber_buffer: 16,
    };
    spawn_monitor_with(pool, api_token, live_updates).await
}

/// ライブ更新設定を指定してモニターを起動
pub async fn spawn_monitor_with(
    pool: SqlitePool,
    api_token: Option<&str>,
    live_updates: LiveUpdateConfig,
) -> TestMonitor {
    let health = HealthCheckConfig {
        probe_timeout: Duration::from_secs(2),
        interval: Duration::from_secs(300),
        enabled: false,
        env: AppEnv::Test,
    };
    let prober = HttpProber::new(health.probe_timeout).expect("build prober");
    let state = AppState::new(
        Arc::new(pool.clone()),
        Arc::new(prober),
        health,
        live_updates,
        api_token.map(str::to_string),
    );
    let server = spawn_app(devxp_health::api::create_app(state.clone())).await;

    TestMonitor {
        state,
        pool,
        server,
    }
}
