//! serve サブコマンド
//!
//! ヘルスモニタリングサーバーを起動する。

use clap::Args;

/// serve サブコマンドの引数
///
/// 未指定の場合は環境変数（旧名を含む）から解決する。
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Listen port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Bind address
    #[arg(short = 'H', long)]
    pub host: Option<String>,
}
