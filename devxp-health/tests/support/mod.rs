//! 統合テスト用ユーティリティ

pub mod health;
pub mod http;
