//! 共通定義
//!
//! エラー型など、各レイヤーから参照される型

pub mod error;
