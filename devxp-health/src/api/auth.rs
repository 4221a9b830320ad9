//! Identity gate
//!
//! `DEVXP_API_TOKEN` が設定されている場合、`Authorization: Bearer <token>`
//! もしくはクエリ `?token=`（WebSocket接続用）を要求する。未設定なら素通し。

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use tracing::warn;

use super::error::AppError;
use crate::common::error::HealthError;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Identity gate ミドルウェア
pub async fn identity_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = bearer_token(request.headers())?.or_else(|| query_token(request.uri()));

    match provided {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => {
            Ok(next.run(request).await)
        }
        Some(_) => {
            warn!(path = %request.uri().path(), "Rejected request with invalid token");
            Err(HealthError::Unauthorized("invalid token".into()).into())
        }
        None => Err(HealthError::Unauthorized("missing token".into()).into()),
    }
}

/// Authorizationヘッダーから "Bearer {token}" を抽出
fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| HealthError::Unauthorized("invalid Authorization header format".into()))?;
    Ok(Some(token.trim().to_string()))
}

fn query_token(uri: &Uri) -> Option<String> {
    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.token)
        .filter(|t| !t.is_empty())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
