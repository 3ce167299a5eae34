//! First-party proxy for the analytics collector.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use super::AppState;
use crate::error::{Result, ServerError};

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// `x-forwarded-for` with the client address appended
pub fn forwarded_for(existing: Option<&str>, client: Option<SocketAddr>) -> Option<String> {
    let existing = existing.map(str::trim).filter(|v| !v.is_empty());
    match (existing, client) {
        (Some(chain), Some(addr)) => Some(format!("{}, {}", chain, addr.ip())),
        (None, Some(addr)) => Some(addr.ip().to_string()),
        (Some(chain), None) => Some(chain.to_string()),
        (None, None) => None,
    }
}

/// POST /api/analytics/*path
pub async fn proxy(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let base = state
        .config
        .analytics_url
        .as_deref()
        .ok_or_else(|| ServerError::NotFound("analytics".to_string()))?;
    let url = format!("{}/{}", base, path.trim_start_matches('/'));

    let mut request = state.http.post(&url).body(body);
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        request = request.header(header::CONTENT_TYPE, content_type);
    }
    if let Some(user_agent) = headers.get(header::USER_AGENT) {
        request = request.header(header::USER_AGENT, user_agent);
    }
    let existing = headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok());
    if let Some(chain) = forwarded_for(existing, connect_info.map(|ConnectInfo(addr)| addr)) {
        request = request.header(X_FORWARDED_FOR, chain);
    }

    let upstream = request.send().await.map_err(|e| {
        tracing::warn!(url = %url, error = %e, "analytics upstream unreachable");
        ServerError::Upstream(e.to_string())
    })?;

    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let body = upstream
        .bytes()
        .await
        .map_err(|e| ServerError::Upstream(e.to_string()))?;

    tracing::debug!(path = %path, status = %status, "analytics event forwarded");

    let mut response = (status, body).into_response();
    if let Some(content_type) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_for_chain() {
        let client: SocketAddr = "203.0.113.9:5555".parse().unwrap();
        assert_eq!(forwarded_for(None, Some(client)).as_deref(), Some("203.0.113.9"));
        assert_eq!(
            forwarded_for(Some("198.51.100.1"), Some(client)).as_deref(),
            Some("198.51.100.1, 203.0.113.9")
        );
        assert_eq!(forwarded_for(Some("198.51.100.1"), None).as_deref(), Some("198.51.100.1"));
        assert_eq!(forwarded_for(Some(" "), None), None);
    }
}
