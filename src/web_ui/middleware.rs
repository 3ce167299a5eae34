//! Request middleware for page routes: the session gate and CMS redirects.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::api::auth::usable_session;
use crate::api::AppState;
use crate::content::redirects;

fn is_protected(path: &str) -> bool {
    path == "/dashboard" || path.starts_with("/dashboard/")
}

fn is_auth_page(path: &str) -> bool {
    matches!(path, "/authentication/login" | "/authentication/register")
}

/// Keep anonymous visitors out of the dashboard and logged-in users off the auth forms
pub async fn session_gate(request: Request, next: Next) -> Response {
    let path = request.uri().path();

    if is_protected(path) && usable_session(request.headers()).is_none() {
        let target = match request.uri().query() {
            Some(query) => format!("{}?{}", path, query),
            None => path.to_string(),
        };
        tracing::debug!(path = %path, "no session, redirecting to login");
        return Redirect::to(&format!("/authentication/login?next={}", urlencoding::encode(&target)))
            .into_response();
    }

    if is_auth_page(path) && usable_session(request.headers()).is_some() {
        return Redirect::to("/dashboard").into_response();
    }

    next.run(request).await
}

/// Paths that never go through CMS redirects
fn skips_redirects(path: &str) -> bool {
    path == "/api"
        || path.starts_with("/api/")
        || path == "/health"
        || path == "/sitemap.xml"
        || path.starts_with("/sitemaps/")
}

/// Apply redirects managed in the CMS to page requests
pub async fn cms_redirects(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method();
    if (method != Method::GET && method != Method::HEAD) || skips_redirects(request.uri().path()) {
        return next.run(request).await;
    }

    if let Some(target) = redirects::resolve(&state, request.uri().path()).await {
        tracing::debug!(
            from = %request.uri().path(),
            to = %target.destination,
            permanent = target.permanent,
            "CMS redirect"
        );
        return if target.permanent {
            Redirect::permanent(&target.destination).into_response()
        } else {
            Redirect::temporary(&target.destination).into_response()
        };
    }

    next.run(request).await
}
