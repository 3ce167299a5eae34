//! Shared utilities and helper functions for web UI.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use tera::Context;

use crate::api::auth::usable_session;
use crate::api::AppState;
use crate::cms::types::Seo;
use crate::error::ServerError;
use crate::web_ui::templates;

/// Context every page starts from: site name, media base and session flag
pub fn base_context(state: &AppState, headers: &HeaderMap) -> Context {
    let mut context = Context::new();
    context.insert("site_name", &state.config.site_name);
    context.insert("site_url", &state.config.site_url);
    context.insert("media_url", &state.config.media_url);
    context.insert("logged_in", &usable_session(headers).is_some());
    context
}

/// Title, description and canonical link, preferring the entry's SEO component
pub fn insert_seo(context: &mut Context, state: &AppState, seo: Option<&Seo>, title: &str, path: &str) {
    let seo = seo.cloned().unwrap_or_default();
    context.insert("seo_title", seo.meta_title.as_deref().unwrap_or(title));
    if let Some(description) = seo.meta_description.as_deref() {
        context.insert("seo_description", description);
    }
    let canonical = seo
        .canonical_url
        .unwrap_or_else(|| format!("{}{}", state.config.site_url, path));
    context.insert("canonical_url", &canonical);
}

/// Helper to render a template
pub fn render_template(name: &str, context: &Context) -> Response {
    render_with_status(StatusCode::OK, name, context)
}

pub fn render_with_status(status: StatusCode, name: &str, context: &Context) -> Response {
    match templates::render(name, context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(template = %name, error = ?e, "template error");
            ServerError::Template(e).into_response()
        }
    }
}

/// Helper to render an error page
pub fn render_error(mut context: Context, status: StatusCode, heading: &str, message: &str) -> Response {
    context.insert("heading", heading);
    context.insert("message", message);

    match templates::render("error.html", &context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(_) => (status, message.to_string()).into_response(),
    }
}

pub fn render_not_found(state: &AppState, headers: &HeaderMap, message: &str) -> Response {
    render_error(base_context(state, headers), StatusCode::NOT_FOUND, "Page not found", message)
}

/// Error page for a failed request, with the status the error maps to
pub fn render_failure(state: &AppState, headers: &HeaderMap, error: ServerError) -> Response {
    let status = error.status();
    if status.is_server_error() {
        tracing::error!(error = %error, "page failed to load");
    }
    render_error(
        base_context(state, headers),
        status,
        "Something went wrong",
        &error.public_message(),
    )
}

/// 303 redirect that also sets a cookie
pub fn redirect_with_cookie(location: &str, cookie: String) -> Response {
    let mut response = Redirect::to(location).into_response();
    if let Ok(value) = cookie.parse() {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

/// `path?error=<message>` with the message encoded
pub fn with_error(path: &str, message: &str) -> String {
    format!("{}?error={}", path, urlencoding::encode(message))
}

/// Only same-site absolute paths that fit in a `Location` header are
/// accepted as post-login targets. Browsers read `/\` like `//`.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !matches!(path.as_bytes().get(1), Some(b'/' | b'\\'))
                && HeaderValue::from_str(path).is_ok() =>
        {
            path
        }
        _ => "/dashboard",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/dashboard/settings")), "/dashboard/settings");
        assert_eq!(safe_next(Some("//evil.example")), "/dashboard");
        assert_eq!(safe_next(Some("https://evil.example")), "/dashboard");
        assert_eq!(safe_next(Some("/\\evil.example")), "/dashboard");
        assert_eq!(safe_next(Some("/dashboard\r\nX-Injected: 1")), "/dashboard");
        assert_eq!(safe_next(Some("/")), "/");
        assert_eq!(safe_next(None), "/dashboard");
    }

    #[test]
    fn test_with_error() {
        assert_eq!(
            with_error("/authentication/login", "Invalid identifier or password"),
            "/authentication/login?error=Invalid%20identifier%20or%20password"
        );
    }
}
