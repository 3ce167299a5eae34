//! Sitemaps and robots.txt.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tera::Context;

use super::utils::{render_failure, render_not_found};
use crate::api::AppState;
use crate::content::sitemap::{self, SitemapKind};
use crate::error::ServerError;
use crate::web_ui::templates;

const XML: &str = "application/xml; charset=utf-8";

fn render_xml(name: &str, context: &Context) -> Response {
    match templates::render_xml(name, context) {
        Ok(xml) => ([(header::CONTENT_TYPE, XML)], xml).into_response(),
        Err(e) => ServerError::Template(e).into_response(),
    }
}

/// GET /sitemap.xml
pub async fn sitemap_index(State(state): State<Arc<AppState>>) -> Response {
    let sitemaps: Vec<String> = SitemapKind::ALL
        .iter()
        .map(|kind| format!("{}/sitemaps/{}", state.config.site_url, kind.file_name()))
        .collect();

    let mut context = Context::new();
    context.insert("sitemaps", &sitemaps);
    render_xml("sitemap_index.xml", &context)
}

/// GET /sitemaps/:file
pub async fn sitemap_file(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
    headers: HeaderMap,
) -> Response {
    let Some(kind) = SitemapKind::from_file_name(&file) else {
        return render_not_found(&state, &headers, &format!("No sitemap named '{}'", file));
    };

    match sitemap::entries(&state, kind).await {
        Ok(entries) => {
            let mut context = Context::new();
            context.insert("entries", &entries);
            render_xml("urlset.xml", &context)
        }
        Err(e) => render_failure(&state, &headers, e.into()),
    }
}

/// GET /robots.txt
pub async fn robots(State(state): State<Arc<AppState>>) -> Response {
    let body = format!(
        "User-agent: *\nAllow: /\nDisallow: /api/\nDisallow: /dashboard\nDisallow: /authentication/\n\nSitemap: {}/sitemap.xml\n",
        state.config.site_url
    );
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}
