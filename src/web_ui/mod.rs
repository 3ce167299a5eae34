//! Server-rendered pages.
//!
//! Content pages, the auth forms and dashboard, sitemaps and robots.txt.
//! Page requests pass through two middleware layers: CMS-managed redirects
//! and the session gate in front of `/dashboard` and the auth forms.

mod middleware;
mod routes;
mod templates;

use axum::Router;
use std::sync::Arc;

use crate::api::AppState;

pub use middleware::{cms_redirects, session_gate};

/// Create the web UI router.
/// Mount this with `.merge(web_ui::router())` in main.rs
pub fn router() -> Router<Arc<AppState>> {
    routes::create_router()
}
