pub mod analytics;
pub mod auth;
pub mod handlers;
pub mod revalidate;

use std::sync::Arc;
use axum::{routing::{get, post}, Router};

pub use handlers::{health, list_games, submit_rating, AppState};

/// JSON API router.
/// Everything lives under /api except the health probe.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        // Session endpoints proxying the CMS users-permissions plugin
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/games", get(list_games))
        .route("/api/ratings", post(submit_rating))
        .route("/api/revalidate", post(revalidate::revalidate))
        .route("/api/analytics/*path", post(analytics::proxy))
}
