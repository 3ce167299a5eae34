use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};

use super::auth::usable_session;
use crate::cache::{self, CacheManager};
use crate::cms::StrapiClient;
use crate::config::Config;
use crate::content::games::{self, GameFilters, GamesPage};
use crate::error::{Result, ServerError};
use crate::ratings::{RatingOutcome, RatingRequest, RatingService};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub cms: StrapiClient,
    pub cache: CacheManager,
    pub ratings: RatingService,
    /// Client for outbound calls that are not CMS requests (analytics)
    pub http: reqwest::Client,
}

impl AppState {
    /// Build the state from configuration, connecting to Redis if configured.
    /// An unreachable Redis falls back to the in-process cache.
    pub async fn new(config: Config) -> Result<Self> {
        let cms = StrapiClient::new(&config.strapi_url, config.strapi_token.clone(), config.cms_timeout)?;

        let cache = match cache::build(&config).await {
            Ok(cache) => cache,
            Err(e) => {
                tracing::error!(error = %e, "Redis unavailable, falling back to in-memory cache");
                CacheManager::new(
                    cache::memory_backend(),
                    config.cache_fresh_for,
                    config.cache_stale_for,
                )
            }
        };

        Self::with_parts(config, cms, cache)
    }

    pub fn with_parts(config: Config, cms: StrapiClient, cache: CacheManager) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.cms_timeout)
            .build()
            .map_err(|e| ServerError::Internal(format!("HTTP client: {}", e)))?;

        tracing::info!(
            cms = %cms.base_url(),
            cache = cache.backend().mode(),
            analytics = config.analytics_url.is_some(),
            "application state ready"
        );

        Ok(Self {
            config,
            cms,
            cache,
            ratings: RatingService::new(),
            http,
        })
    }
}

/// GET /api/games
pub async fn list_games(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<GameFilters>,
) -> Json<GamesPage> {
    Json(games::list(&state, &filters).await)
}

/// POST /api/ratings
pub async fn submit_rating(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<RatingRequest>, JsonRejection>,
) -> Result<Json<RatingOutcome>> {
    if usable_session(&headers).is_none() {
        return Err(ServerError::AuthRequired);
    }
    let Json(request) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let outcome = state.ratings.submit(&state.cms, &state.cache, &request).await?;
    Ok(Json(outcome))
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let backend = state.cache.backend();
    let available = backend.is_available().await;
    let stats = state.cache.stats();

    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "cache": {
            "mode": backend.mode(),
            "available": available,
            "hits": stats.hits,
            "staleHits": stats.stale_hits,
            "misses": stats.misses,
        }
    }))
    .into_response()
}
