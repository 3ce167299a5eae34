//! Shared fixtures for handler and content tests.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{body::Body, response::Response, Router};
use wiremock::MockServer;

use crate::api::AppState;
use crate::cache::{CacheManager, MemoryCache};
use crate::cms::StrapiClient;
use crate::config::Config;

pub const TEST_SECRET: &str = "test-secret";

/// A mock CMS plus application state pointed at it
pub struct TestEnv {
    pub cms: MockServer,
    pub state: Arc<AppState>,
}

impl TestEnv {
    pub async fn start() -> Self {
        Self::with_env(&[]).await
    }

    /// Start with extra environment-style settings
    pub async fn with_env(overrides: &[(&str, &str)]) -> Self {
        let cms = MockServer::start().await;

        let mut vars: HashMap<String, String> = HashMap::new();
        vars.insert("STRAPI_URL".into(), cms.uri());
        vars.insert("SITE_URL".into(), "https://casinos.example.com".into());
        vars.insert("REVALIDATE_SECRET".into(), TEST_SECRET.into());
        for (key, value) in overrides {
            vars.insert(key.to_string(), value.to_string());
        }
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();

        let client = StrapiClient::new(&config.strapi_url, None, config.cms_timeout).unwrap();
        let cache = CacheManager::new(
            Arc::new(MemoryCache::new()),
            config.cache_fresh_for,
            config.cache_stale_for,
        );
        let state = AppState::with_parts(config, client, cache).unwrap();

        Self {
            cms,
            state: Arc::new(state),
        }
    }

    /// Full application router, middleware included
    pub fn router(&self) -> Router {
        crate::build_router(self.state.clone())
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
