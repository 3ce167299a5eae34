//! Home page data.

use serde::Serialize;

use super::{blogs, casinos, games, HOMEPAGE};
use crate::api::AppState;
use crate::cache::keys;
use crate::cms::types::{Blog, Casino, Game, HomePage};
use crate::cms::{CmsError, StrapiQuery};

pub const TOP_CASINOS: u32 = 6;
pub const LATEST_GAMES: u32 = 8;
pub const LATEST_BLOGS: u32 = 3;

#[derive(Clone, Debug, Serialize)]
pub struct HomeData {
    pub page: HomePage,
    pub top_casinos: Vec<Casino>,
    pub latest_games: Vec<Game>,
    pub latest_blogs: Vec<Blog>,
}

async fn page(state: &AppState) -> Result<HomePage, CmsError> {
    let cms = state.cms.clone();
    state
        .cache
        .get_or_fetch(
            &keys::single(HOMEPAGE),
            state.cache.policy().tagged(keys::tags::collection(HOMEPAGE)),
            move || async move {
                cms.single::<HomePage>(HOMEPAGE, &StrapiQuery::new().populate("seo"))
                    .await
            },
        )
        .await
}

fn or_empty<T>(section: &str, result: Result<Vec<T>, CmsError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::error!(section = %section, error = %e, "home section failed to load");
        Vec::new()
    })
}

/// Everything the home page shows. Each section degrades independently.
pub async fn load(state: &AppState) -> HomeData {
    let (page, top_casinos, latest_games, latest_blogs) = tokio::join!(
        page(state),
        casinos::top(state, TOP_CASINOS),
        games::latest(state, LATEST_GAMES),
        blogs::latest(state, LATEST_BLOGS),
    );

    let page = page.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "home page single type unavailable, using defaults");
        HomePage {
            title: state.config.site_name.clone(),
            heading: None,
            introduction: None,
            seo: None,
        }
    });

    HomeData {
        page,
        top_casinos: or_empty("top_casinos", top_casinos),
        latest_games: or_empty("latest_games", latest_games),
        latest_blogs: or_empty("latest_blogs", latest_blogs),
    }
}
